use serde::{Deserialize, Serialize};

/// Status value that marks a span as failed.
pub const ERROR_STATUS: &str = "ERROR";

/// Legacy numeric status code for errors (OTLP `STATUS_CODE_ERROR`).
const LEGACY_ERROR_CODE: f64 = 2.0;

/// One observed span, as produced by the feed adaptor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct RawSpan {
    pub trace_id: String,
    pub span_id: String,
    pub parent_span_id: Option<String>,
    pub service_name: String,
    pub span_name: String,
    /// Start, epoch millis.
    pub timestamp: f64,
    /// End, epoch millis.
    pub end_timestamp: f64,
    /// Millis.
    pub duration: f64,
    pub status_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span_attributes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_attributes: Option<String>,
}

impl RawSpan {
    pub fn is_error(&self) -> bool {
        is_error_status(&self.status_code)
    }

    /// Span attributes as a JSON object, or `None` when absent or malformed.
    pub fn attributes(&self) -> Option<serde_json::Map<String, serde_json::Value>> {
        parse_attribute_blob(self.span_attributes.as_deref())
    }

    pub fn resource(&self) -> Option<serde_json::Map<String, serde_json::Value>> {
        parse_attribute_blob(self.resource_attributes.as_deref())
    }
}

pub fn is_error_status(code: &str) -> bool {
    let code = code.trim();
    code == ERROR_STATUS || code.parse::<f64>().is_ok_and(|n| n == LEGACY_ERROR_CODE)
}

fn parse_attribute_blob(raw: Option<&str>) -> Option<serde_json::Map<String, serde_json::Value>> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(serde_json::Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// A raw span placed in the waterfall.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LayoutSpan {
    #[serde(flatten)]
    pub span: RawSpan,
    pub depth: usize,
    pub row_index: usize,
    pub is_error: bool,
    /// Row indices of the children, in sibling order.
    pub children: Vec<usize>,
}

/// Layout result for one batch of spans.
///
/// `spans` is stored in row order, so `spans[i].row_index == i`. `roots` and
/// every `children` list refer into `spans` by row index.
#[derive(Debug, Clone, Serialize, PartialEq, Default)]
pub struct TraceLayout {
    pub spans: Vec<LayoutSpan>,
    pub roots: Vec<usize>,
    pub trace_start: f64,
    pub trace_end: f64,
    pub total_duration: f64,
}

impl TraceLayout {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    pub fn row(&self, row_index: usize) -> Option<&LayoutSpan> {
        self.spans.get(row_index)
    }

    pub fn roots(&self) -> impl Iterator<Item = &LayoutSpan> + '_ {
        self.roots.iter().filter_map(|&row| self.spans.get(row))
    }

    pub fn children<'a>(&'a self, span: &'a LayoutSpan) -> impl Iterator<Item = &'a LayoutSpan> + 'a {
        span.children.iter().filter_map(|&row| self.spans.get(row))
    }

    /// First span carrying `span_id`, in row order.
    pub fn find(&self, span_id: &str) -> Option<&LayoutSpan> {
        self.spans.iter().find(|s| s.span.span_id == span_id)
    }

    pub fn error_count(&self) -> usize {
        self.spans.iter().filter(|s| s.is_error).count()
    }
}
