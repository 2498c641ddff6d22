use tracefall_core::error::{Result, TracefallError};
use tracefall_core::model::span::RawSpan;
use tracing::{debug, warn};

use crate::batch::{Column, ColumnBatch};
use crate::coerce::{to_number, to_optional_text, to_parent, to_text};

// Accepted names per field, in preference order.
const TRACE_ID: &[&str] = &["trace_id"];
const SPAN_ID: &[&str] = &["span_id"];
const SPAN_NAME: &[&str] = &["span_name", "name"];
const PARENT_SPAN_ID: &[&str] = &["parent_span_id"];
const SERVICE_NAME: &[&str] = &["service_name", "service"];
const START: &[&str] = &["timestamp", "start_timestamp"];
const END: &[&str] = &["end_timestamp"];
const DURATION: &[&str] = &["duration", "duration_ms"];
const STATUS: &[&str] = &["status_code", "status"];
const SPAN_ATTRIBUTES: &[&str] = &["span_attributes"];
const RESOURCE_ATTRIBUTES: &[&str] = &["resource_attributes"];

/// Columns of a batch bound to span fields.
#[derive(Debug, Clone, Copy)]
pub struct SpanColumns<'a> {
    pub trace_id: &'a Column,
    pub span_id: &'a Column,
    pub span_name: &'a Column,
    pub parent_span_id: Option<&'a Column>,
    pub service_name: Option<&'a Column>,
    pub start: Option<&'a Column>,
    pub end: Option<&'a Column>,
    pub duration: Option<&'a Column>,
    pub status: Option<&'a Column>,
    pub span_attributes: Option<&'a Column>,
    pub resource_attributes: Option<&'a Column>,
}

fn find<'a>(batch: &'a ColumnBatch, aliases: &[&str]) -> Option<&'a Column> {
    aliases.iter().find_map(|name| batch.column(name))
}

fn require<'a>(
    batch: &'a ColumnBatch,
    aliases: &'static [&'static str],
) -> Result<&'a Column> {
    find(batch, aliases).ok_or(TracefallError::MissingColumn(aliases[0]))
}

pub fn resolve_columns(batch: &ColumnBatch) -> Result<SpanColumns<'_>> {
    Ok(SpanColumns {
        trace_id: require(batch, TRACE_ID)?,
        span_id: require(batch, SPAN_ID)?,
        span_name: require(batch, SPAN_NAME)?,
        parent_span_id: find(batch, PARENT_SPAN_ID),
        service_name: find(batch, SERVICE_NAME),
        start: find(batch, START),
        end: find(batch, END),
        duration: find(batch, DURATION),
        status: find(batch, STATUS),
        span_attributes: find(batch, SPAN_ATTRIBUTES),
        resource_attributes: find(batch, RESOURCE_ATTRIBUTES),
    })
}

/// Convert a batch into spans, failing when a required column is absent.
pub fn try_adapt_batch(batch: &ColumnBatch) -> Result<Vec<RawSpan>> {
    let cols = resolve_columns(batch)?;
    let text = |col: Option<&Column>, row: usize| col.map(|c| to_text(c.get(row))).unwrap_or_default();
    let number = |col: Option<&Column>, row: usize| col.map_or(0.0, |c| to_number(c.get(row)));

    let spans = (0..batch.num_rows())
        .map(|row| {
            let timestamp = number(cols.start, row);
            let (end_timestamp, duration) = match (cols.end, cols.duration) {
                (Some(_), Some(_)) => (number(cols.end, row), number(cols.duration, row)),
                (None, Some(_)) => {
                    let duration = number(cols.duration, row);
                    (timestamp + duration, duration)
                }
                (Some(_), None) => {
                    let end = number(cols.end, row);
                    (end, (end - timestamp).max(0.0))
                }
                (None, None) => (timestamp, 0.0),
            };
            RawSpan {
                trace_id: to_text(cols.trace_id.get(row)),
                span_id: to_text(cols.span_id.get(row)),
                parent_span_id: cols.parent_span_id.and_then(|c| to_parent(c.get(row))),
                service_name: text(cols.service_name, row),
                span_name: to_text(cols.span_name.get(row)),
                timestamp,
                end_timestamp,
                duration,
                status_code: text(cols.status, row),
                span_attributes: cols.span_attributes.and_then(|c| to_optional_text(c.get(row))),
                resource_attributes: cols
                    .resource_attributes
                    .and_then(|c| to_optional_text(c.get(row))),
            }
        })
        .collect::<Vec<_>>();
    debug!(rows = spans.len(), "batch adapted");
    Ok(spans)
}

/// Lenient form used by views: a malformed batch logs a warning and yields no
/// spans.
pub fn adapt_batch(batch: &ColumnBatch) -> Vec<RawSpan> {
    match try_adapt_batch(batch) {
        Ok(spans) => spans,
        Err(err) => {
            warn!(
                error = %err,
                columns = ?batch.column_names().collect::<Vec<_>>(),
                "span batch rejected"
            );
            Vec::new()
        }
    }
}
