use chrono::{Duration, TimeZone, Utc};
use opentelemetry_proto::tonic::collector::trace::v1::ExportTraceServiceRequest;
use opentelemetry_proto::tonic::common::v1::any_value::Value;
use opentelemetry_proto::tonic::common::v1::{AnyValue, KeyValue};
use opentelemetry_proto::tonic::resource::v1::Resource;
use opentelemetry_proto::tonic::trace::v1::{ResourceSpans, ScopeSpans, Span, Status};
use prost::Message;
use tracefall_core::model::span::RawSpan;
use tracefall_core::time::datetime_to_millis;

/// Epoch millis of 2026-02-01T00:00:00Z, the start of every sample trace.
pub fn base_millis() -> f64 {
    let base = Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap();
    datetime_to_millis(&base)
}

pub fn raw_span(span_id: &str, parent: Option<&str>, start_ms: f64, duration_ms: f64) -> RawSpan {
    RawSpan {
        trace_id: "trace".to_string(),
        span_id: span_id.to_string(),
        parent_span_id: parent.map(str::to_string),
        service_name: "svc".to_string(),
        span_name: format!("op-{span_id}"),
        timestamp: start_ms,
        end_timestamp: start_ms + duration_ms,
        duration: duration_ms,
        status_code: "OK".to_string(),
        span_attributes: None,
        resource_attributes: None,
    }
}

/// A small checkout trace: an erroring request with a cache call and a
/// query issued after it.
pub fn sample_trace(trace_id: &str) -> Vec<RawSpan> {
    let base = base_millis();
    let base_dt = Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap();
    let at = |ms: i64| datetime_to_millis(&(base_dt + Duration::milliseconds(ms)));

    vec![
        RawSpan {
            trace_id: trace_id.to_string(),
            span_id: "root".to_string(),
            parent_span_id: None,
            service_name: "api".to_string(),
            span_name: "GET /v1/orders".to_string(),
            timestamp: base,
            end_timestamp: at(1800),
            duration: 1800.0,
            status_code: "ERROR".to_string(),
            span_attributes: Some("{\"http.method\":\"GET\"}".to_string()),
            resource_attributes: Some("{\"service.name\":\"api\"}".to_string()),
        },
        RawSpan {
            trace_id: trace_id.to_string(),
            span_id: "db".to_string(),
            parent_span_id: Some("root".to_string()),
            service_name: "postgres".to_string(),
            span_name: "SELECT orders".to_string(),
            timestamp: at(1000),
            end_timestamp: at(1250),
            duration: 250.0,
            status_code: "OK".to_string(),
            span_attributes: None,
            resource_attributes: None,
        },
        RawSpan {
            trace_id: trace_id.to_string(),
            span_id: "cache".to_string(),
            parent_span_id: Some("root".to_string()),
            service_name: "api".to_string(),
            span_name: "cache.get redis".to_string(),
            timestamp: at(900),
            end_timestamp: at(1600),
            duration: 700.0,
            status_code: "ERROR".to_string(),
            span_attributes: Some("{\"peer\":\"redis:6379\"}".to_string()),
            resource_attributes: None,
        },
    ]
}

/// `depth` spans, each the only child of the previous one.
pub fn chain_trace(trace_id: &str, depth: usize) -> Vec<RawSpan> {
    let base = base_millis();
    (0..depth)
        .map(|i| {
            let id = format!("{trace_id}-{i}");
            let parent = i.checked_sub(1).map(|p| format!("{trace_id}-{p}"));
            let mut span = raw_span(&id, parent.as_deref(), base + i as f64, 1000.0 - i as f64);
            span.trace_id = trace_id.to_string();
            span
        })
        .collect()
}

/// `sample_trace` as a JSON array of row objects, the shape query tools
/// export.
pub fn sample_rows_json(trace_id: &str) -> String {
    let rows: Vec<serde_json::Value> = sample_trace(trace_id)
        .into_iter()
        .map(|s| {
            serde_json::json!({
                "trace_id": s.trace_id,
                "span_id": s.span_id,
                "parent_span_id": s.parent_span_id.unwrap_or_default(),
                "service_name": s.service_name,
                "span_name": s.span_name,
                "timestamp": s.timestamp,
                "duration": s.duration,
                "status_code": s.status_code,
            })
        })
        .collect();
    serde_json::Value::Array(rows).to_string()
}

fn string_kv(key: &str, value: &str) -> KeyValue {
    KeyValue {
        key: key.to_string(),
        value: Some(AnyValue {
            value: Some(Value::StringValue(value.to_string())),
        }),
    }
}

/// Two-span OTLP export from service `checkout`.
pub fn sample_otlp_request() -> ExportTraceServiceRequest {
    let start = 1_700_000_000_000_000_000u64;
    let root = Span {
        trace_id: vec![0xab; 16],
        span_id: vec![1; 8],
        name: "POST /checkout".to_string(),
        start_time_unix_nano: start,
        end_time_unix_nano: start + 120_000_000,
        status: Some(Status {
            message: String::new(),
            code: 2,
        }),
        attributes: vec![string_kv("http.route", "/checkout")],
        ..Default::default()
    };
    let child = Span {
        trace_id: vec![0xab; 16],
        span_id: vec![2; 8],
        parent_span_id: vec![1; 8],
        name: "charge card".to_string(),
        start_time_unix_nano: start + 10_000_000,
        end_time_unix_nano: start + 90_500_000,
        status: Some(Status {
            message: String::new(),
            code: 1,
        }),
        ..Default::default()
    };

    ExportTraceServiceRequest {
        resource_spans: vec![ResourceSpans {
            resource: Some(Resource {
                attributes: vec![string_kv("service.name", "checkout")],
                dropped_attributes_count: 0,
                entity_refs: vec![],
            }),
            scope_spans: vec![ScopeSpans {
                spans: vec![root, child],
                ..Default::default()
            }],
            schema_url: String::new(),
        }],
    }
}

pub fn sample_otlp_bytes() -> Vec<u8> {
    sample_otlp_request().encode_to_vec()
}
