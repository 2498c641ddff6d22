use opentelemetry_proto::tonic::collector::trace::v1::ExportTraceServiceRequest;
use opentelemetry_proto::tonic::common::v1::any_value::Value as AnyKind;
use opentelemetry_proto::tonic::common::v1::{AnyValue, KeyValue};
use opentelemetry_proto::tonic::resource::v1::Resource;
use opentelemetry_proto::tonic::trace::v1::Span as OtlpSpan;
use serde_json::Value;
use tracefall_core::model::span::RawSpan;
use tracefall_core::time::nanos_to_millis;

const SERVICE_NAME_KEY: &str = "service.name";
const UNKNOWN_SERVICE: &str = "unknown";

/// Flatten every span in an export request.
pub fn decode_request(req: &ExportTraceServiceRequest) -> Vec<RawSpan> {
    let mut spans = Vec::new();
    for rs in &req.resource_spans {
        let resource = rs.resource.as_ref();
        for ss in &rs.scope_spans {
            spans.extend(ss.spans.iter().map(|span| decode_span(resource, span)));
        }
    }
    spans
}

pub fn decode_span(resource: Option<&Resource>, span: &OtlpSpan) -> RawSpan {
    let timestamp = nanos_to_millis(span.start_time_unix_nano);
    let end_timestamp = nanos_to_millis(span.end_time_unix_nano);
    let attributes = kv_to_json(&span.attributes);

    RawSpan {
        trace_id: bytes_to_hex(&span.trace_id).unwrap_or_default(),
        span_id: bytes_to_hex(&span.span_id).unwrap_or_default(),
        parent_span_id: bytes_to_hex(&span.parent_span_id),
        service_name: service_name(resource),
        span_name: span.name.clone(),
        timestamp,
        end_timestamp,
        duration: (end_timestamp - timestamp).max(0.0),
        status_code: status_label(span.status.as_ref().map_or(0, |s| s.code)).to_string(),
        span_attributes: non_empty_object(attributes),
        resource_attributes: resource.and_then(|r| non_empty_object(kv_to_json(&r.attributes))),
    }
}

fn status_label(code: i32) -> &'static str {
    match code {
        2 => "ERROR",
        1 => "OK",
        _ => "UNSET",
    }
}

fn service_name(resource: Option<&Resource>) -> String {
    resource
        .and_then(|r| r.attributes.iter().find(|kv| kv.key == SERVICE_NAME_KEY))
        .and_then(|kv| kv.value.as_ref())
        .map(any_value_to_json)
        .map(|v| match v {
            Value::String(s) => s,
            other => other.to_string(),
        })
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| UNKNOWN_SERVICE.to_string())
}

fn non_empty_object(value: Value) -> Option<String> {
    match &value {
        Value::Object(map) if map.is_empty() => None,
        _ => Some(value.to_string()),
    }
}

fn kv_to_json(attrs: &[KeyValue]) -> Value {
    Value::Object(
        attrs
            .iter()
            .map(|kv| {
                let value = kv.value.as_ref().map_or(Value::Null, any_value_to_json);
                (kv.key.clone(), value)
            })
            .collect(),
    )
}

fn any_value_to_json(value: &AnyValue) -> Value {
    match value.value.as_ref() {
        Some(AnyKind::StringValue(s)) => Value::String(s.clone()),
        Some(AnyKind::BoolValue(b)) => Value::Bool(*b),
        Some(AnyKind::IntValue(i)) => Value::from(*i),
        Some(AnyKind::DoubleValue(d)) => {
            serde_json::Number::from_f64(*d).map_or(Value::Null, Value::Number)
        }
        Some(AnyKind::BytesValue(b)) => Value::String(String::from_utf8_lossy(b).into_owned()),
        Some(AnyKind::ArrayValue(arr)) => {
            Value::Array(arr.values.iter().map(any_value_to_json).collect())
        }
        Some(AnyKind::KvlistValue(list)) => kv_to_json(&list.values),
        None => Value::Null,
    }
}

fn bytes_to_hex(bytes: &[u8]) -> Option<String> {
    if bytes.is_empty() || bytes.iter().all(|b| *b == 0) {
        return None;
    }
    Some(bytes.iter().map(|b| format!("{b:02x}")).collect::<String>())
}
