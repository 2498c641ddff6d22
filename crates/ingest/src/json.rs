use serde_json::Value;
use tracefall_core::error::{Result, TracefallError};

use crate::batch::{Cell, ColumnBatch};

/// Parse a JSON export into a batch.
///
/// Accepts an array of row objects (`[{"span_id": ..}, ..]`) or an object of
/// equal-length column arrays (`{"span_id": [..], ..}`).
pub fn parse_json_batch(input: &str) -> Result<ColumnBatch> {
    let value: Value = serde_json::from_str(input)
        .map_err(|e| TracefallError::Parse(format!("invalid JSON span source: {e}")))?;
    match value {
        Value::Array(rows) => rows_to_batch(rows),
        Value::Object(columns) => {
            let mut batch = ColumnBatch::new();
            for (name, values) in columns {
                let Value::Array(values) = values else {
                    return Err(TracefallError::Parse(format!(
                        "column {name} is not an array"
                    )));
                };
                batch.push_column(&name, values.into_iter().map(value_to_cell).collect())?;
            }
            Ok(batch)
        }
        _ => Err(TracefallError::Parse(
            "expected an array of rows or an object of columns".to_string(),
        )),
    }
}

fn rows_to_batch(rows: Vec<Value>) -> Result<ColumnBatch> {
    let mut names: Vec<String> = Vec::new();
    for row in &rows {
        let Value::Object(map) = row else {
            return Err(TracefallError::Parse("row is not an object".to_string()));
        };
        for key in map.keys() {
            if !names.iter().any(|n| n == key) {
                names.push(key.clone());
            }
        }
    }

    let mut batch = ColumnBatch::new();
    for name in &names {
        let cells = rows
            .iter()
            .map(|row| row.get(name).cloned().map_or(Cell::Null, value_to_cell))
            .collect();
        batch.push_column(name, cells)?;
    }
    Ok(batch)
}

fn value_to_cell(value: Value) -> Cell {
    match value {
        Value::Null => Cell::Null,
        Value::Bool(b) => Cell::Bool(b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Cell::Int(i)
            } else if let Some(u) = n.as_u64() {
                Cell::BigInt(i128::from(u))
            } else {
                Cell::Float(n.as_f64().unwrap_or(0.0))
            }
        }
        Value::String(s) => Cell::Str(s),
        nested @ (Value::Array(_) | Value::Object(_)) => Cell::Str(nested.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::columns::try_adapt_batch;

    #[test]
    fn parses_row_documents() {
        let batch = parse_json_batch(
            r#"[
                {"trace_id":"t","span_id":"a","span_name":"root","timestamp":"2026-02-01T00:00:00Z","duration":12.5,
                 "span_attributes":{"http.method":"GET"}},
                {"trace_id":"t","span_id":"b","span_name":"child","parent_span_id":"a","timestamp":1769904000005,"duration":"3"}
            ]"#,
        )
        .unwrap();
        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.column("parent_span_id").unwrap().get(0), &Cell::Null);

        let spans = try_adapt_batch(&batch).unwrap();
        assert_eq!(spans[0].timestamp, 1_769_904_000_000.0);
        assert_eq!(spans[1].duration, 3.0);
        assert_eq!(
            spans[0].attributes().unwrap()["http.method"],
            serde_json::json!("GET")
        );
    }

    #[test]
    fn parses_column_documents() {
        let batch = parse_json_batch(
            r#"{"trace_id":["t","t"],"span_id":["a","b"],"name":["x","y"],"duration_ms":[1,18446744073709551615]}"#,
        )
        .unwrap();
        assert_eq!(batch.num_rows(), 2);
        assert_eq!(
            batch.column("duration_ms").unwrap().get(1),
            &Cell::BigInt(18_446_744_073_709_551_615)
        );
    }

    #[test]
    fn date_like_text_is_kept_verbatim() {
        let stamp = "2026-02-01T00:00:00.000+00:00";
        let batch = parse_json_batch(&format!(
            r#"[{{"trace_id":"t","span_id":"{stamp}","span_name":"{stamp}","timestamp":"{stamp}"}},
                {{"trace_id":"t","span_id":"b","span_name":"child","parent_span_id":"{stamp}","timestamp":1}}]"#
        ))
        .unwrap();
        assert_eq!(batch.column("span_id").unwrap().get(0), &Cell::Str(stamp.into()));

        let spans = try_adapt_batch(&batch).unwrap();
        assert_eq!(spans[0].span_id, stamp);
        assert_eq!(spans[0].span_name, stamp);
        assert_eq!(spans[0].timestamp, 1_769_904_000_000.0);
        assert_eq!(spans[1].parent_span_id.as_deref(), Some(stamp));
    }

    #[test]
    fn rejects_other_shapes() {
        assert!(parse_json_batch("42").is_err());
        assert!(parse_json_batch("[1, 2]").is_err());
        assert!(parse_json_batch(r#"{"span_id": "a"}"#).is_err());
        assert!(parse_json_batch(r#"{"a": [1], "b": [1, 2]}"#).is_err());
        assert!(parse_json_batch("not json").is_err());
    }
}
