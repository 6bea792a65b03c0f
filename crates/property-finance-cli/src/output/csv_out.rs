use serde_json::{Map, Value};
use std::io;

use super::split_rows;

/// Write output as CSV to stdout.
///
/// Results carrying a row set (yearly projections, portfolio entries) are
/// written as one row per element; otherwise a two-column field/value sheet.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    let result = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    match result {
        Value::Object(map) => {
            let (scalars, row_sets) = split_rows(map);
            match row_sets.first() {
                Some((_, rows)) => write_rows(&mut wtr, rows),
                None => write_fields(&mut wtr, &scalars),
            }
        }
        Value::Array(rows) => write_rows(&mut wtr, rows),
        _ => {
            let _ = wtr.write_record([&format_csv_value(result)]);
        }
    }

    let _ = wtr.flush();
}

fn write_fields(wtr: &mut csv::Writer<io::StdoutLock<'_>>, fields: &[(&str, &Value)]) {
    let _ = wtr.write_record(["field", "value"]);
    for (key, val) in fields {
        let _ = wtr.write_record([*key, &format_csv_value(val)]);
    }
}

fn write_rows(wtr: &mut csv::Writer<io::StdoutLock<'_>>, rows: &[Value]) {
    let Some(Value::Object(first)) = rows.first() else {
        return;
    };

    let headers: Vec<&str> = scalar_keys(first);
    let _ = wtr.write_record(&headers);

    for row in rows.iter().filter_map(Value::as_object) {
        let record: Vec<String> = headers
            .iter()
            .map(|h| row.get(*h).map(format_csv_value).unwrap_or_default())
            .collect();
        let _ = wtr.write_record(&record);
    }
}

fn scalar_keys(row: &Map<String, Value>) -> Vec<&str> {
    row.iter()
        .filter(|(_, v)| !v.is_object() && !v.is_array())
        .map(|(k, _)| k.as_str())
        .collect()
}

/// Undefined figures are left as empty cells for spreadsheet import.
fn format_csv_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
