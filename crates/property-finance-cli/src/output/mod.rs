pub mod csv_out;
pub mod json;
pub mod minimal;
pub mod table;

use crate::OutputFormat;
use serde_json::Value;

/// Dispatch output to the appropriate formatter.
pub fn format_output(format: &OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => json::print_json(value),
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}

/// Render a scalar for human-facing formats. Undefined figures (null) show
/// as "N/A" rather than an empty cell.
pub fn display_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "N/A".to_string(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}

/// Split a result object into scalar fields and arrays of row objects
/// (projections, portfolio entries).
pub fn split_rows(map: &serde_json::Map<String, Value>) -> (Vec<(&str, &Value)>, Vec<(&str, &[Value])>) {
    let mut scalars = Vec::new();
    let mut row_sets = Vec::new();
    for (key, val) in map {
        match val {
            Value::Array(rows) if rows.iter().all(Value::is_object) && !rows.is_empty() => {
                row_sets.push((key.as_str(), rows.as_slice()))
            }
            _ => scalars.push((key.as_str(), val)),
        }
    }
    (scalars, row_sets)
}
