use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

use super::{display_scalar, split_rows};

/// Format output as tables: one Field/Value table for headline figures and
/// one table per row set (yearly projections, portfolio entries).
pub fn print_table(value: &Value) {
    let Value::Object(envelope) = value else {
        println!("{}", display_scalar(value));
        return;
    };

    match envelope.get("result") {
        Some(Value::Object(result)) => print_result(result),
        _ => print_result(envelope),
    }

    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings.iter().filter_map(Value::as_str) {
                println!("  - {}", w);
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}

fn print_result(result: &Map<String, Value>) {
    let (scalars, row_sets) = split_rows(result);

    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (key, val) in scalars {
        match val {
            // Nested summaries such as portfolio totals are flattened inline
            Value::Object(inner) => {
                for (inner_key, inner_val) in inner {
                    builder.push_record([format!("{key}.{inner_key}"), display_scalar(inner_val)]);
                }
            }
            _ => builder.push_record([key.to_string(), display_scalar(val)]),
        }
    }
    println!("{}", Table::from(builder));

    for (name, rows) in row_sets {
        println!("\n{}:", name);
        print_rows(rows);
    }
}

fn print_rows(rows: &[Value]) {
    let Some(Value::Object(first)) = rows.first() else {
        return;
    };

    // Nested objects (e.g. a property's full financials) are too wide for a
    // row; keep the scalar columns only.
    let headers: Vec<&String> = first
        .iter()
        .filter(|(_, v)| !v.is_object() && !v.is_array())
        .map(|(k, _)| k)
        .collect();

    let mut builder = Builder::default();
    builder.push_record(headers.iter().map(|h| h.to_string()));
    for row in rows.iter().filter_map(Value::as_object) {
        builder.push_record(
            headers
                .iter()
                .map(|h| row.get(h.as_str()).map(display_scalar).unwrap_or_default()),
        );
    }
    println!("{}", Table::from(builder));
}
