use serde_json::Value;

use super::display_scalar;

/// Headline figures, most important first.
const PRIORITY_KEYS: [&str; 6] = [
    "irr",
    "monthly_payment",
    "portfolio_dscr",
    "equity_multiple",
    "net_sale_proceeds",
    "net_operating_income",
];

/// Print just the key answer value from the output.
///
/// Looks in the result object, then in a nested `totals` summary. An
/// undefined headline figure prints as "N/A" instead of falling through.
pub fn print_minimal(value: &Value) {
    let result_obj = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    let scopes = [Some(result_obj), result_obj.get("totals")];
    for scope in scopes.into_iter().flatten() {
        if let Value::Object(map) = scope {
            if let Some(val) = PRIORITY_KEYS.iter().find_map(|k| map.get(*k)) {
                println!("{}", display_scalar(val));
                return;
            }
        }
    }

    if let Value::Object(map) = result_obj {
        if let Some((key, val)) = map.iter().next() {
            println!("{}: {}", key, display_scalar(val));
            return;
        }
    }

    println!("{}", display_scalar(result_obj));
}
