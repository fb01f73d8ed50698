use serde_json::Value;

/// Headline fields, most important first. Nested `summary` objects are
/// searched too, so a loan analysis reports its interest saving.
const PRIORITY_KEYS: [&str; 7] = [
    "required_monthly_investment",
    "interest_saved_vs_no_prepayment",
    "xirr",
    "estimated_corpus",
    "monthly_installment",
    "installment",
    "total_interest_paid",
];

/// Print just the key answer value from the output.
pub fn print_minimal(value: &Value) {
    println!("{}", minimal_line(value));
}

fn minimal_line(value: &Value) -> String {
    let result_obj = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    if let Value::Object(map) = result_obj {
        let summary = map.get("summary").and_then(Value::as_object);
        for key in PRIORITY_KEYS {
            let found = summary
                .and_then(|s| s.get(key))
                .or_else(|| map.get(key))
                .filter(|v| !v.is_null() && !is_zero(v));
            if let Some(val) = found {
                return format_minimal(val);
            }
        }

        if let Some((key, val)) = map.iter().next() {
            return format!("{}: {}", key, format_minimal(val));
        }
    }

    if let Value::Array(rows) = result_obj {
        // Schedules: the last row's closing balance
        if let Some(last) = rows.last().and_then(|r| r.get("remaining_balance")) {
            return format_minimal(last);
        }
    }

    format_minimal(result_obj)
}

/// Goal fields are zero outside goal mode and should not win.
fn is_zero(value: &Value) -> bool {
    match value {
        Value::String(s) => s.parse::<f64>().map(|v| v == 0.0).unwrap_or(false),
        Value::Number(n) => n.as_f64() == Some(0.0),
        _ => false,
    }
}

fn format_minimal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
