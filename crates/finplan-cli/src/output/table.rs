use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

/// Format output as tables using the tabled crate.
///
/// Scalar result fields go into one Field/Value table; every array of
/// objects in the result (schedule, yearly rows, delay cost) gets its own
/// table underneath, titled by its key.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => {
            if let Some(result) = map.get("result") {
                print_result_table(result, map);
            } else {
                print_object(map);
            }
        }
        Value::Array(arr) => print_array_table(arr),
        _ => println!("{}", value),
    }
}

fn print_result_table(result: &Value, envelope: &Map<String, Value>) {
    match result {
        Value::Object(res_map) => print_object(res_map),
        other => print_table(other),
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

fn print_object(map: &Map<String, Value>) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    let mut sections: Vec<(&str, &[Value])> = Vec::new();

    for (key, val) in map {
        match val {
            Value::Array(rows) if is_row_array(rows) => sections.push((key.as_str(), rows)),
            Value::Object(inner) => {
                for (inner_key, inner_val) in inner {
                    match inner_val {
                        Value::Array(rows) if is_row_array(rows) => {
                            sections.push((inner_key.as_str(), rows))
                        }
                        _ => builder.push_record([
                            format!("{}.{}", key, inner_key),
                            format_value(inner_val),
                        ]),
                    }
                }
            }
            _ => builder.push_record([key.clone(), format_value(val)]),
        }
    }
    println!("{}", Table::from(builder));

    for (title, rows) in sections {
        println!("\n{}:", title);
        print_array_table(rows);
    }
}

fn is_row_array(arr: &[Value]) -> bool {
    matches!(arr.first(), Some(Value::Object(_)))
}

/// Keys across all rows in first-seen order; optional fields may be absent
/// from the first row.
pub(crate) fn row_headers(arr: &[Value]) -> Vec<String> {
    let mut headers: Vec<String> = Vec::new();
    for map in arr.iter().filter_map(Value::as_object) {
        for key in map.keys() {
            if !headers.contains(key) {
                headers.push(key.clone());
            }
        }
    }
    headers
}

fn print_array_table(arr: &[Value]) {
    if arr.is_empty() {
        println!("(empty)");
        return;
    }

    if is_row_array(arr) {
        let headers = row_headers(arr);
        let mut builder = Builder::default();
        builder.push_record(headers.clone());

        for map in arr.iter().filter_map(Value::as_object) {
            let row: Vec<String> = headers
                .iter()
                .map(|h| map.get(h.as_str()).map(format_value).unwrap_or_default())
                .collect();
            builder.push_record(row);
        }

        println!("{}", Table::from(builder));
    } else {
        for item in arr {
            println!("{}", format_value(item));
        }
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "-".to_string(),
        Value::Array(arr) => arr.iter().map(format_value).collect::<Vec<_>>().join(", "),
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}
