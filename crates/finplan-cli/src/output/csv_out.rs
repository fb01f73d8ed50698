use serde_json::{Map, Value};
use std::io;

use super::table::row_headers;

/// Result arrays written as CSV rows in preference to the scalar fields.
const ROW_KEYS: [&str; 2] = ["schedule", "yearly_breakdown"];

/// Write output as CSV to stdout.
///
/// A loan analysis writes its monthly schedule and a SIP plan its yearly
/// breakdown; other objects fall back to two-column field,value rows.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    let outcome = match value {
        Value::Object(map) => match map.get("result") {
            Some(Value::Object(result)) => write_result(&mut wtr, result),
            Some(Value::Array(rows)) => write_rows(&mut wtr, rows),
            _ => write_fields(&mut wtr, map),
        },
        Value::Array(rows) => write_rows(&mut wtr, rows),
        _ => wtr.write_record([format_csv_value(value)]),
    };

    if let Err(e) = outcome.and_then(|_| wtr.flush().map_err(csv::Error::from)) {
        log::error!("failed to write CSV: {e}");
    }
}

fn write_result<W: io::Write>(wtr: &mut csv::Writer<W>, result: &Map<String, Value>) -> csv::Result<()> {
    for key in ROW_KEYS {
        if let Some(Value::Array(rows)) = result.get(key) {
            return write_rows(wtr, rows);
        }
    }
    write_fields(wtr, result)
}

fn write_fields<W: io::Write>(wtr: &mut csv::Writer<W>, map: &Map<String, Value>) -> csv::Result<()> {
    wtr.write_record(["field", "value"])?;
    for (key, val) in map {
        wtr.write_record([key.as_str(), &format_csv_value(val)])?;
    }
    Ok(())
}

fn write_rows<W: io::Write>(wtr: &mut csv::Writer<W>, rows: &[Value]) -> csv::Result<()> {
    let headers = row_headers(rows);
    if headers.is_empty() {
        for item in rows {
            wtr.write_record([format_csv_value(item)])?;
        }
        return Ok(());
    }

    wtr.write_record(&headers)?;
    for map in rows.iter().filter_map(Value::as_object) {
        let row: Vec<String> = headers
            .iter()
            .map(|h| map.get(h.as_str()).map(format_csv_value).unwrap_or_default())
            .collect();
        wtr.write_record(&row)?;
    }
    Ok(())
}

fn format_csv_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
