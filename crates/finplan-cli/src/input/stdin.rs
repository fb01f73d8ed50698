use serde_json::Value;
use std::io::{self, Read};

/// Read piped input from stdin, JSON first and YAML as a fallback.
///
/// Returns None when stdin is a TTY or carries only whitespace.
pub fn read_stdin() -> Result<Option<Value>, Box<dyn std::error::Error>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }

    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;
    parse_piped(&buffer)
}

fn parse_piped(buffer: &str) -> Result<Option<Value>, Box<dyn std::error::Error>> {
    let trimmed = buffer.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    match serde_json::from_str::<Value>(trimmed) {
        Ok(value) => Ok(Some(value)),
        Err(json_err) => {
            log::debug!("stdin is not JSON ({json_err}), trying YAML");
            let value: Value = serde_yaml::from_str(trimmed)
                .map_err(|_| format!("Failed to parse stdin as JSON: {}", json_err))?;
            Ok(Some(value))
        }
    }
}
