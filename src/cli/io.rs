//! JSON I/O handling for CLI
//!
//! - Input: single JSON object via stdin (insert only)
//! - Output: exactly one JSON line via stdout per command
//! - UTF-8 only

use std::io::{self, Read, Write};

use serde_json::{Map, Value};

use super::errors::{CliError, CliResult};

/// Read one JSON object from stdin
pub fn read_object() -> CliResult<Map<String, Value>> {
    let mut input = String::new();
    io::stdin().lock().read_to_string(&mut input)?;
    parse_object(&input)
}

pub(crate) fn parse_object(input: &str) -> CliResult<Map<String, Value>> {
    if input.trim().is_empty() {
        return Err(CliError::invalid_argument("Empty input"));
    }

    match serde_json::from_str::<Value>(input)? {
        Value::Object(map) => Ok(map),
        other => Err(CliError::invalid_argument(format!(
            "Expected a JSON object, got {}",
            other
        ))),
    }
}

/// Write a success response to stdout
pub fn write_response(data: Value) -> CliResult<()> {
    write_line(&serde_json::json!({
        "status": "ok",
        "data": data
    }))
}

/// Write an error response to stdout
pub fn write_error(code: &str, message: &str) -> CliResult<()> {
    write_line(&serde_json::json!({
        "status": "error",
        "code": code,
        "message": message
    }))
}

fn write_line(response: &Value) -> CliResult<()> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer(&mut stdout, response)?;
    writeln!(stdout)?;
    stdout.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_object() {
        let row = parse_object(r#"{"name": "Trailer"}"#).unwrap();
        assert_eq!(row["name"], "Trailer");
    }

    #[test]
    fn test_parse_rejects_non_object() {
        let err = parse_object("[1, 2]").unwrap_err();
        assert_eq!(err.code_str(), "DELTA_CLI_INVALID_ARGUMENT");
        assert!(parse_object("  ").is_err());
        assert_eq!(parse_object("{").unwrap_err().code_str(), "DELTA_CLI_IO_ERROR");
    }
}
