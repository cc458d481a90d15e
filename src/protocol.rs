//! Invocation protocol plumbing - JSON in, JSON out
//!
//! The desired-state payload arrives as one JSON document, either as a
//! command-line argument or on stdin. Results are written as one JSON
//! document per line on stdout; stdout carries nothing else, so diagnostics
//! stay on stderr.

use std::io::Read;

use convergence::EngineError;
use serde::Serialize;
use serde_json::Value;

/// Read the desired-state payload from the argument or stdin
pub fn read_payload(input: Option<&str>) -> Result<Value, EngineError> {
    let text = match input {
        Some(arg) => arg.to_string(),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .map_err(|err| EngineError::Internal(format!("could not read stdin: {err}")))?;
            buf
        }
    };
    if text.trim().is_empty() {
        return Err(EngineError::MalformedInput(
            "empty desired-state payload".to_string(),
        ));
    }
    serde_json::from_str(&text).map_err(|err| EngineError::MalformedInput(err.to_string()))
}

/// Write one result document to stdout
pub fn write_document<T: Serialize>(value: &T) -> Result<(), EngineError> {
    let line = serde_json::to_string(value)
        .map_err(|err| EngineError::Internal(format!("could not serialize result: {err}")))?;
    println!("{line}");
    Ok(())
}
