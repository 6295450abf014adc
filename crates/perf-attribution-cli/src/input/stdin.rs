use serde::de::DeserializeOwned;
use std::io::{self, Read};

/// Parse a piped attribution request (the `attribute` command's `RunConfig`:
/// the request fields plus an optional `data` section with table paths).
/// `None` when stdin is a terminal or carries nothing.
pub fn read_stdin<T: DeserializeOwned>() -> Result<Option<T>, Box<dyn std::error::Error>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }

    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;
    parse_request(&buffer)
}

fn parse_request<T: DeserializeOwned>(text: &str) -> Result<Option<T>, Box<dyn std::error::Error>> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let value: T = serde_json::from_str(trimmed)
        .map_err(|e| format!("Failed to parse attribution request from stdin: {}", e))?;
    Ok(Some(value))
}
