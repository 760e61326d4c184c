//! JSON-RPC helpers for providers reached through an MCP endpoint

use serde_json::{json, Value};

pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Accept header MCP servers expect for streamable HTTP responses
pub const ACCEPT: &str = "application/json, text/event-stream";

pub fn initialize_request() -> Value {
    json!({
        "jsonrpc": "2.0",
        "method": "initialize",
        "params": {
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": {
                "name": env!("CARGO_PKG_NAME"),
                "version": env!("CARGO_PKG_VERSION"),
            },
        },
        "id": 1,
    })
}

pub fn tool_call(tool: &str, arguments: Value, id: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "method": "tools/call",
        "params": { "name": tool, "arguments": arguments },
        "id": id,
    })
}

/// Collect the `text` content blocks from an MCP response.
///
/// Servers answer either with a bare JSON object or with server-sent events whose
/// `data:` lines carry the JSON. Lines that are not JSON objects are skipped.
pub fn text_blocks(body: &str) -> Vec<String> {
    let trimmed = body.trim_start();
    if trimmed.starts_with('{') {
        return serde_json::from_str::<Value>(trimmed)
            .map(|message| texts_of(&message))
            .unwrap_or_default();
    }

    body.lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(str::trim)
        .filter(|data| data.starts_with('{'))
        .filter_map(|data| serde_json::from_str::<Value>(data).ok())
        .flat_map(|message| texts_of(&message))
        .collect()
}

/// Error message of a JSON-RPC error response, if the body is one
pub fn error_message(body: &str) -> Option<String> {
    body.lines()
        .map(|line| line.strip_prefix("data:").unwrap_or(line).trim())
        .filter(|data| data.starts_with('{'))
        .filter_map(|data| serde_json::from_str::<Value>(data).ok())
        .find_map(|message| {
            message
                .get("error")
                .map(|error| match error.get("message").and_then(Value::as_str) {
                    Some(text) => text.to_string(),
                    None => error.to_string(),
                })
        })
}

fn texts_of(message: &Value) -> Vec<String> {
    message
        .pointer("/result/content")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter(|item| item.get("type").and_then(Value::as_str) == Some("text"))
                .filter_map(|item| item.get("text").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
