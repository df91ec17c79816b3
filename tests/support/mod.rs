#![allow(dead_code)]

use serde_json::json;

/// SSE line carrying a content delta.
pub fn text_event(text: &str) -> String {
    format!(
        "data: {}\n\n",
        json!({"choices": [{"index": 0, "delta": {"content": text}}]})
    )
}

/// SSE line carrying one tool-call delta.
pub fn tool_call_event(index: usize, id: Option<&str>, name: Option<&str>, arguments: &str) -> String {
    let mut call = json!({"index": index, "type": "function", "function": {"arguments": arguments}});
    if let Some(id) = id {
        call["id"] = json!(id);
    }
    if let Some(name) = name {
        call["function"]["name"] = json!(name);
    }
    format!(
        "data: {}\n\n",
        json!({"choices": [{"index": 0, "delta": {"tool_calls": [call]}}]})
    )
}

pub fn done_event() -> String {
    "data: [DONE]\n\n".to_string()
}

pub fn sse_body(events: &[String]) -> String {
    events.concat()
}

pub fn tool_listing() -> serde_json::Value {
    json!({
        "tools": {
            "weather": [
                {
                    "name": "forecast",
                    "description": "Weather forecast for a city",
                    "inputSchema": {
                        "type": "object",
                        "properties": {"city": {"type": "string"}},
                        "required": ["city"]
                    }
                }
            ],
            "files": [
                {"name": "read", "description": "Read a file", "input_schema": {"type": "object"}}
            ]
        },
        "servers_status": {
            "weather": {"status": true, "error": null},
            "files": {"status": true, "error": null}
        }
    })
}
