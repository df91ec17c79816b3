//! Tool calling and function definition types

use serde::{Deserialize, Serialize};

/// The only call type the completion protocol emits.
pub const FUNCTION_TYPE: &str = "function";

fn function_type() -> String {
    FUNCTION_TYPE.to_string()
}

/// A tool call requested by the model.
///
/// While a round is streaming, `id` may still be empty and
/// `function.arguments` is a partial JSON text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    #[serde(default)]
    pub id: String,
    #[serde(default = "function_type")]
    pub r#type: String,
    pub function: FunctionCall,
}

impl ToolCall {
    /// Create a finished function call.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            r#type: function_type(),
            function: FunctionCall {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }

    /// Empty call used as the seed for the first delta of an index slot.
    pub fn empty(id: impl Into<String>) -> Self {
        Self::new(id, "", "")
    }

    /// Parse the argument text as a JSON object.
    ///
    /// Anything that is not a JSON object (including a parse failure or an
    /// empty string) yields an empty object.
    pub fn parsed_arguments(&self) -> serde_json::Value {
        match serde_json::from_str::<serde_json::Value>(self.function.arguments.trim()) {
            Ok(v @ serde_json::Value::Object(_)) => v,
            Ok(_) | Err(_) => {
                if !self.function.arguments.trim().is_empty() {
                    tracing::warn!(
                        call_id = %self.id,
                        tool = %self.function.name,
                        "tool arguments are not a JSON object, using {{}}"
                    );
                }
                serde_json::Value::Object(serde_json::Map::new())
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCall {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub arguments: String,
}

/// Tool definition advertised to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    /// Tool type (always "function")
    pub r#type: String,
    /// Function definition
    pub function: ToolFunction,
}

impl Tool {
    /// Create a new function tool
    pub fn function(name: String, description: String, parameters: serde_json::Value) -> Self {
        Self {
            r#type: function_type(),
            function: ToolFunction {
                name,
                description,
                parameters,
            },
        }
    }
}

/// Tool function definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolFunction {
    /// Function name. For catalog tools this is the synthetic tool id.
    pub name: String,
    /// Function description
    #[serde(default)]
    pub description: String,
    /// JSON schema for function parameters
    pub parameters: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tool_call_serializes_with_type_field() {
        let call = ToolCall::new("c1", "X", "{\"a\":1}");
        let v = serde_json::to_value(&call).unwrap();
        assert_eq!(
            v,
            json!({"id": "c1", "type": "function", "function": {"name": "X", "arguments": "{\"a\":1}"}})
        );
    }

    #[test]
    fn parsed_arguments_falls_back_to_empty_object() {
        assert_eq!(ToolCall::new("c", "x", "{\"a\":1}").parsed_arguments(), json!({"a": 1}));
        assert_eq!(ToolCall::new("c", "x", "{\"a\":").parsed_arguments(), json!({}));
        assert_eq!(ToolCall::new("c", "x", "").parsed_arguments(), json!({}));
        assert_eq!(ToolCall::new("c", "x", "[1,2]").parsed_arguments(), json!({}));
    }

    #[test]
    fn missing_type_defaults_to_function() {
        let call: ToolCall =
            serde_json::from_value(json!({"id": "c1", "function": {"name": "X"}})).unwrap();
        assert_eq!(call.r#type, "function");
        assert_eq!(call.function.arguments, "");
    }
}
