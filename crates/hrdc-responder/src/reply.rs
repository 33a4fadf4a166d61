//! Reply extraction for the responder webhook.
//!
//! The responder's schema is not controlled by this system, so the contract
//! is deliberately tolerant. Shapes are tried in a fixed order:
//!
//! 1. body that is not JSON: the raw text
//! 2. JSON object with one of [`MESSAGE_FIELDS`] (first non-empty wins)
//! 3. top-level JSON string
//! 4. JSON object with a string `data` field
//! 5. any other JSON value: pretty-printed back into text
//!
//! Only an empty body, `null`, or an empty string count as "no content".

use serde_json::Value;

use crate::error::{ResponderError, Result};

/// Object fields that may carry the reply text, in priority order
pub const MESSAGE_FIELDS: [&str; 5] = ["message", "response", "text", "content", "output"];

#[derive(Debug, Clone, PartialEq)]
pub enum ResponderReply {
    PlainText(String),
    Field { name: &'static str, text: String },
    BareString(String),
    Data(String),
    Serialized(String),
}

impl ResponderReply {
    pub fn parse(body: &str) -> Result<Self> {
        if body.trim().is_empty() {
            return Err(ResponderError::NoContent);
        }

        let value: Value = match serde_json::from_str(body) {
            Ok(value) => value,
            Err(_) => return Ok(ResponderReply::PlainText(body.to_string())),
        };

        match value {
            Value::Null => Err(ResponderError::NoContent),
            Value::String(text) if text.is_empty() => Err(ResponderError::NoContent),
            Value::String(text) => Ok(ResponderReply::BareString(text)),
            Value::Object(ref map) => {
                for name in MESSAGE_FIELDS {
                    if let Some(text) = map.get(name).and_then(field_text) {
                        return Ok(ResponderReply::Field { name, text });
                    }
                }
                match map.get("data") {
                    Some(Value::String(data)) if !data.is_empty() => {
                        Ok(ResponderReply::Data(data.clone()))
                    }
                    _ => Ok(ResponderReply::Serialized(pretty(&value))),
                }
            }
            other => Ok(ResponderReply::Serialized(pretty(&other))),
        }
    }

    pub fn text(&self) -> &str {
        match self {
            ResponderReply::PlainText(text)
            | ResponderReply::Field { text, .. }
            | ResponderReply::BareString(text)
            | ResponderReply::Data(text)
            | ResponderReply::Serialized(text) => text,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            ResponderReply::PlainText(text)
            | ResponderReply::Field { text, .. }
            | ResponderReply::BareString(text)
            | ResponderReply::Data(text)
            | ResponderReply::Serialized(text) => text,
        }
    }
}

/// Text carried by a candidate field, `None` for empty-ish values
fn field_text(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        other => Some(other.to_string()),
    }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_json_body_is_plain_text() {
        let reply = ResponderReply::parse("Hi there").unwrap();
        assert_eq!(reply, ResponderReply::PlainText("Hi there".to_string()));
    }

    #[test]
    fn test_field_priority_order() {
        let reply = ResponderReply::parse(r#"{"output": "o", "text": "t", "response": "r"}"#).unwrap();
        assert_eq!(
            reply,
            ResponderReply::Field {
                name: "response",
                text: "r".to_string()
            }
        );
    }

    #[test]
    fn test_empty_field_falls_through() {
        let reply = ResponderReply::parse(r#"{"message": "", "content": "c"}"#).unwrap();
        assert_eq!(reply.text(), "c");
    }

    #[test]
    fn test_non_string_field_is_serialized() {
        let reply = ResponderReply::parse(r#"{"output": {"answer": 42}}"#).unwrap();
        assert_eq!(reply.text(), r#"{"answer":42}"#);
    }

    #[test]
    fn test_top_level_string() {
        let reply = ResponderReply::parse(r#""quoted reply""#).unwrap();
        assert_eq!(reply, ResponderReply::BareString("quoted reply".to_string()));
    }

    #[test]
    fn test_data_string() {
        let reply = ResponderReply::parse(r#"{"data": "from data"}"#).unwrap();
        assert_eq!(reply, ResponderReply::Data("from data".to_string()));
    }

    #[test]
    fn test_unrecognized_object_is_serialized() {
        let reply = ResponderReply::parse(r#"{"foo": "bar"}"#).unwrap();
        match reply {
            ResponderReply::Serialized(text) => {
                assert!(text.contains("\"foo\": \"bar\""));
            }
            other => panic!("unexpected reply: {other:?}"),
        }
    }

    #[test]
    fn test_array_is_serialized() {
        let reply = ResponderReply::parse(r#"[{"output": "x"}]"#).unwrap();
        assert!(matches!(reply, ResponderReply::Serialized(_)));
    }

    #[test]
    fn test_empty_cases_have_no_content() {
        for body in ["", "   ", "null", "\"\""] {
            let result = ResponderReply::parse(body);
            assert!(matches!(result, Err(ResponderError::NoContent)), "body {body:?}");
        }
    }
}
