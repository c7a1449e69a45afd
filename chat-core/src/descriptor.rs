//! Device descriptor decoding.
//!
//! The backend reports a free-form device description. Some backends put a
//! serialized JSON object in that string instead of plain text, so the value
//! is decoded opportunistically: object-shaped strings are parsed, anything
//! else is shown as-is. Decoding never fails.

use chat_types::UNKNOWN_DEVICE;
use serde_json::{Map, Value};
use std::borrow::Cow;

/// A device description as received from the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceDescriptor {
    /// Plain text, or a string that looked like JSON but did not parse.
    Raw(String),
    /// A JSON object with optional description fields.
    Structured {
        /// The `device_info` field, if present and non-empty.
        device_info: Option<String>,
        /// The `name` field, if present and non-empty.
        name: Option<String>,
    },
}

impl DeviceDescriptor {
    /// Decode a descriptor string.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if !(trimmed.starts_with('{') && trimmed.ends_with('}')) {
            return Self::Raw(raw.to_string());
        }

        match serde_json::from_str::<Map<String, Value>>(trimmed) {
            Ok(fields) => Self::Structured {
                device_info: text_field(&fields, "device_info"),
                name: text_field(&fields, "name"),
            },
            Err(_) => Self::Raw(raw.to_string()),
        }
    }

    /// Text to show for this device.
    ///
    /// Structured descriptors prefer `device_info`, then `name`, then the
    /// `Unknown Device` placeholder. Raw descriptors are returned unchanged.
    pub fn display_name(&self) -> Cow<'_, str> {
        match self {
            Self::Raw(raw) => Cow::Borrowed(raw),
            Self::Structured { device_info, name } => device_info
                .as_deref()
                .or(name.as_deref())
                .map(Cow::Borrowed)
                .unwrap_or(Cow::Borrowed(UNKNOWN_DEVICE)),
        }
    }

    /// Whether the descriptor decoded as a JSON object.
    pub fn is_structured(&self) -> bool {
        matches!(self, Self::Structured { .. })
    }
}

/// Decode a descriptor string straight to the text to display.
pub fn parse_device_info(raw: &str) -> String {
    DeviceDescriptor::parse(raw).display_name().into_owned()
}

fn text_field(fields: &Map<String, Value>, key: &str) -> Option<String> {
    match fields.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_info_field_wins() {
        assert_eq!(parse_device_info(r#"{"device_info":"Pixel 7"}"#), "Pixel 7");
        assert_eq!(
            parse_device_info(r#"{"device_info":"Pixel 7","name":"phone"}"#),
            "Pixel 7"
        );
    }

    #[test]
    fn name_is_the_fallback() {
        assert_eq!(parse_device_info(r#"{"name":"Pixel 7"}"#), "Pixel 7");
        assert_eq!(
            parse_device_info(r#"{"device_info":"","name":"Pixel 7"}"#),
            "Pixel 7"
        );
    }

    #[test]
    fn empty_object_gives_placeholder() {
        assert_eq!(parse_device_info("{}"), UNKNOWN_DEVICE);
        assert_eq!(parse_device_info(r#"{"model":"x"}"#), UNKNOWN_DEVICE);
    }

    #[test]
    fn plain_text_is_unchanged() {
        assert_eq!(parse_device_info("Pixel 7"), "Pixel 7");
        assert_eq!(parse_device_info(""), "");
    }

    #[test]
    fn malformed_json_is_unchanged() {
        assert_eq!(parse_device_info("{not json"), "{not json");
        assert_eq!(parse_device_info("{not json}"), "{not json}");

        let descriptor = DeviceDescriptor::parse("{not json}");
        assert!(!descriptor.is_structured());
    }

    #[test]
    fn surrounding_whitespace_is_tolerated_for_objects() {
        assert_eq!(parse_device_info("  {\"name\":\"Tab\"}\n"), "Tab");
    }

    #[test]
    fn json_array_is_not_an_object() {
        assert_eq!(parse_device_info("[1,2]"), "[1,2]");
    }

    #[test]
    fn numeric_field_is_stringified() {
        assert_eq!(parse_device_info(r#"{"device_info":7}"#), "7");
    }

    #[test]
    fn non_text_fields_fall_through() {
        assert_eq!(
            parse_device_info(r#"{"device_info":{"model":"x"},"name":"Tab"}"#),
            "Tab"
        );
        assert_eq!(parse_device_info(r#"{"device_info":null}"#), UNKNOWN_DEVICE);
    }

    #[test]
    fn structured_variant_keeps_fields() {
        let descriptor = DeviceDescriptor::parse(r#"{"device_info":"Pixel 7","name":"phone"}"#);
        assert_eq!(
            descriptor,
            DeviceDescriptor::Structured {
                device_info: Some("Pixel 7".into()),
                name: Some("phone".into()),
            }
        );
    }
}
