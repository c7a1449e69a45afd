//! Request and response bodies for the Router Chat backend.
//!
//! The backend speaks plain JSON. Field names on the wire follow the
//! backend (`device_name`, `local_ip`, `message_text`, ...); the Rust side
//! uses names that say what the value is.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::{MessageId, TypesError};

/// Status value the backend uses for a successful response.
pub const STATUS_SUCCESS: &str = "success";

/// Status value of the latest-message endpoint when nothing was posted yet.
pub const STATUS_NO_MESSAGES: &str = "no_messages";

/// Status value the backend uses when it could not store a message.
pub const STATUS_ERROR: &str = "error";

/// Author name sent when no display name is known.
pub const UNKNOWN_USER: &str = "Unknown User";

/// Address sent or shown when the local address is not known.
pub const UNKNOWN_IP: &str = "Unknown IP";

/// Descriptor shown when the device description is missing.
pub const UNKNOWN_DEVICE: &str = "Unknown Device";

/// Maximum message length, in characters.
pub const MAX_MESSAGE_CHARS: usize = 500;

/// Serialize a body to JSON bytes.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, TypesError> {
    serde_json::to_vec(value).map_err(TypesError::Serialization)
}

/// Deserialize a body from JSON bytes.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, TypesError> {
    serde_json::from_slice(bytes).map_err(TypesError::Deserialization)
}

/// A chat message as stored and returned by the backend.
///
/// Messages are immutable once received; clients replace their whole
/// collection on every fetch instead of patching individual entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Backend-assigned identifier, unique per message.
    #[serde(rename = "message_id")]
    pub id: MessageId,
    /// Display name of the sender.
    #[serde(rename = "device_name", default)]
    pub author_name: String,
    /// Network address of the sending device at send time.
    #[serde(rename = "local_ip", default)]
    pub author_address: String,
    /// Message body.
    #[serde(rename = "message_text", default)]
    pub text: String,
    /// Backend-assigned send time (ISO-8601 local date-time).
    #[serde(rename = "timestamp", default)]
    pub sent_at: String,
}

/// Body of `GET /` (device information as seen by the backend).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfoResponse {
    /// Local network address of the device.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_ip: Option<String>,
    /// Free-form device description; may itself be a JSON object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_info: Option<String>,
    /// Default gateway of the network, when the backend could detect it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_gateway: Option<String>,
    /// Set instead of the fields above when the backend failed to resolve
    /// its own address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Body of `GET /messages`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageListResponse {
    /// `"success"` when `messages` is authoritative.
    pub status: String,
    /// Number of messages reported by the backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_count: Option<usize>,
    /// Full message list, in backend order.
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl MessageListResponse {
    /// Build a successful response carrying the given messages.
    pub fn success(messages: Vec<Message>) -> Self {
        Self {
            status: STATUS_SUCCESS.to_string(),
            message_count: Some(messages.len()),
            messages,
        }
    }

    /// Whether the backend reported success.
    pub fn is_success(&self) -> bool {
        self.status == STATUS_SUCCESS
    }

    /// The message list, or `None` when the status is anything but success.
    pub fn into_messages(self) -> Option<Vec<Message>> {
        if self.is_success() {
            Some(self.messages)
        } else {
            None
        }
    }
}

/// Body of `GET /messages/latest`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatestMessageResponse {
    /// `"success"` or `"no_messages"`.
    pub status: String,
    /// The most recently stored message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_message: Option<Message>,
    /// Human-readable note, set when there is nothing to return.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl LatestMessageResponse {
    /// The latest message, if the backend returned one.
    pub fn into_latest(self) -> Option<Message> {
        if self.status == STATUS_SUCCESS {
            self.latest_message
        } else {
            None
        }
    }
}

/// Body of `POST /message`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitRequest {
    /// Display name of the sender.
    pub device_name: String,
    /// Local network address of the sender.
    pub local_ip: String,
    /// Trimmed message text.
    pub message_text: String,
}

impl SubmitRequest {
    /// Build a submission, substituting placeholders for unknown values.
    pub fn new(display_name: Option<&str>, local_address: Option<&str>, text: &str) -> Self {
        Self {
            device_name: display_name.unwrap_or(UNKNOWN_USER).to_string(),
            local_ip: local_address.unwrap_or(UNKNOWN_IP).to_string(),
            message_text: text.to_string(),
        }
    }
}

/// Acknowledgement returned by `POST /message`.
///
/// Every field is optional: success is signalled by the HTTP status, the body
/// only adds detail.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitResponse {
    /// `"success"` or `"error"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Human-readable detail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Identifier assigned to the stored message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<MessageId>,
}

impl SubmitResponse {
    /// Whether the backend explicitly refused the message.
    pub fn is_rejected(&self) -> bool {
        self.status.as_deref() == Some(STATUS_ERROR)
    }
}
