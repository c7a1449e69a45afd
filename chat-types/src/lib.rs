//! # chat-types
//!
//! Wire format types for the Router Chat backend protocol.
//!
//! This crate provides the foundational types used across all routerchat crates:
//! - [`MessageId`] - Backend-assigned message identity
//! - [`Message`] - A chat message as stored by the backend
//! - Request/response bodies for the device-info, message-list, latest-message
//!   and submission endpoints
//! - [`TypesError`] - Error types

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod ids;
mod messages;

pub use error::TypesError;
pub use ids::MessageId;
pub use messages::{
    decode, encode, DeviceInfoResponse, LatestMessageResponse, Message, MessageListResponse,
    SubmitRequest, SubmitResponse, MAX_MESSAGE_CHARS, STATUS_ERROR, STATUS_NO_MESSAGES,
    STATUS_SUCCESS, UNKNOWN_DEVICE, UNKNOWN_IP, UNKNOWN_USER,
};
