//! Backend abstraction for Router Chat.
//!
//! This module provides a pluggable backend layer that abstracts how the
//! engine reaches the chat service (HTTP/JSON, mock for testing).
//!
//! # Design
//!
//! The backend trait is async and request/response shaped, one method per
//! endpoint:
//! - `device_info()` asks the backend who we are on the network
//! - `messages()` returns the full message list
//! - `latest_message()` returns only the newest message
//! - `submit()` stores a new message
//!
//! Backends return wire bodies unchanged; interpreting statuses and
//! placeholders is the engine's job.
//!
//! # Example
//!
//! ```ignore
//! let backend = MockBackend::new();
//! let list = backend.messages().await?;
//! assert!(list.is_success());
//! ```

mod http;
mod mock;

pub use http::HttpBackend;
pub use mock::MockBackend;

use async_trait::async_trait;
use chat_types::{
    DeviceInfoResponse, LatestMessageResponse, MessageListResponse, SubmitRequest, SubmitResponse,
    TypesError,
};
use thiserror::Error;

/// Backend errors.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Could not reach the backend.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// The request did not complete in time.
    #[error("request timed out")]
    Timeout,

    /// The backend answered with a non-success HTTP status.
    #[error("backend returned HTTP {0}")]
    Status(u16),

    /// The response body could not be decoded.
    #[error("invalid response body: {0}")]
    Decode(#[from] TypesError),

    /// The backend answered but refused the request.
    #[error("backend rejected the request: {0}")]
    Rejected(String),

    /// Any other request failure.
    #[error("request failed: {0}")]
    Request(String),
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() {
            BackendError::ConnectionFailed(e.to_string())
        } else if e.is_timeout() {
            BackendError::Timeout
        } else if let Some(status) = e.status() {
            BackendError::Status(status.as_u16())
        } else {
            BackendError::Request(e.to_string())
        }
    }
}

/// Backend trait for talking to the chat service.
///
/// Implementations handle the underlying transport (HTTP, mock, etc).
#[async_trait]
pub trait Backend: Send + Sync {
    /// Fetch the device information the backend sees for this client.
    async fn device_info(&self) -> Result<DeviceInfoResponse, BackendError>;

    /// Fetch the full message list.
    async fn messages(&self) -> Result<MessageListResponse, BackendError>;

    /// Fetch only the most recent message.
    async fn latest_message(&self) -> Result<LatestMessageResponse, BackendError>;

    /// Submit a new message.
    ///
    /// Success is signalled by the transport; a body that explicitly reports
    /// an error is returned as [`BackendError::Rejected`].
    async fn submit(&self, request: &SubmitRequest) -> Result<SubmitResponse, BackendError>;
}
