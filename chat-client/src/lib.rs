//! # chat-client
//!
//! Message synchronization engine for Router Chat clients.
//!
//! This is the library a presentation layer (terminal, mobile shell, desktop
//! window) drives to take part in a local-network chat.
//!
//! ## Features
//!
//! - **Session gating**: nothing touches the network before a display name is set
//! - **Poll loop**: cancellable fixed-interval refresh with a stored task handle
//! - **Stale-response discard**: overlapping fetches never roll the board back
//! - **Submission pipeline**: validation, busy flag, refresh after send
//! - **Backend abstraction**: pluggable backend (HTTP, mock)
//!
//! ## Example
//!
//! ```ignore
//! use chat_client::{ChatEngine, Draft, EngineConfig, HttpBackend};
//!
//! let config = EngineConfig::default();
//! let engine = ChatEngine::new(HttpBackend::new(config.backend.clone())?, config);
//!
//! engine.set_session_identity("Ana").await?;
//!
//! let mut draft = Draft::from("hello from the kitchen");
//! engine.send_message(&mut draft).await?;
//!
//! for message in engine.messages().await {
//!     println!("{}: {}", message.author_name, message.text);
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod config;
pub mod device;
pub mod engine;
mod poller;

pub use backend::{Backend, BackendError, HttpBackend, MockBackend};
pub use config::{BackendConfig, ConfigError, EngineConfig, PollConfig};
pub use device::DeviceIdentity;
pub use engine::{ChatEngine, EngineError, FetchReport, SendReceipt, SessionStart};

pub use chat_core::{Draft, EngineEvent, Failure, FetchMode, SessionIdentity, ValidationError};
pub use chat_types::Message;
