//! # chat-core
//!
//! Pure logic for Router Chat (no I/O, instant tests).
//!
//! This crate implements the state machines and rules of the message
//! synchronization engine without any network access, enabling fast unit
//! tests.
//!
//! ## Design Philosophy
//!
//! All modules in this crate are **pure** - they take input and produce output
//! without side effects:
//! - [`lifecycle`]: session and poll-loop state machine
//! - [`board`]: the displayed message collection and stale-fetch detection
//! - [`session`]: display name and draft validation
//! - [`descriptor`]: lenient decoding of device descriptors
//! - [`failure`]: which failures reach the user and which are swallowed
//!
//! The actual I/O (HTTP requests, timers) is performed by `chat-client`, which
//! interprets the actions produced here.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod board;
pub mod descriptor;
pub mod events;
pub mod failure;
pub mod lifecycle;
pub mod session;

pub use board::{ApplyOutcome, FetchTicket, MessageBoard};
pub use descriptor::{parse_device_info, DeviceDescriptor};
pub use events::EngineEvent;
pub use failure::{CallSite, Failure, FetchMode, Visibility};
pub use lifecycle::{Action, Event, Lifecycle};
pub use session::{
    validate_message_text, Draft, SessionIdentity, ValidationError, MAX_DISPLAY_NAME_CHARS,
};
