//! Events emitted to the presentation layer.

use crate::FetchMode;
use chat_types::MessageId;
use std::time::Duration;

/// Something the presentation layer may want to redraw for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Display name accepted; network activity begins.
    SessionStarted {
        /// The accepted display name.
        display_name: String,
    },
    /// Device information learned from the backend.
    DeviceIdentified {
        /// Local network address reported by the backend.
        local_address: String,
    },
    /// The message collection was replaced.
    MessagesReplaced {
        /// Number of messages now displayed.
        count: usize,
        /// Which kind of fetch produced it.
        mode: FetchMode,
    },
    /// A fetch answered after a newer one and was dropped.
    StaleFetchDiscarded {
        /// Ticket of the dropped fetch.
        ticket: u64,
    },
    /// A fetch failed (always swallowed; emitted for diagnostics).
    FetchFailed {
        /// Which kind of fetch failed.
        mode: FetchMode,
        /// Error description.
        error: String,
    },
    /// A message was accepted by the backend.
    MessageSent {
        /// Identifier assigned by the backend, when it reported one.
        id: Option<MessageId>,
    },
    /// The poll loop was (re)started.
    PollingStarted {
        /// Tick interval.
        interval: Duration,
    },
    /// The poll loop was stopped.
    PollingStopped,
}
