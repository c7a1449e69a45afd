//! Session lifecycle state machine for Router Chat.
//!
//! This module provides a pure, side-effect-free state machine for the
//! engine's lifecycle: waiting for a display name, running with or without
//! the poll loop, and shut down. The state machine takes events as input and
//! produces a new state plus a list of actions to execute.
//!
//! The actual I/O (HTTP requests, spawning and aborting the poll task) is
//! performed by chat-client, not by this module.

use std::time::Duration;

use crate::{EngineEvent, FetchMode};

/// Engine lifecycle - NO I/O, just state transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lifecycle {
    /// No display name yet; nothing may touch the network.
    AwaitingIdentity,
    /// Display name set, poll loop not running.
    Idle,
    /// Display name set, poll loop running.
    Polling {
        /// Current tick interval.
        interval: Duration,
    },
    /// Torn down; every further event is ignored.
    Closed,
}

impl Lifecycle {
    /// Create a state machine waiting for the display name.
    pub fn new() -> Self {
        Self::AwaitingIdentity
    }

    /// Process an event and return the new state plus actions to execute.
    ///
    /// This is a pure function - no side effects. The caller (chat-client)
    /// is responsible for executing the returned actions.
    pub fn on_event(self, event: Event) -> (Self, Vec<Action>) {
        match (self, event) {
            // From AwaitingIdentity
            (Self::AwaitingIdentity, Event::IdentitySet { display_name }) => (
                Self::Idle,
                vec![
                    Action::EmitEvent(EngineEvent::SessionStarted { display_name }),
                    Action::FetchDeviceInfo,
                    Action::FetchMessages {
                        mode: FetchMode::Manual,
                    },
                ],
            ),

            // From Idle
            (Self::Idle, Event::StartPollingRequested { interval }) => (
                Self::Polling { interval },
                vec![
                    Action::SchedulePoll { interval },
                    Action::EmitEvent(EngineEvent::PollingStarted { interval }),
                ],
            ),
            (Self::Idle, Event::StopPollingRequested) => (Self::Idle, vec![]),

            // From Polling
            (Self::Polling { .. }, Event::StartPollingRequested { interval }) => (
                Self::Polling { interval },
                vec![
                    Action::CancelPoll,
                    Action::SchedulePoll { interval },
                    Action::EmitEvent(EngineEvent::PollingStarted { interval }),
                ],
            ),
            (Self::Polling { .. }, Event::StopPollingRequested) => (
                Self::Idle,
                vec![
                    Action::CancelPoll,
                    Action::EmitEvent(EngineEvent::PollingStopped),
                ],
            ),
            (Self::Polling { .. }, Event::ShutdownRequested) => (
                Self::Closed,
                vec![
                    Action::CancelPoll,
                    Action::EmitEvent(EngineEvent::PollingStopped),
                ],
            ),

            // Shutdown from anywhere else
            (Self::AwaitingIdentity | Self::Idle, Event::ShutdownRequested) => {
                (Self::Closed, vec![])
            }

            // Invalid transitions - stay in current state
            (state, _) => (state, vec![]),
        }
    }

    /// Whether a display name has been accepted and the engine is not closed.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Idle | Self::Polling { .. })
    }

    /// Whether the poll loop is running.
    pub fn is_polling(&self) -> bool {
        matches!(self, Self::Polling { .. })
    }

    /// Current poll interval, if polling.
    pub fn interval(&self) -> Option<Duration> {
        match self {
            Self::Polling { interval } => Some(*interval),
            _ => None,
        }
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

/// Inputs to the lifecycle state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A valid display name was accepted.
    IdentitySet {
        /// The accepted display name.
        display_name: String,
    },
    /// Start (or restart) the poll loop.
    StartPollingRequested {
        /// Tick interval.
        interval: Duration,
    },
    /// Stop the poll loop.
    StopPollingRequested,
    /// Session is ending.
    ShutdownRequested,
}

/// Actions to be executed by chat-client.
///
/// These are instructions, not side effects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Look up device information once.
    FetchDeviceInfo,
    /// Fetch the message list.
    FetchMessages {
        /// Kind of fetch to run.
        mode: FetchMode,
    },
    /// Spawn the recurring poll task.
    SchedulePoll {
        /// Tick interval.
        interval: Duration,
    },
    /// Abort the poll task, if any.
    CancelPoll,
    /// Emit an event to the presentation layer.
    EmitEvent(EngineEvent),
}
