//! The displayed message collection.
//!
//! The board holds whatever the most recent accepted fetch returned. It never
//! merges: every accepted fetch replaces the whole collection, in the order
//! the backend sent it.
//!
//! Fetches may overlap (a background tick and a manual refresh, or the
//! refresh that follows a send). Each fetch takes a [`FetchTicket`] before it
//! goes out; when a response arrives with a ticket older than the last one
//! applied, it is stale and gets dropped.

use chat_types::Message;

/// Sequence number handed to a fetch when it is issued.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct FetchTicket(u64);

impl FetchTicket {
    /// Numeric value of this ticket.
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Result of offering a fetch response to the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The collection was replaced.
    Replaced {
        /// Number of messages now on the board.
        count: usize,
    },
    /// A newer response was already applied; this one was dropped.
    Stale {
        /// Ticket of the dropped response.
        ticket: FetchTicket,
        /// Ticket of the response currently on the board.
        current: FetchTicket,
    },
}

/// Message collection plus fetch sequencing.
#[derive(Debug, Clone, Default)]
pub struct MessageBoard {
    messages: Vec<Message>,
    /// Last ticket handed out.
    issued: u64,
    /// Ticket of the response currently displayed (0 = nothing yet).
    applied: u64,
}

impl MessageBoard {
    /// Create an empty board.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve a ticket for a fetch that is about to be sent.
    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.issued = self.issued.saturating_add(1);
        FetchTicket(self.issued)
    }

    /// Offer the result of the fetch holding `ticket`.
    ///
    /// The response replaces the board unless a fetch issued later has
    /// already been applied.
    pub fn apply(&mut self, ticket: FetchTicket, messages: Vec<Message>) -> ApplyOutcome {
        if ticket.0 < self.applied {
            return ApplyOutcome::Stale {
                ticket,
                current: FetchTicket(self.applied),
            };
        }

        self.applied = ticket.0;
        self.messages = messages;
        ApplyOutcome::Replaced {
            count: self.messages.len(),
        }
    }

    /// Messages currently displayed, in backend order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Number of messages on the board.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the board is empty.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

}
