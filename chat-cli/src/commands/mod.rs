//! CLI command implementations.

pub mod chat;
pub mod device;
pub mod latest;
pub mod messages;
pub mod send;

use chat_types::Message;

/// One-line rendering of a message.
pub fn format_message(message: &Message) -> String {
    format!(
        "[{}] {} ({}): {}",
        message.sent_at, message.author_name, message.author_address, message.text
    )
}
