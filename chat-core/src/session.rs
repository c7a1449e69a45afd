//! Session identity and draft validation.

use chat_types::MAX_MESSAGE_CHARS;
use std::fmt;
use thiserror::Error;

/// Maximum display name length, in characters.
pub const MAX_DISPLAY_NAME_CHARS: usize = 30;

/// Input the user has to correct before anything is sent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Display name is empty after trimming.
    #[error("please enter your name")]
    EmptyName,

    /// Display name is too long.
    #[error("name is too long ({actual} characters, max {max})")]
    NameTooLong {
        /// Allowed maximum.
        max: usize,
        /// Length of the trimmed input.
        actual: usize,
    },

    /// Message is empty after trimming.
    #[error("please enter a message")]
    EmptyMessage,

    /// Message is too long.
    #[error("message is too long ({actual} characters, max {max})")]
    MessageTooLong {
        /// Allowed maximum.
        max: usize,
        /// Length of the trimmed input.
        actual: usize,
    },
}

/// The display name chosen for this session.
///
/// Always trimmed and non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionIdentity(String);

impl SessionIdentity {
    /// Validate and trim a display name.
    pub fn parse(name: &str) -> Result<Self, ValidationError> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyName);
        }
        let actual = trimmed.chars().count();
        if actual > MAX_DISPLAY_NAME_CHARS {
            return Err(ValidationError::NameTooLong {
                max: MAX_DISPLAY_NAME_CHARS,
                actual,
            });
        }
        Ok(Self(trimmed.to_string()))
    }

    /// The display name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Check a draft and return the trimmed text to send.
pub fn validate_message_text(text: &str) -> Result<&str, ValidationError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyMessage);
    }
    let actual = trimmed.chars().count();
    if actual > MAX_MESSAGE_CHARS {
        return Err(ValidationError::MessageTooLong {
            max: MAX_MESSAGE_CHARS,
            actual,
        });
    }
    Ok(trimmed)
}

/// Unsent message text.
///
/// Owned by the presentation layer and lent to the engine for sending. The
/// engine clears it only after the backend accepted the message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Draft {
    text: String,
}

impl Draft {
    /// Create an empty draft.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current text, untrimmed.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Replace the text (typing).
    pub fn set(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    /// Clear the text.
    pub fn clear(&mut self) {
        self.text.clear();
    }

    /// Whether there is nothing to send.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Validate the draft and return the text to send.
    pub fn validated(&self) -> Result<&str, ValidationError> {
        validate_message_text(&self.text)
    }
}

impl From<&str> for Draft {
    fn from(text: &str) -> Self {
        Self {
            text: text.to_string(),
        }
    }
}

impl From<String> for Draft {
    fn from(text: String) -> Self {
        Self { text }
    }
}
