//! Failure visibility.
//!
//! Whether a failure reaches the user depends on where it happened, not on
//! the error itself. A dropped connection during a background tick is
//! swallowed and healed by the next tick; the same error while sending a
//! message is shown to the user. Call sites wrap their errors in
//! [`Failure`] so callers can match on visibility directly.

use std::fmt;

/// How a fetch was triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchMode {
    /// Poll-loop tick.
    Background,
    /// Pull-to-refresh, the refresh button, or the refresh after a send.
    Manual,
}

impl FetchMode {
    /// Call site used to classify failures of this fetch.
    pub fn call_site(self) -> CallSite {
        match self {
            Self::Background => CallSite::BackgroundFetch,
            Self::Manual => CallSite::ManualFetch,
        }
    }
}

impl fmt::Display for FetchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Background => f.write_str("background"),
            Self::Manual => f.write_str("manual"),
        }
    }
}

/// Places in the engine where a network failure can occur.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallSite {
    /// Device information lookup during bootstrap.
    DeviceInfo,
    /// Poll-loop fetch.
    BackgroundFetch,
    /// User-initiated fetch.
    ManualFetch,
    /// Message submission.
    Submission,
}

impl CallSite {
    /// Whether failures at this site are shown to the user.
    ///
    /// Manual refreshes stay silent: the refreshing indicator turning off is
    /// the only feedback.
    pub fn visibility(self) -> Visibility {
        match self {
            Self::DeviceInfo | Self::Submission => Visibility::Visible,
            Self::BackgroundFetch | Self::ManualFetch => Visibility::Silent,
        }
    }
}

/// Whether a failure is surfaced to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Visibility {
    /// Logged and otherwise ignored.
    Silent,
    /// Shown to the user (alert, prompt, error line).
    Visible,
}

/// An error tagged with its visibility.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure<E> {
    /// Swallowed failure.
    Silent(E),
    /// Failure to show to the user.
    Visible(E),
}

impl<E> Failure<E> {
    /// Tag an error according to the call site it came from.
    pub fn at(site: CallSite, error: E) -> Self {
        match site.visibility() {
            Visibility::Silent => Self::Silent(error),
            Visibility::Visible => Self::Visible(error),
        }
    }

    /// Visibility of this failure.
    pub fn visibility(&self) -> Visibility {
        match self {
            Self::Silent(_) => Visibility::Silent,
            Self::Visible(_) => Visibility::Visible,
        }
    }

    /// Whether the failure should be shown to the user.
    pub fn is_visible(&self) -> bool {
        matches!(self, Self::Visible(_))
    }

    /// Borrow the underlying error.
    pub fn error(&self) -> &E {
        match self {
            Self::Silent(e) | Self::Visible(e) => e,
        }
    }

    /// Take the underlying error regardless of visibility.
    pub fn into_inner(self) -> E {
        match self {
            Self::Silent(e) | Self::Visible(e) => e,
        }
    }

    /// The error, only if it should be shown.
    pub fn visible(self) -> Option<E> {
        match self {
            Self::Visible(e) => Some(e),
            Self::Silent(_) => None,
        }
    }
}

impl<E: fmt::Display> fmt::Display for Failure<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.error().fmt(f)
    }
}

impl<E: std::error::Error + 'static> std::error::Error for Failure<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.error())
    }
}
