use std::fmt;

use crate::event::EventId;

/// Machine-readable error codes shared by the library and the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigParseError,
    InputReadFailed,
    MalformedEvent,
    MissingAncestor,
    LockPoisoned,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ConfigParseError => "E1001",
            Self::InputReadFailed => "E1002",
            Self::MalformedEvent => "E2001",
            Self::MissingAncestor => "E2002",
            Self::LockPoisoned => "E5001",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ConfigParseError => "Config file parse error",
            Self::InputReadFailed => "Event log could not be read",
            Self::MalformedEvent => "Malformed event record",
            Self::MissingAncestor => "Parent event not ingested",
            Self::LockPoisoned => "Event index lock poisoned",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ConfigParseError => Some("Fix the syntax of the consensus config and retry."),
            Self::InputReadFailed => Some("Check the event log path and read permissions."),
            Self::MalformedEvent => {
                Some("Each line must be a JSON object with at least `seq` and `creator`.")
            }
            Self::MissingAncestor => Some(
                "Ingest parents before children, or set `missing_parent = \"lenient\"`.",
            ),
            Self::LockPoisoned => Some("A writer panicked mid-ingest; rebuild the index."),
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Errors from sealing an event.
///
/// Equivocation is not an error: it is reported through fork flags.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IngestError {
    /// A parent referenced by the event is not in the index.
    #[error("event {event} references unknown parent {parent}")]
    MissingAncestor {
        /// The event being sealed.
        event: EventId,
        /// The parent that could not be resolved.
        parent: EventId,
    },

    /// A writer panicked while holding the shared index.
    #[error("event index lock poisoned")]
    Poisoned,

    #[error("internal error: {0}")]
    Internal(String),
}

impl IngestError {
    /// Return the machine-readable error code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::MissingAncestor { .. } => ErrorCode::MissingAncestor,
            Self::Poisoned => ErrorCode::LockPoisoned,
            Self::Internal(_) => ErrorCode::InternalUnexpected,
        }
    }
}
