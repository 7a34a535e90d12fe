//! Error types shared across shotdedup crates.

use std::fmt;
use std::path::PathBuf;

/// Input field that failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventField {
    EventId,
    EventTime,
    X,
    Y,
    Rounds,
}

impl EventField {
    /// Column name as it appears in input rows.
    pub fn column(&self) -> &'static str {
        match self {
            Self::EventId => "event_id",
            Self::EventTime => "event_time",
            Self::X => "x",
            Self::Y => "y",
            Self::Rounds => "rounds",
        }
    }
}

impl fmt::Display for EventField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// Top-level error type for shotdedup operations.
#[derive(Debug, thiserror::Error)]
pub enum DedupError {
    #[error("Invalid event at row {row}{}: field `{field}` {reason}", display_id(.event_id))]
    InvalidEvent {
        row: usize,
        event_id: Option<i64>,
        field: EventField,
        reason: String,
    },

    #[error("Duplicate event id {event_id} (rows {first_row} and {second_row})")]
    DuplicateEventId {
        event_id: i64,
        first_row: usize,
        second_row: usize,
    },

    #[error("Invalid parameter `{name}` = {value}: {reason}")]
    InvalidParameter {
        name: &'static str,
        value: f64,
        reason: String,
    },

    #[error("Component references unknown event id {event_id}")]
    UnknownEventId { event_id: i64 },

    #[error("Internal error: {message}")]
    Internal { message: String },

    #[error("Parse error on line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn display_id(event_id: &Option<i64>) -> String {
    event_id
        .map(|id| format!(" (event_id {id})"))
        .unwrap_or_default()
}

/// Result type alias using DedupError.
pub type DedupResult<T> = Result<T, DedupError>;

impl DedupError {
    pub fn invalid_event(
        row: usize,
        event_id: Option<i64>,
        field: EventField,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidEvent {
            row,
            event_id,
            field,
            reason: reason.into(),
        }
    }

    pub fn invalid_parameter(name: &'static str, value: f64, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            value,
            reason: reason.into(),
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Field that failed, for errors that come from a single input row.
    pub fn field(&self) -> Option<EventField> {
        match self {
            Self::InvalidEvent { field, .. } => Some(*field),
            Self::DuplicateEventId { .. } => Some(EventField::EventId),
            _ => None,
        }
    }
}
