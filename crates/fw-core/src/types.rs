//! Core type definitions with validation.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Validation errors raised at the watcher boundary.
///
/// A value that fails validation never reaches the reducer or the normalizer.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// The provided value was empty or blank.
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    /// A required field was absent.
    #[error("missing {field}")]
    Missing { field: &'static str },

    /// The focus state was not one of the recognized values.
    #[error("invalid state {value:?}, must be \"focused\" or \"unfocused\"")]
    InvalidState { value: String },

    /// The duration was negative, non-finite, or not a number.
    #[error("invalid duration: {value}")]
    InvalidDuration { value: String },

    /// The timestamp could not be parsed as RFC 3339 with an offset.
    #[error("invalid timestamp {value:?}: {reason}")]
    InvalidTimestamp { value: String, reason: String },
}

/// Eye-tracking focus state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FocusState {
    /// Gaze was on the screen.
    Focused,
    /// Gaze was away from the screen.
    Unfocused,
}

impl FocusState {
    /// String representation for database storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Focused => "focused",
            Self::Unfocused => "unfocused",
        }
    }
}

impl fmt::Display for FocusState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for FocusState {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "focused" => Ok(Self::Focused),
            "unfocused" => Ok(Self::Unfocused),
            _ => Err(ValidationError::InvalidState {
                value: s.to_string(),
            }),
        }
    }
}

/// Generates a validated string newtype with common trait implementations.
macro_rules! define_string_id {
    (
        $(#[$meta:meta])*
        $name:ident, $field_name:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates a new value after validation.
            pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
                let id = id.into();
                if id.trim().is_empty() {
                    return Err(ValidationError::Empty { field: $field_name });
                }
                Ok(Self(id))
            }

            /// Returns the value as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_string_id!(
    /// A validated application name.
    ///
    /// App names must contain at least one non-whitespace character.
    AppName, "app name"
);

define_string_id!(
    /// A validated watcher stream identifier.
    ///
    /// Each stream (e.g. one per device) owns its own session reducer.
    StreamId, "stream ID"
);

define_string_id!(
    /// A validated session identifier.
    SessionId, "session ID"
);

define_string_id!(
    /// A validated focus interval identifier.
    IntervalId, "interval ID"
);

impl SessionId {
    /// Derives the ID of the session that `stream` opened for `app` at `start_time`.
    ///
    /// `previous` is the session this one replaced. Chaining on it keeps a
    /// quick A, B, A switch within one timestamp from reusing the first ID,
    /// while replaying the same history still yields the same IDs.
    #[must_use]
    pub fn derive(
        stream: &StreamId,
        app: &AppName,
        start_time: DateTime<Utc>,
        previous: Option<&Self>,
    ) -> Self {
        let previous = previous.map_or("", Self::as_str);
        let start = format_timestamp(start_time);
        let content = format!("session|{stream}|{app}|{start}|{previous}");
        Self(Uuid::new_v5(&Uuid::NAMESPACE_OID, content.as_bytes()).to_string())
    }
}

impl IntervalId {
    /// Derives the ID of the interval reported at `timestamp` with `state`.
    #[must_use]
    pub fn derive(timestamp: DateTime<Utc>, state: FocusState) -> Self {
        let content = format!("interval|{}|{state}", format_timestamp(timestamp));
        Self(Uuid::new_v5(&Uuid::NAMESPACE_OID, content.as_bytes()).to_string())
    }
}

/// Parses an RFC 3339 timestamp with an explicit offset into UTC.
///
/// Naive timestamps (no offset) are rejected rather than guessed.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, ValidationError> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|err| ValidationError::InvalidTimestamp {
            value: value.to_string(),
            reason: err.to_string(),
        })
}

/// Formats a timestamp for storage: RFC 3339, millisecond precision, `Z` suffix.
pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}
