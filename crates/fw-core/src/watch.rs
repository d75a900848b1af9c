//! Watcher payloads and boundary validation.
//!
//! Watchers deliver loosely typed JSON. Everything is checked here, before
//! any reducer or normalizer state is touched; a payload that fails is
//! reported to the caller and dropped.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::interval::FocusPing;
use crate::session::Observation;
use crate::types::{AppName, FocusState, ValidationError, parse_timestamp};

/// Foreground-app report as sent by the app watcher.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppPayload {
    #[serde(default)]
    pub app: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    /// RFC 3339 time of the observation. The receive time is used when absent.
    #[serde(default)]
    pub at: Option<String>,
}

impl AppPayload {
    /// Validates the payload into an [`Observation`].
    ///
    /// `received_at` stands in for a missing `at`.
    pub fn validate(self, received_at: DateTime<Utc>) -> Result<Observation, ValidationError> {
        let app = self.app.ok_or(ValidationError::Missing { field: "app" })?;
        let app = AppName::new(app)?;
        let observed_at = match self.at.as_deref() {
            Some(at) => parse_timestamp(at)?,
            None => received_at,
        };
        Ok(Observation::new(app, self.title, observed_at))
    }
}

/// Focus report as sent by the eye watcher.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FocusPayload {
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    /// Seconds. Kept untyped so a string or boolean is reported as a bad
    /// duration rather than a generic parse failure.
    #[serde(default)]
    pub duration: Option<Value>,
}

impl FocusPayload {
    /// Validates the payload into a [`FocusPing`].
    pub fn validate(self) -> Result<FocusPing, ValidationError> {
        let timestamp = self
            .timestamp
            .ok_or(ValidationError::Missing { field: "timestamp" })?;
        let timestamp = parse_timestamp(&timestamp)?;
        let state: FocusState = self
            .state
            .ok_or(ValidationError::Missing { field: "state" })?
            .parse()?;
        let duration_secs = match self.duration {
            None | Some(Value::Null) => None,
            Some(value) => Some(parse_duration(&value)?),
        };
        Ok(FocusPing {
            timestamp,
            state,
            duration_secs,
        })
    }
}

/// Longest duration a single focus ping may claim: one week.
pub const MAX_PING_SECS: i64 = 7 * 24 * 60 * 60;

/// Accepts a JSON number of seconds in `0..=MAX_PING_SECS`, floored.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn parse_duration(value: &Value) -> Result<i64, ValidationError> {
    let invalid = || ValidationError::InvalidDuration {
        value: value.to_string(),
    };
    if let Some(secs) = value.as_i64() {
        return if (0..=MAX_PING_SECS).contains(&secs) {
            Ok(secs)
        } else {
            Err(invalid())
        };
    }
    let secs = value.as_f64().ok_or_else(invalid)?;
    if !secs.is_finite() || secs < 0.0 || secs > MAX_PING_SECS as f64 {
        return Err(invalid());
    }
    Ok(secs.floor() as i64)
}

/// One line of a watcher batch, tagged by `type`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WatcherEvent {
    App(AppPayload),
    Focus(FocusPayload),
}

/// A watcher event that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidatedEvent {
    Observation(Observation),
    Ping(FocusPing),
}

impl WatcherEvent {
    pub fn validate(self, received_at: DateTime<Utc>) -> Result<ValidatedEvent, ValidationError> {
        match self {
            Self::App(payload) => payload.validate(received_at).map(ValidatedEvent::Observation),
            Self::Focus(payload) => payload.validate().map(ValidatedEvent::Ping),
        }
    }
}
