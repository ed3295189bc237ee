use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::Phase;

/// Timestamp layout used by the events endpoint for `created_at`.
pub const ACTIVITY_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// One public event. Only the timestamp matters to the switch; `kind` is kept for logs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActivityRecord {
    pub kind: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl ActivityRecord {
    pub fn at(created_at: DateTime<Utc>) -> Self {
        Self { kind: None, created_at: Some(created_at) }
    }

    pub fn untimed() -> Self {
        Self { kind: None, created_at: None }
    }

    /// Extract what we need from a raw event object. Never fails: anything
    /// missing or malformed becomes `None`.
    pub fn from_json(value: &serde_json::Value) -> Self {
        let kind = value.get("type").and_then(|v| v.as_str()).map(str::to_string);
        let created_at = value
            .get("created_at")
            .and_then(|v| v.as_str())
            .and_then(parse_activity_timestamp);
        Self { kind, created_at }
    }
}

pub fn parse_activity_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, ACTIVITY_TIMESTAMP_FORMAT) {
        return Some(naive.and_utc());
    }
    DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.with_timezone(&Utc))
}

/// Durable history of the switch, rewritten on every run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchState {
    /// `None` means older than the observable window.
    pub last_activity: Option<DateTime<Utc>>,
    pub inactivity_days: u32,
    pub triggered: bool,
    pub triggered_at: Option<DateTime<Utc>>,
    pub last_check: Option<DateTime<Utc>>,
}

impl SwitchState {
    pub fn phase(&self) -> Phase {
        if self.triggered {
            Phase::Fired
        } else {
            Phase::Armed
        }
    }

    /// `triggered` only ever goes from false to true here.
    pub fn mark_released(&mut self, at: DateTime<Utc>) {
        self.triggered = true;
        self.triggered_at = Some(at);
    }
}
