use chrono::{DateTime, Utc};

use crate::{types::ActivityRecord, window};

/// What this run learned about the monitored handle. Computed fresh every run,
/// never persisted as-is.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ActivitySnapshot {
    pub last_activity: Option<DateTime<Utc>>,
}

impl ActivitySnapshot {
    pub fn from_records(records: &[ActivityRecord]) -> Self {
        Self { last_activity: window::last_activity(records) }
    }

    pub fn inactivity_days(&self, now: DateTime<Utc>) -> Option<u32> {
        window::days_since(self.last_activity, now)
    }
}
