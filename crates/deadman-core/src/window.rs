use chrono::{DateTime, Utc};

use crate::types::ActivityRecord;

/// Most recent timestamp among `records`. Records without one are skipped.
///
/// `None` covers both "no events" and "nothing inside the window"; callers
/// cannot tell them apart and must not try to.
pub fn last_activity(records: &[ActivityRecord]) -> Option<DateTime<Utc>> {
    records.iter().filter_map(|r| r.created_at).max()
}

/// Whole days elapsed since `last`, truncated. Future instants count as 0.
pub fn days_since(last: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Option<u32> {
    let last = last?;
    let days = (now - last).num_days().max(0);
    Some(u32::try_from(days).unwrap_or(u32::MAX))
}
