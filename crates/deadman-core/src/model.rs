use serde::{Deserialize, Serialize};

/// The events endpoint only ever returns the last 90 days.
pub const ACTIVITY_WINDOW_DAYS: u32 = 90;

pub const MIN_THRESHOLD_DAYS: u32 = 1;
pub const MAX_THRESHOLD_DAYS: u32 = ACTIVITY_WINDOW_DAYS;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum Phase {
    Armed,
    Fired,
}

/// The slice of configuration the decision engine needs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TriggerPolicy {
    pub threshold_days: u32,
    pub one_shot: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    /// Inactivity is within the threshold.
    StayArmed,
    /// Past the threshold, but a one-shot switch has already fired.
    SkipAlreadyReleased,
    Release,
}
