use serde::{Deserialize, Serialize};

use crate::model::Decision;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum RunOutcome {
    /// Activity is recent enough; nothing released.
    Safe,
    /// One-shot switch already fired; release skipped.
    AlreadyReleased,
    Released,
}

impl From<Decision> for RunOutcome {
    fn from(d: Decision) -> Self {
        match d {
            Decision::StayArmed => RunOutcome::Safe,
            Decision::SkipAlreadyReleased => RunOutcome::AlreadyReleased,
            Decision::Release => RunOutcome::Released,
        }
    }
}
