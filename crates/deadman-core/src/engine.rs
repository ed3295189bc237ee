use chrono::{DateTime, Utc};

use crate::{ActivitySnapshot, Command, Decision, Phase, SwitchState, TriggerPolicy};

/// Result of planning one run: the state to checkpoint before any side effect,
/// and what the shell should do next.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Plan {
    pub checkpoint: SwitchState,
    pub decision: Decision,
}

impl Plan {
    pub fn commands(&self) -> Vec<Command> {
        match self.decision {
            Decision::StayArmed | Decision::SkipAlreadyReleased => vec![Command::SaveCheckpoint],
            Decision::Release => vec![Command::SaveCheckpoint, Command::ReleasePayload, Command::SaveReleased],
        }
    }
}

/// Pure transition function for one run.
///
/// Tracking fields (`last_check`, `last_activity`, `inactivity_days`) are
/// refreshed regardless of the decision. `triggered`/`triggered_at` are carried
/// over untouched; the shell sets them only after the release succeeded.
pub fn plan_run(prior: &SwitchState, policy: &TriggerPolicy, snapshot: &ActivitySnapshot, now: DateTime<Utc>) -> Plan {
    // No observable activity inside the window is treated as just past the threshold.
    let inactivity_days = snapshot
        .inactivity_days(now)
        .unwrap_or_else(|| policy.threshold_days.saturating_add(1));

    let mut checkpoint = prior.clone();
    checkpoint.last_check = Some(now);
    checkpoint.last_activity = snapshot.last_activity;
    checkpoint.inactivity_days = inactivity_days;

    let decision = decide(prior.phase(), policy, inactivity_days);
    Plan { checkpoint, decision }
}

pub fn decide(phase: Phase, policy: &TriggerPolicy, inactivity_days: u32) -> Decision {
    if inactivity_days <= policy.threshold_days {
        return Decision::StayArmed;
    }
    if policy.one_shot && phase == Phase::Fired {
        return Decision::SkipAlreadyReleased;
    }
    Decision::Release
}
