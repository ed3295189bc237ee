use std::path::PathBuf;

use anyhow::{Context, Result};
use deadman_activity::ActivitySource;
use deadman_core::{plan_run, ActivitySnapshot, Clock, Command, Decision, RunOutcome, SwitchState};
use deadman_state::StateStore;
use tracing::{info, warn};

use crate::{PayloadRelease, SwitchConfig};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub state: SwitchState,
    pub released_to: Option<PathBuf>,
}

/// One pass of the switch: fetch, evaluate, decide, maybe release, persist.
///
/// Every capability is borrowed so tests can drive it with fakes.
pub struct TriggerEngine<'a> {
    pub config: &'a SwitchConfig,
    pub activity: &'a dyn ActivitySource,
    pub store: &'a dyn StateStore,
    pub release: &'a dyn PayloadRelease,
    pub clock: &'a dyn Clock,
}

impl TriggerEngine<'_> {
    pub fn run(&self) -> Result<RunReport> {
        let prior = self.store.load();

        info!("getting activity");
        let records = self
            .activity
            .fetch(&self.config.username, self.config.handle_404)
            .with_context(|| format!("fetch activity for {}", self.config.username))?;
        let snapshot = ActivitySnapshot::from_records(&records);

        let now = self.clock.now();
        let plan = plan_run(&prior, &self.config.policy(), &snapshot, now);
        match snapshot.last_activity {
            Some(at) => info!("last activity {} ({} days ago)", at.to_rfc3339(), plan.checkpoint.inactivity_days),
            None => info!("no activity in the observable window"),
        }

        let mut state = plan.checkpoint.clone();
        let mut released_to = None;
        for command in plan.commands() {
            match command {
                Command::SaveCheckpoint => {
                    self.store.save(&state).context("save state")?;
                }
                Command::ReleasePayload => {
                    warn!(
                        "inactive for {} days (threshold {}), releasing payload",
                        state.inactivity_days, self.config.inactivity_days
                    );
                    released_to = Some(self.release.release().context("release payload")?);
                }
                Command::SaveReleased => {
                    state.mark_released(self.clock.now());
                    self.store.save(&state).context("save released state")?;
                }
            }
        }

        match plan.decision {
            Decision::StayArmed => info!("not inactive, safe to exit"),
            Decision::SkipAlreadyReleased => info!("already triggered, skipping"),
            Decision::Release => info!("payload released"),
        }

        Ok(RunReport { outcome: plan.decision.into(), state, released_to })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use deadman_activity::ActivityError;
    use deadman_core::{ActivityRecord, FixedClock};
    use deadman_state::InMemoryStateStore;
    use std::cell::Cell;

    struct FakeActivity(Option<Vec<ActivityRecord>>);

    impl ActivitySource for FakeActivity {
        fn fetch(&self, _handle: &str, _missing_as_empty: bool) -> Result<Vec<ActivityRecord>, ActivityError> {
            self.0.clone().ok_or(ActivityError::Status { status: 500, url: "fake".into() })
        }
    }

    #[derive(Default)]
    struct CountingRelease {
        calls: Cell<u32>,
        fail: bool,
    }

    impl PayloadRelease for CountingRelease {
        fn release(&self) -> Result<PathBuf> {
            self.calls.set(self.calls.get() + 1);
            if self.fail {
                return Err(anyhow!("decrypt payload: authentication failed"));
            }
            Ok(PathBuf::from("README.md"))
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 11, 5, 3, 0, 0).unwrap()
    }

    fn config(threshold: u32, one_shot: bool) -> SwitchConfig {
        SwitchConfig { inactivity_days: threshold, one_shot, ..SwitchConfig::template() }
    }

    fn active_days_ago(days: i64) -> FakeActivity {
        FakeActivity(Some(vec![ActivityRecord::at(now() - Duration::days(days))]))
    }

    fn run(cfg: &SwitchConfig, activity: &FakeActivity, store: &InMemoryStateStore, release: &CountingRelease) -> Result<RunReport> {
        let clock = FixedClock(now());
        TriggerEngine { config: cfg, activity, store, release, clock: &clock }.run()
    }

    #[test]
    fn boundary_day_does_not_trigger() {
        let store = InMemoryStateStore::new();
        let release = CountingRelease::default();
        let report = run(&config(14, false), &active_days_ago(14), &store, &release).unwrap();
        assert_eq!(report.outcome, RunOutcome::Safe);
        assert_eq!(release.calls.get(), 0);
        assert_eq!(store.saves().len(), 1);
    }

    #[test]
    fn day_after_boundary_triggers() {
        let store = InMemoryStateStore::new();
        let release = CountingRelease::default();
        let report = run(&config(14, false), &active_days_ago(15), &store, &release).unwrap();
        assert_eq!(report.outcome, RunOutcome::Released);
        assert_eq!(release.calls.get(), 1);
        assert_eq!(report.released_to, Some(PathBuf::from("README.md")));
    }

    #[test]
    fn release_is_checkpointed_before_and_after() {
        let store = InMemoryStateStore::new();
        let release = CountingRelease::default();
        run(&config(7, true), &active_days_ago(30), &store, &release).unwrap();

        let saves = store.saves();
        assert_eq!(saves.len(), 2);
        assert!(!saves[0].triggered);
        assert_eq!(saves[0].inactivity_days, 30);
        assert_eq!(saves[0].last_check, Some(now()));
        assert!(saves[1].triggered);
        assert_eq!(saves[1].triggered_at, Some(now()));
    }

    #[test]
    fn one_shot_never_releases_twice() {
        let store = InMemoryStateStore::new();
        let release = CountingRelease::default();
        let cfg = config(7, true);
        run(&cfg, &active_days_ago(30), &store, &release).unwrap();
        let first = store.load().triggered_at;

        for _ in 0..5 {
            let report = run(&cfg, &active_days_ago(31), &store, &release).unwrap();
            assert_eq!(report.outcome, RunOutcome::AlreadyReleased);
        }
        assert_eq!(release.calls.get(), 1);
        let state = store.load();
        assert_eq!(state.triggered_at, first);
        assert_eq!(state.inactivity_days, 31);
    }

    #[test]
    fn repeatable_switch_releases_every_run() {
        let store = InMemoryStateStore::new();
        let release = CountingRelease::default();
        let cfg = config(7, false);
        for _ in 0..3 {
            assert_eq!(run(&cfg, &active_days_ago(30), &store, &release).unwrap().outcome, RunOutcome::Released);
        }
        assert_eq!(release.calls.get(), 3);
        assert_eq!(store.saves().len(), 6);
    }

    #[test]
    fn fetch_failure_saves_nothing() {
        let prior = SwitchState { inactivity_days: 3, ..SwitchState::default() };
        let store = InMemoryStateStore::with_state(prior.clone());
        let release = CountingRelease::default();
        assert!(run(&config(7, false), &FakeActivity(None), &store, &release).is_err());
        assert!(store.saves().is_empty());
        assert_eq!(store.load(), prior);
    }

    #[test]
    fn failed_release_leaves_only_the_checkpoint() {
        let store = InMemoryStateStore::new();
        let release = CountingRelease { fail: true, ..CountingRelease::default() };
        let err = run(&config(7, false), &active_days_ago(30), &store, &release).unwrap_err();
        assert!(format!("{err:#}").contains("authentication failed"));

        let saves = store.saves();
        assert_eq!(saves.len(), 1);
        assert!(!saves[0].triggered);
        assert!(!store.load().triggered);
    }

    #[test]
    fn failed_checkpoint_aborts_before_release() {
        let store = InMemoryStateStore::new();
        store.fail_saves();
        let release = CountingRelease::default();
        assert!(run(&config(7, false), &active_days_ago(30), &store, &release).is_err());
        assert_eq!(release.calls.get(), 0);
    }

    #[test]
    fn failed_fired_save_reaches_caller() {
        let store = InMemoryStateStore::new();
        store.fail_save_number(2);
        let release = CountingRelease::default();
        let err = run(&config(7, true), &active_days_ago(30), &store, &release).unwrap_err();
        assert!(format!("{err:#}").contains("save released state"));
        assert_eq!(release.calls.get(), 1);

        let saves = store.saves();
        assert_eq!(saves.len(), 1);
        assert!(!saves[0].triggered);
        assert_eq!(saves[0].inactivity_days, 30);
    }

    #[test]
    fn returning_activity_keeps_fired_flag() {
        let mut prior = SwitchState::default();
        prior.mark_released(now() - Duration::days(2));
        let store = InMemoryStateStore::with_state(prior.clone());
        let release = CountingRelease::default();
        let report = run(&config(7, true), &active_days_ago(0), &store, &release).unwrap();
        assert_eq!(report.outcome, RunOutcome::Safe);
        assert!(report.state.triggered);
        assert_eq!(report.state.triggered_at, prior.triggered_at);
        assert_eq!(report.state.inactivity_days, 0);
    }
}
