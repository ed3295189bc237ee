use std::sync::Mutex;

use anyhow::anyhow;
use deadman_core::SwitchState;

use crate::traits::StateStore;

/// In-memory state store for tests. Not durable, but records every save so
/// tests can assert on checkpoint ordering.
#[derive(Default)]
pub struct InMemoryStateStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    current: Option<SwitchState>,
    saves: Vec<SwitchState>,
    attempts: usize,
    fail_saves: bool,
    fail_attempt: Option<usize>,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: SwitchState) -> Self {
        let store = Self::default();
        store.inner.lock().unwrap().current = Some(state);
        store
    }

    /// Every subsequent `save` returns an error.
    pub fn fail_saves(&self) {
        self.inner.lock().unwrap().fail_saves = true;
    }

    /// Only the `n`-th save (1-based) returns an error.
    pub fn fail_save_number(&self, n: usize) {
        self.inner.lock().unwrap().fail_attempt = Some(n);
    }

    pub fn saves(&self) -> Vec<SwitchState> {
        self.inner.lock().unwrap().saves.clone()
    }

    pub fn current(&self) -> Option<SwitchState> {
        self.inner.lock().unwrap().current.clone()
    }
}

impl StateStore for InMemoryStateStore {
    fn load(&self) -> SwitchState {
        self.inner.lock().unwrap().current.clone().unwrap_or_default()
    }

    fn save(&self, state: &SwitchState) -> anyhow::Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.attempts += 1;
        if inner.fail_saves || inner.fail_attempt == Some(inner.attempts) {
            return Err(anyhow!("state store is read-only"));
        }
        inner.current = Some(state.clone());
        inner.saves.push(state.clone());
        Ok(())
    }
}
