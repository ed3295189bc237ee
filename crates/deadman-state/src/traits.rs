use deadman_core::SwitchState;

pub trait StateStore: Send + Sync {
    /// Never fails: a missing or invalid record yields `SwitchState::default()`.
    fn load(&self) -> SwitchState;

    /// Replace the stored record. Errors must reach the caller; a dropped write
    /// can cause a duplicate or missed release.
    fn save(&self, state: &SwitchState) -> anyhow::Result<()>;
}
