/// Side effects the imperative shell performs, in order, for one run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    /// Persist the refreshed tracking fields.
    SaveCheckpoint,
    /// Decrypt the sealed payload and write it to the output location.
    ReleasePayload,
    /// Record the release (`triggered`, `triggered_at`) and persist the fired state.
    SaveReleased,
}
