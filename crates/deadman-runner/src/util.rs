use std::path::PathBuf;

/// Expand a leading `~` so config paths can point into the home directory.
pub fn expand_path(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).as_ref())
}
