use anyhow::Context;
use std::path::{Path, PathBuf};

/// Resolve the registry root.
///
/// Priority:
/// 1. `--root` flag / `TROUPE_HOME` env var (passed in as `explicit`)
/// 2. `~/.troupe`
pub fn resolve_root(explicit: Option<&Path>) -> anyhow::Result<PathBuf> {
    if let Some(p) = explicit {
        return Ok(p.to_path_buf());
    }
    troupe_core::paths::default_root().context("failed to resolve registry root")
}
