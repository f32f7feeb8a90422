use std::path::{Path, PathBuf};

use chrono::Utc;
use troupe_core::{paths, sync, Registry};

use crate::error::{LaunchError, Result};
use crate::terminal::ProcessLauncher;

// ─── Outcome ──────────────────────────────────────────────────────────────

/// Terminal state of one launch request. Errors reaching the caller as
/// `Err` are total failures (unreadable registry, nonexistent folder);
/// everything recoverable is an outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchOutcome {
    Launched { project_id: String },
    /// No project bound to the folder, or launch failed for a reason a
    /// different scene choice might fix. The caller presents the scene
    /// picker.
    NeedsSetup { folder: String },
    /// Launch was blocked by a macOS automation denial. Scene selection
    /// cannot fix this; the remediation is
    /// [`crate::terminal::open_accessibility_settings`].
    PermissionRecovery { folder: String },
}

// ─── Orchestrator ─────────────────────────────────────────────────────────

/// Drives one launch request from folder path to outcome. Registry state
/// is re-read on every request and nothing is held between requests, so
/// repeated triggers for the same folder are safe.
pub struct Orchestrator<'a> {
    registry: &'a Registry,
    launcher: &'a dyn ProcessLauncher,
}

impl<'a> Orchestrator<'a> {
    pub fn new(registry: &'a Registry, launcher: &'a dyn ProcessLauncher) -> Self {
        Self { registry, launcher }
    }

    pub fn launch(&self, folder: &str) -> Result<LaunchOutcome> {
        let normalized = paths::normalize_project_path(folder);
        let data = self.registry.data()?;

        let Some(project) = data
            .find_project_by_path(&normalized)
            .filter(|p| p.scene_id.is_some())
            .cloned()
        else {
            tracing::debug!(folder = %normalized, "no scene bound, setup required");
            return Ok(LaunchOutcome::NeedsSetup { folder: normalized });
        };

        if let Err(e) = sync::sync(self.registry, &project.id) {
            tracing::warn!(folder = %normalized, error = %e, "sync failed before launch");
            return Ok(LaunchOutcome::NeedsSetup { folder: normalized });
        }

        let settings = self.registry.settings()?;
        match self.launcher.launch(Path::new(&normalized), &settings) {
            Ok(()) => {
                // The terminal is already up; usage bookkeeping must not
                // turn a successful launch into an error.
                if let Err(e) = self.record_scene_used(project.scene_id.as_deref()) {
                    tracing::warn!(folder = %normalized, error = %e, "failed to record scene usage");
                }
                tracing::info!(folder = %normalized, "launched claude");
                Ok(LaunchOutcome::Launched {
                    project_id: project.id,
                })
            }
            Err(LaunchError::PermissionDenied) => {
                tracing::warn!(folder = %normalized, "automation permission denied");
                Ok(LaunchOutcome::PermissionRecovery { folder: normalized })
            }
            Err(e @ LaunchError::FolderNotFound(_)) => Err(e),
            Err(e) => {
                tracing::warn!(folder = %normalized, error = %e, "launch failed");
                Ok(LaunchOutcome::NeedsSetup { folder: normalized })
            }
        }
    }

    fn record_scene_used(&self, scene_id: Option<&str>) -> Result<()> {
        let Some(scene_id) = scene_id else {
            return Ok(());
        };
        let mut data = self.registry.data()?;
        if let Some(scene) = data.find_scene_mut(scene_id) {
            scene.last_used = Some(Utc::now());
            self.registry.save_data(&data)?;
        }
        Ok(())
    }
}

// ─── Re-entrant trigger ───────────────────────────────────────────────────

/// Parse the `--launch <path>` argument carried by both the initial
/// invocation and second-instance handoffs.
pub fn launch_path_from_args<I, S>(args: I) -> Option<PathBuf>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        let arg = arg.as_ref();
        if arg == "--launch" {
            return args.next().map(|p| PathBuf::from(p.as_ref()));
        }
        if let Some(path) = arg.strip_prefix("--launch=") {
            return Some(PathBuf::from(path));
        }
    }
    None
}
