use crate::cmd::scene::resolve_scene_id;
use crate::output::{print_json, print_table};
use anyhow::{bail, Context};
use claude_launcher::{open_accessibility_settings, LaunchOutcome, Orchestrator, TerminalLauncher};
use std::path::Path;
use troupe_core::{sync, Registry};

pub fn run(
    root: &Path,
    path: &str,
    scene: Option<&str>,
    open_settings: bool,
    json: bool,
) -> anyhow::Result<()> {
    let registry = Registry::open(root).context("failed to open registry")?;
    let launcher = TerminalLauncher;
    let orchestrator = Orchestrator::new(&registry, &launcher);

    let mut outcome = orchestrator
        .launch(path)
        .with_context(|| format!("failed to launch {path}"))?;

    // An unconfigured folder plus an explicit scene is a bind-and-retry.
    if let (LaunchOutcome::NeedsSetup { folder }, Some(scene_ident)) = (&outcome, scene) {
        let data = registry.data().context("failed to load catalogue")?;
        let scene_id = resolve_scene_id(&data, scene_ident)?;
        sync::bind(&registry, folder, &scene_id)
            .with_context(|| format!("failed to bind {folder}"))?;
        outcome = orchestrator
            .launch(path)
            .with_context(|| format!("failed to launch {path}"))?;
    }

    match &outcome {
        LaunchOutcome::Launched { project_id } => {
            if json {
                print_json(&serde_json::json!({
                    "status": "launched",
                    "project_id": project_id,
                }))?;
            } else {
                println!("Launched claude in {path}");
            }
            Ok(())
        }
        LaunchOutcome::NeedsSetup { folder } => {
            if json {
                print_json(&serde_json::json!({
                    "status": "needs_setup",
                    "folder": folder,
                }))?;
                return Ok(());
            }
            println!("{folder} has no working scene bound.");
            let data = registry.data().context("failed to load catalogue")?;
            if data.scenes.is_empty() {
                println!("No scenes exist yet; create one with 'troupe scene create <name>'.");
            } else {
                let rows = data
                    .scenes
                    .iter()
                    .map(|s| vec![s.name.clone(), s.description.clone()])
                    .collect();
                print_table(&["SCENE", "DESCRIPTION"], rows);
                println!("Pick one with: troupe launch {folder} --scene <scene>");
            }
            Ok(())
        }
        LaunchOutcome::PermissionRecovery { folder } => {
            if json {
                print_json(&serde_json::json!({
                    "status": "permission_denied",
                    "folder": folder,
                }))?;
            } else {
                println!(
                    "Terminal automation was denied. Grant access under \
                     System Settings > Privacy & Security > Accessibility, then retry."
                );
            }
            if open_settings {
                open_accessibility_settings().context("failed to open system settings")?;
            }
            bail!("launch blocked by an automation permission denial")
        }
    }
}
