use crate::cmd::scene::resolve_scene_id;
use crate::output::{fmt_time, print_json, print_table, yes_no};
use anyhow::Context;
use clap::Subcommand;
use std::path::Path;
use troupe_core::{sync, Registry};

#[derive(Subcommand)]
pub enum ProjectSubcommand {
    /// List projects
    List,
    /// Bind a folder to a scene (creates the project if needed)
    Bind {
        /// Folder path
        path: String,
        /// Scene, by id or name
        scene: String,
    },
    /// Write the bound scene's artifacts into the project folder
    Sync {
        /// Project, by id or path
        project: String,
    },
    /// Remove synced artifacts from the folder and unbind it
    Clear {
        /// Project, by id or path
        project: String,
    },
    /// Inspect what a folder currently has on disk
    Status {
        /// Folder path
        path: String,
    },
}

pub fn run(root: &Path, subcmd: ProjectSubcommand, json: bool) -> anyhow::Result<()> {
    let registry = Registry::open(root).context("failed to open registry")?;
    match subcmd {
        ProjectSubcommand::List => list(&registry, json),
        ProjectSubcommand::Bind { path, scene } => bind(&registry, &path, &scene, json),
        ProjectSubcommand::Sync { project } => sync_cmd(&registry, &project, json),
        ProjectSubcommand::Clear { project } => clear(&registry, &project, json),
        ProjectSubcommand::Status { path } => status(&registry, &path, json),
    }
}

fn list(registry: &Registry, json: bool) -> anyhow::Result<()> {
    let data = registry.data().context("failed to load catalogue")?;
    if json {
        return print_json(&data.projects);
    }
    if data.projects.is_empty() {
        println!("No projects. Bind one with 'troupe project bind <path> <scene>'.");
        return Ok(());
    }
    let rows = data
        .projects
        .iter()
        .map(|p| {
            let scene_name = p
                .scene_id
                .as_deref()
                .map(|id| {
                    data.find_scene(id)
                        .map(|s| s.name.clone())
                        .unwrap_or_else(|| format!("{id} (dangling)"))
                })
                .unwrap_or_else(|| "-".to_string());
            vec![
                p.name.clone(),
                p.path.clone(),
                scene_name,
                fmt_time(p.last_synced),
            ]
        })
        .collect();
    print_table(&["NAME", "PATH", "SCENE", "LAST SYNCED"], rows);
    Ok(())
}

fn bind(registry: &Registry, path: &str, scene: &str, json: bool) -> anyhow::Result<()> {
    let data = registry.data().context("failed to load catalogue")?;
    let scene_id = resolve_scene_id(&data, scene)?;
    let project = sync::bind(registry, path, &scene_id)
        .with_context(|| format!("failed to bind {path}"))?;
    if json {
        print_json(&project)?;
    } else {
        println!("Bound {} to scene {}", project.path, scene);
    }
    Ok(())
}

fn sync_cmd(registry: &Registry, project: &str, json: bool) -> anyhow::Result<()> {
    let report = sync::sync(registry, project)
        .with_context(|| format!("failed to sync {project}"))?;
    if json {
        print_json(&report)?;
    } else {
        println!(
            "Synced: {} skill(s) linked, {} mcp server(s), {} claude.md section(s)",
            report.skills_linked, report.mcps_written, report.claude_md_written
        );
        if report.dangling > 0 {
            println!("warning: {} scene entr(ies) no longer exist", report.dangling);
        }
    }
    Ok(())
}

fn clear(registry: &Registry, project: &str, json: bool) -> anyhow::Result<()> {
    sync::clear(registry, project).with_context(|| format!("failed to clear {project}"))?;
    if json {
        print_json(&serde_json::json!({ "cleared": project }))?;
    } else {
        println!("Cleared synced artifacts and unbound {project}");
    }
    Ok(())
}

fn status(registry: &Registry, path: &str, json: bool) -> anyhow::Result<()> {
    let status = sync::config_status(registry, path)
        .with_context(|| format!("failed to inspect {path}"))?;
    if json {
        return print_json(&status);
    }
    println!(".claude directory: {}", yes_no(status.has_claude_dir));
    println!("skill links:       {}", status.skill_links);
    println!("mcp servers:       {}", status.mcp_servers);
    println!("claude.md:         {}", yes_no(status.has_claude_md));
    Ok(())
}
