use crate::output::{fmt_stamp, print_json, print_table};
use anyhow::{bail, Context};
use clap::Subcommand;
use std::path::{Path, PathBuf};
use troupe_core::trash::{self, TrashedArtifact};
use troupe_core::Registry;

#[derive(Subcommand)]
pub enum TrashSubcommand {
    /// List soft-deleted items, newest first
    List,
    /// Restore trashed items back into the registry
    Restore {
        /// Trash path of a skill to restore (repeatable)
        #[arg(long = "skill")]
        skills: Vec<PathBuf>,

        /// Trash path of an MCP server to restore (repeatable)
        #[arg(long = "mcp")]
        mcps: Vec<PathBuf>,

        /// Trash path of a CLAUDE.md entry to restore (repeatable)
        #[arg(long = "claude-md")]
        claude_mds: Vec<PathBuf>,
    },
}

pub fn run(root: &Path, subcmd: TrashSubcommand, json: bool) -> anyhow::Result<()> {
    let registry = Registry::open(root).context("failed to open registry")?;
    match subcmd {
        TrashSubcommand::List => list(&registry, json),
        TrashSubcommand::Restore {
            skills,
            mcps,
            claude_mds,
        } => restore(&registry, &skills, &mcps, &claude_mds, json),
    }
}

fn list(registry: &Registry, json: bool) -> anyhow::Result<()> {
    let items = trash::list(registry).context("failed to read trash")?;
    if json {
        return print_json(&items);
    }
    if items.is_empty() {
        println!("Trash is empty.");
        return Ok(());
    }
    section("SKILLS", &items.skills);
    section("MCP SERVERS", &items.mcps);
    section("CLAUDE.MD", &items.claude_md);
    Ok(())
}

fn section(title: &str, artifacts: &[TrashedArtifact]) {
    if artifacts.is_empty() {
        return;
    }
    println!("{title}");
    let rows = artifacts
        .iter()
        .map(|a| {
            vec![
                a.name.clone(),
                fmt_stamp(a.deleted_at),
                a.path.display().to_string(),
            ]
        })
        .collect();
    print_table(&["NAME", "DELETED", "PATH"], rows);
}

fn restore(
    registry: &Registry,
    skills: &[PathBuf],
    mcps: &[PathBuf],
    claude_mds: &[PathBuf],
    json: bool,
) -> anyhow::Result<()> {
    if skills.is_empty() && mcps.is_empty() && claude_mds.is_empty() {
        bail!("nothing to restore: pass --skill, --mcp or --claude-md");
    }

    // Each item restores independently; one failure never rolls back the
    // ones that already succeeded.
    let mut restored: Vec<String> = Vec::new();
    let mut failed: Vec<String> = Vec::new();
    let mut attempt = |result: troupe_core::Result<String>, path: &Path| match result {
        Ok(name) => restored.push(name),
        Err(e) => failed.push(format!("{}: {e}", path.display())),
    };

    for path in skills {
        attempt(trash::restore_skill(registry, path), path);
    }
    for path in mcps {
        attempt(trash::restore_mcp(registry, path), path);
    }
    for path in claude_mds {
        attempt(trash::restore_claude_md(registry, path), path);
    }

    if json {
        print_json(&serde_json::json!({
            "restored": restored,
            "failed": failed,
        }))?;
    } else {
        for name in &restored {
            println!("restored: {name}");
        }
        for failure in &failed {
            eprintln!("error: {failure}");
        }
        println!("Restored {} item(s), {} failed.", restored.len(), failed.len());
    }

    if !failed.is_empty() {
        bail!("{} item(s) could not be restored", failed.len());
    }
    Ok(())
}
