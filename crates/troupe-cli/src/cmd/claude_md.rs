use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use std::path::{Path, PathBuf};
use troupe_core::{trash, Registry};

#[derive(Subcommand)]
pub enum ClaudeMdSubcommand {
    /// List managed CLAUDE.md files
    List,
    /// Add a CLAUDE.md file to the registry (copies the content)
    Add {
        /// Display name for the entry
        name: String,
        /// File to copy
        file: PathBuf,
    },
    /// Print the content of an entry
    Show { id: String },
    /// Move an entry to the trash
    Delete { id: String },
}

pub fn run(root: &Path, subcmd: ClaudeMdSubcommand, json: bool) -> anyhow::Result<()> {
    let registry = Registry::open(root).context("failed to open registry")?;
    match subcmd {
        ClaudeMdSubcommand::List => list(&registry, json),
        ClaudeMdSubcommand::Add { name, file } => add(&registry, &name, &file, json),
        ClaudeMdSubcommand::Show { id } => show(&registry, &id),
        ClaudeMdSubcommand::Delete { id } => delete(&registry, &id, json),
    }
}

fn list(registry: &Registry, json: bool) -> anyhow::Result<()> {
    let data = registry.data().context("failed to load catalogue")?;
    if json {
        return print_json(&data.claude_md_files);
    }
    if data.claude_md_files.is_empty() {
        println!("No CLAUDE.md files in the registry.");
        return Ok(());
    }
    let rows = data
        .claude_md_files
        .iter()
        .map(|c| vec![c.id.clone(), c.name.clone(), c.description.clone()])
        .collect();
    print_table(&["ID", "NAME", "DESCRIPTION"], rows);
    Ok(())
}

fn add(registry: &Registry, name: &str, file: &Path, json: bool) -> anyhow::Result<()> {
    let record = registry
        .add_claude_md(name, file)
        .with_context(|| format!("failed to add {}", file.display()))?;
    if json {
        print_json(&record)?;
    } else {
        println!("Added '{}' with id {}", record.name, record.id);
    }
    Ok(())
}

fn show(registry: &Registry, id: &str) -> anyhow::Result<()> {
    let content = registry
        .claude_md_content(id)
        .with_context(|| format!("claude.md entry not found: {id}"))?;
    print!("{content}");
    Ok(())
}

fn delete(registry: &Registry, id: &str, json: bool) -> anyhow::Result<()> {
    let trashed = trash::soft_delete_claude_md(registry, id)
        .with_context(|| format!("failed to delete claude.md entry '{id}'"))?;
    if json {
        print_json(&serde_json::json!({ "trashed": trashed }))?;
    } else {
        println!("Moved to trash: {}", trashed.display());
    }
    Ok(())
}
