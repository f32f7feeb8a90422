use crate::output::{fmt_time, print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use std::path::Path;
use troupe_core::{trash, Registry};

#[derive(Subcommand)]
pub enum SkillSubcommand {
    /// List skills in the registry
    List,
    /// Show one skill
    Show { name: String },
    /// Move a skill to the trash
    Delete { name: String },
}

pub fn run(root: &Path, subcmd: SkillSubcommand, json: bool) -> anyhow::Result<()> {
    let registry = Registry::open(root).context("failed to open registry")?;
    match subcmd {
        SkillSubcommand::List => list(&registry, json),
        SkillSubcommand::Show { name } => show(&registry, &name, json),
        SkillSubcommand::Delete { name } => delete(&registry, &name, json),
    }
}

fn list(registry: &Registry, json: bool) -> anyhow::Result<()> {
    let skills = registry.skills().context("failed to list skills")?;
    if json {
        return print_json(&skills);
    }
    if skills.is_empty() {
        println!("No skills in the registry. Try 'troupe detect'.");
        return Ok(());
    }
    let rows = skills
        .iter()
        .map(|s| {
            vec![
                s.name.clone(),
                s.description.clone(),
                if s.enabled { "yes" } else { "no" }.to_string(),
                fmt_time(s.last_used),
            ]
        })
        .collect();
    print_table(&["NAME", "DESCRIPTION", "ENABLED", "LAST USED"], rows);
    Ok(())
}

fn show(registry: &Registry, name: &str, json: bool) -> anyhow::Result<()> {
    let skills = registry.skills().context("failed to list skills")?;
    let skill = skills
        .iter()
        .find(|s| s.name == name)
        .with_context(|| format!("skill not found: {name}"))?;
    if json {
        return print_json(skill);
    }
    println!("Name:        {}", skill.name);
    println!("Id:          {}", skill.id);
    println!("Description: {}", skill.description);
    println!("Path:        {}", skill.path.display());
    if let Some(source) = &skill.source_path {
        println!("Imported:    {}", source);
    }
    println!("Enabled:     {}", skill.enabled);
    Ok(())
}

fn delete(registry: &Registry, name: &str, json: bool) -> anyhow::Result<()> {
    let trashed = trash::soft_delete_skill(registry, name)
        .with_context(|| format!("failed to delete skill '{name}'"))?;
    if json {
        print_json(&serde_json::json!({ "trashed": trashed }))?;
    } else {
        println!("Moved to trash: {}", trashed.display());
    }
    Ok(())
}
