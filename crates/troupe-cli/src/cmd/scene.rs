use crate::output::{fmt_time, print_json, print_table};
use anyhow::{bail, Context};
use chrono::Utc;
use clap::Subcommand;
use std::path::Path;
use troupe_core::types::{AppData, Scene};
use troupe_core::Registry;

#[derive(Subcommand)]
pub enum SceneSubcommand {
    /// List scenes
    List,
    /// Create a scene
    Create {
        name: String,

        #[arg(long, default_value = "")]
        description: String,

        #[arg(long)]
        icon: Option<String>,

        /// Skill to include, by id or name (repeatable)
        #[arg(long = "skill")]
        skills: Vec<String>,

        /// MCP server to include, by id or name (repeatable)
        #[arg(long = "mcp")]
        mcps: Vec<String>,

        /// CLAUDE.md entry to include, by id or name (repeatable)
        #[arg(long = "claude-md")]
        claude_mds: Vec<String>,
    },
    /// Show a scene and what its ids resolve to
    Show { scene: String },
    /// Add or remove artifacts on a scene
    Edit {
        scene: String,

        #[arg(long = "add-skill")]
        add_skills: Vec<String>,

        #[arg(long = "remove-skill")]
        remove_skills: Vec<String>,

        #[arg(long = "add-mcp")]
        add_mcps: Vec<String>,

        #[arg(long = "remove-mcp")]
        remove_mcps: Vec<String>,

        #[arg(long = "add-claude-md")]
        add_claude_mds: Vec<String>,

        #[arg(long = "remove-claude-md")]
        remove_claude_mds: Vec<String>,
    },
    /// Delete a scene (projects bound to it become unconfigured on next use)
    Delete { scene: String },
}

pub fn run(root: &Path, subcmd: SceneSubcommand, json: bool) -> anyhow::Result<()> {
    let registry = Registry::open(root).context("failed to open registry")?;
    match subcmd {
        SceneSubcommand::List => list(&registry, json),
        SceneSubcommand::Create {
            name,
            description,
            icon,
            skills,
            mcps,
            claude_mds,
        } => create(&registry, name, description, icon, &skills, &mcps, &claude_mds, json),
        SceneSubcommand::Show { scene } => show(&registry, &scene, json),
        SceneSubcommand::Edit {
            scene,
            add_skills,
            remove_skills,
            add_mcps,
            remove_mcps,
            add_claude_mds,
            remove_claude_mds,
        } => edit(
            &registry,
            &scene,
            &add_skills,
            &remove_skills,
            &add_mcps,
            &remove_mcps,
            &add_claude_mds,
            &remove_claude_mds,
            json,
        ),
        SceneSubcommand::Delete { scene } => delete(&registry, &scene, json),
    }
}

/// Scenes are addressed by id or name in the CLI.
pub fn resolve_scene_id(data: &AppData, ident: &str) -> anyhow::Result<String> {
    data.scenes
        .iter()
        .find(|s| s.id == ident || s.name == ident)
        .map(|s| s.id.clone())
        .with_context(|| format!("scene not found: {ident}"))
}

fn resolve_skill_id(registry: &Registry, ident: &str) -> anyhow::Result<String> {
    let skills = registry.skills()?;
    skills
        .iter()
        .find(|s| s.id == ident || s.name == ident)
        .map(|s| s.id.clone())
        .with_context(|| format!("skill not found: {ident}"))
}

fn resolve_mcp_id(registry: &Registry, ident: &str) -> anyhow::Result<String> {
    let mcps = registry.mcps()?;
    mcps.iter()
        .find(|m| m.id == ident || m.name == ident)
        .map(|m| m.id.clone())
        .with_context(|| format!("mcp server not found: {ident}"))
}

fn resolve_claude_md_id(data: &AppData, ident: &str) -> anyhow::Result<String> {
    data.claude_md_files
        .iter()
        .find(|c| c.id == ident || c.name == ident)
        .map(|c| c.id.clone())
        .with_context(|| format!("claude.md entry not found: {ident}"))
}

fn list(registry: &Registry, json: bool) -> anyhow::Result<()> {
    let data = registry.data().context("failed to load catalogue")?;
    if json {
        return print_json(&data.scenes);
    }
    if data.scenes.is_empty() {
        println!("No scenes. Create one with 'troupe scene create <name>'.");
        return Ok(());
    }
    let rows = data
        .scenes
        .iter()
        .map(|s| {
            vec![
                s.id.clone(),
                s.name.clone(),
                s.skill_ids.len().to_string(),
                s.mcp_ids.len().to_string(),
                s.claude_md_ids.len().to_string(),
                fmt_time(s.last_used),
            ]
        })
        .collect();
    print_table(
        &["ID", "NAME", "SKILLS", "MCPS", "CLAUDE.MD", "LAST USED"],
        rows,
    );
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn create(
    registry: &Registry,
    name: String,
    description: String,
    icon: Option<String>,
    skills: &[String],
    mcps: &[String],
    claude_mds: &[String],
    json: bool,
) -> anyhow::Result<()> {
    let mut data = registry.data().context("failed to load catalogue")?;
    if data.scenes.iter().any(|s| s.name == name) {
        bail!("a scene named '{name}' already exists");
    }

    let skill_ids = skills
        .iter()
        .map(|s| resolve_skill_id(registry, s))
        .collect::<anyhow::Result<Vec<_>>>()?;
    let mcp_ids = mcps
        .iter()
        .map(|m| resolve_mcp_id(registry, m))
        .collect::<anyhow::Result<Vec<_>>>()?;
    let claude_md_ids = claude_mds
        .iter()
        .map(|c| resolve_claude_md_id(&data, c))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let scene = Scene {
        id: uuid::Uuid::new_v4().to_string(),
        name,
        description,
        icon,
        skill_ids,
        mcp_ids,
        claude_md_ids,
        created_at: Some(Utc::now()),
        last_used: None,
    };
    data.scenes.push(scene.clone());
    registry.save_data(&data).context("failed to save catalogue")?;

    if json {
        print_json(&scene)?;
    } else {
        println!("Created scene '{}' ({})", scene.name, scene.id);
    }
    Ok(())
}

fn show(registry: &Registry, ident: &str, json: bool) -> anyhow::Result<()> {
    let data = registry.data().context("failed to load catalogue")?;
    let scene = data
        .scenes
        .iter()
        .find(|s| s.id == ident || s.name == ident)
        .with_context(|| format!("scene not found: {ident}"))?;
    if json {
        return print_json(scene);
    }

    let skills = registry.skills()?;
    let mcps = registry.mcps()?;
    println!("Scene: {} ({})", scene.name, scene.id);
    if !scene.description.is_empty() {
        println!("  {}", scene.description);
    }
    println!("Skills:");
    for sid in &scene.skill_ids {
        match skills.iter().find(|s| s.id == *sid) {
            Some(s) => println!("  {}", s.name),
            None => println!("  {sid} (dangling)"),
        }
    }
    println!("MCP servers:");
    for mid in &scene.mcp_ids {
        match mcps.iter().find(|m| m.id == *mid) {
            Some(m) => println!("  {}", m.name),
            None => println!("  {mid} (dangling)"),
        }
    }
    println!("CLAUDE.md:");
    for cid in &scene.claude_md_ids {
        match data.find_claude_md(cid) {
            Some(c) => println!("  {}", c.name),
            None => println!("  {cid} (dangling)"),
        }
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn edit(
    registry: &Registry,
    ident: &str,
    add_skills: &[String],
    remove_skills: &[String],
    add_mcps: &[String],
    remove_mcps: &[String],
    add_claude_mds: &[String],
    remove_claude_mds: &[String],
    json: bool,
) -> anyhow::Result<()> {
    let mut data = registry.data().context("failed to load catalogue")?;
    let id = resolve_scene_id(&data, ident)?;

    let added_skills = add_skills
        .iter()
        .map(|s| resolve_skill_id(registry, s))
        .collect::<anyhow::Result<Vec<_>>>()?;
    let removed_skills = remove_skills
        .iter()
        .map(|s| resolve_skill_id(registry, s))
        .collect::<anyhow::Result<Vec<_>>>()?;
    let added_mcps = add_mcps
        .iter()
        .map(|m| resolve_mcp_id(registry, m))
        .collect::<anyhow::Result<Vec<_>>>()?;
    let removed_mcps = remove_mcps
        .iter()
        .map(|m| resolve_mcp_id(registry, m))
        .collect::<anyhow::Result<Vec<_>>>()?;
    let added_claude_mds = add_claude_mds
        .iter()
        .map(|c| resolve_claude_md_id(&data, c))
        .collect::<anyhow::Result<Vec<_>>>()?;
    let removed_claude_mds = remove_claude_mds
        .iter()
        .map(|c| resolve_claude_md_id(&data, c))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let scene = data
        .find_scene_mut(&id)
        .with_context(|| format!("scene not found: {id}"))?;
    for sid in added_skills {
        if !scene.skill_ids.contains(&sid) {
            scene.skill_ids.push(sid);
        }
    }
    scene.skill_ids.retain(|s| !removed_skills.contains(s));
    for mid in added_mcps {
        if !scene.mcp_ids.contains(&mid) {
            scene.mcp_ids.push(mid);
        }
    }
    scene.mcp_ids.retain(|m| !removed_mcps.contains(m));
    for cid in added_claude_mds {
        if !scene.claude_md_ids.contains(&cid) {
            scene.claude_md_ids.push(cid);
        }
    }
    scene
        .claude_md_ids
        .retain(|c| !removed_claude_mds.contains(c));

    let updated = scene.clone();
    registry.save_data(&data).context("failed to save catalogue")?;
    if json {
        print_json(&updated)?;
    } else {
        println!("Updated scene '{}'", updated.name);
    }
    Ok(())
}

fn delete(registry: &Registry, ident: &str, json: bool) -> anyhow::Result<()> {
    let mut data = registry.data().context("failed to load catalogue")?;
    let id = resolve_scene_id(&data, ident)?;
    data.scenes.retain(|s| s.id != id);
    registry.save_data(&data).context("failed to save catalogue")?;
    if json {
        print_json(&serde_json::json!({ "deleted": id }))?;
    } else {
        println!("Deleted scene {id}");
    }
    Ok(())
}
