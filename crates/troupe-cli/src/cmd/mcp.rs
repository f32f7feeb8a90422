use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use std::path::Path;
use troupe_core::types::McpTransport;
use troupe_core::{trash, Registry};

#[derive(Subcommand)]
pub enum McpSubcommand {
    /// List MCP servers in the registry
    List,
    /// Show one MCP server definition
    Show { name: String },
    /// Move an MCP server to the trash
    Delete { name: String },
}

pub fn run(root: &Path, subcmd: McpSubcommand, json: bool) -> anyhow::Result<()> {
    let registry = Registry::open(root).context("failed to open registry")?;
    match subcmd {
        McpSubcommand::List => list(&registry, json),
        McpSubcommand::Show { name } => show(&registry, &name, json),
        McpSubcommand::Delete { name } => delete(&registry, &name, json),
    }
}

fn transport_label(transport: McpTransport) -> &'static str {
    match transport {
        McpTransport::Stdio => "stdio",
        McpTransport::Http => "http",
    }
}

fn list(registry: &Registry, json: bool) -> anyhow::Result<()> {
    let servers = registry.mcps().context("failed to list mcp servers")?;
    if json {
        return print_json(&servers);
    }
    if servers.is_empty() {
        println!("No MCP servers in the registry. Try 'troupe detect'.");
        return Ok(());
    }
    let rows = servers
        .iter()
        .map(|m| {
            let target = match m.transport {
                McpTransport::Http => m.url.clone().unwrap_or_default(),
                McpTransport::Stdio => m.command.clone(),
            };
            vec![
                m.name.clone(),
                transport_label(m.transport).to_string(),
                target,
            ]
        })
        .collect();
    print_table(&["NAME", "TRANSPORT", "COMMAND/URL"], rows);
    Ok(())
}

fn show(registry: &Registry, name: &str, json: bool) -> anyhow::Result<()> {
    let def = registry
        .mcp_definition(name)
        .with_context(|| format!("mcp server not found: {name}"))?;
    if json {
        return print_json(&def);
    }
    println!("Name:      {}", def.name);
    println!("Transport: {}", transport_label(def.transport));
    match def.transport {
        McpTransport::Http => println!("Url:       {}", def.url.unwrap_or_default()),
        McpTransport::Stdio => {
            println!("Command:   {}", def.command);
            if !def.args.is_empty() {
                println!("Args:      {}", def.args.join(" "));
            }
            if !def.env.is_empty() {
                let mut keys: Vec<&str> = def.env.keys().map(String::as_str).collect();
                keys.sort_unstable();
                println!("Env:       {}", keys.join(", "));
            }
        }
    }
    Ok(())
}

fn delete(registry: &Registry, name: &str, json: bool) -> anyhow::Result<()> {
    let trashed = trash::soft_delete_mcp(registry, name)
        .with_context(|| format!("failed to delete mcp server '{name}'"))?;
    if json {
        print_json(&serde_json::json!({ "trashed": trashed }))?;
    } else {
        println!("Moved to trash: {}", trashed.display());
    }
    Ok(())
}
