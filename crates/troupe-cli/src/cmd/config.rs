use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use std::path::Path;
use troupe_core::Registry;

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Show all settings
    Show,
    /// Change a setting
    Set { key: String, value: String },
}

pub fn run(root: &Path, subcmd: ConfigSubcommand, json: bool) -> anyhow::Result<()> {
    let registry = Registry::open(root).context("failed to open registry")?;
    match subcmd {
        ConfigSubcommand::Show => show(&registry, json),
        ConfigSubcommand::Set { key, value } => set(&registry, &key, &value, json),
    }
}

fn show(registry: &Registry, json: bool) -> anyhow::Result<()> {
    let settings = registry.settings().context("failed to load settings")?;
    if json {
        return print_json(&settings);
    }
    let rows = settings
        .pairs()
        .into_iter()
        .map(|(key, value)| vec![key.to_string(), value])
        .collect();
    print_table(&["KEY", "VALUE"], rows);
    Ok(())
}

fn set(registry: &Registry, key: &str, value: &str, json: bool) -> anyhow::Result<()> {
    let mut settings = registry.settings().context("failed to load settings")?;
    settings.set(key, value)?;
    registry
        .save_settings(&settings)
        .context("failed to save settings")?;
    if json {
        print_json(&settings)?;
    } else {
        println!("{key} = {value}");
    }
    Ok(())
}
