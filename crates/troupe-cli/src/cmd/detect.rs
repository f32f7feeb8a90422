use crate::output::{print_json, print_table, scope_label};
use anyhow::Context;
use std::path::Path;
use troupe_core::detect::{detect, DetectSources};
use troupe_core::Registry;

pub fn run(root: &Path, json: bool) -> anyhow::Result<()> {
    let registry = Registry::open(root).context("failed to open registry")?;
    let settings = registry.settings().context("failed to load settings")?;
    let sources = DetectSources::from_settings(&settings)?;
    let config = detect(&registry, &sources).context("detection failed")?;

    if json {
        return print_json(&config);
    }

    if config.is_empty() {
        println!("Nothing new detected.");
    }

    if !config.skills.is_empty() {
        println!("SKILLS");
        let rows = config
            .skills
            .iter()
            .map(|s| {
                vec![
                    s.name.clone(),
                    s.description.clone().unwrap_or_default(),
                    s.path.display().to_string(),
                ]
            })
            .collect();
        print_table(&["NAME", "DESCRIPTION", "SOURCE"], rows);
        println!();
    }

    if !config.mcps.is_empty() {
        println!("MCP SERVERS");
        let rows = config
            .mcps
            .iter()
            .map(|m| {
                let target = match m.url.as_deref() {
                    Some(url) => url.to_string(),
                    None => m.command.clone(),
                };
                vec![m.name.clone(), scope_label(&m.scope), target]
            })
            .collect();
        print_table(&["NAME", "SCOPE", "COMMAND/URL"], rows);
        println!();
    }

    for source in &config.skipped_sources {
        println!("warning: skipped unreadable source: {source}");
    }
    Ok(())
}
