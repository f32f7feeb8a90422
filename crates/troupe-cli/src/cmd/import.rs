use crate::output::print_json;
use anyhow::{bail, Context};
use std::path::Path;
use troupe_core::detect::{detect, DetectSources, ImportSelection};
use troupe_core::import::{import, plan, DetectSourcesRef, ImportStatus};
use troupe_core::Registry;

pub fn run(
    root: &Path,
    all: bool,
    skills: &[String],
    mcps: &[String],
    json: bool,
) -> anyhow::Result<()> {
    let registry = Registry::open(root).context("failed to open registry")?;
    let settings = registry.settings().context("failed to load settings")?;
    let sources = DetectSources::from_settings(&settings)?;
    let config = detect(&registry, &sources).context("detection failed")?;

    let mut selection = ImportSelection::default();
    if all || (skills.is_empty() && mcps.is_empty()) {
        selection.select_all(&config);
    } else {
        for name in skills {
            let skill = config
                .skills
                .iter()
                .find(|s| s.name == *name)
                .with_context(|| format!("skill not detected: {name}"))?;
            selection.toggle(skill.key());
        }
        for name in mcps {
            // A name can be detected in several scopes; take them all.
            let matches: Vec<_> = config.mcps.iter().filter(|m| m.name == *name).collect();
            if matches.is_empty() {
                bail!("mcp server not detected: {name}");
            }
            for mcp in matches {
                selection.toggle(mcp.key());
            }
        }
    }

    if selection.is_empty() {
        if json {
            return print_json(&troupe_core::import::ImportOutcome::default());
        }
        println!("Nothing to import.");
        return Ok(());
    }

    let items = plan(&config, &selection);
    let outcome = import(&registry, &DetectSourcesRef::from(&sources), &items)
        .context("import failed")?;

    if json {
        print_json(&outcome)?;
    } else {
        for name in &outcome.imported_skills {
            println!("imported skill: {name}");
        }
        for name in &outcome.imported_mcps {
            println!("imported mcp server: {name}");
        }
        for skip in &outcome.skipped {
            println!("skipped: {skip}");
        }
        if let Some(backup) = &outcome.backup_path {
            println!("replaced entries backed up to: {}", backup.display());
        }
        for error in &outcome.errors {
            eprintln!("error: {error}");
        }
        println!(
            "Imported {} item(s), {} skipped, {} failed.",
            outcome.imported(),
            outcome.skipped.len(),
            outcome.errors.len()
        );
    }

    if outcome.status() == ImportStatus::NoneImported && !outcome.errors.is_empty() {
        bail!("no items imported");
    }
    Ok(())
}
