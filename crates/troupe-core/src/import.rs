use crate::detect::{DetectScope, DetectedConfig, ImportSelection};
use crate::error::{Result, TroupeError};
use crate::io;
use crate::paths;
use crate::registry::Registry;
use crate::types::{ArtifactMeta, McpDefinition, RawMcpServer};
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Plan
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub enum ImportItem {
    Skill { name: String, source: PathBuf },
    Mcp { name: String, scope: DetectScope },
}

impl ImportItem {
    pub fn name(&self) -> &str {
        match self {
            ImportItem::Skill { name, .. } | ImportItem::Mcp { name, .. } => name,
        }
    }
}

/// Turn a selection into concrete work items, skills first.
pub fn plan(config: &DetectedConfig, selection: &ImportSelection) -> Vec<ImportItem> {
    let mut items = Vec::new();
    for skill in &config.skills {
        if selection.contains(&skill.key()) {
            items.push(ImportItem::Skill {
                name: skill.name.clone(),
                source: skill.path.clone(),
            });
        }
    }
    for mcp in &config.mcps {
        if selection.contains(&mcp.key()) {
            items.push(ImportItem::Mcp {
                name: mcp.name.clone(),
                scope: mcp.scope.clone(),
            });
        }
    }
    items
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportStatus {
    AllImported,
    Partial,
    NoneImported,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportOutcome {
    pub imported_skills: Vec<String>,
    pub imported_mcps: Vec<String>,
    pub skipped: Vec<String>,
    pub errors: Vec<String>,
    pub backup_path: Option<PathBuf>,
}

impl ImportOutcome {
    pub fn imported(&self) -> usize {
        self.imported_skills.len() + self.imported_mcps.len()
    }

    pub fn status(&self) -> ImportStatus {
        if self.imported() == 0 {
            ImportStatus::NoneImported
        } else if self.errors.is_empty() {
            ImportStatus::AllImported
        } else {
            ImportStatus::Partial
        }
    }
}

/// Manifest written into each backup directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupInfo {
    pub created_at: DateTime<Utc>,
    pub skills: Vec<String>,
    pub mcps: Vec<String>,
}

// ---------------------------------------------------------------------------
// Import
// ---------------------------------------------------------------------------

/// Import the given items into the registry.
///
/// Sources are only ever read. Items fail independently: an error on one
/// appends to `errors` and the batch continues. When any selected skill
/// would replace an existing registry entry, the existing entries are
/// copied into one timestamped backup before anything is mutated.
pub fn import(
    registry: &Registry,
    sources: &DetectSourcesRef<'_>,
    items: &[ImportItem],
) -> Result<ImportOutcome> {
    let mut outcome = ImportOutcome::default();

    let colliding_skills: Vec<String> = items
        .iter()
        .filter_map(|i| match i {
            ImportItem::Skill { name, .. } if registry.has_skill(name) => Some(name.clone()),
            _ => None,
        })
        .collect();
    if !colliding_skills.is_empty() {
        let backup = backup_existing(registry, &colliding_skills)?;
        tracing::info!(path = %backup.display(), "backed up colliding entries");
        outcome.backup_path = Some(backup);
    }

    let mut data = registry.data()?;
    for item in items {
        match item {
            ImportItem::Skill { name, source } => {
                if let Err(e) = paths::validate_artifact_name(name) {
                    outcome
                        .errors
                        .push(format!("failed to import skill '{name}': {e}"));
                    continue;
                }
                let dest = paths::skill_dir(registry.root(), name);
                let replace_existing = dest.exists();
                let result = if replace_existing {
                    // Backed up above; replace wholesale.
                    std::fs::remove_dir_all(&dest)
                        .map_err(TroupeError::from)
                        .and_then(|()| io::copy_dir_recursive(source, &dest))
                } else {
                    io::copy_dir_recursive(source, &dest)
                };
                match result {
                    Ok(()) => {
                        data.skill_meta.entry(name.clone()).or_insert_with(|| {
                            ArtifactMeta::fresh(Some(source.display().to_string()))
                        });
                        outcome.imported_skills.push(name.clone());
                    }
                    Err(e) => {
                        if !replace_existing {
                            let _ = std::fs::remove_dir_all(&dest);
                        }
                        outcome
                            .errors
                            .push(format!("failed to import skill '{name}': {e}"));
                    }
                }
            }
            ImportItem::Mcp { name, scope } => {
                if registry.has_mcp(name) {
                    outcome
                        .skipped
                        .push(format!("mcp server '{name}' already in registry"));
                    continue;
                }
                if let Err(e) = paths::validate_artifact_name(name) {
                    outcome
                        .errors
                        .push(format!("failed to import mcp server '{name}': {e}"));
                    continue;
                }
                match extract_mcp(sources, name, scope) {
                    Ok(def) => {
                        match io::write_json(&paths::mcp_path(registry.root(), name), &def) {
                            Ok(()) => {
                                data.mcp_meta.entry(name.clone()).or_insert_with(|| {
                                    ArtifactMeta::fresh(Some(
                                        sources.claude_json.display().to_string(),
                                    ))
                                });
                                outcome.imported_mcps.push(name.clone());
                            }
                            Err(e) => outcome
                                .errors
                                .push(format!("failed to import mcp server '{name}': {e}")),
                        }
                    }
                    Err(e) => outcome
                        .errors
                        .push(format!("failed to import mcp server '{name}': {e}")),
                }
            }
        }
    }
    registry.save_data(&data)?;
    Ok(outcome)
}

/// The subset of detection sources the import step reads from.
#[derive(Debug, Clone)]
pub struct DetectSourcesRef<'a> {
    pub claude_json: &'a Path,
    pub claude_settings: &'a Path,
    pub plugins_dir: &'a Path,
}

impl<'a> From<&'a crate::detect::DetectSources> for DetectSourcesRef<'a> {
    fn from(s: &'a crate::detect::DetectSources) -> Self {
        Self {
            claude_json: &s.claude_json,
            claude_settings: &s.claude_settings,
            plugins_dir: &s.plugins_dir,
        }
    }
}

fn backup_existing(registry: &Registry, skills: &[String]) -> Result<PathBuf> {
    let stamp = Local::now().format(paths::TRASH_STAMP_FORMAT).to_string();
    let dir = paths::backups_dir(registry.root()).join(stamp);
    io::ensure_dir(&dir)?;
    for name in skills {
        io::copy_dir_recursive(
            &paths::skill_dir(registry.root(), name),
            &dir.join("skills").join(name),
        )?;
    }
    let info = BackupInfo {
        created_at: Utc::now(),
        skills: skills.to_vec(),
        mcps: Vec::new(),
    };
    io::write_json(&dir.join(paths::BACKUP_INFO_FILE), &info)?;
    Ok(dir)
}

/// Pull one MCP server definition out of Claude Code's configuration,
/// matching the scope it was detected in. `settings.json` is only
/// consulted for user scope; plugin servers come from the plugin's
/// cached `.mcp.json`.
fn extract_mcp(sources: &DetectSourcesRef<'_>, name: &str, scope: &DetectScope) -> Result<McpDefinition> {
    if let DetectScope::Plugin(plugin_id) = scope {
        return extract_plugin_mcp(sources, name, plugin_id);
    }
    if sources.claude_json.exists() {
        let text = std::fs::read_to_string(sources.claude_json)?;
        let value: serde_json::Value = serde_json::from_str(&text)?;
        let entry = match scope {
            DetectScope::User => value.get("mcpServers").and_then(|s| s.get(name)),
            DetectScope::Plugin(_) => None,
            DetectScope::Project(path) => value
                .get("projects")
                .and_then(|p| p.as_object())
                .and_then(|projects| {
                    projects
                        .iter()
                        .find(|(k, _)| paths::normalize_project_path(k) == *path)
                        .map(|(_, v)| v)
                })
                .and_then(|p| p.get("mcpServers"))
                .and_then(|s| s.get(name)),
        };
        if let Some(entry) = entry {
            return raw_to_definition(name, serde_json::from_value(entry.clone())?);
        }
    }
    if *scope == DetectScope::User && sources.claude_settings.exists() {
        let text = std::fs::read_to_string(sources.claude_settings)?;
        let value: serde_json::Value = serde_json::from_str(&text)?;
        if let Some(entry) = value.get("mcpServers").and_then(|s| s.get(name)) {
            return raw_to_definition(name, serde_json::from_value(entry.clone())?);
        }
    }
    Err(TroupeError::McpNotFound(name.to_string()))
}

fn extract_plugin_mcp(
    sources: &DetectSourcesRef<'_>,
    name: &str,
    plugin_id: &str,
) -> Result<McpDefinition> {
    let plugin_dir = paths::plugin_cache_dir(sources.plugins_dir, plugin_id);
    if let Some(version_dir) = paths::plugin_version_dir(&plugin_dir) {
        let mcp_file = version_dir.join(paths::PLUGIN_MCP_FILE);
        if mcp_file.is_file() {
            let value: serde_json::Value =
                serde_json::from_str(&std::fs::read_to_string(&mcp_file)?)?;
            let servers = value.get("mcpServers").unwrap_or(&value);
            if let Some(entry) = servers.get(name) {
                return raw_to_definition(name, serde_json::from_value(entry.clone())?);
            }
        }
    }
    Err(TroupeError::McpNotFound(name.to_string()))
}

fn raw_to_definition(name: &str, raw: RawMcpServer) -> Result<McpDefinition> {
    Ok(McpDefinition {
        name: name.to_string(),
        description: None,
        transport: raw.transport(),
        command: raw.command.unwrap_or_default(),
        args: raw.args.unwrap_or_default(),
        env: raw.env.unwrap_or_default(),
        url: raw.url,
    })
}
