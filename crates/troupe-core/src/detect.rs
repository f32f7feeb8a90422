use crate::error::{Result, TroupeError};
use crate::io;
use crate::paths;
use crate::registry::{skill_description, Registry};
use crate::settings::AppSettings;
use crate::types::{McpTransport, RawMcpServer};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Detection identity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectKind {
    Skill,
    Mcp,
}

/// Where an item was found. Two same-name servers in different scopes
/// are distinct detections. `Plugin` carries the `<name>@<marketplace>`
/// plugin id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectScope {
    User,
    Project(String),
    Plugin(String),
}

/// Composite identity of a detected item. Selection state is keyed by
/// this, so it survives re-detection as long as the item reappears with
/// the same kind, name and scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct DetectKey {
    pub kind: DetectKind,
    pub name: String,
    pub scope: DetectScope,
}

// ---------------------------------------------------------------------------
// Detected items
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct DetectedSkill {
    pub name: String,
    /// Symlinks already resolved; this is the real directory.
    pub path: PathBuf,
    pub description: Option<String>,
    /// Set when the skill ships with an installed marketplace plugin.
    pub plugin: Option<String>,
}

impl DetectedSkill {
    pub fn key(&self) -> DetectKey {
        DetectKey {
            kind: DetectKind::Skill,
            name: self.name.clone(),
            scope: match &self.plugin {
                Some(id) => DetectScope::Plugin(id.clone()),
                None => DetectScope::User,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DetectedMcp {
    pub name: String,
    pub scope: DetectScope,
    pub transport: McpTransport,
    pub command: String,
    pub args: Vec<String>,
    pub url: Option<String>,
}

impl DetectedMcp {
    pub fn key(&self) -> DetectKey {
        DetectKey {
            kind: DetectKind::Mcp,
            name: self.name.clone(),
            scope: self.scope.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DetectedConfig {
    pub skills: Vec<DetectedSkill>,
    pub mcps: Vec<DetectedMcp>,
    /// Sources that existed but could not be read or parsed; detection
    /// continued without them.
    pub skipped_sources: Vec<String>,
}

impl DetectedConfig {
    pub fn is_empty(&self) -> bool {
        self.skills.is_empty() && self.mcps.is_empty()
    }

    pub fn keys(&self) -> Vec<DetectKey> {
        self.skills
            .iter()
            .map(DetectedSkill::key)
            .chain(self.mcps.iter().map(DetectedMcp::key))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

/// Concrete filesystem locations scanned by detection.
#[derive(Debug, Clone)]
pub struct DetectSources {
    pub claude_skills_dir: PathBuf,
    pub agents_skills_dir: PathBuf,
    pub claude_json: PathBuf,
    pub claude_settings: PathBuf,
    /// Claude Code's plugin marketplace root, `<config_dir>/plugins`.
    pub plugins_dir: PathBuf,
}

impl DetectSources {
    pub fn from_settings(settings: &AppSettings) -> Result<Self> {
        let home = paths::home_dir()?;
        let config_dir = paths::expand_tilde(&settings.claude_config_dir)?;
        Ok(Self {
            claude_skills_dir: config_dir.join("skills"),
            agents_skills_dir: home.join(".agents").join("skills"),
            claude_json: home.join(".claude.json"),
            claude_settings: config_dir.join("settings.json"),
            plugins_dir: config_dir.join("plugins"),
        })
    }
}

// ---------------------------------------------------------------------------
// Detection
// ---------------------------------------------------------------------------

/// Scan all sources for skills and MCP servers not yet in the registry.
///
/// Results are recomputed from scratch on every call: importing an item
/// or deleting it from the registry changes the next run's output, and
/// nothing is cached in between. A source that exists but cannot be read
/// is recorded in `skipped_sources`; only all existing sources failing is
/// an error.
pub fn detect(registry: &Registry, sources: &DetectSources) -> Result<DetectedConfig> {
    let mut config = DetectedConfig::default();
    let mut existing = 0usize;

    let mut seen_skills = HashSet::new();
    for dir in [&sources.claude_skills_dir, &sources.agents_skills_dir] {
        if !dir.exists() {
            continue;
        }
        existing += 1;
        if let Err(e) = scan_skills_dir(dir, registry, &mut seen_skills, &mut config.skills) {
            tracing::warn!(dir = %dir.display(), error = %e, "skipping unreadable skills dir");
            config.skipped_sources.push(dir.display().to_string());
        }
    }

    let plugins_index = sources.plugins_dir.join(paths::INSTALLED_PLUGINS_FILE);
    if plugins_index.exists() {
        existing += 1;
        if let Err(e) = scan_plugins(sources, registry, &mut seen_skills, &mut config) {
            tracing::warn!(path = %plugins_index.display(), error = %e, "skipping unreadable plugin index");
            config
                .skipped_sources
                .push(plugins_index.display().to_string());
        }
    }

    let mut seen_user_mcps = HashSet::new();
    if sources.claude_json.exists() {
        existing += 1;
        match scan_claude_json(&sources.claude_json, registry, &mut seen_user_mcps) {
            Ok(mut mcps) => config.mcps.append(&mut mcps),
            Err(e) => {
                tracing::warn!(path = %sources.claude_json.display(), error = %e, "skipping unreadable claude.json");
                config
                    .skipped_sources
                    .push(sources.claude_json.display().to_string());
            }
        }
    }

    // Legacy location; a same-name user-scope entry from claude.json wins.
    if sources.claude_settings.exists() {
        existing += 1;
        match scan_settings_json(&sources.claude_settings, registry, &seen_user_mcps) {
            Ok(mut mcps) => config.mcps.append(&mut mcps),
            Err(e) => {
                tracing::warn!(path = %sources.claude_settings.display(), error = %e, "skipping unreadable settings.json");
                config
                    .skipped_sources
                    .push(sources.claude_settings.display().to_string());
            }
        }
    }

    if existing > 0 && config.skipped_sources.len() == existing {
        return Err(TroupeError::NoSourcesReadable(
            config.skipped_sources.join(", "),
        ));
    }
    Ok(config)
}

fn scan_skills_dir(
    dir: &Path,
    registry: &Registry,
    seen: &mut HashSet<String>,
    out: &mut Vec<DetectedSkill>,
) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_string();
        // Broken symlinks and stray files are not skills.
        let resolved = match io::resolve_symlink(&entry.path()) {
            Ok(p) => p,
            Err(_) => continue,
        };
        if !resolved.is_dir() || !resolved.join(paths::SKILL_MANIFEST).is_file() {
            continue;
        }
        if seen.contains(&name) || registry.has_skill(&name) {
            continue;
        }
        seen.insert(name.clone());
        out.push(DetectedSkill {
            description: skill_description(&resolved),
            name,
            path: resolved,
            plugin: None,
        });
    }
    Ok(())
}

#[derive(Deserialize)]
struct InstalledPlugins {
    #[serde(default)]
    plugins: HashMap<String, serde_json::Value>,
}

/// The `enabledPlugins` map from Claude Code's settings.json. A missing
/// or unparsable file means no plugin is switched on.
fn enabled_plugins(settings_path: &Path) -> HashMap<String, bool> {
    #[derive(Deserialize)]
    struct Settings {
        #[serde(default, rename = "enabledPlugins")]
        enabled_plugins: HashMap<String, bool>,
    }
    let Ok(text) = std::fs::read_to_string(settings_path) else {
        return HashMap::new();
    };
    serde_json::from_str::<Settings>(&text)
        .map(|s| s.enabled_plugins)
        .unwrap_or_default()
}

/// Skills and MCP servers shipped by installed marketplace plugins.
///
/// The index at `plugins/installed_plugins.json` names the plugins; only
/// those switched on in `enabledPlugins` contribute. Each plugin's active
/// version lives under `plugins/cache/<marketplace>/<name>/` with an
/// optional `skills/` directory and `.mcp.json`.
fn scan_plugins(
    sources: &DetectSources,
    registry: &Registry,
    seen_skills: &mut HashSet<String>,
    config: &mut DetectedConfig,
) -> Result<()> {
    let index = sources.plugins_dir.join(paths::INSTALLED_PLUGINS_FILE);
    let text = std::fs::read_to_string(&index)?;
    let installed: InstalledPlugins = serde_json::from_str(&text)?;
    let enabled = enabled_plugins(&sources.claude_settings);

    let mut ids: Vec<&String> = installed.plugins.keys().collect();
    ids.sort();
    for id in ids {
        if !enabled.get(id).copied().unwrap_or(false) {
            continue;
        }
        let plugin_dir = paths::plugin_cache_dir(&sources.plugins_dir, id);
        let Some(version_dir) = paths::plugin_version_dir(&plugin_dir) else {
            tracing::debug!(plugin = %id, "enabled plugin has no cached version");
            continue;
        };

        let skills_dir = version_dir.join(paths::SKILLS_DIR);
        if skills_dir.is_dir() {
            for entry in std::fs::read_dir(&skills_dir)? {
                let entry = entry?;
                let name = entry.file_name().to_string_lossy().to_string();
                let path = entry.path();
                if !path.is_dir() || !path.join(paths::SKILL_MANIFEST).is_file() {
                    continue;
                }
                if seen_skills.contains(&name) || registry.has_skill(&name) {
                    continue;
                }
                seen_skills.insert(name.clone());
                config.skills.push(DetectedSkill {
                    description: skill_description(&path),
                    name,
                    path,
                    plugin: Some(id.clone()),
                });
            }
        }

        let mcp_file = version_dir.join(paths::PLUGIN_MCP_FILE);
        if mcp_file.is_file() {
            let value: serde_json::Value =
                serde_json::from_str(&std::fs::read_to_string(&mcp_file)?)?;
            // Plugins write either an `mcpServers` wrapper or a flat map.
            let servers = value.get("mcpServers").unwrap_or(&value);
            collect_servers(
                servers,
                registry,
                DetectScope::Plugin(id.clone()),
                &mut config.mcps,
            );
        }
    }
    Ok(())
}

fn collect_servers(
    value: &serde_json::Value,
    registry: &Registry,
    scope: DetectScope,
    out: &mut Vec<DetectedMcp>,
) {
    let Some(servers) = value.as_object() else {
        return;
    };
    for (name, entry) in servers {
        if registry.has_mcp(name) {
            continue;
        }
        let raw: RawMcpServer = match serde_json::from_value(entry.clone()) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::debug!(name, error = %e, "ignoring malformed mcp entry");
                continue;
            }
        };
        out.push(DetectedMcp {
            name: name.clone(),
            scope: scope.clone(),
            transport: raw.transport(),
            command: raw.command.unwrap_or_default(),
            args: raw.args.unwrap_or_default(),
            url: raw.url,
        });
    }
}

fn scan_claude_json(
    path: &Path,
    registry: &Registry,
    seen_user: &mut HashSet<String>,
) -> Result<Vec<DetectedMcp>> {
    let text = std::fs::read_to_string(path)?;
    let value: serde_json::Value = serde_json::from_str(&text)?;
    let mut out = Vec::new();

    if let Some(servers) = value.get("mcpServers") {
        collect_servers(servers, registry, DetectScope::User, &mut out);
    }
    seen_user.extend(out.iter().map(|m| m.name.clone()));

    if let Some(projects) = value.get("projects").and_then(|p| p.as_object()) {
        for (project_path, project) in projects {
            if let Some(servers) = project.get("mcpServers") {
                collect_servers(
                    servers,
                    registry,
                    DetectScope::Project(paths::normalize_project_path(project_path)),
                    &mut out,
                );
            }
        }
    }
    Ok(out)
}

fn scan_settings_json(
    path: &Path,
    registry: &Registry,
    seen_user: &HashSet<String>,
) -> Result<Vec<DetectedMcp>> {
    let text = std::fs::read_to_string(path)?;
    let value: serde_json::Value = serde_json::from_str(&text)?;
    let mut out = Vec::new();
    if let Some(servers) = value.get("mcpServers") {
        collect_servers(servers, registry, DetectScope::User, &mut out);
    }
    out.retain(|m| !seen_user.contains(&m.name));
    Ok(out)
}

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

/// The set of detected items chosen for import, keyed by [`DetectKey`].
#[derive(Debug, Clone, Default)]
pub struct ImportSelection {
    keys: HashSet<DetectKey>,
}

impl ImportSelection {
    /// Flip one item. Returns whether it is selected afterwards; toggling
    /// twice restores the original state.
    pub fn toggle(&mut self, key: DetectKey) -> bool {
        if self.keys.remove(&key) {
            false
        } else {
            self.keys.insert(key);
            true
        }
    }

    /// Select everything currently detected (already-imported items never
    /// appear in `config`, so they cannot be selected).
    pub fn select_all(&mut self, config: &DetectedConfig) {
        self.keys.extend(config.keys());
    }

    pub fn clear(&mut self) {
        self.keys.clear();
    }

    /// Drop keys that no longer match any detected item.
    pub fn retain_detected(&mut self, config: &DetectedConfig) {
        let current: HashSet<DetectKey> = config.keys().into_iter().collect();
        self.keys.retain(|k| current.contains(k));
    }

    pub fn contains(&self, key: &DetectKey) -> bool {
        self.keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Group detected MCPs by name for display: user scope first, then
/// project scopes in path order, then plugin scopes.
pub fn mcps_by_name(config: &DetectedConfig) -> HashMap<String, Vec<&DetectedMcp>> {
    let mut grouped: HashMap<String, Vec<&DetectedMcp>> = HashMap::new();
    for mcp in &config.mcps {
        grouped.entry(mcp.name.clone()).or_default().push(mcp);
    }
    for entries in grouped.values_mut() {
        entries.sort_by_key(|m| match &m.scope {
            DetectScope::User => (0, String::new()),
            DetectScope::Project(p) => (1, p.clone()),
            DetectScope::Plugin(p) => (2, p.clone()),
        });
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        registry: Registry,
        sources: DetectSources,
        home: PathBuf,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let home = dir.path().join("home");
        let registry = Registry::open(dir.path().join("registry")).unwrap();
        let sources = DetectSources {
            claude_skills_dir: home.join(".claude/skills"),
            agents_skills_dir: home.join(".agents/skills"),
            claude_json: home.join(".claude.json"),
            claude_settings: home.join(".claude/settings.json"),
            plugins_dir: home.join(".claude/plugins"),
        };
        Fixture {
            _dir: dir,
            registry,
            sources,
            home,
        }
    }

    fn add_source_skill(dir: &Path, name: &str) {
        let skill = dir.join(name);
        std::fs::create_dir_all(&skill).unwrap();
        std::fs::write(skill.join("SKILL.md"), format!("# {name}\n\ndesc\n")).unwrap();
    }

    /// Register a plugin in the installed index and enabledPlugins map,
    /// returning its cache version directory.
    fn install_plugin(f: &Fixture, id: &str, enabled: bool) -> PathBuf {
        let version_dir = paths::plugin_cache_dir(&f.sources.plugins_dir, id).join("1.0.0");
        std::fs::create_dir_all(&version_dir).unwrap();

        let index = f.sources.plugins_dir.join(paths::INSTALLED_PLUGINS_FILE);
        let mut installed: serde_json::Value = std::fs::read_to_string(&index)
            .ok()
            .and_then(|t| serde_json::from_str(&t).ok())
            .unwrap_or_else(|| serde_json::json!({ "version": 1, "plugins": {} }));
        installed["plugins"][id] = serde_json::json!([{ "scope": "user", "version": "1.0.0" }]);
        std::fs::write(&index, installed.to_string()).unwrap();

        let settings = &f.sources.claude_settings;
        std::fs::create_dir_all(settings.parent().unwrap()).unwrap();
        let mut value: serde_json::Value = std::fs::read_to_string(settings)
            .ok()
            .and_then(|t| serde_json::from_str(&t).ok())
            .unwrap_or_else(|| serde_json::json!({}));
        value["enabledPlugins"][id] = serde_json::json!(enabled);
        std::fs::write(settings, value.to_string()).unwrap();
        version_dir
    }

    #[test]
    fn no_sources_yields_empty_config() {
        let f = fixture();
        let config = detect(&f.registry, &f.sources).unwrap();
        assert!(config.is_empty());
        assert!(config.skipped_sources.is_empty());
    }

    #[test]
    fn detects_skills_and_user_mcps() {
        let f = fixture();
        add_source_skill(&f.sources.claude_skills_dir, "pdf-tools");
        std::fs::write(
            &f.sources.claude_json,
            r#"{"mcpServers":{"github":{"command":"npx","args":["-y","server-github"]}}}"#,
        )
        .unwrap();

        let config = detect(&f.registry, &f.sources).unwrap();
        assert_eq!(config.skills.len(), 1);
        assert_eq!(config.skills[0].name, "pdf-tools");
        assert_eq!(config.skills[0].description.as_deref(), Some("desc"));
        assert_eq!(config.mcps.len(), 1);
        assert_eq!(config.mcps[0].scope, DetectScope::User);
    }

    #[test]
    fn project_scope_entries_are_distinct() {
        let f = fixture();
        std::fs::create_dir_all(f.sources.claude_json.parent().unwrap()).unwrap();
        std::fs::write(
            &f.sources.claude_json,
            r#"{
                "mcpServers": {"github": {"command": "npx"}},
                "projects": {
                    "/work/app/": {"mcpServers": {"github": {"command": "npx"}}}
                }
            }"#,
        )
        .unwrap();

        let config = detect(&f.registry, &f.sources).unwrap();
        assert_eq!(config.mcps.len(), 2);
        let keys: HashSet<DetectKey> = config.keys().into_iter().collect();
        assert_eq!(keys.len(), 2);
        assert!(keys.contains(&DetectKey {
            kind: DetectKind::Mcp,
            name: "github".into(),
            scope: DetectScope::Project("/work/app".into()),
        }));
    }

    #[cfg(unix)]
    #[test]
    fn follows_skill_symlinks() {
        let f = fixture();
        let real = f.home.join("real-skills/linked");
        std::fs::create_dir_all(&real).unwrap();
        std::fs::write(real.join("SKILL.md"), "# linked\n\nvia symlink\n").unwrap();
        std::fs::create_dir_all(&f.sources.claude_skills_dir).unwrap();
        std::os::unix::fs::symlink(&real, f.sources.claude_skills_dir.join("linked")).unwrap();

        let config = detect(&f.registry, &f.sources).unwrap();
        assert_eq!(config.skills.len(), 1);
        assert_eq!(config.skills[0].path, real.canonicalize().unwrap());
    }

    #[test]
    fn agents_dir_deduped_against_claude_dir() {
        let f = fixture();
        add_source_skill(&f.sources.claude_skills_dir, "shared");
        add_source_skill(&f.sources.agents_skills_dir, "shared");
        add_source_skill(&f.sources.agents_skills_dir, "only-agents");

        let config = detect(&f.registry, &f.sources).unwrap();
        let names: Vec<&str> = config.skills.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["shared", "only-agents"]);
    }

    #[test]
    fn registry_entries_are_excluded_every_run() {
        let f = fixture();
        add_source_skill(&f.sources.claude_skills_dir, "pdf-tools");
        assert_eq!(detect(&f.registry, &f.sources).unwrap().skills.len(), 1);

        // Simulate an import, then re-run: dedup reflects the new state.
        let dest = paths::skill_dir(f.registry.root(), "pdf-tools");
        std::fs::create_dir_all(&dest).unwrap();
        assert_eq!(detect(&f.registry, &f.sources).unwrap().skills.len(), 0);

        std::fs::remove_dir_all(&dest).unwrap();
        assert_eq!(detect(&f.registry, &f.sources).unwrap().skills.len(), 1);
    }

    #[test]
    fn settings_json_fallback_skips_user_duplicates() {
        let f = fixture();
        std::fs::create_dir_all(f.sources.claude_settings.parent().unwrap()).unwrap();
        std::fs::write(
            &f.sources.claude_json,
            r#"{"mcpServers":{"github":{"command":"npx"}}}"#,
        )
        .unwrap();
        std::fs::write(
            &f.sources.claude_settings,
            r#"{"mcpServers":{"github":{"command":"old"},"legacy":{"command":"legacy-cmd"}}}"#,
        )
        .unwrap();

        let config = detect(&f.registry, &f.sources).unwrap();
        let names: Vec<&str> = config.mcps.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["github", "legacy"]);
        assert_eq!(config.mcps[0].command, "npx");
    }

    #[test]
    fn one_bad_source_is_skipped_not_fatal() {
        let f = fixture();
        add_source_skill(&f.sources.claude_skills_dir, "good");
        std::fs::write(&f.sources.claude_json, "{ definitely not json").unwrap();

        let config = detect(&f.registry, &f.sources).unwrap();
        assert_eq!(config.skills.len(), 1);
        assert_eq!(config.skipped_sources.len(), 1);
    }

    #[test]
    fn all_sources_unreadable_is_an_error() {
        let f = fixture();
        std::fs::create_dir_all(f.sources.claude_json.parent().unwrap()).unwrap();
        std::fs::write(&f.sources.claude_json, "{ bad").unwrap();

        let err = detect(&f.registry, &f.sources).unwrap_err();
        assert!(matches!(err, TroupeError::NoSourcesReadable(_)));
    }

    #[test]
    fn enabled_plugin_contributes_skills_and_mcps() {
        let f = fixture();
        let version_dir = install_plugin(&f, "pdf-pack@community", true);
        add_source_skill(&version_dir.join("skills"), "pdf-extract");
        std::fs::write(
            version_dir.join(".mcp.json"),
            r#"{"mcpServers":{"pdf-api":{"command":"pdf-srv"}}}"#,
        )
        .unwrap();

        let config = detect(&f.registry, &f.sources).unwrap();
        assert_eq!(config.skills.len(), 1);
        assert_eq!(config.skills[0].name, "pdf-extract");
        assert_eq!(config.skills[0].plugin.as_deref(), Some("pdf-pack@community"));
        assert_eq!(
            config.skills[0].key().scope,
            DetectScope::Plugin("pdf-pack@community".into())
        );
        assert_eq!(config.mcps.len(), 1);
        assert_eq!(
            config.mcps[0].scope,
            DetectScope::Plugin("pdf-pack@community".into())
        );
    }

    #[test]
    fn disabled_plugin_is_ignored() {
        let f = fixture();
        let version_dir = install_plugin(&f, "pdf-pack@community", false);
        add_source_skill(&version_dir.join("skills"), "pdf-extract");
        std::fs::write(
            version_dir.join(".mcp.json"),
            r#"{"mcpServers":{"pdf-api":{"command":"pdf-srv"}}}"#,
        )
        .unwrap();

        let config = detect(&f.registry, &f.sources).unwrap();
        assert!(config.is_empty());
    }

    #[test]
    fn plugin_skills_dedupe_against_user_skills() {
        let f = fixture();
        add_source_skill(&f.sources.claude_skills_dir, "shared");
        let version_dir = install_plugin(&f, "tools@market", true);
        add_source_skill(&version_dir.join("skills"), "shared");

        let config = detect(&f.registry, &f.sources).unwrap();
        assert_eq!(config.skills.len(), 1);
        assert!(config.skills[0].plugin.is_none());
    }

    #[test]
    fn flat_plugin_mcp_json_is_accepted() {
        let f = fixture();
        let version_dir = install_plugin(&f, "tools@market", true);
        std::fs::write(
            version_dir.join(".mcp.json"),
            r#"{"scraper":{"command":"scrape"}}"#,
        )
        .unwrap();

        let config = detect(&f.registry, &f.sources).unwrap();
        assert_eq!(config.mcps.len(), 1);
        assert_eq!(config.mcps[0].name, "scraper");
        assert_eq!(config.mcps[0].command, "scrape");
    }

    #[test]
    fn malformed_plugin_index_is_skipped_not_fatal() {
        let f = fixture();
        add_source_skill(&f.sources.claude_skills_dir, "good");
        std::fs::create_dir_all(&f.sources.plugins_dir).unwrap();
        std::fs::write(
            f.sources.plugins_dir.join(paths::INSTALLED_PLUGINS_FILE),
            "{ not json",
        )
        .unwrap();

        let config = detect(&f.registry, &f.sources).unwrap();
        assert_eq!(config.skills.len(), 1);
        assert_eq!(config.skipped_sources.len(), 1);
    }

    #[test]
    fn toggle_is_idempotent_pairwise() {
        let key = DetectKey {
            kind: DetectKind::Skill,
            name: "pdf".into(),
            scope: DetectScope::User,
        };
        let mut sel = ImportSelection::default();
        assert!(sel.toggle(key.clone()));
        assert!(!sel.toggle(key.clone()));
        assert!(sel.is_empty());
    }

    #[test]
    fn selection_survives_redetection() {
        let f = fixture();
        add_source_skill(&f.sources.claude_skills_dir, "keep");
        add_source_skill(&f.sources.claude_skills_dir, "gone");

        let first = detect(&f.registry, &f.sources).unwrap();
        let mut sel = ImportSelection::default();
        sel.select_all(&first);
        assert_eq!(sel.len(), 2);

        std::fs::remove_dir_all(f.sources.claude_skills_dir.join("gone")).unwrap();
        let second = detect(&f.registry, &f.sources).unwrap();
        sel.retain_detected(&second);
        assert_eq!(sel.len(), 1);
        assert!(sel.contains(&DetectKey {
            kind: DetectKind::Skill,
            name: "keep".into(),
            scope: DetectScope::User,
        }));
    }
}
