use crate::error::{Result, TroupeError};
use crate::io;
use crate::paths;
use crate::registry::Registry;
use crate::types::{AppData, McpServer, McpTransport, Project};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use std::path::Path;

/// Find a project by id or by (normalized) path.
pub fn find_project<'a>(data: &'a AppData, ident: &str) -> Option<&'a Project> {
    data.find_project(ident)
        .or_else(|| data.find_project_by_path(&paths::normalize_project_path(ident)))
}

// ---------------------------------------------------------------------------
// Bind
// ---------------------------------------------------------------------------

/// Bind a directory to a scene, creating the project row if needed.
///
/// Re-binding the same scene is a no-op that leaves `last_synced` alone.
/// Binding a different scene replaces the association and clears
/// `last_synced` until the next sync.
pub fn bind(registry: &Registry, path: &str, scene_id: &str) -> Result<Project> {
    let mut data = registry.data()?;
    if data.find_scene(scene_id).is_none() {
        return Err(TroupeError::SceneNotFound(scene_id.to_string()));
    }
    let normalized = paths::normalize_project_path(path);

    if let Some(project) = data.projects.iter_mut().find(|p| p.path == normalized) {
        if project.scene_id.as_deref() == Some(scene_id) {
            return Ok(project.clone());
        }
        project.scene_id = Some(scene_id.to_string());
        project.last_synced = None;
        let updated = project.clone();
        registry.save_data(&data)?;
        return Ok(updated);
    }

    let name = Path::new(&normalized)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| normalized.clone());
    let project = Project {
        id: uuid::Uuid::new_v4().to_string(),
        name,
        path: normalized,
        scene_id: Some(scene_id.to_string()),
        last_synced: None,
    };
    data.projects.push(project.clone());
    registry.save_data(&data)?;
    Ok(project)
}

// ---------------------------------------------------------------------------
// Sync
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub skills_linked: usize,
    pub mcps_written: usize,
    pub claude_md_written: usize,
    /// Scene ids that resolved to nothing and were skipped.
    pub dangling: usize,
    pub synced_at: DateTime<Utc>,
}

/// Materialize a project's bound scene into its directory: skill
/// symlinks under `.claude/skills/`, `.mcp.json`, and the CLAUDE.md
/// distribution target. Dangling ids are skipped and counted, never an
/// error. Re-running with an unchanged scene reproduces the same
/// configuration.
pub fn sync(registry: &Registry, project_ident: &str) -> Result<SyncReport> {
    let mut data = registry.data()?;
    let project = find_project(&data, project_ident)
        .ok_or_else(|| TroupeError::ProjectNotFound(project_ident.to_string()))?
        .clone();
    let scene_id = project
        .scene_id
        .clone()
        .ok_or_else(|| TroupeError::ProjectUnconfigured(project.path.clone()))?;
    let scene = data
        .find_scene(&scene_id)
        .ok_or_else(|| TroupeError::SceneNotFound(scene_id.clone()))?
        .clone();
    let settings = registry.settings()?;
    let project_dir = Path::new(&project.path);

    let now = Utc::now();
    let mut report = SyncReport {
        skills_linked: 0,
        mcps_written: 0,
        claude_md_written: 0,
        dangling: 0,
        synced_at: now,
    };

    // Skills: replace the managed symlinks wholesale so removals from the
    // scene disappear from the project.
    let link_dir = project_dir.join(paths::PROJECT_SKILLS_DIR);
    io::ensure_dir(&link_dir)?;
    io::remove_symlinks_in(&link_dir)?;
    let skills = registry.skills()?;
    for id in &scene.skill_ids {
        match skills.iter().find(|s| s.id == *id) {
            Some(skill) => {
                io::symlink_dir(&skill.path, &link_dir.join(&skill.name))?;
                report.skills_linked += 1;
            }
            None => {
                tracing::warn!(scene = %scene.name, skill_id = %id, "skipping dangling skill id");
                report.dangling += 1;
            }
        }
    }

    // MCP servers.
    let mcps = registry.mcps()?;
    let mut resolved: Vec<&McpServer> = Vec::new();
    for id in &scene.mcp_ids {
        match mcps.iter().find(|m| m.id == *id) {
            Some(mcp) => resolved.push(mcp),
            None => {
                tracing::warn!(scene = %scene.name, mcp_id = %id, "skipping dangling mcp id");
                report.dangling += 1;
            }
        }
    }
    write_mcp_config(project_dir, &resolved)?;
    report.mcps_written = resolved.len();

    // CLAUDE.md: concatenate every resolvable entry into the target file.
    let mut sections = Vec::new();
    for id in &scene.claude_md_ids {
        if data.find_claude_md(id).is_some() {
            sections.push(registry.claude_md_content(id)?);
            report.claude_md_written += 1;
        } else {
            tracing::warn!(scene = %scene.name, claude_md_id = %id, "skipping dangling claude.md id");
            report.dangling += 1;
        }
    }
    // No resolvable sections deletes the distributed file, same as the
    // empty `.mcp.json` case.
    let target = project_dir.join(&settings.claude_md_target);
    if sections.is_empty() {
        if target.exists() {
            std::fs::remove_file(&target)?;
        }
    } else {
        io::atomic_write(&target, sections.join("\n\n").as_bytes())?;
    }

    if let Some(project) = data.find_project_mut(&project.id) {
        project.last_synced = Some(now);
    }
    registry.save_data(&data)?;
    tracing::info!(project = %project.path, scene = %scene.name, "synced project configuration");
    Ok(report)
}

/// Write `.mcp.json` in the format Claude Code reads. An empty server
/// list deletes the file rather than leaving an empty stub behind.
fn write_mcp_config(project_dir: &Path, servers: &[&McpServer]) -> Result<()> {
    let path = project_dir.join(paths::PROJECT_MCP_FILE);
    if servers.is_empty() {
        if path.exists() {
            std::fs::remove_file(&path)?;
        }
        return Ok(());
    }
    let mut entries = serde_json::Map::new();
    for server in servers {
        let entry = match server.transport {
            McpTransport::Http => json!({
                "type": "http",
                "url": server.url.clone().unwrap_or_default(),
            }),
            McpTransport::Stdio => {
                let mut entry = json!({
                    "command": server.command,
                    "args": server.args,
                });
                if !server.env.is_empty() {
                    entry["env"] = json!(server.env);
                }
                entry
            }
        };
        entries.insert(server.name.clone(), entry);
    }
    io::write_json(&path, &json!({ "mcpServers": entries }))
}

// ---------------------------------------------------------------------------
// Clear
// ---------------------------------------------------------------------------

/// Remove everything troupe manages in the project directory and unbind
/// its scene.
pub fn clear(registry: &Registry, project_ident: &str) -> Result<()> {
    let mut data = registry.data()?;
    let project = find_project(&data, project_ident)
        .ok_or_else(|| TroupeError::ProjectNotFound(project_ident.to_string()))?
        .clone();
    let settings = registry.settings()?;
    let project_dir = Path::new(&project.path);

    let link_dir = project_dir.join(paths::PROJECT_SKILLS_DIR);
    io::remove_symlinks_in(&link_dir)?;
    if link_dir.is_dir() && std::fs::read_dir(&link_dir)?.next().is_none() {
        std::fs::remove_dir(&link_dir)?;
    }
    let mcp_file = project_dir.join(paths::PROJECT_MCP_FILE);
    if mcp_file.exists() {
        std::fs::remove_file(&mcp_file)?;
    }
    let claude_md = project_dir.join(&settings.claude_md_target);
    if claude_md.exists() {
        std::fs::remove_file(&claude_md)?;
    }

    if let Some(project) = data.find_project_mut(&project.id) {
        project.scene_id = None;
        project.last_synced = None;
    }
    registry.save_data(&data)?;
    tracing::info!(project = %project.path, "cleared project configuration");
    Ok(())
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct ProjectConfigStatus {
    pub has_claude_dir: bool,
    pub skill_links: usize,
    pub mcp_servers: usize,
    pub has_claude_md: bool,
}

/// Inspect what troupe currently manages inside a project directory.
pub fn config_status(registry: &Registry, project_path: &str) -> Result<ProjectConfigStatus> {
    let settings = registry.settings()?;
    let project_dir = Path::new(&paths::normalize_project_path(project_path)).to_path_buf();

    let link_dir = project_dir.join(paths::PROJECT_SKILLS_DIR);
    let mut skill_links = 0;
    if link_dir.is_dir() {
        for entry in std::fs::read_dir(&link_dir)? {
            let entry = entry?;
            if entry.path().symlink_metadata()?.file_type().is_symlink() {
                skill_links += 1;
            }
        }
    }

    let mcp_file = project_dir.join(paths::PROJECT_MCP_FILE);
    let mut mcp_servers = 0;
    if mcp_file.is_file() {
        let value: Option<serde_json::Value> = io::read_json(&mcp_file)?;
        mcp_servers = value
            .as_ref()
            .and_then(|v| v.get("mcpServers"))
            .and_then(|s| s.as_object())
            .map(|s| s.len())
            .unwrap_or(0);
    }

    Ok(ProjectConfigStatus {
        has_claude_dir: project_dir.join(paths::PROJECT_CLAUDE_DIR).is_dir(),
        skill_links,
        mcp_servers,
        has_claude_md: project_dir.join(&settings.claude_md_target).is_file(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ArtifactMeta, Scene};
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        registry: Registry,
        project_dir: std::path::PathBuf,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let registry = Registry::open(dir.path().join("registry")).unwrap();
        let project_dir = dir.path().join("project");
        std::fs::create_dir_all(&project_dir).unwrap();
        Fixture {
            _dir: dir,
            registry,
            project_dir,
        }
    }

    fn add_scene(reg: &Registry, id: &str, skill_ids: &[&str], mcp_ids: &[&str]) {
        let mut data = reg.data().unwrap();
        data.scenes.push(Scene {
            id: id.into(),
            name: format!("scene-{id}"),
            description: String::new(),
            icon: None,
            skill_ids: skill_ids.iter().map(|s| s.to_string()).collect(),
            mcp_ids: mcp_ids.iter().map(|s| s.to_string()).collect(),
            claude_md_ids: Vec::new(),
            created_at: Some(Utc::now()),
            last_used: None,
        });
        reg.save_data(&data).unwrap();
    }

    fn add_skill(reg: &Registry, name: &str, meta_id: &str) {
        let dir = paths::skill_dir(reg.root(), name);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("SKILL.md"), format!("# {name}\n")).unwrap();
        let mut data = reg.data().unwrap();
        let mut meta = ArtifactMeta::fresh(None);
        meta.id = meta_id.into();
        data.skill_meta.insert(name.into(), meta);
        reg.save_data(&data).unwrap();
    }

    fn add_mcp(reg: &Registry, name: &str, meta_id: &str) {
        let def = crate::types::McpDefinition {
            name: name.into(),
            description: None,
            transport: McpTransport::Stdio,
            command: "npx".into(),
            args: vec!["-y".into(), format!("server-{name}")],
            env: Default::default(),
            url: None,
        };
        reg.add_mcp(&def, None).unwrap();
        let mut data = reg.data().unwrap();
        data.mcp_meta.get_mut(name).unwrap().id = meta_id.into();
        reg.save_data(&data).unwrap();
    }

    #[test]
    fn bind_creates_project_with_normalized_path() {
        let f = fixture();
        add_scene(&f.registry, "sc1", &[], &[]);
        let path = format!("{}/", f.project_dir.display());
        let project = bind(&f.registry, &path, "sc1").unwrap();
        assert_eq!(project.path, f.project_dir.display().to_string());
        assert_eq!(project.name, "project");
        assert_eq!(project.scene_id.as_deref(), Some("sc1"));
        assert!(project.last_synced.is_none());
    }

    #[test]
    fn bind_same_scene_is_noop() {
        let f = fixture();
        add_scene(&f.registry, "sc1", &[], &[]);
        let path = f.project_dir.display().to_string();
        let first = bind(&f.registry, &path, "sc1").unwrap();

        // Pretend a sync happened.
        let mut data = f.registry.data().unwrap();
        data.find_project_mut(&first.id).unwrap().last_synced = Some(Utc::now());
        f.registry.save_data(&data).unwrap();

        let again = bind(&f.registry, &format!("{path}/"), "sc1").unwrap();
        assert_eq!(again.id, first.id);
        assert!(again.last_synced.is_some());
        assert_eq!(f.registry.data().unwrap().projects.len(), 1);
    }

    #[test]
    fn bind_different_scene_clears_last_synced() {
        let f = fixture();
        add_scene(&f.registry, "sc1", &[], &[]);
        add_scene(&f.registry, "sc2", &[], &[]);
        let path = f.project_dir.display().to_string();
        let first = bind(&f.registry, &path, "sc1").unwrap();

        let mut data = f.registry.data().unwrap();
        data.find_project_mut(&first.id).unwrap().last_synced = Some(Utc::now());
        f.registry.save_data(&data).unwrap();

        let rebound = bind(&f.registry, &path, "sc2").unwrap();
        assert_eq!(rebound.id, first.id);
        assert_eq!(rebound.scene_id.as_deref(), Some("sc2"));
        assert!(rebound.last_synced.is_none());
    }

    #[test]
    fn bind_unknown_scene_fails() {
        let f = fixture();
        let err = bind(&f.registry, "/tmp/x", "nope").unwrap_err();
        assert!(matches!(err, TroupeError::SceneNotFound(_)));
    }

    #[cfg(unix)]
    #[test]
    fn sync_materializes_scene() {
        let f = fixture();
        add_skill(&f.registry, "pdf", "skill-1");
        add_mcp(&f.registry, "github", "mcp-1");
        add_scene(&f.registry, "sc1", &["skill-1", "ghost"], &["mcp-1"]);
        let path = f.project_dir.display().to_string();
        let project = bind(&f.registry, &path, "sc1").unwrap();

        let report = sync(&f.registry, &project.id).unwrap();
        assert_eq!(report.skills_linked, 1);
        assert_eq!(report.mcps_written, 1);
        assert_eq!(report.dangling, 1);

        let link = f.project_dir.join(".claude/skills/pdf");
        assert!(link.symlink_metadata().unwrap().file_type().is_symlink());
        let mcp_json = std::fs::read_to_string(f.project_dir.join(".mcp.json")).unwrap();
        assert!(mcp_json.contains("\"github\""));
        assert!(mcp_json.contains("\"command\": \"npx\""));

        let data = f.registry.data().unwrap();
        assert!(data.find_project(&project.id).unwrap().last_synced.is_some());
    }

    #[cfg(unix)]
    #[test]
    fn resync_removes_dropped_artifacts() {
        let f = fixture();
        add_skill(&f.registry, "pdf", "skill-1");
        add_skill(&f.registry, "web", "skill-2");
        add_mcp(&f.registry, "github", "mcp-1");
        add_scene(&f.registry, "sc1", &["skill-1", "skill-2"], &["mcp-1"]);
        let path = f.project_dir.display().to_string();
        let project = bind(&f.registry, &path, "sc1").unwrap();
        sync(&f.registry, &project.id).unwrap();

        let mut data = f.registry.data().unwrap();
        let scene = data.find_scene_mut("sc1").unwrap();
        scene.skill_ids = vec!["skill-1".into()];
        scene.mcp_ids = Vec::new();
        f.registry.save_data(&data).unwrap();

        let report = sync(&f.registry, &project.id).unwrap();
        assert_eq!(report.skills_linked, 1);
        assert!(f.project_dir.join(".claude/skills/pdf").exists());
        assert!(!f.project_dir.join(".claude/skills/web").exists());
        assert!(!f.project_dir.join(".mcp.json").exists());
    }

    #[test]
    fn sync_unconfigured_project_fails() {
        let f = fixture();
        add_scene(&f.registry, "sc1", &[], &[]);
        let path = f.project_dir.display().to_string();
        let project = bind(&f.registry, &path, "sc1").unwrap();
        let mut data = f.registry.data().unwrap();
        data.find_project_mut(&project.id).unwrap().scene_id = None;
        f.registry.save_data(&data).unwrap();

        let err = sync(&f.registry, &project.id).unwrap_err();
        assert!(matches!(err, TroupeError::ProjectUnconfigured(_)));
    }

    #[test]
    fn sync_unknown_project_fails() {
        let f = fixture();
        let err = sync(&f.registry, "no-such").unwrap_err();
        assert!(matches!(err, TroupeError::ProjectNotFound(_)));
    }

    #[cfg(unix)]
    #[test]
    fn sync_writes_claude_md_sections() {
        let f = fixture();
        let src = f.project_dir.join("seed.md");
        std::fs::write(&src, "Use tabs.\n").unwrap();
        let record = f.registry.add_claude_md("style", &src).unwrap();

        add_scene(&f.registry, "sc1", &[], &[]);
        let mut data = f.registry.data().unwrap();
        data.find_scene_mut("sc1").unwrap().claude_md_ids = vec![record.id.clone()];
        f.registry.save_data(&data).unwrap();

        let path = f.project_dir.display().to_string();
        let project = bind(&f.registry, &path, "sc1").unwrap();
        let report = sync(&f.registry, &project.id).unwrap();
        assert_eq!(report.claude_md_written, 1);
        assert_eq!(
            std::fs::read_to_string(f.project_dir.join(".claude/CLAUDE.md")).unwrap(),
            "Use tabs.\n"
        );
    }

    #[cfg(unix)]
    #[test]
    fn resync_removes_claude_md_when_scene_drops_it() {
        let f = fixture();
        let src = f.project_dir.join("seed.md");
        std::fs::write(&src, "Use tabs.\n").unwrap();
        let record = f.registry.add_claude_md("style", &src).unwrap();

        add_scene(&f.registry, "sc1", &[], &[]);
        let mut data = f.registry.data().unwrap();
        data.find_scene_mut("sc1").unwrap().claude_md_ids = vec![record.id.clone()];
        f.registry.save_data(&data).unwrap();

        let path = f.project_dir.display().to_string();
        let project = bind(&f.registry, &path, "sc1").unwrap();
        sync(&f.registry, &project.id).unwrap();
        assert!(f.project_dir.join(".claude/CLAUDE.md").is_file());

        let mut data = f.registry.data().unwrap();
        data.find_scene_mut("sc1").unwrap().claude_md_ids = Vec::new();
        f.registry.save_data(&data).unwrap();

        let report = sync(&f.registry, &project.id).unwrap();
        assert_eq!(report.claude_md_written, 0);
        assert!(!f.project_dir.join(".claude/CLAUDE.md").exists());
    }

    #[cfg(unix)]
    #[test]
    fn clear_removes_managed_files_and_unbinds() {
        let f = fixture();
        add_skill(&f.registry, "pdf", "skill-1");
        add_mcp(&f.registry, "github", "mcp-1");
        add_scene(&f.registry, "sc1", &["skill-1"], &["mcp-1"]);
        let path = f.project_dir.display().to_string();
        let project = bind(&f.registry, &path, "sc1").unwrap();
        sync(&f.registry, &project.id).unwrap();

        clear(&f.registry, &project.id).unwrap();
        assert!(!f.project_dir.join(".claude/skills").exists());
        assert!(!f.project_dir.join(".mcp.json").exists());
        let data = f.registry.data().unwrap();
        let project = data.find_project(&project.id).unwrap();
        assert!(project.scene_id.is_none());
        assert!(project.last_synced.is_none());
    }

    #[cfg(unix)]
    #[test]
    fn config_status_counts_managed_entries() {
        let f = fixture();
        add_skill(&f.registry, "pdf", "skill-1");
        add_mcp(&f.registry, "github", "mcp-1");
        add_scene(&f.registry, "sc1", &["skill-1"], &["mcp-1"]);
        let path = f.project_dir.display().to_string();
        bind(&f.registry, &path, "sc1").unwrap();
        sync(&f.registry, &path).unwrap();

        let status = config_status(&f.registry, &path).unwrap();
        assert!(status.has_claude_dir);
        assert_eq!(status.skill_links, 1);
        assert_eq!(status.mcp_servers, 1);
        assert!(!status.has_claude_md);
    }
}
