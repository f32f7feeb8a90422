use crate::error::{Result, TroupeError};
use crate::io;
use crate::paths;
use crate::registry::{skill_description, Registry};
use crate::types::{ArtifactMeta, ClaudeMdFile};
use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize)]
pub struct TrashedArtifact {
    /// Original name (stamp stripped).
    pub name: String,
    /// Location inside the trash; the handle restores take.
    pub path: PathBuf,
    pub deleted_at: DateTime<Utc>,
    pub description: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TrashedItems {
    pub skills: Vec<TrashedArtifact>,
    pub mcps: Vec<TrashedArtifact>,
    pub claude_md: Vec<TrashedArtifact>,
}

impl TrashedItems {
    pub fn is_empty(&self) -> bool {
        self.skills.is_empty() && self.mcps.is_empty() && self.claude_md.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Soft delete
// ---------------------------------------------------------------------------

/// Sidecar next to a trash entry holding the catalogue row that was
/// removed from `data.json`, so restore can put it back intact.
fn meta_sidecar(trash_path: &Path, stem: &str) -> PathBuf {
    trash_path.with_file_name(format!("{stem}.meta.json"))
}

/// Move a skill directory into the trash. The entry disappears from
/// registry queries immediately; scene references go dangling, which
/// sync tolerates. Its metadata row is stashed in a sidecar so a later
/// restore keeps the id, tags and category.
pub fn soft_delete_skill(registry: &Registry, name: &str) -> Result<PathBuf> {
    let src = paths::skill_dir(registry.root(), name);
    if !src.is_dir() {
        return Err(TroupeError::SkillNotFound(name.to_string()));
    }
    let stamped = paths::trash_name(name, Local::now());
    let dest = paths::trash_skills_dir(registry.root()).join(&stamped);
    std::fs::rename(&src, &dest)?;

    let mut data = registry.data()?;
    if let Some(meta) = data.skill_meta.remove(name) {
        io::write_json(&meta_sidecar(&dest, &stamped), &meta)?;
    }
    registry.save_data(&data)?;
    tracing::info!(skill = name, "moved skill to trash");
    Ok(dest)
}

pub fn soft_delete_mcp(registry: &Registry, name: &str) -> Result<PathBuf> {
    let src = paths::mcp_path(registry.root(), name);
    if !src.is_file() {
        return Err(TroupeError::McpNotFound(name.to_string()));
    }
    let stamped = paths::trash_name(name, Local::now());
    let dest = paths::trash_mcps_dir(registry.root()).join(format!("{stamped}.json"));
    std::fs::rename(&src, &dest)?;

    let mut data = registry.data()?;
    if let Some(meta) = data.mcp_meta.remove(name) {
        io::write_json(&meta_sidecar(&dest, &stamped), &meta)?;
    }
    registry.save_data(&data)?;
    tracing::info!(mcp = name, "moved mcp server to trash");
    Ok(dest)
}

/// Move a CLAUDE.md entry directory into the trash and drop its
/// catalogue row. The `info.json` sidecar travels with the directory so
/// restore can rebuild the row.
pub fn soft_delete_claude_md(registry: &Registry, id: &str) -> Result<PathBuf> {
    let src = paths::claude_md_entry_dir(registry.root(), id);
    let mut data = registry.data()?;
    let Some(pos) = data.claude_md_files.iter().position(|c| c.id == id) else {
        return Err(TroupeError::ClaudeMdNotFound(id.to_string()));
    };
    if !src.is_dir() {
        return Err(TroupeError::ClaudeMdNotFound(id.to_string()));
    }
    let dest =
        paths::trash_claude_md_dir(registry.root()).join(paths::trash_name(id, Local::now()));
    std::fs::rename(&src, &dest)?;

    data.claude_md_files.remove(pos);
    registry.save_data(&data)?;
    tracing::info!(claude_md = id, "moved claude.md entry to trash");
    Ok(dest)
}

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

fn deleted_at_for(path: &Path, stem: &str) -> (String, DateTime<Utc>) {
    if let Some((name, at)) = paths::split_trash_name(stem) {
        return (name, at);
    }
    // Unstamped entries (manual drops) fall back to file mtime.
    let mtime = std::fs::metadata(path)
        .and_then(|m| m.modified())
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|_| Utc::now());
    (stem.to_string(), mtime)
}

/// Everything currently in the trash, newest first.
pub fn list(registry: &Registry) -> Result<TrashedItems> {
    let mut items = TrashedItems::default();

    for entry in std::fs::read_dir(paths::trash_skills_dir(registry.root()))? {
        let path = entry?.path();
        if !path.is_dir() {
            continue;
        }
        let stem = path.file_name().unwrap_or_default().to_string_lossy().to_string();
        let (name, deleted_at) = deleted_at_for(&path, &stem);
        items.skills.push(TrashedArtifact {
            description: skill_description(&path).unwrap_or_default(),
            name,
            path,
            deleted_at,
        });
    }

    for entry in std::fs::read_dir(paths::trash_mcps_dir(registry.root()))? {
        let path = entry?.path();
        if !path.is_file() || path.extension().is_none_or(|e| e != "json") {
            continue;
        }
        let fname = path.file_name().unwrap_or_default().to_string_lossy().to_string();
        if fname.ends_with(".meta.json") {
            continue;
        }
        let stem = path.file_stem().unwrap_or_default().to_string_lossy().to_string();
        let (name, deleted_at) = deleted_at_for(&path, &stem);
        let description = io::read_json::<crate::types::McpDefinition>(&path)
            .ok()
            .flatten()
            .and_then(|d| d.description)
            .unwrap_or_default();
        items.mcps.push(TrashedArtifact {
            name,
            path,
            deleted_at,
            description,
        });
    }

    for entry in std::fs::read_dir(paths::trash_claude_md_dir(registry.root()))? {
        let path = entry?.path();
        if !path.is_dir() {
            continue;
        }
        let stem = path.file_name().unwrap_or_default().to_string_lossy().to_string();
        let (id, deleted_at) = deleted_at_for(&path, &stem);
        let record: Option<ClaudeMdFile> =
            io::read_json(&path.join(paths::CLAUDE_MD_INFO_FILE)).ok().flatten();
        items.claude_md.push(TrashedArtifact {
            name: record.as_ref().map(|r| r.name.clone()).unwrap_or(id),
            description: record.map(|r| r.description).unwrap_or_default(),
            path,
            deleted_at,
        });
    }

    for list in [&mut items.skills, &mut items.mcps, &mut items.claude_md] {
        list.sort_by(|a, b| b.deleted_at.cmp(&a.deleted_at));
    }
    Ok(items)
}

// ---------------------------------------------------------------------------
// Restore
// ---------------------------------------------------------------------------

fn trash_stem(path: &Path, is_dir: bool) -> Result<String> {
    let exists = if is_dir { path.is_dir() } else { path.is_file() };
    if !exists {
        return Err(TroupeError::TrashEntryNotFound(path.display().to_string()));
    }
    let stem = if is_dir {
        path.file_name()
    } else {
        path.file_stem()
    };
    Ok(stem.unwrap_or_default().to_string_lossy().to_string())
}

/// Restore a trashed skill. All-or-nothing: a name collision leaves the
/// trash entry untouched and fails. The stashed metadata row goes back
/// into the catalogue; entries dropped into the trash by hand have none
/// and get a fresh row on the next registry scan.
pub fn restore_skill(registry: &Registry, trash_path: &Path) -> Result<String> {
    let stem = trash_stem(trash_path, true)?;
    let name = paths::split_trash_name(&stem)
        .map(|(n, _)| n)
        .unwrap_or(stem.clone());
    let dest = paths::skill_dir(registry.root(), &name);
    if dest.exists() {
        return Err(TroupeError::SkillExists(name));
    }
    let sidecar = meta_sidecar(trash_path, &stem);
    let meta: Option<ArtifactMeta> = io::read_json(&sidecar)?;
    std::fs::rename(trash_path, &dest)?;
    if let Some(meta) = meta {
        let mut data = registry.data()?;
        data.skill_meta.insert(name.clone(), meta);
        registry.save_data(&data)?;
        std::fs::remove_file(&sidecar)?;
    }
    tracing::info!(skill = %name, "restored skill from trash");
    Ok(name)
}

pub fn restore_mcp(registry: &Registry, trash_path: &Path) -> Result<String> {
    let stem = trash_stem(trash_path, false)?;
    let name = paths::split_trash_name(&stem)
        .map(|(n, _)| n)
        .unwrap_or(stem.clone());
    let dest = paths::mcp_path(registry.root(), &name);
    if dest.exists() {
        return Err(TroupeError::McpExists(name));
    }
    let sidecar = meta_sidecar(trash_path, &stem);
    let meta: Option<ArtifactMeta> = io::read_json(&sidecar)?;
    std::fs::rename(trash_path, &dest)?;
    if let Some(meta) = meta {
        let mut data = registry.data()?;
        data.mcp_meta.insert(name.clone(), meta);
        registry.save_data(&data)?;
        std::fs::remove_file(&sidecar)?;
    }
    tracing::info!(mcp = %name, "restored mcp server from trash");
    Ok(name)
}

/// Restore a trashed CLAUDE.md entry. The catalogue row is rebuilt from
/// the `info.json` sidecar when present (never re-marked global), or
/// synthesized minimally from the entry id.
pub fn restore_claude_md(registry: &Registry, trash_path: &Path) -> Result<String> {
    let stem = trash_stem(trash_path, true)?;
    let id = paths::split_trash_name(&stem)
        .map(|(n, _)| n)
        .unwrap_or(stem);
    let dest = paths::claude_md_entry_dir(registry.root(), &id);
    if dest.exists() {
        return Err(TroupeError::ClaudeMdExists(id));
    }

    let mut record: ClaudeMdFile = io::read_json(&trash_path.join(paths::CLAUDE_MD_INFO_FILE))?
        .unwrap_or_else(|| ClaudeMdFile {
            id: id.clone(),
            name: id.clone(),
            description: String::new(),
            category: None,
            tags: Vec::new(),
            is_global: false,
            source_path: None,
            created_at: None,
            updated_at: None,
        });
    record.id = id.clone();
    record.is_global = false;
    record.updated_at = Some(Utc::now());

    std::fs::rename(trash_path, &dest)?;
    io::write_json(&dest.join(paths::CLAUDE_MD_INFO_FILE), &record)?;

    let mut data = registry.data()?;
    data.claude_md_files.retain(|c| c.id != id);
    data.claude_md_files.push(record);
    registry.save_data(&data)?;
    tracing::info!(claude_md = %id, "restored claude.md entry from trash");
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn registry() -> (TempDir, Registry) {
        let dir = TempDir::new().unwrap();
        let reg = Registry::open(dir.path()).unwrap();
        (dir, reg)
    }

    fn add_skill(reg: &Registry, name: &str) {
        let dir = paths::skill_dir(reg.root(), name);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("SKILL.md"), format!("# {name}\n\ndesc\n")).unwrap();
        let mut data = reg.data().unwrap();
        data.skill_meta
            .insert(name.into(), crate::types::ArtifactMeta::fresh(None));
        reg.save_data(&data).unwrap();
    }

    fn add_mcp(reg: &Registry, name: &str) {
        let def = crate::types::McpDefinition {
            name: name.into(),
            description: Some("a server".into()),
            transport: Default::default(),
            command: "npx".into(),
            args: Vec::new(),
            env: Default::default(),
            url: None,
        };
        reg.add_mcp(&def, None).unwrap();
    }

    #[test]
    fn soft_delete_hides_skill_and_stamps_name() {
        let (_dir, reg) = registry();
        add_skill(&reg, "pdf-tools");

        let dest = soft_delete_skill(&reg, "pdf-tools").unwrap();
        assert!(!reg.has_skill("pdf-tools"));
        assert!(reg.skills().unwrap().is_empty());
        assert!(!reg.data().unwrap().skill_meta.contains_key("pdf-tools"));

        let stem = dest.file_name().unwrap().to_string_lossy().to_string();
        let (name, _) = paths::split_trash_name(&stem).unwrap();
        assert_eq!(name, "pdf-tools");
    }

    #[test]
    fn soft_delete_missing_skill_fails() {
        let (_dir, reg) = registry();
        assert!(matches!(
            soft_delete_skill(&reg, "nope").unwrap_err(),
            TroupeError::SkillNotFound(_)
        ));
    }

    #[test]
    fn delete_restore_round_trip() {
        let (_dir, reg) = registry();
        add_skill(&reg, "pdf-tools");
        let trashed = soft_delete_skill(&reg, "pdf-tools").unwrap();

        let name = restore_skill(&reg, &trashed).unwrap();
        assert_eq!(name, "pdf-tools");
        assert!(reg.has_skill("pdf-tools"));
        assert!(!trashed.exists());
        assert_eq!(
            std::fs::read_to_string(paths::skill_dir(reg.root(), "pdf-tools").join("SKILL.md"))
                .unwrap(),
            "# pdf-tools\n\ndesc\n"
        );
    }

    #[test]
    fn restore_keeps_skill_metadata() {
        let (_dir, reg) = registry();
        add_skill(&reg, "pdf-tools");
        let mut data = reg.data().unwrap();
        let meta = data.skill_meta.get_mut("pdf-tools").unwrap();
        meta.tags = vec!["docs".into(), "pdf".into()];
        meta.category = Some("productivity".into());
        let id = meta.id.clone();
        reg.save_data(&data).unwrap();

        let trashed = soft_delete_skill(&reg, "pdf-tools").unwrap();
        restore_skill(&reg, &trashed).unwrap();

        let data = reg.data().unwrap();
        let meta = data.skill_meta.get("pdf-tools").unwrap();
        assert_eq!(meta.id, id);
        assert_eq!(meta.tags, vec!["docs", "pdf"]);
        assert_eq!(meta.category.as_deref(), Some("productivity"));
        let skill = reg.skills().unwrap().into_iter().next().unwrap();
        assert_eq!(skill.id, id);
        assert_eq!(skill.tags, vec!["docs", "pdf"]);
    }

    #[test]
    fn restore_keeps_mcp_metadata() {
        let (_dir, reg) = registry();
        add_mcp(&reg, "github");
        let mut data = reg.data().unwrap();
        let meta = data.mcp_meta.get_mut("github").unwrap();
        meta.tags = vec!["vcs".into()];
        let id = meta.id.clone();
        reg.save_data(&data).unwrap();

        let trashed = soft_delete_mcp(&reg, "github").unwrap();
        restore_mcp(&reg, &trashed).unwrap();

        let data = reg.data().unwrap();
        let meta = data.mcp_meta.get("github").unwrap();
        assert_eq!(meta.id, id);
        assert_eq!(meta.tags, vec!["vcs"]);
    }

    #[test]
    fn restore_cleans_up_metadata_sidecar() {
        let (_dir, reg) = registry();
        add_skill(&reg, "pdf-tools");
        let trashed = soft_delete_skill(&reg, "pdf-tools").unwrap();
        restore_skill(&reg, &trashed).unwrap();

        assert!(list(&reg).unwrap().is_empty());
        let leftovers: Vec<_> = std::fs::read_dir(paths::trash_skills_dir(reg.root()))
            .unwrap()
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn restore_collision_keeps_trash_entry() {
        let (_dir, reg) = registry();
        add_skill(&reg, "pdf-tools");
        let trashed = soft_delete_skill(&reg, "pdf-tools").unwrap();
        add_skill(&reg, "pdf-tools");

        let err = restore_skill(&reg, &trashed).unwrap_err();
        assert!(matches!(err, TroupeError::SkillExists(_)));
        assert!(trashed.is_dir());
        assert_eq!(list(&reg).unwrap().skills.len(), 1);
    }

    #[test]
    fn restore_unknown_entry_fails() {
        let (_dir, reg) = registry();
        let bogus = paths::trash_skills_dir(reg.root()).join("ghost_20240101_000000");
        assert!(matches!(
            restore_skill(&reg, &bogus).unwrap_err(),
            TroupeError::TrashEntryNotFound(_)
        ));
    }

    #[test]
    fn mcp_round_trip() {
        let (_dir, reg) = registry();
        add_mcp(&reg, "github");
        let trashed = soft_delete_mcp(&reg, "github").unwrap();
        assert!(!reg.has_mcp("github"));
        assert!(trashed.extension().is_some_and(|e| e == "json"));

        let listed = list(&reg).unwrap();
        assert_eq!(listed.mcps.len(), 1);
        assert_eq!(listed.mcps[0].name, "github");
        assert_eq!(listed.mcps[0].description, "a server");

        restore_mcp(&reg, &trashed).unwrap();
        assert!(reg.has_mcp("github"));
    }

    #[test]
    fn claude_md_restore_rebuilds_record() {
        let (dir, reg) = registry();
        let src = dir.path().join("seed.md");
        std::fs::write(&src, "Use tabs.\n").unwrap();
        let mut record = reg.add_claude_md("style", &src).unwrap();
        record.is_global = true;
        let content = reg.claude_md_content(&record.id).unwrap();
        reg.write_claude_md_entry(&record, &content).unwrap();

        let trashed = soft_delete_claude_md(&reg, &record.id).unwrap();
        assert!(reg.data().unwrap().claude_md_files.is_empty());

        let id = restore_claude_md(&reg, &trashed).unwrap();
        assert_eq!(id, record.id);
        let data = reg.data().unwrap();
        let restored = data.find_claude_md(&id).unwrap();
        assert_eq!(restored.name, "style");
        assert!(!restored.is_global);
        assert_eq!(reg.claude_md_content(&id).unwrap(), "Use tabs.\n");
    }

    #[test]
    fn list_sorts_newest_first_with_mtime_fallback() {
        let (_dir, reg) = registry();
        // One stamped old entry, one unstamped entry relying on mtime.
        let old = paths::trash_skills_dir(reg.root()).join("old-skill_20200101_000000");
        std::fs::create_dir_all(&old).unwrap();
        let unstamped = paths::trash_skills_dir(reg.root()).join("manual-drop");
        std::fs::create_dir_all(&unstamped).unwrap();

        let items = list(&reg).unwrap();
        assert_eq!(items.skills.len(), 2);
        assert_eq!(items.skills[0].name, "manual-drop");
        assert_eq!(items.skills[1].name, "old-skill");
        assert!(items.skills[0].deleted_at > items.skills[1].deleted_at);
    }
}
