use crate::error::{Result, TroupeError};
use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Registry layout constants
// ---------------------------------------------------------------------------

pub const DATA_FILE: &str = "data.json";
pub const SETTINGS_FILE: &str = "settings.json";
pub const SKILLS_DIR: &str = "skills";
pub const MCPS_DIR: &str = "mcps";
pub const CLAUDE_MD_DIR: &str = "claude-md";
pub const TRASH_SKILLS_DIR: &str = "trash/skills";
pub const TRASH_MCPS_DIR: &str = "trash/mcps";
pub const TRASH_CLAUDE_MD_DIR: &str = "trash/claude-md";
pub const BACKUPS_DIR: &str = "backups";

pub const SKILL_MANIFEST: &str = "SKILL.md";
pub const CLAUDE_MD_FILE: &str = "CLAUDE.md";
pub const CLAUDE_MD_INFO_FILE: &str = "info.json";
pub const BACKUP_INFO_FILE: &str = "backup-info.json";

/// Files troupe manages inside a project directory.
pub const PROJECT_CLAUDE_DIR: &str = ".claude";
pub const PROJECT_SKILLS_DIR: &str = ".claude/skills";
pub const PROJECT_MCP_FILE: &str = ".mcp.json";

/// Claude Code's plugin marketplace layout under `<config_dir>/plugins`.
pub const INSTALLED_PLUGINS_FILE: &str = "installed_plugins.json";
pub const PLUGIN_CACHE_DIR: &str = "cache";
pub const PLUGIN_MCP_FILE: &str = ".mcp.json";

pub const TRASH_STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn data_path(root: &Path) -> PathBuf {
    root.join(DATA_FILE)
}

pub fn settings_path(root: &Path) -> PathBuf {
    root.join(SETTINGS_FILE)
}

pub fn skills_dir(root: &Path) -> PathBuf {
    root.join(SKILLS_DIR)
}

pub fn skill_dir(root: &Path, name: &str) -> PathBuf {
    root.join(SKILLS_DIR).join(name)
}

pub fn mcps_dir(root: &Path) -> PathBuf {
    root.join(MCPS_DIR)
}

pub fn mcp_path(root: &Path, name: &str) -> PathBuf {
    root.join(MCPS_DIR).join(format!("{name}.json"))
}

pub fn claude_md_dir(root: &Path) -> PathBuf {
    root.join(CLAUDE_MD_DIR)
}

pub fn claude_md_entry_dir(root: &Path, id: &str) -> PathBuf {
    root.join(CLAUDE_MD_DIR).join(id)
}

pub fn trash_skills_dir(root: &Path) -> PathBuf {
    root.join(TRASH_SKILLS_DIR)
}

pub fn trash_mcps_dir(root: &Path) -> PathBuf {
    root.join(TRASH_MCPS_DIR)
}

pub fn trash_claude_md_dir(root: &Path) -> PathBuf {
    root.join(TRASH_CLAUDE_MD_DIR)
}

pub fn backups_dir(root: &Path) -> PathBuf {
    root.join(BACKUPS_DIR)
}

pub fn home_dir() -> Result<PathBuf> {
    home::home_dir().ok_or(TroupeError::HomeNotFound)
}

/// Default registry root: `~/.troupe`.
pub fn default_root() -> Result<PathBuf> {
    Ok(home_dir()?.join(".troupe"))
}

/// Expand a leading `~` or `~/` to the home directory.
pub fn expand_tilde(path: &str) -> Result<PathBuf> {
    if path == "~" {
        return home_dir();
    }
    if let Some(rest) = path.strip_prefix("~/") {
        return Ok(home_dir()?.join(rest));
    }
    Ok(PathBuf::from(path))
}

/// Normalize a project path for identity comparisons: strip trailing
/// slashes but keep the filesystem root intact.
pub fn normalize_project_path(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Artifact names become file and directory names inside the registry.
pub fn validate_artifact_name(name: &str) -> Result<()> {
    if name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0')
    {
        return Err(TroupeError::InvalidName(name.to_string()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Plugin cache paths
// ---------------------------------------------------------------------------

/// Split a `<name>@<marketplace>` plugin id on the last `@`. Ids without
/// a marketplace fall back to `unknown`, matching how Claude Code writes
/// them.
pub fn split_plugin_id(id: &str) -> (&str, &str) {
    match id.rfind('@') {
        Some(pos) => (&id[..pos], &id[pos + 1..]),
        None => (id, "unknown"),
    }
}

/// Cache directory holding a plugin's installed versions:
/// `<plugins_dir>/cache/<marketplace>/<name>`.
pub fn plugin_cache_dir(plugins_dir: &Path, plugin_id: &str) -> PathBuf {
    let (name, marketplace) = split_plugin_id(plugin_id);
    plugins_dir.join(PLUGIN_CACHE_DIR).join(marketplace).join(name)
}

/// The active version under a plugin cache dir: the first non-hidden
/// subdirectory.
pub fn plugin_version_dir(plugin_dir: &Path) -> Option<PathBuf> {
    let entries = std::fs::read_dir(plugin_dir).ok()?;
    let mut dirs: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .filter(|e| !e.file_name().to_string_lossy().starts_with('.'))
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    dirs.sort();
    dirs.into_iter().next()
}

// ---------------------------------------------------------------------------
// Trash name stamps
// ---------------------------------------------------------------------------

static TRASH_NAME_RE: OnceLock<Regex> = OnceLock::new();

fn trash_name_re() -> &'static Regex {
    TRASH_NAME_RE.get_or_init(|| Regex::new(r"^(.+)_(\d{8}_\d{6})$").unwrap())
}

/// Build a trash entry name: `<name>_<YYYYMMDD_HHMMSS>`.
pub fn trash_name(name: &str, at: DateTime<Local>) -> String {
    format!("{name}_{}", at.format(TRASH_STAMP_FORMAT))
}

/// Split a trash entry name back into the original name and deletion time.
/// Stamps are written in local time.
pub fn split_trash_name(stem: &str) -> Option<(String, DateTime<Utc>)> {
    let caps = trash_name_re().captures(stem)?;
    let name = caps.get(1)?.as_str().to_string();
    let naive = NaiveDateTime::parse_from_str(caps.get(2)?.as_str(), TRASH_STAMP_FORMAT).ok()?;
    let local = Local.from_local_datetime(&naive).single()?;
    Some((name, local.with_timezone(&Utc)))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_trailing_slashes() {
        assert_eq!(normalize_project_path("/tmp/app/"), "/tmp/app");
        assert_eq!(normalize_project_path("/tmp/app///"), "/tmp/app");
        assert_eq!(normalize_project_path("/tmp/app"), "/tmp/app");
        assert_eq!(normalize_project_path("/"), "/");
    }

    #[test]
    fn valid_names() {
        for name in ["pdf-tools", "My Skill", "x", "a.b"] {
            validate_artifact_name(name).unwrap_or_else(|_| panic!("expected valid: {name}"));
        }
    }

    #[test]
    fn invalid_names() {
        for name in ["", ".", "..", "a/b", "a\\b"] {
            assert!(validate_artifact_name(name).is_err(), "expected invalid: {name}");
        }
    }

    #[test]
    fn plugin_ids_split_on_last_at() {
        assert_eq!(split_plugin_id("pdf-pack@community"), ("pdf-pack", "community"));
        assert_eq!(split_plugin_id("a@b@c"), ("a@b", "c"));
        assert_eq!(split_plugin_id("bare"), ("bare", "unknown"));
    }

    #[test]
    fn trash_name_round_trip() {
        let stamped = trash_name("pdf-tools", Local::now());
        let (name, _at) = split_trash_name(&stamped).unwrap();
        assert_eq!(name, "pdf-tools");
    }

    #[test]
    fn trash_name_keeps_underscores_in_name() {
        let (name, _) = split_trash_name("my_skill_v2_20240101_120000").unwrap();
        assert_eq!(name, "my_skill_v2");
    }

    #[test]
    fn unstamped_names_do_not_parse() {
        assert!(split_trash_name("plain-name").is_none());
        assert!(split_trash_name("short_2024_01").is_none());
    }

    #[test]
    fn path_helpers() {
        let root = Path::new("/tmp/reg");
        assert_eq!(data_path(root), PathBuf::from("/tmp/reg/data.json"));
        assert_eq!(
            mcp_path(root, "github"),
            PathBuf::from("/tmp/reg/mcps/github.json")
        );
        assert_eq!(
            skill_dir(root, "pdf"),
            PathBuf::from("/tmp/reg/skills/pdf")
        );
    }
}
