use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

pub(crate) fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Artifacts
// ---------------------------------------------------------------------------

/// Per-artifact metadata persisted in `data.json`, keyed by artifact name.
/// The artifact content itself lives on disk (skill directory or MCP
/// definition file); this record carries identity and catalogue fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactMeta {
    pub id: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub source_path: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_used: Option<DateTime<Utc>>,
    #[serde(default)]
    pub usage_count: u32,
}

impl ArtifactMeta {
    pub fn fresh(source_path: Option<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            category: None,
            tags: Vec::new(),
            enabled: true,
            source_path,
            created_at: Some(Utc::now()),
            last_used: None,
            usage_count: 0,
        }
    }
}

/// A skill as presented by the registry: directory contents plus metadata.
#[derive(Debug, Clone, Serialize)]
pub struct Skill {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub enabled: bool,
    pub path: PathBuf,
    pub source_path: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub last_used: Option<DateTime<Utc>>,
    pub usage_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum McpTransport {
    #[default]
    Stdio,
    Http,
}

/// The persisted MCP definition file at `mcps/<name>.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, rename = "type")]
    pub transport: McpTransport,
    #[serde(default)]
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// An MCP server as presented by the registry: definition plus metadata.
#[derive(Debug, Clone, Serialize)]
pub struct McpServer {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub enabled: bool,
    pub transport: McpTransport,
    pub command: String,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
    pub url: Option<String>,
    pub path: PathBuf,
    pub source_path: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub last_used: Option<DateTime<Utc>>,
    pub usage_count: u32,
}

/// A managed CLAUDE.md record. The content lives at
/// `claude-md/<id>/CLAUDE.md` with this record mirrored in `info.json`
/// so a trashed entry can be restored without the catalogue row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaudeMdFile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_global: bool,
    #[serde(default)]
    pub source_path: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Catalogue organization
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub id: String,
    pub name: String,
}

/// Derived on demand; counts are never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryCount {
    pub category: Category,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct TagCount {
    pub tag: Tag,
    pub count: usize,
}

// ---------------------------------------------------------------------------
// Scenes and projects
// ---------------------------------------------------------------------------

/// A named bundle of artifact ids. Dangling ids are tolerated everywhere
/// and resolve to nothing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scene {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub skill_ids: Vec<String>,
    #[serde(default)]
    pub mcp_ids: Vec<String>,
    #[serde(default)]
    pub claude_md_ids: Vec<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_used: Option<DateTime<Utc>>,
}

/// A directory bound to a scene. `path` is the unique key after
/// trailing-slash normalization; `scene_id == None` means unconfigured.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub scene_id: Option<String>,
    #[serde(default)]
    pub last_synced: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Registry catalogue file (data.json)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppData {
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub scenes: Vec<Scene>,
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub skill_meta: BTreeMap<String, ArtifactMeta>,
    #[serde(default)]
    pub mcp_meta: BTreeMap<String, ArtifactMeta>,
    #[serde(default)]
    pub claude_md_files: Vec<ClaudeMdFile>,
}

impl AppData {
    pub fn find_scene(&self, id: &str) -> Option<&Scene> {
        self.scenes.iter().find(|s| s.id == id)
    }

    pub fn find_scene_mut(&mut self, id: &str) -> Option<&mut Scene> {
        self.scenes.iter_mut().find(|s| s.id == id)
    }

    pub fn find_project(&self, id: &str) -> Option<&Project> {
        self.projects.iter().find(|p| p.id == id)
    }

    pub fn find_project_mut(&mut self, id: &str) -> Option<&mut Project> {
        self.projects.iter_mut().find(|p| p.id == id)
    }

    /// Lookup by normalized path.
    pub fn find_project_by_path(&self, normalized: &str) -> Option<&Project> {
        self.projects.iter().find(|p| p.path == normalized)
    }

    pub fn find_claude_md(&self, id: &str) -> Option<&ClaudeMdFile> {
        self.claude_md_files.iter().find(|c| c.id == id)
    }
}

// ---------------------------------------------------------------------------
// External Claude Code formats (~/.claude.json, settings.json)
// ---------------------------------------------------------------------------

/// One entry under `mcpServers` in Claude Code's own configuration.
/// Unknown fields are carried through untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawMcpServer {
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub transport: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<HashMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(flatten)]
    pub other: serde_json::Map<String, serde_json::Value>,
}

impl RawMcpServer {
    pub fn transport(&self) -> McpTransport {
        match self.transport.as_deref() {
            Some("http") | Some("sse") => McpTransport::Http,
            Some(_) => McpTransport::Stdio,
            None if self.url.is_some() => McpTransport::Http,
            None => McpTransport::Stdio,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_mcp_preserves_unknown_fields() {
        let text = r#"{"command":"npx","args":["-y","server"],"futureField":{"x":1}}"#;
        let raw: RawMcpServer = serde_json::from_str(text).unwrap();
        assert_eq!(raw.command.as_deref(), Some("npx"));
        assert!(raw.other.contains_key("futureField"));
        let back = serde_json::to_value(&raw).unwrap();
        assert_eq!(back["futureField"]["x"], 1);
    }

    #[test]
    fn raw_mcp_transport_inference() {
        let http: RawMcpServer =
            serde_json::from_str(r#"{"url":"https://mcp.example.com"}"#).unwrap();
        assert_eq!(http.transport(), McpTransport::Http);
        let stdio: RawMcpServer = serde_json::from_str(r#"{"command":"npx"}"#).unwrap();
        assert_eq!(stdio.transport(), McpTransport::Stdio);
    }

    #[test]
    fn app_data_defaults_from_empty_object() {
        let data: AppData = serde_json::from_str("{}").unwrap();
        assert!(data.scenes.is_empty());
        assert!(data.skill_meta.is_empty());
    }

    #[test]
    fn scene_tolerates_missing_claude_md_ids() {
        let scene: Scene = serde_json::from_str(
            r#"{"id":"s1","name":"Web","skill_ids":["a"],"mcp_ids":[]}"#,
        )
        .unwrap();
        assert!(scene.claude_md_ids.is_empty());
    }
}
