use crate::error::{Result, TroupeError};
use crate::io;
use crate::paths;
use crate::settings::AppSettings;
use crate::types::{
    AppData, ArtifactMeta, CategoryCount, ClaudeMdFile, McpDefinition, McpServer, Skill, TagCount,
};
use chrono::Utc;
use std::path::{Path, PathBuf};

/// Handle on a registry root (`~/.troupe` by default). All catalogue
/// state is re-read from disk on each call; nothing is cached.
#[derive(Debug, Clone)]
pub struct Registry {
    root: PathBuf,
}

impl Registry {
    /// Open a registry, creating the directory layout if needed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        io::ensure_dir(&paths::skills_dir(&root))?;
        io::ensure_dir(&paths::mcps_dir(&root))?;
        io::ensure_dir(&paths::claude_md_dir(&root))?;
        io::ensure_dir(&paths::trash_skills_dir(&root))?;
        io::ensure_dir(&paths::trash_mcps_dir(&root))?;
        io::ensure_dir(&paths::trash_claude_md_dir(&root))?;
        io::ensure_dir(&paths::backups_dir(&root))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    // -----------------------------------------------------------------------
    // Catalogue and settings files
    // -----------------------------------------------------------------------

    pub fn data(&self) -> Result<AppData> {
        Ok(io::read_json(&paths::data_path(&self.root))?.unwrap_or_default())
    }

    pub fn save_data(&self, data: &AppData) -> Result<()> {
        io::write_json(&paths::data_path(&self.root), data)
    }

    pub fn settings(&self) -> Result<AppSettings> {
        Ok(io::read_json(&paths::settings_path(&self.root))?.unwrap_or_default())
    }

    pub fn save_settings(&self, settings: &AppSettings) -> Result<()> {
        io::write_json(&paths::settings_path(&self.root), settings)
    }

    // -----------------------------------------------------------------------
    // Skills
    // -----------------------------------------------------------------------

    pub fn has_skill(&self, name: &str) -> bool {
        paths::skill_dir(&self.root, name).is_dir()
    }

    pub fn skill_names(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(paths::skills_dir(&self.root))? {
            let entry = entry?;
            if entry.path().is_dir() {
                names.push(entry.file_name().to_string_lossy().to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Scan the skills directory and merge in catalogue metadata. A skill
    /// directory without a metadata row still lists, keyed by its name.
    pub fn skills(&self) -> Result<Vec<Skill>> {
        let data = self.data()?;
        let mut skills = Vec::new();
        for name in self.skill_names()? {
            let path = paths::skill_dir(&self.root, &name);
            let description = skill_description(&path).unwrap_or_default();
            let skill = match data.skill_meta.get(&name) {
                Some(meta) => Skill {
                    id: meta.id.clone(),
                    name,
                    description,
                    category: meta.category.clone(),
                    tags: meta.tags.clone(),
                    enabled: meta.enabled,
                    path,
                    source_path: meta.source_path.clone(),
                    created_at: meta.created_at,
                    last_used: meta.last_used,
                    usage_count: meta.usage_count,
                },
                None => Skill {
                    id: name.clone(),
                    name,
                    description,
                    category: None,
                    tags: Vec::new(),
                    enabled: true,
                    path,
                    source_path: None,
                    created_at: None,
                    last_used: None,
                    usage_count: 0,
                },
            };
            skills.push(skill);
        }
        Ok(skills)
    }

    // -----------------------------------------------------------------------
    // MCP servers
    // -----------------------------------------------------------------------

    pub fn has_mcp(&self, name: &str) -> bool {
        paths::mcp_path(&self.root, name).is_file()
    }

    pub fn mcp_names(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(paths::mcps_dir(&self.root))? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().is_some_and(|e| e == "json") {
                if let Some(stem) = path.file_stem() {
                    names.push(stem.to_string_lossy().to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    pub fn mcp_definition(&self, name: &str) -> Result<McpDefinition> {
        io::read_json(&paths::mcp_path(&self.root, name))?
            .ok_or_else(|| TroupeError::McpNotFound(name.to_string()))
    }

    pub fn mcps(&self) -> Result<Vec<McpServer>> {
        let data = self.data()?;
        let mut servers = Vec::new();
        for name in self.mcp_names()? {
            let path = paths::mcp_path(&self.root, &name);
            let def: McpDefinition = match io::read_json(&path)? {
                Some(def) => def,
                None => continue,
            };
            let meta = data.mcp_meta.get(&name);
            servers.push(McpServer {
                id: meta.map(|m| m.id.clone()).unwrap_or_else(|| name.clone()),
                name,
                description: def.description.unwrap_or_default(),
                category: meta.and_then(|m| m.category.clone()),
                tags: meta.map(|m| m.tags.clone()).unwrap_or_default(),
                enabled: meta.map(|m| m.enabled).unwrap_or(true),
                transport: def.transport,
                command: def.command,
                args: def.args,
                env: def.env,
                url: def.url,
                path,
                source_path: meta.and_then(|m| m.source_path.clone()),
                created_at: meta.and_then(|m| m.created_at),
                last_used: meta.and_then(|m| m.last_used),
                usage_count: meta.map(|m| m.usage_count).unwrap_or(0),
            });
        }
        Ok(servers)
    }

    /// Write an MCP definition file and register metadata for it.
    pub fn add_mcp(&self, def: &McpDefinition, source_path: Option<String>) -> Result<()> {
        paths::validate_artifact_name(&def.name)?;
        io::write_json(&paths::mcp_path(&self.root, &def.name), def)?;
        let mut data = self.data()?;
        data.mcp_meta
            .entry(def.name.clone())
            .or_insert_with(|| ArtifactMeta::fresh(source_path));
        self.save_data(&data)
    }

    // -----------------------------------------------------------------------
    // CLAUDE.md entries
    // -----------------------------------------------------------------------

    pub fn claude_md_content(&self, id: &str) -> Result<String> {
        let path = paths::claude_md_entry_dir(&self.root, id).join(paths::CLAUDE_MD_FILE);
        if !path.exists() {
            return Err(TroupeError::ClaudeMdNotFound(id.to_string()));
        }
        Ok(std::fs::read_to_string(path)?)
    }

    /// Add a CLAUDE.md entry from a source file. Content is copied into
    /// the registry with the record mirrored to `info.json`.
    pub fn add_claude_md(&self, name: &str, source: &Path) -> Result<ClaudeMdFile> {
        paths::validate_artifact_name(name)?;
        let content = std::fs::read_to_string(source)?;
        let now = Utc::now();
        let record = ClaudeMdFile {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            description: content
                .lines()
                .find(|l| !l.trim().is_empty())
                .unwrap_or("")
                .trim()
                .to_string(),
            category: None,
            tags: Vec::new(),
            is_global: false,
            source_path: Some(source.display().to_string()),
            created_at: Some(now),
            updated_at: Some(now),
        };
        self.write_claude_md_entry(&record, &content)?;
        let mut data = self.data()?;
        data.claude_md_files.push(record.clone());
        self.save_data(&data)?;
        Ok(record)
    }

    /// Write both files of a CLAUDE.md entry directory.
    pub fn write_claude_md_entry(&self, record: &ClaudeMdFile, content: &str) -> Result<()> {
        let dir = paths::claude_md_entry_dir(&self.root, &record.id);
        io::ensure_dir(&dir)?;
        io::atomic_write(&dir.join(paths::CLAUDE_MD_FILE), content.as_bytes())?;
        io::write_json(&dir.join(paths::CLAUDE_MD_INFO_FILE), record)
    }

    // -----------------------------------------------------------------------
    // Derived counts
    // -----------------------------------------------------------------------

    /// Category usage, recomputed from current artifacts on every call.
    pub fn category_counts(&self) -> Result<Vec<CategoryCount>> {
        let data = self.data()?;
        let skills = self.skills()?;
        let mcps = self.mcps()?;
        Ok(data
            .categories
            .iter()
            .map(|cat| {
                let count = skills
                    .iter()
                    .filter(|s| s.category.as_deref() == Some(cat.id.as_str()))
                    .count()
                    + mcps
                        .iter()
                        .filter(|m| m.category.as_deref() == Some(cat.id.as_str()))
                        .count()
                    + data
                        .claude_md_files
                        .iter()
                        .filter(|c| c.category.as_deref() == Some(cat.id.as_str()))
                        .count();
                CategoryCount {
                    category: cat.clone(),
                    count,
                }
            })
            .collect())
    }

    pub fn tag_counts(&self) -> Result<Vec<TagCount>> {
        let data = self.data()?;
        let skills = self.skills()?;
        let mcps = self.mcps()?;
        Ok(data
            .tags
            .iter()
            .map(|tag| {
                let count = skills.iter().filter(|s| s.tags.contains(&tag.id)).count()
                    + mcps.iter().filter(|m| m.tags.contains(&tag.id)).count()
                    + data
                        .claude_md_files
                        .iter()
                        .filter(|c| c.tags.contains(&tag.id))
                        .count();
                TagCount {
                    tag: tag.clone(),
                    count,
                }
            })
            .collect())
    }
}

/// First non-header, non-frontmatter line of SKILL.md, capped at 200
/// characters.
pub fn skill_description(skill_dir: &Path) -> Option<String> {
    let text = std::fs::read_to_string(skill_dir.join(paths::SKILL_MANIFEST)).ok()?;
    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with("---") {
            continue;
        }
        if trimmed.chars().count() > 200 {
            return Some(trimmed.chars().take(200).collect());
        }
        return Some(trimmed.to_string());
    }
    None
}
