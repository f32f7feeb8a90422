use thiserror::Error;

#[derive(Debug, Error)]
pub enum TroupeError {
    #[error("home directory not found: set HOME environment variable")]
    HomeNotFound,

    #[error("no readable configuration sources: {0}")]
    NoSourcesReadable(String),

    #[error("project not found: {0}")]
    ProjectNotFound(String),

    #[error("project has no scene bound: {0}")]
    ProjectUnconfigured(String),

    #[error("scene not found: {0}")]
    SceneNotFound(String),

    #[error("skill not found: {0}")]
    SkillNotFound(String),

    #[error("a skill named '{0}' already exists")]
    SkillExists(String),

    #[error("mcp server not found: {0}")]
    McpNotFound(String),

    #[error("an mcp server named '{0}' already exists")]
    McpExists(String),

    #[error("claude.md file not found: {0}")]
    ClaudeMdNotFound(String),

    #[error("a claude.md entry named '{0}' already exists")]
    ClaudeMdExists(String),

    #[error("trash entry not found: {0}")]
    TrashEntryNotFound(String),

    #[error("invalid name '{0}': must not be empty or contain path separators")]
    InvalidName(String),

    #[error("unknown setting: {0}")]
    UnknownSetting(String),

    #[error("invalid value '{value}' for setting '{key}'")]
    InvalidSettingValue { key: String, value: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TroupeError>;
