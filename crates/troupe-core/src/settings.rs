use crate::error::{Result, TroupeError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WarpOpenMode {
    #[default]
    Window,
    Tab,
}

/// User settings persisted as `settings.json`. Every field has a default
/// so an empty or partial file loads cleanly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    /// Claude Code's configuration directory, tilde-expandable.
    #[serde(default = "default_claude_config_dir")]
    pub claude_config_dir: String,

    /// Terminal backend: "Terminal", "iTerm2", "Warp" or "Alacritty".
    #[serde(default = "default_terminal_app")]
    pub terminal_app: String,

    /// Command launched inside the terminal.
    #[serde(default = "default_claude_command")]
    pub claude_command: String,

    #[serde(default)]
    pub warp_open_mode: WarpOpenMode,

    /// Pre-select everything newly detected in the import picker.
    #[serde(default = "crate::types::default_true")]
    pub auto_select_detected: bool,

    /// Where synced CLAUDE.md content lands, relative to the project root.
    #[serde(default = "default_claude_md_target")]
    pub claude_md_target: String,
}

fn default_claude_config_dir() -> String {
    "~/.claude".to_string()
}

fn default_terminal_app() -> String {
    "Terminal".to_string()
}

fn default_claude_command() -> String {
    "claude".to_string()
}

fn default_claude_md_target() -> String {
    ".claude/CLAUDE.md".to_string()
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            claude_config_dir: default_claude_config_dir(),
            terminal_app: default_terminal_app(),
            claude_command: default_claude_command(),
            warp_open_mode: WarpOpenMode::default(),
            auto_select_detected: true,
            claude_md_target: default_claude_md_target(),
        }
    }
}

impl AppSettings {
    /// Apply a `config set <key> <value>` assignment.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "claude_config_dir" => self.claude_config_dir = value.to_string(),
            "terminal_app" => self.terminal_app = value.to_string(),
            "claude_command" => self.claude_command = value.to_string(),
            "claude_md_target" => self.claude_md_target = value.to_string(),
            "warp_open_mode" => {
                self.warp_open_mode = match value {
                    "window" => WarpOpenMode::Window,
                    "tab" => WarpOpenMode::Tab,
                    _ => {
                        return Err(TroupeError::InvalidSettingValue {
                            key: key.to_string(),
                            value: value.to_string(),
                        })
                    }
                }
            }
            "auto_select_detected" => {
                self.auto_select_detected =
                    value.parse().map_err(|_| TroupeError::InvalidSettingValue {
                        key: key.to_string(),
                        value: value.to_string(),
                    })?
            }
            _ => return Err(TroupeError::UnknownSetting(key.to_string())),
        }
        Ok(())
    }

    /// Key/value pairs for `config show`, in a stable order.
    pub fn pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("claude_config_dir", self.claude_config_dir.clone()),
            ("terminal_app", self.terminal_app.clone()),
            ("claude_command", self.claude_command.clone()),
            (
                "warp_open_mode",
                match self.warp_open_mode {
                    WarpOpenMode::Window => "window".to_string(),
                    WarpOpenMode::Tab => "tab".to_string(),
                },
            ),
            (
                "auto_select_detected",
                self.auto_select_detected.to_string(),
            ),
            ("claude_md_target", self.claude_md_target.clone()),
        ]
    }
}
