use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::Serialize;
use troupe_core::settings::{AppSettings, WarpOpenMode};

use crate::error::{LaunchError, Result};

// ─── Backend selection ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalApp {
    Terminal,
    ITerm,
    Warp,
    Alacritty,
}

impl TerminalApp {
    /// Unrecognized names fall back to Terminal.app.
    pub fn from_name(name: &str) -> Self {
        match name {
            "iTerm" | "iTerm2" => TerminalApp::ITerm,
            "Warp" => TerminalApp::Warp,
            "Alacritty" => TerminalApp::Alacritty,
            _ => TerminalApp::Terminal,
        }
    }
}

/// Seam between the orchestrator and the operating system. The real
/// implementation is [`TerminalLauncher`]; tests substitute their own.
pub trait ProcessLauncher {
    fn launch(&self, folder: &Path, settings: &AppSettings) -> Result<()>;
}

// ─── TerminalLauncher ─────────────────────────────────────────────────────

/// Launches the configured claude command in a terminal window at the
/// given folder. Each backend uses its native non-keystroke mechanism:
/// AppleScript `do script` / `create window` for Terminal.app and
/// iTerm2, launch configurations or a handoff script for Warp, and
/// plain CLI arguments for Alacritty.
#[derive(Debug, Default)]
pub struct TerminalLauncher;

impl ProcessLauncher for TerminalLauncher {
    fn launch(&self, folder: &Path, settings: &AppSettings) -> Result<()> {
        if !folder.is_dir() {
            return Err(LaunchError::FolderNotFound(folder.display().to_string()));
        }
        if let Some(binary) = settings.claude_command.split_whitespace().next() {
            if which::which(binary).is_err() {
                tracing::warn!(command = binary, "claude command not found on PATH");
            }
        }

        let folder_str = folder.display().to_string();
        match TerminalApp::from_name(&settings.terminal_app) {
            TerminalApp::Terminal => {
                let script = format!(
                    "tell application \"Terminal\"\n    activate\n    do script \"cd \\\"{}\\\" && {}\"\nend tell",
                    applescript_escape(&folder_str),
                    applescript_escape(&settings.claude_command),
                );
                run_osascript(&script)
            }
            TerminalApp::ITerm => {
                let script = format!(
                    "tell application \"iTerm2\"\n    activate\n    create window with default profile command \"cd \\\"{}\\\" && {}\"\nend tell",
                    applescript_escape(&folder_str),
                    applescript_escape(&settings.claude_command),
                );
                run_osascript(&script)
            }
            TerminalApp::Warp => match settings.warp_open_mode {
                WarpOpenMode::Window => launch_warp_window(&folder_str, &settings.claude_command),
                WarpOpenMode::Tab => launch_warp_tab(&folder_str, &settings.claude_command),
            },
            TerminalApp::Alacritty => launch_alacritty(folder, &settings.claude_command),
        }
    }
}

// ─── AppleScript ──────────────────────────────────────────────────────────

fn applescript_escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Run an AppleScript and classify failures. Automation denials show up
/// on stderr as error -1743 (not permitted) or -25211 (assistive
/// access); those become [`LaunchError::PermissionDenied`].
fn run_osascript(script: &str) -> Result<()> {
    let output = Command::new("osascript")
        .arg("-e")
        .arg(script)
        .output()
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => LaunchError::TerminalNotFound("osascript".into()),
            _ => LaunchError::Io(e),
        })?;
    if output.status.success() {
        return Ok(());
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    if stderr_signals_permission_denial(&stderr) {
        return Err(LaunchError::PermissionDenied);
    }
    Err(LaunchError::Spawn(stderr.trim().to_string()))
}

pub(crate) fn stderr_signals_permission_denial(stderr: &str) -> bool {
    stderr.contains("-1743")
        || stderr.contains("-25211")
        || stderr.contains("not authorized")
        || stderr.contains("assistive access")
}

// ─── Warp ─────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct WarpLaunchConfig {
    name: String,
    windows: Vec<WarpWindow>,
}

#[derive(Debug, Serialize)]
struct WarpWindow {
    tabs: Vec<WarpTab>,
}

#[derive(Debug, Serialize)]
struct WarpTab {
    title: String,
    layout: WarpLayout,
}

#[derive(Debug, Serialize)]
struct WarpLayout {
    cwd: String,
    commands: Vec<WarpCommand>,
}

#[derive(Debug, Serialize)]
struct WarpCommand {
    exec: String,
}

fn unix_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}

fn warp_config(name: &str, folder: &str, claude_command: &str) -> WarpLaunchConfig {
    WarpLaunchConfig {
        name: name.to_string(),
        windows: vec![WarpWindow {
            tabs: vec![WarpTab {
                title: "Claude Code".to_string(),
                layout: WarpLayout {
                    cwd: folder.to_string(),
                    commands: vec![WarpCommand {
                        exec: claude_command.to_string(),
                    }],
                },
            }],
        }],
    }
}

/// Remove a handoff file once the terminal has had time to read it.
fn cleanup_later(path: PathBuf, delay: Duration) {
    std::thread::spawn(move || {
        std::thread::sleep(delay);
        let _ = std::fs::remove_file(path);
    });
}

/// Window mode: write a launch configuration and open it through Warp's
/// URI scheme. The URI takes the configuration name, not the file path.
fn launch_warp_window(folder: &str, claude_command: &str) -> Result<()> {
    let config_name = format!("troupe-launch-{}", unix_millis());
    let config_dir = troupe_core::paths::home_dir()?
        .join(".warp")
        .join("launch_configurations");
    std::fs::create_dir_all(&config_dir)?;

    let config_path = config_dir.join(format!("{config_name}.yaml"));
    let yaml = serde_yaml::to_string(&warp_config(&config_name, folder, claude_command))
        .map_err(|e| LaunchError::Spawn(format!("failed to serialize warp config: {e}")))?;
    std::fs::write(&config_path, yaml)?;

    open::that_detached(format!("warp://launch/{config_name}"))
        .map_err(|e| LaunchError::Spawn(format!("failed to open warp uri: {e}")))?;
    cleanup_later(config_path, Duration::from_secs(10));
    Ok(())
}

/// Tab mode: hand Warp an executable script. Opens a tab in the current
/// window and needs no automation permission.
fn launch_warp_tab(folder: &str, claude_command: &str) -> Result<()> {
    let script_path = std::env::temp_dir().join(format!("troupe_warp_{}.sh", unix_millis()));
    let script = format!(
        "#!/bin/zsh\ncd \"{}\"\n{}\n# Keep the shell interactive after claude exits\nexec zsh\n",
        folder.replace('"', "\\\""),
        claude_command,
    );
    std::fs::write(&script_path, script)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&script_path, std::fs::Permissions::from_mode(0o755))?;
    }

    let result = Command::new("open")
        .arg("-a")
        .arg("Warp")
        .arg(&script_path)
        .spawn();
    match result {
        Ok(_) => {
            cleanup_later(script_path, Duration::from_secs(5));
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(LaunchError::TerminalNotFound("Warp".into()))
        }
        Err(e) => Err(LaunchError::Spawn(e.to_string())),
    }
}

// ─── Alacritty ────────────────────────────────────────────────────────────

fn launch_alacritty(folder: &Path, claude_command: &str) -> Result<()> {
    if which::which("alacritty").is_err() {
        return Err(LaunchError::TerminalNotFound("alacritty".into()));
    }
    // Trailing zsh keeps the window open after claude exits.
    let shell_command = format!("{claude_command}; zsh");
    Command::new("alacritty")
        .arg("--working-directory")
        .arg(folder)
        .arg("-e")
        .arg("zsh")
        .arg("-c")
        .arg(&shell_command)
        .spawn()
        .map_err(|e| LaunchError::Spawn(e.to_string()))?;
    Ok(())
}

// ─── Remediation ──────────────────────────────────────────────────────────

/// Open the macOS accessibility privacy pane, the fix for
/// [`LaunchError::PermissionDenied`].
pub fn open_accessibility_settings() -> Result<()> {
    open::that_detached(
        "x-apple.systempreferences:com.apple.preference.security?Privacy_Accessibility",
    )
    .map_err(|e| LaunchError::Spawn(format!("failed to open system settings: {e}")))
}
