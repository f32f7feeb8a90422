pub mod error;
pub mod orchestrator;
pub mod terminal;

pub use error::{LaunchError, Result};
pub use orchestrator::{launch_path_from_args, LaunchOutcome, Orchestrator};
pub use terminal::{open_accessibility_settings, ProcessLauncher, TerminalApp, TerminalLauncher};
