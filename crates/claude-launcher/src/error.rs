use thiserror::Error;

#[derive(Debug, Error)]
pub enum LaunchError {
    /// macOS refused the automation request. Remediation is granting
    /// access in System Settings, not picking a different scene.
    #[error("terminal automation not permitted: grant access under System Settings > Privacy & Security > Accessibility")]
    PermissionDenied,

    #[error("folder does not exist: {0}")]
    FolderNotFound(String),

    #[error("terminal application not found: {0}")]
    TerminalNotFound(String),

    #[error("failed to launch terminal: {0}")]
    Spawn(String),

    #[error(transparent)]
    Registry(#[from] troupe_core::TroupeError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, LaunchError>;
