// src/error.rs

use std::path::PathBuf;
use thiserror::Error;

use crate::archive::ArchiveError;
use crate::cli_install::CliInstallError;
use crate::config::ConfigError;
use crate::credentials::CredentialError;
use crate::download::DownloadError;
use crate::paths::PathError;
use crate::platform::PlatformError;
use crate::systemd::ServiceError;

#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Platform(#[from] PlatformError),

    #[error(transparent)]
    Path(#[from] PathError),

    #[error(transparent)]
    Download(#[from] DownloadError),

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error(transparent)]
    Cli(#[from] CliInstallError),

    #[error("Already installed at {0}; use update instead")]
    AlreadyInstalled(PathBuf),

    #[error("Not installed: {0} does not exist")]
    NotInstalled(PathBuf),

    #[error("Port {0} is already in use")]
    PortInUse(u16),

    #[error("Update failed, previous version restored: {0}")]
    UpdateRolledBack(#[source] ArchiveError),

    #[error("{0}")]
    Usage(String),
}
