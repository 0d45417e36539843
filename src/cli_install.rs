// src/cli_install.rs

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

use crate::privileges::require_root;

#[derive(Debug, Error)]
pub enum CliInstallError {
    #[error("{0}")]
    Permission(io::Error),

    #[error("Failed to copy {from} to {to}: {source}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to link {link} -> {target}: {source}")]
    Link {
        link: PathBuf,
        target: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Installed manager copy and its command-path symlink.
#[derive(Debug, Clone, PartialEq)]
pub struct CliLinkage {
    pub manager_path: PathBuf,
    pub link_path: PathBuf,
}

impl CliLinkage {
    pub fn new(manager_path: &Path, link_path: &Path) -> Self {
        CliLinkage {
            manager_path: manager_path.to_path_buf(),
            link_path: link_path.to_path_buf(),
        }
    }

    pub fn is_installed(&self) -> bool {
        self.manager_path.is_file() && self.link_path.is_symlink()
    }

    pub fn install(&self, source: &Path) -> Result<(), CliInstallError> {
        require_root().map_err(CliInstallError::Permission)?;
        self.install_unchecked(source)
    }

    fn install_unchecked(&self, source: &Path) -> Result<(), CliInstallError> {
        let copy_error = |e: io::Error| CliInstallError::Copy {
            from: source.to_path_buf(),
            to: self.manager_path.clone(),
            source: e,
        };

        println!(
            "Installing manager: {} -> {}",
            source.display(),
            self.manager_path.display()
        );

        let copied = source != self.manager_path;
        if copied {
            if let Some(parent) = self.manager_path.parent() {
                fs::create_dir_all(parent).map_err(copy_error)?;
            }
            fs::copy(source, &self.manager_path).map_err(copy_error)?;
        }

        let linked = set_mode(&self.manager_path, 0o755)
            .map_err(copy_error)
            .and_then(|()| {
                create_symlink(&self.manager_path, &self.link_path).map_err(|e| {
                    CliInstallError::Link {
                        link: self.link_path.clone(),
                        target: self.manager_path.clone(),
                        source: e,
                    }
                })
            });

        if let Err(e) = linked {
            if copied {
                debug!("Rolling back {:?}", self.manager_path);
                if let Err(rm) = fs::remove_file(&self.manager_path) {
                    warn!("Rollback of {:?} failed: {}", self.manager_path, rm);
                }
            }
            return Err(e);
        }

        Ok(())
    }

    /// Removes the symlink and the manager copy; failures are reported, never fatal.
    pub fn uninstall(&self) -> bool {
        let mut clean = true;

        for path in [&self.link_path, &self.manager_path] {
            if !path.exists() && !path.is_symlink() {
                continue;
            }
            match fs::remove_file(path) {
                Ok(()) => println!("Removed: {}", path.display()),
                Err(e) => {
                    clean = false;
                    warn!("Failed to remove {:?}: {}", path, e);
                    eprintln!("⚠️ Failed to remove {}: {}", path.display(), e);
                }
            }
        }

        clean
    }
}

pub fn install_source_executable() -> io::Result<PathBuf> {
    std::env::current_exe()
}

fn create_symlink(target: &Path, link_path: &Path) -> io::Result<()> {
    debug!("Creating symlink: {:?} -> {:?}", link_path, target);

    if link_path.exists() || link_path.is_symlink() {
        fs::remove_file(link_path)?;
    }

    #[cfg(unix)]
    {
        std::os::unix::fs::symlink(target, link_path)
    }

    #[cfg(not(unix))]
    {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "Symlinks not supported on this platform",
        ))
    }
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> io::Result<()> {
    let mut perms = fs::metadata(path)?.permissions();
    perms.set_mode(mode);
    fs::set_permissions(path, perms)
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> io::Result<()> {
    Ok(())
}
