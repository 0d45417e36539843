// src/paths.rs

use nix::unistd::{AccessFlags, access};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

lazy_static::lazy_static! {
    static ref WORKING_DIRECTORY: Regex =
        Regex::new(r"(?m)^\s*WorkingDirectory\s*=\s*(\S.*?)\s*$").unwrap();
}

#[derive(Debug, Error)]
pub enum PathError {
    #[error("Install path is not writable: {path} ({reason})")]
    PathUnwritable { path: PathBuf, reason: String },
}

/// Strips trailing separators and makes sure the path ends in `subdir`.
pub fn normalize_install_path(raw: &str, subdir: &str) -> PathBuf {
    let trimmed = raw.trim().trim_end_matches('/');
    let base = if trimmed.is_empty() {
        PathBuf::from("/")
    } else {
        PathBuf::from(trimmed)
    };

    if base.file_name().is_some_and(|name| name == subdir) {
        base
    } else {
        base.join(subdir)
    }
}

/// Creates the parent of `install_dir` if needed and checks it accepts writes.
pub fn prepare_install_dir(install_dir: &Path) -> Result<(), PathError> {
    let parent = install_dir
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("/"));

    fs::create_dir_all(parent).map_err(|e| PathError::PathUnwritable {
        path: parent.to_path_buf(),
        reason: e.to_string(),
    })?;

    access(parent, AccessFlags::W_OK).map_err(|e| PathError::PathUnwritable {
        path: parent.to_path_buf(),
        reason: e.to_string(),
    })?;

    debug!("Install parent {:?} is writable", parent);
    Ok(())
}

/// Extracts `WorkingDirectory=` from a unit description.
pub fn working_directory(unit_contents: &str) -> Option<PathBuf> {
    WORKING_DIRECTORY
        .captures(unit_contents)
        .and_then(|caps| caps.get(1))
        .map(|m| PathBuf::from(m.as_str()))
}

/// Picks the install directory of a previous install.
///
/// The unit file's working directory wins when it still holds `binary`;
/// otherwise `default_dir` is used.
pub fn resolve_install_path(
    unit_contents: Option<&str>,
    binary: &str,
    default_dir: &Path,
    exists: impl Fn(&Path) -> bool,
) -> PathBuf {
    unit_contents
        .and_then(working_directory)
        .filter(|dir| exists(&dir.join(binary)))
        .unwrap_or_else(|| default_dir.to_path_buf())
}
