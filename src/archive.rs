// src/archive.rs

use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::io::{self, BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

use crate::download::{DownloadError, Downloader};

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Download(#[from] DownloadError),

    #[error("Failed to extract archive: {0}")]
    ExtractFailed(String),

    #[error("Archive did not contain the expected executable {binary} (install dir: {dir})")]
    BinaryMissing { binary: String, dir: PathBuf },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallMode {
    /// Empty target; a release without the executable resets the directory.
    Fresh,
    /// Existing install; nothing in the directory is touched unless the
    /// release is complete.
    Upgrade,
}

pub struct ArchiveInstaller<'a> {
    downloader: &'a Downloader,
    binary: String,
    temp_dir: PathBuf,
}

impl<'a> ArchiveInstaller<'a> {
    pub fn new(downloader: &'a Downloader, binary: &str) -> Self {
        ArchiveInstaller {
            downloader,
            binary: binary.to_string(),
            temp_dir: std::env::temp_dir(),
        }
    }

    /// Where the downloaded archive is kept until extraction finishes.
    pub fn with_temp_dir(mut self, temp_dir: &Path) -> Self {
        self.temp_dir = temp_dir.to_path_buf();
        self
    }

    /// Downloads `url`, unpacks it into `install_dir` and returns the executable path.
    #[instrument(skip(self, install_dir), fields(dir = %install_dir.display()))]
    pub fn install(
        &self,
        url: &str,
        install_dir: &Path,
        mode: InstallMode,
    ) -> Result<PathBuf, ArchiveError> {
        let staging_parent = install_dir.parent().unwrap_or(install_dir);
        fs::create_dir_all(staging_parent)?;

        let mut archive = tempfile::Builder::new()
            .prefix("alist-")
            .suffix(".tar.gz")
            .tempfile_in(&self.temp_dir)?;

        println!("⬇️  Downloading {}", url);
        self.downloader.download(url, archive.as_file_mut())?;

        let staging = tempfile::Builder::new()
            .prefix(".alist-stage-")
            .tempdir_in(staging_parent)?;

        if let Err(e) = extract(archive.as_file_mut(), staging.path()) {
            warn!("Extraction of {:?} failed: {}", archive.path(), e);
            return Err(ArchiveError::ExtractFailed(e.to_string()));
        }
        archive.close()?;

        if !staging.path().join(&self.binary).is_file() {
            if mode == InstallMode::Fresh {
                reset_dir(install_dir)?;
            }
            return Err(ArchiveError::BinaryMissing {
                binary: self.binary.clone(),
                dir: install_dir.to_path_buf(),
            });
        }

        fs::create_dir_all(install_dir)?;
        promote(staging.path(), install_dir)?;

        let binary_path = install_dir.join(&self.binary);
        set_executable(&binary_path)?;

        info!("Installed {:?}", binary_path);
        Ok(binary_path)
    }
}

fn extract(archive: &mut File, dest: &Path) -> io::Result<()> {
    archive.seek(SeekFrom::Start(0))?;
    let mut tar = tar::Archive::new(GzDecoder::new(BufReader::new(archive)));
    tar.set_preserve_permissions(true);
    tar.unpack(dest)
}

/// Moves every staged entry into `install_dir`, replacing same-named entries.
fn promote(staging: &Path, install_dir: &Path) -> io::Result<()> {
    for entry in fs::read_dir(staging)? {
        let entry = entry?;
        let dest = install_dir.join(entry.file_name());

        if dest.is_dir() && !dest.is_symlink() {
            fs::remove_dir_all(&dest)?;
        } else if dest.exists() || dest.is_symlink() {
            fs::remove_file(&dest)?;
        }

        debug!("Promoting {:?} -> {:?}", entry.path(), dest);
        fs::rename(entry.path(), &dest)?;
    }
    Ok(())
}

fn reset_dir(dir: &Path) -> io::Result<()> {
    if dir.exists() {
        fs::remove_dir_all(dir)?;
    }
    fs::create_dir_all(dir)
}

#[cfg(unix)]
fn set_executable(path: &Path) -> io::Result<()> {
    let mut perms = fs::metadata(path)?.permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms)
}

#[cfg(not(unix))]
fn set_executable(_path: &Path) -> io::Result<()> {
    Ok(())
}
