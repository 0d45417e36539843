// src/update.rs

use chrono::Utc;
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{error, info, instrument, warn};

use crate::archive::InstallMode;
use crate::error::ManagerError;
use crate::manager::Manager;
use crate::platform::{self, Arch, InstallTarget};

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateReport {
    pub install_dir: PathBuf,
    pub previous_digest: String,
    pub current_digest: String,
}

impl UpdateReport {
    pub fn changed(&self) -> bool {
        self.previous_digest != self.current_digest
    }
}

pub fn file_digest(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}

fn backup_path(binary: &Path) -> PathBuf {
    let timestamp = Utc::now().format("%Y%m%d%H%M%S");
    let name = binary
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("alist");
    binary.with_file_name(format!("{}.{}.bak", name, timestamp))
}

impl Manager {
    pub fn update(&self) -> Result<UpdateReport, ManagerError> {
        let arch = platform::detect_host()?;
        self.update_for(arch)
    }

    /// Replaces the installed executable, restoring the previous one if the
    /// new release cannot be fetched or unpacked.
    #[instrument(skip(self))]
    pub(crate) fn update_for(&self, arch: Arch) -> Result<UpdateReport, ManagerError> {
        let install_dir = self.installed_dir();
        let binary = install_dir.join(self.binary_name());
        if !binary.is_file() {
            return Err(ManagerError::NotInstalled(binary));
        }

        let target = InstallTarget::new(self.config(), arch, install_dir.clone());
        println!(
            "🔄 Updating {} ({}) in {}",
            self.binary_name(),
            target.arch,
            install_dir.display()
        );

        self.service().stop();

        let previous_digest = file_digest(&binary)?;
        let backup = backup_path(&binary);
        if let Err(e) = fs::copy(&binary, &backup) {
            error!("Backup of {:?} failed: {}", binary, e);
            self.service().start()?;
            return Err(e.into());
        }
        info!("Backed up {:?} to {:?}", binary, backup);

        if let Err(e) =
            self.archive_installer()
                .install(&target.download_url, &install_dir, InstallMode::Upgrade)
        {
            error!("Update failed, restoring {:?}: {}", backup, e);
            let restored = fs::rename(&backup, &binary);
            if let Err(restore_err) = &restored {
                error!("Restoring {:?} failed: {}", backup, restore_err);
            }
            if let Err(start_err) = self.service().start() {
                error!("Restarting after rollback failed: {}", start_err);
            }
            restored?;
            return Err(ManagerError::UpdateRolledBack(e));
        }

        self.service().start()?;

        if let Err(e) = fs::remove_file(&backup) {
            warn!("Failed to remove backup {:?}: {}", backup, e);
        }

        let report = UpdateReport {
            install_dir,
            previous_digest,
            current_digest: file_digest(&binary)?,
        };

        if report.changed() {
            println!(
                "✅ Updated {} in {} ({} → {}).",
                self.binary_name(),
                report.install_dir.display(),
                &report.previous_digest[..12],
                &report.current_digest[..12]
            );
        } else {
            println!(
                "✅ {} in {} is already the latest release.",
                self.binary_name(),
                report.install_dir.display()
            );
        }

        Ok(report)
    }
}
