// src/install.rs

use std::fs;
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use tracing::{error, info, instrument, warn};

use crate::archive::InstallMode;
use crate::cli_install::install_source_executable;
use crate::credentials::{Credential, CredentialManager};
use crate::error::ManagerError;
use crate::manager::{Manager, print_credential};
use crate::paths;
use crate::platform::{self, Arch, InstallTarget};
use crate::systemd::ServiceUnit;

#[derive(Debug)]
pub struct InstallSummary {
    pub target: InstallTarget,
    pub credential: Credential,
    pub cli_link: Option<PathBuf>,
}

impl InstallSummary {
    fn print(&self, binary: &str, port: u16) {
        println!("✅ {} installed and started.", binary);
        println!("   Address:     http://127.0.0.1:{}", port);
        println!("   Install dir: {}", self.target.install_dir.display());
        if let Some(link) = &self.cli_link {
            println!("   Manage with: {}", link.display());
        }
        print_credential(&self.credential, &self.target.install_dir, binary);
    }
}

fn port_available(port: u16) -> bool {
    TcpListener::bind(("0.0.0.0", port)).is_ok()
}

impl Manager {
    /// Fresh install into `path` (or the configured default) for the host architecture.
    pub fn install(&self, path: Option<&str>) -> Result<InstallSummary, ManagerError> {
        let arch = platform::detect_host()?;
        let summary = self.install_for(path, arch)?;
        summary.print(self.binary_name(), self.config().install.port);
        Ok(summary)
    }

    #[instrument(skip(self))]
    pub(crate) fn install_for(
        &self,
        path: Option<&str>,
        arch: Arch,
    ) -> Result<InstallSummary, ManagerError> {
        let install = &self.config().install;

        let install_dir = match path {
            Some(raw) => paths::normalize_install_path(raw, &install.subdir),
            None => self.config().default_install_dir(),
        };
        paths::prepare_install_dir(&install_dir)?;

        let target = InstallTarget::new(self.config(), arch, install_dir);
        let binary = target.binary_path(&install.binary);
        if binary.exists() {
            return Err(ManagerError::AlreadyInstalled(target.install_dir.clone()));
        }

        if install.check_port && !port_available(install.port) {
            return Err(ManagerError::PortInUse(install.port));
        }

        println!(
            "🔧 Installing {} ({}) into {}",
            install.binary,
            target.arch,
            target.install_dir.display()
        );

        let dir_existed = target.install_dir.exists();
        self.archive_installer()
            .install(&target.download_url, &target.install_dir, InstallMode::Fresh)?;

        let unit = ServiceUnit::new(
            &self.config().service.name,
            &target.install_dir,
            &install.binary,
            self.config().service.restart_sec,
        );
        if let Err(e) = self.service().register(&unit) {
            error!("Registration failed, removing {:?}: {}", target.install_dir, e);
            self.discard_fresh_install(&target, &binary, dir_existed);
            return Err(e.into());
        }

        // The service has not been started yet, so the admin subcommand has
        // the storage to itself.
        let credential = CredentialManager::new(&target.install_dir, &install.binary)
            .random()
            .unwrap_or_else(|e| {
                warn!("Could not mint initial credentials: {}", e);
                Credential::default()
            });

        self.service().start()?;

        let cli_link = match self.install_cli() {
            Ok(path) => Some(path),
            Err(e) => {
                warn!("CLI shortcut not installed: {}", e);
                eprintln!("⚠️ Skipping manager command install: {}", e);
                None
            }
        };

        info!("Installed into {:?}", target.install_dir);
        Ok(InstallSummary {
            target,
            credential,
            cli_link,
        })
    }

    /// Undoes an extracted-but-unregistered install so a later `install` can retry.
    fn discard_fresh_install(&self, target: &InstallTarget, binary: &Path, dir_existed: bool) {
        if let Err(e) = self.service().unregister() {
            warn!("Cleaning up unit after failed registration: {}", e);
        }

        let removed = if dir_existed {
            fs::remove_file(binary)
        } else {
            fs::remove_dir_all(&target.install_dir)
        };
        if let Err(e) = removed {
            warn!("Failed to remove {:?}: {}", target.install_dir, e);
            eprintln!("⚠️ Remove {} manually before retrying", target.install_dir.display());
        }
    }

    fn install_cli(&self) -> Result<PathBuf, ManagerError> {
        let source = install_source_executable()?;
        let cli = self.cli();
        cli.install(&source)?;
        Ok(cli.link_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::tests::tar_gz;
    use crate::manager::tests::{FAKE_ALIST, test_manager};
    use crate::systemd::ServiceState;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    #[test]
    fn install_registers_starts_and_mints_credentials() {
        let root = TempDir::new().unwrap();
        let payload = tar_gz(&[("alist", FAKE_ALIST.as_bytes())]);
        let manager = test_manager(root.path(), payload);
        let requested = root.path().join("srv");

        let summary = manager
            .install_for(Some(requested.to_str().unwrap()), Arch::Amd64)
            .unwrap();

        let install_dir = requested.join("alist");
        assert_eq!(summary.target.install_dir, install_dir);
        assert!(summary.target.download_url.ends_with("alist-linux-amd64.tar.gz"));
        assert!(install_dir.join("alist").is_file());
        assert_eq!(summary.credential.username, "admin");
        assert_eq!(summary.credential.password, "R4nd0m");

        let unit = manager.service().read_unit().unwrap();
        assert!(unit.contains(&format!("WorkingDirectory={}", install_dir.display())));
        assert_eq!(manager.service().status().unwrap(), ServiceState::Running);
        assert_eq!(manager.installed_dir(), install_dir);
    }

    #[test]
    fn install_refuses_existing_binary() {
        let root = TempDir::new().unwrap();
        let manager = test_manager(root.path(), Vec::new());
        let install_dir = root.path().join("opt/alist");
        fs::create_dir_all(&install_dir).unwrap();
        fs::write(install_dir.join("alist"), b"existing").unwrap();

        let err = manager.install_for(None, Arch::Arm64).unwrap_err();

        assert!(matches!(err, ManagerError::AlreadyInstalled(_)));
        assert_eq!(fs::read(install_dir.join("alist")).unwrap(), b"existing");
    }

    #[test]
    fn install_without_binary_in_release_leaves_empty_dir_and_no_unit() {
        let root = TempDir::new().unwrap();
        let payload = tar_gz(&[("LICENSE", b"MIT")]);
        let manager = test_manager(root.path(), payload);

        let err = manager.install_for(None, Arch::Amd64).unwrap_err();

        assert!(matches!(err, ManagerError::Archive(_)));
        let install_dir = root.path().join("opt/alist");
        assert!(fs::read_dir(&install_dir).unwrap().next().is_none());
        assert!(!manager.service().unit_path().exists());
    }

    #[test]
    fn install_rejects_busy_port() {
        let root = TempDir::new().unwrap();
        let listener = TcpListener::bind(("0.0.0.0", 0)).unwrap();
        let port = listener.local_addr().unwrap().port();

        let mut manager = test_manager(root.path(), Vec::new());
        manager.config_mut().install.check_port = true;
        manager.config_mut().install.port = port;

        let err = manager.install_for(None, Arch::Amd64).unwrap_err();
        assert!(matches!(err, ManagerError::PortInUse(p) if p == port));
        assert!(!Path::new(&manager.config().install.default_dir).join("alist").exists());
    }

    #[cfg(unix)]
    #[test]
    fn failed_registration_removes_extracted_install() {
        use crate::archive::tests::downloader_serving;
        use crate::manager::tests::test_config;
        use crate::systemd::Service;
        use crate::systemd::tests::write_executable;

        let root = TempDir::new().unwrap();
        let systemctl = root.path().join("systemctl");
        write_executable(
            &systemctl,
            "#!/usr/bin/env bash\n[[ \"${1:-}\" == enable ]] && exit 1\nexit 0\n",
        );
        let tmp = root.path().join("tmp");
        fs::create_dir_all(&tmp).unwrap();
        let manager = Manager::with_parts(
            test_config(root.path()),
            Service::new(systemctl.to_str().unwrap(), &root.path().join("units"), "alist"),
            downloader_serving(tar_gz(&[("alist", FAKE_ALIST.as_bytes())])),
        )
        .with_temp_dir(&tmp);
        let requested = root.path().join("srv");

        let err = manager
            .install_for(Some(requested.to_str().unwrap()), Arch::Amd64)
            .unwrap_err();

        assert!(matches!(err, ManagerError::Service(_)));
        assert!(!requested.join("alist").exists());
        assert!(!manager.service().unit_path().exists());
    }
}
