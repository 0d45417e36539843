// src/manager.rs

use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info};

use crate::archive::ArchiveInstaller;
use crate::cli_install::CliLinkage;
use crate::config::Config;
use crate::credentials::{Credential, CredentialManager};
use crate::download::{Downloader, HttpFetcher, RetryPolicy};
use crate::error::ManagerError;
use crate::paths;
use crate::systemd::Service;

/// Resolved configuration plus the collaborators every operation needs.
pub struct Manager {
    config: Config,
    service: Service,
    downloader: Downloader,
    temp_dir: PathBuf,
}

impl Manager {
    pub fn new(config: Config) -> Result<Self, ManagerError> {
        let fetcher = HttpFetcher::new(Duration::from_secs(
            config.download.connect_timeout_secs,
        ))?;
        let downloader = Downloader::new(Box::new(fetcher), RetryPolicy::from(&config.download));
        let service = Service::from_config(&config);
        Ok(Manager::with_parts(config, service, downloader))
    }

    pub fn with_parts(config: Config, service: Service, downloader: Downloader) -> Self {
        Manager {
            config,
            service,
            downloader,
            temp_dir: std::env::temp_dir(),
        }
    }

    #[cfg(test)]
    pub fn with_temp_dir(mut self, temp_dir: &Path) -> Self {
        self.temp_dir = temp_dir.to_path_buf();
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    #[cfg(test)]
    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    pub fn service(&self) -> &Service {
        &self.service
    }

    pub fn binary_name(&self) -> &str {
        &self.config.install.binary
    }

    pub fn cli(&self) -> CliLinkage {
        CliLinkage::new(&self.config.manager_path(), &self.config.link_path())
    }

    pub(crate) fn archive_installer(&self) -> ArchiveInstaller<'_> {
        ArchiveInstaller::new(&self.downloader, self.binary_name()).with_temp_dir(&self.temp_dir)
    }

    /// Install directory of the current installation, read back from its unit file.
    pub fn installed_dir(&self) -> PathBuf {
        let unit = self.service.read_unit();
        paths::resolve_install_path(
            unit.as_deref(),
            self.binary_name(),
            &self.config.default_install_dir(),
            |p| p.is_file(),
        )
    }

    fn require_installed(&self) -> Result<PathBuf, ManagerError> {
        let install_dir = self.installed_dir();
        let binary = install_dir.join(self.binary_name());
        if binary.is_file() {
            Ok(install_dir)
        } else {
            Err(ManagerError::NotInstalled(binary))
        }
    }

    pub fn start(&self) -> Result<(), ManagerError> {
        self.require_installed()?;
        self.service.start()?;
        println!("✅ {} started.", self.service.unit_name());
        Ok(())
    }

    pub fn stop(&self) -> Result<(), ManagerError> {
        self.require_installed()?;
        if self.service.stop() {
            println!("✅ {} stopped.", self.service.unit_name());
        }
        Ok(())
    }

    pub fn restart(&self) -> Result<(), ManagerError> {
        self.require_installed()?;
        self.service.restart()?;
        println!("✅ {} restarted.", self.service.unit_name());
        Ok(())
    }

    /// Runs `f` with the service stopped and starts it again whatever `f` returned.
    pub(crate) fn with_service_stopped<T>(
        &self,
        f: impl FnOnce() -> Result<T, ManagerError>,
    ) -> Result<T, ManagerError> {
        self.service.stop();
        let result = f();

        match (result, self.service.start()) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(start_err)) => Err(start_err.into()),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(start_err)) => {
                error!("Restarting service also failed: {}", start_err);
                Err(e)
            }
        }
    }

    pub fn random_password(&self) -> Result<Credential, ManagerError> {
        let install_dir = self.require_installed()?;
        let credentials = CredentialManager::new(&install_dir, self.binary_name());
        let credential = self.with_service_stopped(|| Ok(credentials.random()?))?;
        info!("Generated a new random password");
        print_credential(&credential, &install_dir, self.binary_name());
        Ok(credential)
    }

    pub fn set_password(&self, new_password: &str) -> Result<Credential, ManagerError> {
        let install_dir = self.require_installed()?;
        let credentials = CredentialManager::new(&install_dir, self.binary_name());
        let credential = self.with_service_stopped(|| Ok(credentials.set(new_password)?))?;
        print_credential(&credential, &install_dir, self.binary_name());
        Ok(credential)
    }
}

pub(crate) fn print_credential(credential: &Credential, install_dir: &Path, binary: &str) {
    if credential.username.is_empty() || credential.password.is_empty() {
        println!("⚠️ Could not read the credentials from {} output.", binary);
        println!(
            "   Reset them manually: cd {} && ./{} admin random",
            install_dir.display(),
            binary
        );
        return;
    }

    println!("🔑 Username: {}", credential.username);
    println!("🔑 Password: {}", credential.password);
}
