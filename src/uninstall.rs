// src/uninstall.rs

use std::fs;
use tracing::{info, warn};

use crate::error::ManagerError;
use crate::manager::Manager;

impl Manager {
    /// Stops and removes the service, the install directory and the manager command.
    pub fn uninstall(&self) -> Result<(), ManagerError> {
        let install_dir = self.installed_dir();
        let binary = install_dir.join(self.binary_name());

        if !binary.is_file() && !self.service().unit_path().exists() {
            return Err(ManagerError::NotInstalled(binary));
        }

        println!("🧹 Uninstalling {} from {}", self.binary_name(), install_dir.display());

        self.service().unregister()?;

        if install_dir.exists() {
            fs::remove_dir_all(&install_dir)?;
            println!("Removed install dir: {}", install_dir.display());
        }

        if !self.cli().uninstall() {
            warn!("Manager command was not fully removed");
        }

        info!("Uninstalled {:?}", install_dir);
        println!("✅ {} uninstalled.", self.binary_name());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::tests::{seed_install, test_manager};
    use crate::systemd::tests::calls;
    use tempfile::TempDir;

    #[test]
    fn uninstall_removes_unit_and_install_dir() {
        let root = TempDir::new().unwrap();
        let manager = test_manager(root.path(), Vec::new());
        let install_dir = root.path().join("data/alist");
        seed_install(&manager, &install_dir);
        manager.service().start().unwrap();

        manager.uninstall().unwrap();

        assert!(!install_dir.exists());
        assert!(!manager.service().unit_path().exists());

        let log = calls(root.path());
        let stop = log.find("stop alist.service").unwrap();
        let disable = log.find("disable alist.service").unwrap();
        assert!(stop < disable);
    }

    #[test]
    fn uninstall_removes_cli_artifacts() {
        let root = TempDir::new().unwrap();
        let manager = test_manager(root.path(), Vec::new());
        seed_install(&manager, &root.path().join("opt/alist"));

        let cli = manager.cli();
        fs::create_dir_all(cli.manager_path.parent().unwrap()).unwrap();
        fs::create_dir_all(cli.link_path.parent().unwrap()).unwrap();
        fs::write(&cli.manager_path, b"manager").unwrap();
        std::os::unix::fs::symlink(&cli.manager_path, &cli.link_path).unwrap();

        manager.uninstall().unwrap();

        assert!(!cli.manager_path.exists());
        assert!(!cli.link_path.is_symlink());
    }

    #[test]
    fn uninstall_without_install_is_an_error() {
        let root = TempDir::new().unwrap();
        let manager = test_manager(root.path(), Vec::new());
        assert!(matches!(
            manager.uninstall(),
            Err(ManagerError::NotInstalled(_))
        ));
    }
}
