use serde::Serialize;
use std::path::PathBuf;

use crate::error::ManagerError;
use crate::manager::Manager;
use crate::systemd::ServiceState;

#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub install_dir: PathBuf,
    pub installed: bool,
    pub unit_file: Option<PathBuf>,
    pub service: ServiceState,
    pub port: u16,
    pub cli_installed: bool,
}

impl Manager {
    pub fn status_report(&self) -> Result<StatusReport, ManagerError> {
        let install_dir = self.installed_dir();
        let unit_path = self.service().unit_path();

        Ok(StatusReport {
            installed: install_dir.join(self.binary_name()).is_file(),
            install_dir,
            unit_file: unit_path.exists().then_some(unit_path),
            service: self.service().status()?,
            port: self.config().install.port,
            cli_installed: self.cli().is_installed(),
        })
    }

    pub fn print_status(&self, json: bool) -> Result<(), ManagerError> {
        let report = self.status_report()?;

        if json {
            let text = serde_json::to_string_pretty(&report)
                .map_err(|e| ManagerError::Io(std::io::Error::other(e)))?;
            println!("{}", text);
            return Ok(());
        }

        println!("\n🔍 Status for: {}", self.service().unit_name());
        println!("  Install dir:  {}", report.install_dir.display());
        println!(
            "  Installed:    {}",
            if report.installed { "yes" } else { "no" }
        );
        match &report.unit_file {
            Some(path) => println!("  Unit file:    {}", path.display()),
            None => println!("  Unit file:    (none)"),
        }
        let state = match report.service {
            ServiceState::Running => "running",
            ServiceState::Stopped => "stopped",
            ServiceState::Unknown => "unknown",
        };
        println!("  Service:      {}", state);
        println!("  Port:         {}", report.port);
        println!(
            "  Manager cmd:  {}",
            if report.cli_installed { "installed" } else { "not installed" }
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::manager::tests::{seed_install, test_manager};
    use crate::systemd::ServiceState;
    use tempfile::TempDir;

    #[test]
    fn status_reports_missing_install() {
        let root = TempDir::new().unwrap();
        let manager = test_manager(root.path(), Vec::new());

        let report = manager.status_report().unwrap();

        assert!(!report.installed);
        assert!(report.unit_file.is_none());
        assert_eq!(report.service, ServiceState::Stopped);
        assert!(!report.cli_installed);
    }

    #[test]
    fn status_reports_running_install() {
        let root = TempDir::new().unwrap();
        let manager = test_manager(root.path(), Vec::new());
        let install_dir = root.path().join("data/alist");
        seed_install(&manager, &install_dir);
        manager.service().start().unwrap();

        let report = manager.status_report().unwrap();

        assert!(report.installed);
        assert_eq!(report.install_dir, install_dir);
        assert_eq!(report.unit_file, Some(manager.service().unit_path()));
        assert_eq!(report.service, ServiceState::Running);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["service"], "running");
        assert_eq!(json["port"], 5244);
    }
}
