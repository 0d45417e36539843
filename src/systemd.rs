// src/systemd.rs

use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;
use tracing::{debug, info, warn};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

use crate::config::Config;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to register {unit}: {reason}")]
    RegistrationFailed { unit: String, reason: String },

    #[error("systemctl {command} exited with {status}")]
    ControlFailed { command: String, status: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceState {
    Running,
    Stopped,
    Unknown,
}

impl ServiceState {
    fn from_is_active(output: &str) -> Self {
        match output.trim() {
            "active" | "activating" | "reloading" => ServiceState::Running,
            "inactive" | "failed" | "deactivating" => ServiceState::Stopped,
            _ => ServiceState::Unknown,
        }
    }
}

/// Unit description for the managed server.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceUnit {
    pub name: String,
    pub working_directory: PathBuf,
    pub exec_start: String,
    pub restart_sec: u64,
}

impl ServiceUnit {
    pub fn new(name: &str, working_directory: &Path, binary: &str, restart_sec: u64) -> Self {
        ServiceUnit {
            name: name.to_string(),
            working_directory: working_directory.to_path_buf(),
            exec_start: format!("{} server", working_directory.join(binary).display()),
            restart_sec,
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}.service", self.name)
    }

    pub fn render(&self) -> String {
        format!(
            r#"[Unit]
Description={name} service
Wants=network.target
After=network.target network.service

[Service]
Type=simple
WorkingDirectory={dir}
ExecStart={exec}
KillMode=process
Restart=on-failure
RestartSec={restart_sec}

[Install]
WantedBy=multi-user.target
"#,
            name = self.name,
            dir = self.working_directory.display(),
            exec = self.exec_start,
            restart_sec = self.restart_sec,
        )
    }
}

/// Thin wrapper around `systemctl` for one unit.
pub struct Service {
    systemctl: String,
    unit_dir: PathBuf,
    name: String,
}

impl Service {
    pub fn new(systemctl: &str, unit_dir: &Path, name: &str) -> Self {
        Service {
            systemctl: systemctl.to_string(),
            unit_dir: unit_dir.to_path_buf(),
            name: name.to_string(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Service::new(
            &config.service.systemctl,
            &config.unit_dir(),
            &config.service.name,
        )
    }

    pub fn unit_name(&self) -> String {
        format!("{}.service", self.name)
    }

    pub fn unit_path(&self) -> PathBuf {
        self.unit_dir.join(self.unit_name())
    }

    pub fn read_unit(&self) -> Option<String> {
        fs::read_to_string(self.unit_path()).ok()
    }

    fn run(&self, args: &[&str]) -> Result<(), ServiceError> {
        debug!("{} {}", self.systemctl, args.join(" "));
        let status = Command::new(&self.systemctl).args(args).status()?;

        if status.success() {
            Ok(())
        } else {
            Err(ServiceError::ControlFailed {
                command: args.join(" "),
                status: status.to_string(),
            })
        }
    }

    fn control(&self, verb: &str) -> Result<(), ServiceError> {
        let unit = self.unit_name();
        self.run(&[verb, unit.as_str()])
    }

    /// Writes the unit file, reloads systemd and enables the unit for boot.
    pub fn register(&self, unit: &ServiceUnit) -> Result<(), ServiceError> {
        let registration_failed = |reason: String| ServiceError::RegistrationFailed {
            unit: unit.file_name(),
            reason,
        };

        fs::create_dir_all(&self.unit_dir).map_err(|e| registration_failed(e.to_string()))?;

        let dst = self.unit_dir.join(unit.file_name());
        println!("Installing unit: {} → {}", unit.file_name(), dst.display());
        fs::write(&dst, unit.render()).map_err(|e| registration_failed(e.to_string()))?;
        set_mode(&dst, 0o644).map_err(|e| registration_failed(e.to_string()))?;

        self.run(&["daemon-reload"])
            .map_err(|e| registration_failed(e.to_string()))?;
        self.control("enable")
            .map_err(|e| registration_failed(e.to_string()))?;

        info!("Registered {}", unit.file_name());
        Ok(())
    }

    /// Stops, disables and removes the unit, in that order.
    pub fn unregister(&self) -> Result<(), ServiceError> {
        self.stop();

        if let Err(e) = self.control("disable") {
            warn!("Disabling {} failed: {}", self.unit_name(), e);
            eprintln!("⚠️ {}", e);
        }

        let path = self.unit_path();
        if path.exists() {
            println!("Removing unit: {}", path.display());
            fs::remove_file(&path)?;
        }

        self.run(&["daemon-reload"])?;
        Ok(())
    }

    pub fn start(&self) -> Result<(), ServiceError> {
        self.control("start")
    }

    pub fn restart(&self) -> Result<(), ServiceError> {
        self.control("restart")
    }

    /// Stopping an already stopped unit is not an error; failures are only reported.
    pub fn stop(&self) -> bool {
        match self.control("stop") {
            Ok(()) => true,
            Err(e) => {
                warn!("Stopping {} failed: {}", self.unit_name(), e);
                eprintln!("⚠️ {}", e);
                false
            }
        }
    }

    pub fn status(&self) -> Result<ServiceState, ServiceError> {
        let output = Command::new(&self.systemctl)
            .args(["is-active", self.unit_name().as_str()])
            .output()?;
        Ok(ServiceState::from_is_active(&String::from_utf8_lossy(
            &output.stdout,
        )))
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

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use tempfile::TempDir;

    /// Fake systemctl that logs its argv and tracks `is-active` in a state file.
    pub(crate) const FAKE_SYSTEMCTL: &str = r#"#!/usr/bin/env bash
set -euo pipefail
dir="$(dirname "$0")"
echo "$*" >> "$dir/calls.log"
state="$dir/state"
case "${1:-}" in
  start|restart) echo active > "$state" ;;
  stop) echo inactive > "$state" ;;
  is-active) cat "$state" 2>/dev/null || echo inactive ;;
esac
exit 0
"#;

    #[cfg(unix)]
    pub(crate) fn write_executable(path: &Path, contents: &str) {
        fs::write(path, contents).unwrap();
        let mut perms = fs::metadata(path).unwrap().permissions();
        perms.set_mode(0o755);
        fs::set_permissions(path, perms).unwrap();
    }

    pub(crate) fn fake_service(root: &Path) -> Service {
        let bin_dir = root.join("fakebin");
        fs::create_dir_all(&bin_dir).unwrap();
        let systemctl = bin_dir.join("systemctl");
        write_executable(&systemctl, FAKE_SYSTEMCTL);
        Service::new(systemctl.to_str().unwrap(), &root.join("units"), "alist")
    }

    pub(crate) fn calls(root: &Path) -> String {
        fs::read_to_string(root.join("fakebin/calls.log")).unwrap_or_default()
    }

    #[test]
    fn unit_renders_working_directory_and_restart_policy() {
        let unit = ServiceUnit::new("alist", Path::new("/opt/alist"), "alist", 5);
        let text = unit.render();

        assert!(text.contains("WorkingDirectory=/opt/alist\n"));
        assert!(text.contains("ExecStart=/opt/alist/alist server\n"));
        assert!(text.contains("Restart=on-failure\n"));
        assert!(text.contains("RestartSec=5\n"));
        assert!(text.contains("After=network.target"));
        assert_eq!(
            crate::paths::working_directory(&text),
            Some(PathBuf::from("/opt/alist"))
        );
    }

    #[test]
    fn state_parses_is_active_output() {
        assert_eq!(ServiceState::from_is_active("active\n"), ServiceState::Running);
        assert_eq!(ServiceState::from_is_active("inactive\n"), ServiceState::Stopped);
        assert_eq!(ServiceState::from_is_active("failed"), ServiceState::Stopped);
        assert_eq!(ServiceState::from_is_active(""), ServiceState::Unknown);
    }

    #[cfg(unix)]
    #[test]
    fn register_start_stop_unregister_round_trip() {
        let root = TempDir::new().unwrap();
        let service = fake_service(root.path());
        let unit = ServiceUnit::new("alist", &root.path().join("alist"), "alist", 5);

        service.register(&unit).unwrap();
        assert!(service.unit_path().is_file());
        let mode = fs::metadata(service.unit_path()).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o644);

        service.start().unwrap();
        assert_eq!(service.status().unwrap(), ServiceState::Running);

        assert!(service.stop());
        assert_eq!(service.status().unwrap(), ServiceState::Stopped);

        service.unregister().unwrap();
        assert!(!service.unit_path().exists());

        let log = calls(root.path());
        assert!(log.contains("daemon-reload"));
        assert!(log.contains("enable alist.service"));
        assert!(log.contains("start alist.service"));
    }

    #[cfg(unix)]
    #[test]
    fn unregister_stops_before_disabling_before_removal() {
        let root = TempDir::new().unwrap();
        let service = fake_service(root.path());
        let unit = ServiceUnit::new("alist", &root.path().join("alist"), "alist", 5);
        service.register(&unit).unwrap();
        fs::remove_file(root.path().join("fakebin/calls.log")).unwrap();

        service.unregister().unwrap();

        let log = calls(root.path());
        let lines: Vec<&str> = log.lines().collect();
        assert_eq!(
            lines,
            vec!["stop alist.service", "disable alist.service", "daemon-reload"]
        );
    }

    #[cfg(unix)]
    #[test]
    fn stop_failure_is_not_fatal_but_start_failure_is() {
        let root = TempDir::new().unwrap();
        let systemctl = root.path().join("systemctl");
        write_executable(&systemctl, "#!/usr/bin/env bash\nexit 5\n");
        let service = Service::new(systemctl.to_str().unwrap(), root.path(), "alist");

        assert!(!service.stop());
        let err = service.start().unwrap_err();
        assert!(matches!(err, ServiceError::ControlFailed { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn register_reports_enable_failure() {
        let root = TempDir::new().unwrap();
        let systemctl = root.path().join("systemctl");
        write_executable(
            &systemctl,
            r#"#!/usr/bin/env bash
if [[ "${1:-}" == "enable" ]]; then
  exit 1
fi
exit 0
"#,
        );
        let service = Service::new(systemctl.to_str().unwrap(), &root.path().join("units"), "alist");
        let unit = ServiceUnit::new("alist", Path::new("/opt/alist"), "alist", 5);

        let err = service.register(&unit).unwrap_err();
        assert!(matches!(err, ServiceError::RegistrationFailed { .. }));
    }
}
