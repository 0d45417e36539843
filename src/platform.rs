// src/platform.rs

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::config::Config;

#[derive(Debug, Error, PartialEq)]
pub enum PlatformError {
    #[error("Unsupported architecture: {0}")]
    UnsupportedArchitecture(String),

    #[error("Failed to query host architecture: {0}")]
    Uname(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arch {
    Amd64,
    Arm64,
}

impl Arch {
    pub fn as_str(&self) -> &'static str {
        match self {
            Arch::Amd64 => "amd64",
            Arch::Arm64 => "arm64",
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps a `uname -m` style machine string to a release architecture tag.
pub fn detect(machine: &str) -> Result<Arch, PlatformError> {
    match machine.trim() {
        "x86_64" | "x64" | "amd64" => Ok(Arch::Amd64),
        "aarch64" | "arm64" | "armv8" | "armv8l" => Ok(Arch::Arm64),
        other => Err(PlatformError::UnsupportedArchitecture(other.to_string())),
    }
}

pub fn host_machine() -> Result<String, PlatformError> {
    let uts = nix::sys::utsname::uname().map_err(|e| PlatformError::Uname(e.to_string()))?;
    Ok(uts.machine().to_string_lossy().into_owned())
}

pub fn detect_host() -> Result<Arch, PlatformError> {
    detect(&host_machine()?)
}

pub fn asset_name(arch: Arch) -> String {
    format!("alist-linux-{}.tar.gz", arch)
}

/// Builds the release download URL, optionally routed through a mirror prefix.
pub fn release_url(base_url: &str, proxy: &str, arch: Arch) -> String {
    let url = format!("{}/{}", base_url.trim_end_matches('/'), asset_name(arch));
    if proxy.is_empty() {
        url
    } else {
        format!("{}{}", proxy, url)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InstallTarget {
    pub arch: Arch,
    pub install_dir: PathBuf,
    pub download_url: String,
}

impl InstallTarget {
    pub fn new(config: &Config, arch: Arch, install_dir: PathBuf) -> Self {
        InstallTarget {
            arch,
            install_dir,
            download_url: release_url(&config.release.base_url, &config.release.proxy, arch),
        }
    }

    pub fn binary_path(&self, binary: &str) -> PathBuf {
        self.install_dir.join(binary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_maps_supported_machines() {
        for machine in ["x86_64", "x64", "amd64"] {
            assert_eq!(detect(machine), Ok(Arch::Amd64), "{machine}");
        }
        for machine in ["aarch64", "arm64", "armv8"] {
            assert_eq!(detect(machine), Ok(Arch::Arm64), "{machine}");
        }
        assert_eq!(detect("x86_64\n"), Ok(Arch::Amd64));
    }

    #[test]
    fn detect_rejects_unknown_machines() {
        for machine in ["i686", "armv7l", "riscv64", "mips", ""] {
            assert_eq!(
                detect(machine),
                Err(PlatformError::UnsupportedArchitecture(machine.to_string()))
            );
        }
    }

    #[test]
    fn release_url_without_proxy() {
        let url = release_url(
            "https://github.com/alist-org/alist/releases/latest/download/",
            "",
            Arch::Arm64,
        );
        assert_eq!(
            url,
            "https://github.com/alist-org/alist/releases/latest/download/alist-linux-arm64.tar.gz"
        );
    }

    #[test]
    fn release_url_with_proxy_prefix() {
        let url = release_url("https://example.com/dl", "https://mirror.test/", Arch::Amd64);
        assert_eq!(
            url,
            "https://mirror.test/https://example.com/dl/alist-linux-amd64.tar.gz"
        );
    }

    #[test]
    fn install_target_uses_config_release() {
        let config = Config::default();
        let target = InstallTarget::new(&config, Arch::Amd64, PathBuf::from("/opt/alist"));
        assert!(target.download_url.ends_with("alist-linux-amd64.tar.gz"));
        assert_eq!(target.binary_path("alist"), PathBuf::from("/opt/alist/alist"));
    }
}
