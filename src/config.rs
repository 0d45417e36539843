use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Install {
    pub default_dir: String,

    /// Directory name appended to user-supplied install paths.
    pub subdir: String,

    pub binary: String,

    pub port: u16,

    pub check_port: bool,
}

impl Default for Install {
    fn default() -> Self {
        Install {
            default_dir: "/opt/alist".to_string(),
            subdir: "alist".to_string(),
            binary: "alist".to_string(),
            port: 5244,
            check_port: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Release {
    pub base_url: String,

    /// Mirror prefix prepended verbatim to the asset URL, e.g. `https://ghproxy.com/`.
    pub proxy: String,
}

impl Default for Release {
    fn default() -> Self {
        Release {
            base_url: "https://github.com/alist-org/alist/releases/latest/download".to_string(),
            proxy: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Download {
    pub max_retries: u32,

    pub initial_backoff_secs: u64,

    pub connect_timeout_secs: u64,
}

impl Default for Download {
    fn default() -> Self {
        Download {
            max_retries: 3,
            initial_backoff_secs: 5,
            connect_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Service {
    pub name: String,

    pub unit_dir: String,

    pub systemctl: String,

    pub restart_sec: u64,
}

impl Default for Service {
    fn default() -> Self {
        Service {
            name: "alist".to_string(),
            unit_dir: "/etc/systemd/system".to_string(),
            systemctl: "systemctl".to_string(),
            restart_sec: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Cli {
    pub manager_path: String,

    pub link_path: String,
}

impl Default for Cli {
    fn default() -> Self {
        Cli {
            manager_path: "/usr/local/sbin/alistman".to_string(),
            link_path: "/usr/local/bin/alistman".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Menu {
    pub pause_ms: u64,
}

impl Default for Menu {
    fn default() -> Self {
        Menu { pause_ms: 1500 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Logging {
    pub level: String,

    pub json_output: bool,
}

impl Default for Logging {
    fn default() -> Self {
        Logging {
            level: "warn".to_string(),
            json_output: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub install: Install,

    #[serde(default)]
    pub release: Release,

    #[serde(default)]
    pub download: Download,

    #[serde(default)]
    pub service: Service,

    #[serde(default)]
    pub cli: Cli,

    #[serde(default)]
    pub menu: Menu,

    #[serde(default)]
    pub logging: Logging,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Config::default()
        };

        config.apply_env_overrides();

        Ok(config)
    }

    pub fn config_path() -> PathBuf {
        std::env::var_os("ALISTMAN_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("/etc/alistman/config.toml"))
    }

    pub fn default_install_dir(&self) -> PathBuf {
        PathBuf::from(&self.install.default_dir)
    }

    pub fn unit_dir(&self) -> PathBuf {
        PathBuf::from(&self.service.unit_dir)
    }

    pub fn manager_path(&self) -> PathBuf {
        PathBuf::from(&self.cli.manager_path)
    }

    pub fn link_path(&self) -> PathBuf {
        PathBuf::from(&self.cli.link_path)
    }

    pub fn menu_pause(&self) -> Duration {
        Duration::from_millis(self.menu.pause_ms)
    }

    pub fn log_level(&self) -> &str {
        &self.logging.level
    }

    pub fn json_output(&self) -> bool {
        self.logging.json_output
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("ALISTMAN_INSTALL_DIR") {
            self.install.default_dir = val;
        }
        if let Ok(val) = std::env::var("ALISTMAN_PROXY") {
            self.release.proxy = val;
        }
        if let Ok(val) = std::env::var("ALISTMAN_SYSTEMCTL") {
            self.service.systemctl = val;
        }
        if let Ok(val) = std::env::var("ALISTMAN_UNIT_DIR") {
            self.service.unit_dir = val;
        }
        if let Ok(val) = std::env::var("RUST_LOG") {
            self.logging.level = val;
        }
    }
}
