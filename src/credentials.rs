// src/credentials.rs

use regex::Regex;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;
use tracing::{debug, warn};

lazy_static::lazy_static! {
    static ref USERNAME: Regex = Regex::new(r"username:[ \t]*(\S+)").unwrap();
    static ref PASSWORD: Regex = Regex::new(r"password:[ \t]*(\S+)").unwrap();
}

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("Failed to run {binary}: {source}")]
    Spawn {
        binary: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Password must not be empty")]
    EmptyPassword,
}

/// Login pair reported by the server binary. Empty fields mean the output
/// carried no recognizable token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credential {
    pub username: String,
    pub password: String,
}

pub fn parse_credentials(output: &str) -> Credential {
    let token = |re: &Regex| {
        re.captures(output)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
            .unwrap_or_default()
    };

    Credential {
        username: token(&USERNAME),
        password: token(&PASSWORD),
    }
}

/// Runs the server binary's `admin` subcommands. The caller is expected to
/// stop the service first and restart it afterwards.
pub struct CredentialManager {
    binary: PathBuf,
    install_dir: PathBuf,
}

impl CredentialManager {
    pub fn new(install_dir: &Path, binary: &str) -> Self {
        CredentialManager {
            binary: install_dir.join(binary),
            install_dir: install_dir.to_path_buf(),
        }
    }

    fn admin(&self, args: &[&str]) -> Result<String, CredentialError> {
        debug!("{:?} admin {}", self.binary, args.join(" "));
        let output = Command::new(&self.binary)
            .arg("admin")
            .args(args)
            .current_dir(&self.install_dir)
            .output()
            .map_err(|source| CredentialError::Spawn {
                binary: self.binary.clone(),
                source,
            })?;

        if !output.status.success() {
            warn!("{:?} admin exited with {}", self.binary, output.status);
        }

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push('\n');
        combined.push_str(&String::from_utf8_lossy(&output.stderr));
        Ok(combined)
    }

    pub fn random(&self) -> Result<Credential, CredentialError> {
        let output = self.admin(&["random"])?;
        Ok(parse_credentials(&output))
    }

    /// Applies `new_password`; the returned username comes from the binary's output.
    pub fn set(&self, new_password: &str) -> Result<Credential, CredentialError> {
        if new_password.trim().is_empty() {
            return Err(CredentialError::EmptyPassword);
        }

        let output = self.admin(&["set", new_password])?;
        let parsed = parse_credentials(&output);
        Ok(Credential {
            username: parsed.username,
            password: new_password.to_string(),
        })
    }
}
