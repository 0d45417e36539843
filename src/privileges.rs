use nix::unistd::Uid;
use std::io;
use std::path::PathBuf;

pub fn require_root() -> io::Result<()> {
    if Uid::effective().is_root() {
        Ok(())
    } else {
        Err(io::Error::new(
            io::ErrorKind::PermissionDenied,
            "This command must be run with sudo/root.",
        ))
    }
}

/// Resolves an external command on `PATH` (or as an explicit path).
pub fn require_command(name: &str) -> io::Result<PathBuf> {
    which::which(name).map_err(|_| {
        io::Error::new(
            io::ErrorKind::NotFound,
            format!("Required command not found: {}", name),
        )
    })
}
