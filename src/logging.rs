use std::fs::{self, OpenOptions};
use std::io;
use std::path::Path;

use env_logger::{Builder, Env, Target};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LogInitError {
    #[error("cannot open log file: {0}")]
    Io(#[from] io::Error),
    #[error("logger already installed: {0}")]
    AlreadySet(#[from] log::SetLoggerError),
}

/// Installs env_logger writing to `path` (appending). The terminal belongs to
/// the UI, so nothing is logged to stderr. `RUST_LOG` overrides the default
/// `info` filter.
pub fn init(path: &Path) -> Result<(), LogInitError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;

    Builder::from_env(Env::default().default_filter_or("info"))
        .target(Target::Pipe(Box::new(file)))
        .try_init()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn creates_missing_log_directory() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("floorrush.log");

        // a logger may already be installed by another test in this binary
        let _ = init(&path);

        assert!(path.exists());
    }
}
