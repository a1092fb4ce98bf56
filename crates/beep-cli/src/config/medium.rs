//! Backing medium configuration.

use std::path::PathBuf;

use anyhow::Context;
use beep_store::medium::{Backing, FileMedium};
use clap::Args;

use crate::TRACING_TARGET_CONFIG;

// Default values
const DEFAULT_DATA_DIR: &str = ".beep";

/// Where the store keeps its records.
#[derive(Debug, Clone, Args)]
pub struct MediumConfig {
    /// Directory holding one file per record key
    #[arg(long = "data-dir", env = "BEEP_DATA_DIR", default_value = DEFAULT_DATA_DIR)]
    pub data_dir: PathBuf,

    /// Keep the value in memory only; nothing is read or written on disk
    #[arg(long = "no-persist")]
    pub no_persist: bool,
}

impl MediumConfig {
    /// Opens the configured backing.
    ///
    /// # Errors
    ///
    /// Returns an error if the data directory cannot be created.
    pub fn open(&self) -> anyhow::Result<Backing> {
        if self.no_persist {
            return Ok(Backing::Unavailable);
        }

        let medium = FileMedium::open(&self.data_dir).with_context(|| {
            format!("failed to open data directory {}", self.data_dir.display())
        })?;
        Ok(Backing::new(medium))
    }

    /// Logs medium configuration at info level.
    pub fn log(&self) {
        tracing::info!(
            target: TRACING_TARGET_CONFIG,
            data_dir = %self.data_dir.display(),
            persist = !self.no_persist,
            "Medium configuration"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_persist_is_unavailable() {
        let config = MediumConfig {
            data_dir: PathBuf::from("unused"),
            no_persist: true,
        };
        assert!(!config.open().unwrap().is_available());
    }

    #[test]
    fn test_open_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("records");
        let config = MediumConfig {
            data_dir: data_dir.clone(),
            no_persist: false,
        };

        assert!(config.open().unwrap().is_available());
        assert!(data_dir.is_dir());
    }
}
