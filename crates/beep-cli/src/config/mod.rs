//! CLI configuration management.
//!
//! This module defines the complete CLI configuration hierarchy:
//!
//! ```text
//! Cli
//! ├── medium: MediumConfig   # Data directory, persistence toggle
//! ├── store: StoreConfig     # Key, TTL, expiry polling
//! ├── initial: Value         # Value used when nothing is stored
//! └── command: Command       # What to do with the store
//! ```
//!
//! All configuration can be provided via CLI arguments or environment variables.
//! Use `--help` to see all available options.
//!
//! # Example
//!
//! ```bash
//! # Store a banner for five minutes
//! beep --store-key banner --store-ttl-ms 300000 set '"maintenance at noon"'
//!
//! # Or via environment variables
//! BEEP_STORE_KEY=banner BEEP_DATA_DIR=/tmp/beep beep get
//! ```

mod medium;

use std::process;

use anyhow::Context;
use beep_store::store::StoreConfig;
use clap::Parser;
pub use medium::MediumConfig;
use serde_json::Value;

use crate::TRACING_TARGET_CONFIG;
use crate::commands::Command;

/// Complete CLI configuration.
#[derive(Debug, Clone, Parser)]
#[command(name = "beep")]
#[command(about = "Expiring local key-value store")]
#[command(version)]
pub struct Cli {
    /// Backing medium configuration.
    #[clap(flatten)]
    pub medium: MediumConfig,

    /// Store key and expiry configuration.
    #[clap(flatten)]
    pub store: StoreConfig,

    /// JSON value used when nothing is stored
    #[arg(long, env = "BEEP_INITIAL", default_value = "null", value_parser = parse_json)]
    pub initial: Value,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Loads environment variables from .env file (if enabled) and parses CLI arguments.
    pub fn init() -> Self {
        Self::load_dotenv();
        Self::parse()
    }

    /// Loads environment variables from .env file if the dotenv feature is enabled.
    #[cfg(feature = "dotenv")]
    fn load_dotenv() {
        if let Err(err) = dotenvy::dotenv()
            && !err.not_found()
        {
            eprintln!("Warning: failed to load .env file: {err}");
        }
    }

    /// No-op when dotenv feature is disabled.
    #[cfg(not(feature = "dotenv"))]
    fn load_dotenv() {}

    /// Validates all configuration values.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.store
            .validate()
            .context("invalid store configuration")?;
        Ok(())
    }

    /// Logs configuration (no values, only shape).
    pub fn log(&self) {
        tracing::debug!(
            target: TRACING_TARGET_CONFIG,
            version = env!("CARGO_PKG_VERSION"),
            pid = process::id(),
            features = ?Self::enabled_features(),
            "Build information"
        );

        self.medium.log();
        tracing::info!(
            target: TRACING_TARGET_CONFIG,
            key = %self.store.key(),
            ttl_ms = ?self.store.ttl().map(|ttl| ttl.as_millis()),
            poll_interval_ms = self.store.poll_interval().as_millis() as u64,
            "Store configuration"
        );
    }

    /// Returns a list of enabled compile-time features.
    fn enabled_features() -> Vec<&'static str> {
        [cfg!(feature = "dotenv").then_some("dotenv")]
            .into_iter()
            .flatten()
            .collect()
    }
}

/// Parses a command-line argument as JSON.
pub(crate) fn parse_json(raw: &str) -> Result<Value, String> {
    serde_json::from_str(raw).map_err(|e| format!("not valid JSON: {e}"))
}
