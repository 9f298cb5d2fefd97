//! CLI argument definitions for the Askline application.
//!
//! Uses `clap` with derive macros for ergonomic argument parsing.
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use askline_core::config::AsklineConfig;
use askline_core::error::{AsklineError, Result};

/// Environment variable pointing at the configuration file.
pub const CONFIG_ENV: &str = "ASKLINE_CONFIG";

/// Askline: answers questions through a supervised pipeline of model-backed workers.
#[derive(Parser, Debug)]
#[command(name = "askline", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// API server port.
    #[arg(short = 'p', long = "port", global = true)]
    pub port: Option<u16>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Start the HTTP API server (the default).
    Serve,
    /// Answer one question and print the result as JSON.
    Ask {
        /// The question to answer.
        transcript: String,
    },
    /// Write a default configuration file to the resolved config path.
    InitConfig {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

impl CliArgs {
    /// The subcommand to run; `serve` when none was given.
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Serve)
    }

    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > ASKLINE_CONFIG env var > ~/.askline/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var(CONFIG_ENV) {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Apply CLI overrides on top of file and environment values.
    pub fn apply_overrides(&self, config: &mut AsklineConfig) {
        if let Some(port) = self.port {
            config.general.port = port;
        }
        if let Some(ref level) = self.log_level {
            config.general.log_level = level.clone();
        }
    }
}

/// Write the default configuration to `path`.
///
/// Credentials are left out; they come from the environment or are added by
/// hand. An existing file is kept unless `force` is set.
pub fn write_default_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        return Err(AsklineError::Config(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }
    AsklineConfig::default().save(path)
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".askline").join("config.toml");
    }
    #[cfg(not(target_os = "windows"))]
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".askline").join("config.toml");
    }
    PathBuf::from("config.toml")
}
