//! Bootstrap configuration loading and config file discovery
//!
//! The TOML file only carries bootstrap concerns (listen address, model
//! artifact, scratch storage, logging, transcoder). Every field is optional;
//! missing fields fall back to compiled defaults.
//!
//! # Settings Sources Priority
//!
//! 1. Command-line arguments
//! 2. Environment variables
//! 3. TOML configuration file
//! 4. Compiled defaults
//!
//! Priorities 1 and 2 are applied by the service binary on top of the
//! [`TomlConfig`] returned here.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Application name used for config directory and file names
pub const APP_NAME: &str = "cry-ai";

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TomlConfig {
    /// Address the HTTP server binds to
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Path to the pretrained classifier artifact (JSON forest)
    #[serde(default = "default_model_path")]
    pub model_path: PathBuf,

    /// Directory holding per-request scratch directories
    ///
    /// Defaults to `<system temp>/cry-ai` when not specified.
    #[serde(default)]
    pub storage_dir: Option<PathBuf>,

    /// Maximum accepted upload size in bytes
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,

    /// External transcoder configuration (optional)
    #[serde(default)]
    pub transcoder: TranscoderConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

/// External transcoder (ffmpeg) configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TranscoderConfig {
    /// Set to false to never invoke the transcoder
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Binary name or path
    #[serde(default = "default_transcoder_binary")]
    pub binary: String,

    /// Upper bound on a single transcode, in seconds
    #[serde(default = "default_transcoder_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            model_path: default_model_path(),
            storage_dir: None,
            max_upload_bytes: default_max_upload_bytes(),
            logging: LoggingConfig::default(),
            transcoder: TranscoderConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

impl Default for TranscoderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            binary: default_transcoder_binary(),
            timeout_secs: default_transcoder_timeout_secs(),
        }
    }
}

impl TomlConfig {
    /// Scratch storage directory, falling back to `<system temp>/cry-ai`
    pub fn storage_dir_or_default(&self) -> PathBuf {
        self.storage_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join(APP_NAME))
    }
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_model_path() -> PathBuf {
    PathBuf::from("models/cry_classifier.json")
}

fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_transcoder_binary() -> String {
    "ffmpeg".to_string()
}

fn default_transcoder_timeout_secs() -> u64 {
    30
}

/// Platform config file locations, in lookup order
///
/// 1. `<user config dir>/cry-ai/cry-ai.toml`
/// 2. `/etc/cry-ai/cry-ai.toml` (Unix only)
pub fn config_file_candidates() -> Vec<PathBuf> {
    let file_name = format!("{APP_NAME}.toml");
    let mut candidates = Vec::new();

    if let Some(dir) = dirs::config_dir() {
        candidates.push(dir.join(APP_NAME).join(&file_name));
    }

    if cfg!(unix) {
        candidates.push(PathBuf::from("/etc").join(APP_NAME).join(&file_name));
    }

    candidates
}

/// Parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;

    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Load the bootstrap config
///
/// An explicit path must exist. Without one, the first existing platform
/// candidate is used; when none exists a warning is logged and compiled
/// defaults are returned. A file that exists but does not parse is always an
/// error.
pub fn load_or_default(explicit: Option<&Path>) -> Result<TomlConfig> {
    if let Some(path) = explicit {
        if !path.exists() {
            return Err(Error::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        info!("Loading config from {}", path.display());
        return load_toml_config(path);
    }

    match config_file_candidates().into_iter().find(|p| p.exists()) {
        Some(path) => {
            info!("Loading config from {}", path.display());
            load_toml_config(&path)
        }
        None => {
            warn!("No config file found, using compiled defaults");
            Ok(TomlConfig::default())
        }
    }
}
