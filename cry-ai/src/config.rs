//! Service configuration
//!
//! Command-line flags and their environment variables (handled by clap) are
//! layered over the bootstrap TOML file from `cry_common::config`.

use clap::Parser;
use cry_common::config::{LoggingConfig, TomlConfig, TranscoderConfig};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Command-line arguments for cry-ai
#[derive(Parser, Debug, Default)]
#[command(name = "cry-ai")]
#[command(about = "Infant cry classification service")]
#[command(version)]
pub struct Cli {
    /// Config file (TOML)
    #[arg(short, long, env = "CRY_AI_CONFIG")]
    pub config: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, env = "CRY_AI_PORT")]
    pub port: Option<u16>,

    /// Address to bind to
    #[arg(short, long, env = "CRY_AI_BIND")]
    pub bind: Option<String>,

    /// Classifier artifact (JSON forest)
    #[arg(short, long, env = "CRY_AI_MODEL")]
    pub model: Option<PathBuf>,

    /// Directory for per-request scratch files
    #[arg(long, env = "CRY_AI_STORAGE_DIR")]
    pub storage_dir: Option<PathBuf>,

    /// Transcoder binary (ffmpeg)
    #[arg(long, env = "CRY_AI_FFMPEG")]
    pub ffmpeg: Option<String>,

    /// Never invoke the transcoder
    #[arg(long)]
    pub no_transcoder: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,
}

/// Fully resolved service configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    pub bind_address: String,
    pub port: u16,
    pub model_path: PathBuf,
    pub storage_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub logging: LoggingConfig,
    pub transcoder: TranscoderConfig,
}

impl ServiceConfig {
    /// Apply CLI/env overrides on top of the TOML values
    pub fn resolve(cli: &Cli, toml: TomlConfig) -> Self {
        let storage_dir = cli
            .storage_dir
            .clone()
            .unwrap_or_else(|| toml.storage_dir_or_default());

        let mut transcoder = toml.transcoder;
        if let Some(binary) = &cli.ffmpeg {
            transcoder.binary = binary.clone();
        }
        if cli.no_transcoder {
            transcoder.enabled = false;
        }

        let mut logging = toml.logging;
        if let Some(level) = &cli.log_level {
            logging.level = level.clone();
        }

        Self {
            bind_address: cli.bind.clone().unwrap_or(toml.bind_address),
            port: cli.port.unwrap_or(toml.port),
            model_path: cli.model.clone().unwrap_or(toml.model_path),
            storage_dir,
            max_upload_bytes: toml.max_upload_bytes,
            logging,
            transcoder,
        }
    }

    pub fn socket_addr(&self) -> cry_common::Result<SocketAddr> {
        format!("{}:{}", self.bind_address, self.port)
            .parse()
            .map_err(|e| {
                cry_common::Error::Config(format!(
                    "Invalid bind address {}:{}: {}",
                    self.bind_address, self.port, e
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const ENV_VARS: &[&str] = &[
        "CRY_AI_CONFIG",
        "CRY_AI_PORT",
        "CRY_AI_BIND",
        "CRY_AI_MODEL",
        "CRY_AI_STORAGE_DIR",
        "CRY_AI_FFMPEG",
    ];

    fn clear_env() {
        for var in ENV_VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    fn test_defaults_without_overrides() {
        let config = ServiceConfig::resolve(&Cli::default(), TomlConfig::default());
        assert_eq!(config.port, 5000);
        assert_eq!(config.bind_address, "0.0.0.0");
        assert_eq!(config.model_path, PathBuf::from("models/cry_classifier.json"));
        assert_eq!(config.storage_dir, std::env::temp_dir().join("cry-ai"));
        assert!(config.transcoder.enabled);
    }

    #[test]
    fn test_toml_beats_defaults() {
        let toml = TomlConfig {
            port: 7000,
            storage_dir: Some(PathBuf::from("/srv/cry")),
            ..TomlConfig::default()
        };
        let config = ServiceConfig::resolve(&Cli::default(), toml);
        assert_eq!(config.port, 7000);
        assert_eq!(config.storage_dir, PathBuf::from("/srv/cry"));
    }

    #[test]
    fn test_cli_beats_toml() {
        let toml = TomlConfig {
            port: 7000,
            ..TomlConfig::default()
        };
        let cli = Cli {
            port: Some(8000),
            ffmpeg: Some("/opt/ffmpeg/bin/ffmpeg".to_string()),
            no_transcoder: true,
            log_level: Some("debug".to_string()),
            ..Cli::default()
        };
        let config = ServiceConfig::resolve(&cli, toml);
        assert_eq!(config.port, 8000);
        assert_eq!(config.transcoder.binary, "/opt/ffmpeg/bin/ffmpeg");
        assert!(!config.transcoder.enabled);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    #[serial]
    fn test_env_beats_toml_and_flag_beats_env() {
        clear_env();
        std::env::set_var("CRY_AI_PORT", "6100");
        std::env::set_var("CRY_AI_MODEL", "/models/env.json");

        let toml = TomlConfig {
            port: 7000,
            ..TomlConfig::default()
        };

        let cli = Cli::try_parse_from(["cry-ai"]).unwrap();
        let config = ServiceConfig::resolve(&cli, toml.clone());
        assert_eq!(config.port, 6100);
        assert_eq!(config.model_path, PathBuf::from("/models/env.json"));

        let cli = Cli::try_parse_from(["cry-ai", "--port", "6200"]).unwrap();
        let config = ServiceConfig::resolve(&cli, toml);
        assert_eq!(config.port, 6200);

        clear_env();
    }

    #[test]
    fn test_socket_addr() {
        let mut config = ServiceConfig::resolve(&Cli::default(), TomlConfig::default());
        assert_eq!(config.socket_addr().unwrap().port(), 5000);

        config.bind_address = "not an address".to_string();
        assert!(config.socket_addr().is_err());
    }
}
