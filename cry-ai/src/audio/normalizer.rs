//! Format normalizer
//!
//! Converts non-canonical uploads (browser WebM/Opus, MP4/AAC, ...) to a WAV
//! copy using the `ffmpeg` command-line tool when it is installed. When the
//! tool is missing, disabled, fails or times out, the original path is
//! returned unchanged and the decoder ladder deals with it.

use cry_common::config::TranscoderConfig;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

/// Content types that denote the canonical container
const WAV_CONTENT_TYPES: &[&str] = &["audio/wav", "audio/x-wav", "audio/wave", "audio/vnd.wave"];

/// Lower bound on the transcoder time budget
const MIN_TIMEOUT_SECS: u64 = 1;

/// Transcoding errors (never leave this module)
#[derive(Debug, Error)]
pub enum NormalizeError {
    /// Transcoder disabled by configuration
    #[error("Transcoder disabled")]
    Disabled,

    /// Transcoder binary not found
    #[error("Transcoder binary not found: {0}")]
    BinaryNotFound(String),

    /// Failed to spawn or wait on the transcoder
    #[error("Failed to execute transcoder: {0}")]
    ExecutionError(String),

    /// Transcoder exited unsuccessfully
    #[error("Transcoding failed: {0}")]
    TranscodeFailed(String),

    /// Transcoder exceeded its time budget
    #[error("Transcoding timed out after {0:?}")]
    Timeout(Duration),

    /// Transcoder reported success but produced no audio
    #[error("Transcoder produced no output: {0}")]
    EmptyOutput(String),
}

/// Availability of the external transcoder
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranscoderStatus {
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl TranscoderStatus {
    fn unavailable() -> Self {
        Self {
            available: false,
            version: None,
        }
    }
}

/// Format normalizer backed by an optional external transcoder
pub struct FormatNormalizer {
    config: TranscoderConfig,
    status: OnceCell<TranscoderStatus>,
}

impl FormatNormalizer {
    pub fn new(config: TranscoderConfig) -> Self {
        Self {
            config,
            status: OnceCell::new(),
        }
    }

    /// Per-invocation time budget, never below one second
    fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.timeout_secs.max(MIN_TIMEOUT_SECS))
    }

    /// Check whether the transcoder is installed
    ///
    /// Probes `<binary> -version` on first call; the answer is cached for the
    /// lifetime of this normalizer.
    pub async fn transcoder_status(&self) -> TranscoderStatus {
        self.status
            .get_or_init(|| async {
                if !self.config.enabled {
                    return TranscoderStatus::unavailable();
                }
                let status = probe_transcoder(&self.config.binary, self.timeout()).await;
                info!(
                    binary = %self.config.binary,
                    available = status.available,
                    version = status.version.as_deref().unwrap_or("-"),
                    "Transcoder capability check"
                );
                status
            })
            .await
            .clone()
    }

    /// Return a path the decoder should read
    ///
    /// Canonical WAV input is returned as-is. Anything else is transcoded to
    /// `<stem>.normalized.wav` next to the input; on any failure the original
    /// path is returned. The original file is never removed.
    pub async fn normalize(
        &self,
        path: &Path,
        declared_extension: Option<&str>,
        declared_content_type: Option<&str>,
    ) -> PathBuf {
        if is_canonical(path, declared_extension, declared_content_type) {
            debug!(path = %path.display(), "Input already in canonical container");
            return path.to_path_buf();
        }

        match self.transcode(path).await {
            Ok(converted) => {
                debug!(
                    input = %path.display(),
                    output = %converted.display(),
                    "Transcoded upload to WAV"
                );
                converted
            }
            Err(NormalizeError::Disabled) => {
                debug!("Transcoder disabled, passing original container through");
                path.to_path_buf()
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Normalization failed, using original file");
                path.to_path_buf()
            }
        }
    }

    async fn transcode(&self, input: &Path) -> Result<PathBuf, NormalizeError> {
        if !self.config.enabled {
            return Err(NormalizeError::Disabled);
        }
        if !self.transcoder_status().await.available {
            return Err(NormalizeError::BinaryNotFound(self.config.binary.clone()));
        }

        let output_path = derived_output_path(input);

        let child = Command::new(&self.config.binary)
            .args(["-y", "-hide_banner", "-loglevel", "error", "-i"])
            .arg(input)
            .args(["-vn", "-f", "wav"])
            .arg(&output_path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => {
                    NormalizeError::BinaryNotFound(self.config.binary.clone())
                }
                _ => NormalizeError::ExecutionError(e.to_string()),
            })?;

        let output = tokio::time::timeout(self.timeout(), child.wait_with_output())
            .await
            .map_err(|_| NormalizeError::Timeout(self.timeout()))?
            .map_err(|e| NormalizeError::ExecutionError(e.to_string()))?;

        if !output.status.success() {
            let _ = tokio::fs::remove_file(&output_path).await;
            return Err(NormalizeError::TranscodeFailed(format!(
                "Exit code: {:?}, stderr: {}",
                output.status.code(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        match tokio::fs::metadata(&output_path).await {
            Ok(meta) if meta.len() > 0 => Ok(output_path),
            _ => Err(NormalizeError::EmptyOutput(output_path.display().to_string())),
        }
    }
}

/// Decide whether the file is already a RIFF/WAVE container
///
/// Byte sniffing wins; declared hints only matter when the bytes are not
/// recognised.
pub fn is_canonical(
    path: &Path,
    declared_extension: Option<&str>,
    declared_content_type: Option<&str>,
) -> bool {
    match infer::get_from_path(path) {
        Ok(Some(kind)) => return kind.extension() == "wav",
        Ok(None) => {}
        Err(e) => {
            debug!(path = %path.display(), error = %e, "Could not sniff container");
        }
    }

    let ext_is_wav = declared_extension
        .map(|ext| matches!(ext.to_ascii_lowercase().as_str(), "wav" | "wave"))
        .unwrap_or(false);

    let content_type_is_wav = declared_content_type
        .map(|ct| {
            let essence = ct.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
            WAV_CONTENT_TYPES.contains(&essence.as_str())
        })
        .unwrap_or(false);

    ext_is_wav || content_type_is_wav
}

/// `<dir>/<stem>.normalized.wav`
fn derived_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());
    input.with_file_name(format!("{stem}.normalized.wav"))
}

/// Run `<binary> -version` and parse the reported version
async fn probe_transcoder(binary: &str, timeout: Duration) -> TranscoderStatus {
    let run = Command::new(binary)
        .arg("-version")
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output();

    match tokio::time::timeout(timeout, run).await {
        Ok(Ok(output)) if output.status.success() => TranscoderStatus {
            available: true,
            version: parse_version(&String::from_utf8_lossy(&output.stdout)),
        },
        Ok(Ok(output)) => {
            debug!(binary, code = ?output.status.code(), "Transcoder -version exited unsuccessfully");
            TranscoderStatus::unavailable()
        }
        Ok(Err(e)) => {
            debug!(binary, error = %e, "Transcoder not runnable");
            TranscoderStatus::unavailable()
        }
        Err(_) => {
            warn!(binary, "Transcoder -version timed out");
            TranscoderStatus::unavailable()
        }
    }
}

/// `ffmpeg version 6.1.1-3ubuntu5 Copyright ...` → `6.1.1-3ubuntu5`
fn parse_version(stdout: &str) -> Option<String> {
    let first_line = stdout.lines().next()?;
    let mut tokens = first_line.split_whitespace();
    match (tokens.next(), tokens.next(), tokens.next()) {
        (Some(_), Some("version"), Some(version)) => Some(version.to_string()),
        _ => None,
    }
}
