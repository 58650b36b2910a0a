//! Format normalizer tests against stub transcoder scripts
//!
//! The stubs are small shell scripts standing in for ffmpeg. Tests run
//! serially so no script is executed while another is still being written.

#![cfg(unix)]

use cry_ai::audio::FormatNormalizer;
use cry_common::config::TranscoderConfig;
use serial_test::serial;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// EBML header, sniffed as WebM/Matroska
const WEBM_BYTES: &[u8] = b"\x1A\x45\xDF\xA3\x9F\x42\x86\x81\x01\x42\xF7\x81\x01webm";

const VERSION_PREAMBLE: &str = r#"#!/bin/sh
if [ "$1" = "-version" ]; then
    echo "ffmpeg version 9.9.9-stub Copyright (c) test"
    exit 0
fi
for last; do :; done
"#;

fn write_stub(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, format!("{VERSION_PREAMBLE}{body}\n")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn normalizer_for(binary: &Path, timeout_secs: u64) -> FormatNormalizer {
    FormatNormalizer::new(TranscoderConfig {
        enabled: true,
        binary: binary.display().to_string(),
        timeout_secs,
    })
}

fn webm_input(dir: &Path) -> PathBuf {
    let path = dir.join("upload.webm");
    std::fs::write(&path, WEBM_BYTES).unwrap();
    path
}

#[tokio::test]
#[serial]
async fn test_successful_transcode_returns_new_path() {
    let dir = TempDir::new().unwrap();
    let stub = write_stub(dir.path(), "ffmpeg-ok", r#"printf 'RIFFstub' > "$last""#);
    let input = webm_input(dir.path());

    let normalizer = normalizer_for(&stub, 10);
    let output = normalizer.normalize(&input, Some("webm"), Some("audio/webm")).await;

    assert_eq!(output, dir.path().join("upload.normalized.wav"));
    assert!(output.exists());
    assert!(input.exists(), "original must be kept");
}

#[tokio::test]
#[serial]
async fn test_failed_transcode_returns_original() {
    let dir = TempDir::new().unwrap();
    let stub = write_stub(dir.path(), "ffmpeg-fail", "echo 'Invalid data' >&2\nexit 1");
    let input = webm_input(dir.path());

    let output = normalizer_for(&stub, 10)
        .normalize(&input, Some("webm"), None)
        .await;

    assert_eq!(output, input);
    assert!(!dir.path().join("upload.normalized.wav").exists());
}

#[tokio::test]
#[serial]
async fn test_empty_output_returns_original() {
    let dir = TempDir::new().unwrap();
    let stub = write_stub(dir.path(), "ffmpeg-empty", r#": > "$last""#);
    let input = webm_input(dir.path());

    let output = normalizer_for(&stub, 10).normalize(&input, None, None).await;
    assert_eq!(output, input);
}

#[tokio::test]
#[serial]
async fn test_timeout_returns_original() {
    let dir = TempDir::new().unwrap();
    let stub = write_stub(dir.path(), "ffmpeg-slow", "exec sleep 10");
    let input = webm_input(dir.path());

    let started = std::time::Instant::now();
    let output = normalizer_for(&stub, 1).normalize(&input, None, None).await;

    assert_eq!(output, input);
    assert!(started.elapsed() < std::time::Duration::from_secs(8));
}

#[tokio::test]
#[serial]
async fn test_missing_binary_returns_original() {
    let dir = TempDir::new().unwrap();
    let input = webm_input(dir.path());

    let normalizer = normalizer_for(&dir.path().join("does-not-exist"), 10);
    let output = normalizer.normalize(&input, Some("webm"), None).await;

    assert_eq!(output, input);
    assert!(!normalizer.transcoder_status().await.available);
}

#[tokio::test]
#[serial]
async fn test_canonical_input_skips_transcoder() {
    let dir = TempDir::new().unwrap();
    // Would fail if it were ever run
    let stub = write_stub(dir.path(), "ffmpeg-fail", "exit 1");
    let input = dir.path().join("upload.bin");
    std::fs::write(&input, b"RIFF\x24\x00\x00\x00WAVEfmt ").unwrap();

    let output = normalizer_for(&stub, 10).normalize(&input, None, None).await;
    assert_eq!(output, input);
}

#[tokio::test]
#[serial]
async fn test_status_reports_version_and_is_stable() {
    let dir = TempDir::new().unwrap();
    let stub = write_stub(dir.path(), "ffmpeg-ok", "exit 0");

    let normalizer = normalizer_for(&stub, 10);
    let first = normalizer.transcoder_status().await;
    assert!(first.available);
    assert_eq!(first.version.as_deref(), Some("9.9.9-stub"));

    // Cached: removing the binary does not change the answer
    std::fs::remove_file(&stub).unwrap();
    assert_eq!(normalizer.transcoder_status().await, first);
}
