//! Layered audio decoder
//!
//! 1. Primary: symphonia, codec-tolerant, native sample rate, averaged to mono.
//! 2. Secondary (feature `wav-fallback`): WAV-native loader via hound, forced
//!    mono and resampled to [`FALLBACK_SAMPLE_RATE`]. Only tried when the
//!    primary backend errors.
//!
//! Clips shorter than [`MIN_DURATION_SECS`](super::MIN_DURATION_SECS) from
//! either backend end the ladder with [`DecodeOutcome::TooShort`]. Both
//! backends stop reading after the decoder's duration cap
//! ([`MAX_DURATION_SECS`] by default), so a long upload never materialises
//! more than that many seconds of samples.

use super::{downmix_to_mono, Waveform, MAX_DURATION_SECS};
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use thiserror::Error;
use tracing::{debug, warn};

/// Sample rate produced by the secondary decoder
pub const FALLBACK_SAMPLE_RATE: u32 = 22_050;

/// Decoder errors
#[derive(Debug, Error)]
pub enum DecodeError {
    /// File could not be opened
    #[error("Failed to open audio file: {0}")]
    Open(#[from] std::io::Error),

    /// Container not recognised
    #[error("Failed to probe audio format: {0}")]
    Probe(String),

    /// No decodable audio track
    #[error("No audio tracks found in file")]
    NoTrack,

    /// Sample rate missing from codec parameters
    #[error("Sample rate not specified in codec params")]
    MissingSampleRate,

    /// Codec setup or packet decoding failed
    #[error("Codec error: {0}")]
    Codec(String),

    /// Stream decoded but contained no samples
    #[error("No samples decoded")]
    Empty,

    /// WAV reader error
    #[error("WAV read error: {0}")]
    Wav(String),

    /// Resampler error
    #[error("Resampling failed: {0}")]
    Resample(String),

    /// Secondary decoder not compiled into this build
    #[error("Secondary decoder unavailable")]
    Unavailable,
}

/// Backend that produced a waveform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderBackend {
    Symphonia,
    WavNative,
}

/// Result of walking the decoder ladder
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeOutcome {
    /// Usable waveform
    Decoded {
        waveform: Waveform,
        backend: DecoderBackend,
    },
    /// Decoded, but under the minimum duration
    TooShort {
        duration_secs: f64,
        backend: DecoderBackend,
    },
    /// No backend could decode the file
    Failed { reason: String },
}

/// Audio decoder with a fixed backend priority
#[derive(Debug, Clone)]
pub struct AudioDecoder {
    max_duration_secs: f64,
}

impl Default for AudioDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioDecoder {
    pub fn new() -> Self {
        Self::with_max_duration(MAX_DURATION_SECS)
    }

    /// Decoder that keeps at most `secs` seconds of each clip
    pub fn with_max_duration(secs: f64) -> Self {
        Self {
            max_duration_secs: secs,
        }
    }

    /// Decode a file to a mono waveform, walking the backend ladder
    pub fn decode(&self, path: &Path) -> DecodeOutcome {
        let primary_error = match decode_symphonia(path, self.max_duration_secs) {
            Ok(waveform) => return classify_duration(waveform, DecoderBackend::Symphonia),
            Err(e) => e,
        };

        warn!(
            path = %path.display(),
            error = %primary_error,
            "Primary decoder failed, trying WAV-native loader"
        );

        match decode_wav_native(path, self.max_duration_secs) {
            Ok(waveform) => classify_duration(waveform, DecoderBackend::WavNative),
            Err(secondary_error) => {
                warn!(
                    path = %path.display(),
                    error = %secondary_error,
                    "Secondary decoder failed"
                );
                DecodeOutcome::Failed {
                    reason: format!("primary: {primary_error}; secondary: {secondary_error}"),
                }
            }
        }
    }
}

/// Sample count covering `secs` at `sample_rate`
fn sample_limit(sample_rate: u32, secs: f64) -> usize {
    (sample_rate as f64 * secs.max(0.0)).ceil() as usize
}

fn classify_duration(waveform: Waveform, backend: DecoderBackend) -> DecodeOutcome {
    if waveform.is_too_short() {
        debug!(
            samples = waveform.samples.len(),
            sample_rate = waveform.sample_rate,
            ?backend,
            "Decoded clip is too short"
        );
        return DecodeOutcome::TooShort {
            duration_secs: waveform.duration_secs(),
            backend,
        };
    }

    debug!(
        samples = waveform.samples.len(),
        sample_rate = waveform.sample_rate,
        ?backend,
        "Decoded clip"
    );
    DecodeOutcome::Decoded { waveform, backend }
}

/// Decode any symphonia-supported container at its native rate, keeping at
/// most `max_secs` seconds
pub fn decode_symphonia(path: &Path, max_secs: f64) -> Result<Waveform, DecodeError> {
    let file = std::fs::File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| DecodeError::Probe(e.to_string()))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or(DecodeError::NoTrack)?;

    let track_id = track.id;
    let codec_params = track.codec_params.clone();
    let sample_rate = codec_params.sample_rate.ok_or(DecodeError::MissingSampleRate)?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| DecodeError::Codec(e.to_string()))?;

    let limit = sample_limit(sample_rate, max_secs);
    let mut mono = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;

    while mono.len() < limit {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(DecodeError::Codec(e.to_string())),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(e)) => {
                debug!("Skipping corrupt packet: {}", e);
                continue;
            }
            Err(e) => return Err(DecodeError::Codec(e.to_string())),
        };

        let spec = *decoded.spec();
        let channels = spec.channels.count();

        let needs_buffer = sample_buf
            .as_ref()
            .map_or(true, |buf| buf.capacity() < decoded.capacity() * channels);
        if needs_buffer {
            sample_buf = Some(SampleBuffer::new(decoded.capacity() as u64, spec));
        }

        if let Some(buf) = sample_buf.as_mut() {
            buf.copy_interleaved_ref(decoded);
            mono.extend(downmix_to_mono(buf.samples(), channels));
        }
    }

    if mono.len() > limit {
        debug!(limit, decoded = mono.len(), "Clip truncated to duration cap");
        mono.truncate(limit);
    }

    if mono.is_empty() {
        return Err(DecodeError::Empty);
    }

    Ok(Waveform::new(mono, sample_rate))
}

/// Load a WAV file as mono at [`FALLBACK_SAMPLE_RATE`], reading at most
/// `max_secs` seconds
#[cfg(feature = "wav-fallback")]
pub fn decode_wav_native(path: &Path, max_secs: f64) -> Result<Waveform, DecodeError> {
    let mut reader = hound::WavReader::open(path).map_err(|e| DecodeError::Wav(e.to_string()))?;
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;
    let limit = sample_limit(spec.sample_rate, max_secs).saturating_mul(channels);

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .take(limit)
            .collect::<Result<_, _>>()
            .map_err(|e| DecodeError::Wav(e.to_string()))?,
        hound::SampleFormat::Int => {
            let scale = (1_i64 << (spec.bits_per_sample.clamp(1, 32) - 1)) as f32;
            reader
                .samples::<i32>()
                .take(limit)
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()
                .map_err(|e| DecodeError::Wav(e.to_string()))?
        }
    };

    let mono = downmix_to_mono(&interleaved, channels);
    let samples = if spec.sample_rate != FALLBACK_SAMPLE_RATE {
        resample_mono(mono, spec.sample_rate, FALLBACK_SAMPLE_RATE)?
    } else {
        mono
    };

    Ok(Waveform::new(samples, FALLBACK_SAMPLE_RATE))
}

#[cfg(not(feature = "wav-fallback"))]
pub fn decode_wav_native(_path: &Path, _max_secs: f64) -> Result<Waveform, DecodeError> {
    Err(DecodeError::Unavailable)
}

/// Resample mono PCM with rubato sinc interpolation
#[cfg(feature = "wav-fallback")]
fn resample_mono(samples: Vec<f32>, source_rate: u32, target_rate: u32) -> Result<Vec<f32>, DecodeError> {
    use rubato::{
        Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
    };

    if samples.is_empty() || source_rate == 0 {
        return Ok(Vec::new());
    }

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let ratio = target_rate as f64 / source_rate as f64;
    let num_frames = samples.len();

    let mut resampler = SincFixedIn::<f32>::new(ratio, 2.0, params, num_frames, 1)
        .map_err(|e| DecodeError::Resample(e.to_string()))?;

    let input_channels = vec![samples];
    let mut output = resampler
        .process(&input_channels, None)
        .map_err(|e| DecodeError::Resample(e.to_string()))?;

    debug!(
        "Resampled {} frames ({} Hz) → {} frames ({} Hz)",
        num_frames,
        source_rate,
        output[0].len(),
        target_rate
    );

    Ok(output.swap_remove(0))
}
