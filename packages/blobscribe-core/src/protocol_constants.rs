//! Fixed protocol constants that should NOT be changed.
//!
//! These values are defined by external specifications (RIFF/WAVE, the speech
//! REST endpoint) and changing them would break compatibility.

// ─────────────────────────────────────────────────────────────────────────────
// RIFF / WAVE
// ─────────────────────────────────────────────────────────────────────────────

/// Tag opening every RIFF container.
pub const RIFF_TAG: [u8; 4] = *b"RIFF";

/// Form type identifying a RIFF container as WAVE audio.
pub const WAVE_TAG: [u8; 4] = *b"WAVE";

/// Format subchunk tag (the trailing space is significant).
pub const FMT_TAG: [u8; 4] = *b"fmt ";

/// Data subchunk tag.
pub const DATA_TAG: [u8; 4] = *b"data";

/// Size of the mandatory part of the `fmt ` chunk (bytes).
///
/// Anything the header declares beyond this is an extension and is skipped.
pub const FMT_CHUNK_BASE_SIZE: u32 = 16;

/// Length of a canonical PCM WAV header (RIFF + fmt(16) + data headers).
pub const CANONICAL_HEADER_LEN: usize = 44;

/// `WAVE_FORMAT_PCM` format tag.
pub const PCM_FORMAT_TAG: u16 = 1;

/// Maximum size indicator for WAV streams (4,294,967,295 bytes / ~4.3 GB).
///
/// Written into RIFF/data size fields when the payload length is unknown.
pub const WAV_STREAM_SIZE_MAX: u32 = u32::MAX;

// ─────────────────────────────────────────────────────────────────────────────
// Speech REST endpoint
// ─────────────────────────────────────────────────────────────────────────────

/// Path of the short-audio recognition endpoint.
pub const RECOGNITION_PATH: &str = "/speech/recognition/conversation/cognitiveservices/v1";

/// Header carrying the subscription key.
pub const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";

/// Recognition language used when none is configured.
pub const DEFAULT_LANGUAGE: &str = "en-US";

/// Timeout for a single recognition HTTP request (seconds).
///
/// Short-audio recognition accepts up to 60 seconds of audio, so the service
/// may legitimately take a while to answer.
pub const RECOGNITION_TIMEOUT_SECS: u64 = 60;

/// Number of bytes pulled from the audio source per read.
///
/// 3200 bytes is 100ms of 16kHz mono 16-bit PCM.
pub const PULL_CHUNK_SIZE: usize = 3200;

/// Length of one offset/duration tick reported by the service (nanoseconds).
pub const TICK_NANOS: u64 = 100;

// ─────────────────────────────────────────────────────────────────────────────
// Text Analytics REST
// ─────────────────────────────────────────────────────────────────────────────

/// Versioned prefix of every text analytics operation.
pub const TEXT_ANALYTICS_PATH: &str = "/text/analytics/v3.1";

/// Sentiment analysis operation, relative to [`TEXT_ANALYTICS_PATH`].
pub const SENTIMENT_PATH: &str = "/sentiment";

/// General named-entity recognition operation.
pub const ENTITIES_PATH: &str = "/entities/recognition/general";

/// Key phrase extraction operation.
pub const KEY_PHRASES_PATH: &str = "/keyPhrases";

/// Language sent with analytics documents when none is configured.
pub const DEFAULT_ANALYTICS_LANGUAGE: &str = "en";

/// Timeout for a single analytics HTTP request (seconds).
pub const ANALYTICS_TIMEOUT_SECS: u64 = 30;

// ─────────────────────────────────────────────────────────────────────────────
// Storage
// ─────────────────────────────────────────────────────────────────────────────

/// Extension appended to a blob name to form its transcript blob name.
pub const TRANSCRIPT_EXTENSION: &str = "json";

/// Extension of analysis result blobs.
pub const ANALYSIS_EXTENSION: &str = "json";
