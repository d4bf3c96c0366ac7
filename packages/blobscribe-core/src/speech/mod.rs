//! Speech recognition boundary.
//!
//! The recognition engine is an external service. The rest of the crate only
//! sees the [`SpeechRecognizer`] trait: a parsed [`AudioConfig`] goes in, a
//! [`RecognitionResult`] comes out. Transport problems never escape as errors;
//! they surface as [`RecognitionResult::Canceled`] with an error code.

pub mod rest;

pub use rest::RestSpeechRecognizer;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::protocol_constants::{DEFAULT_LANGUAGE, RECOGNITION_TIMEOUT_SECS};
use crate::wav::{AudioConfig, WavError};

// ─────────────────────────────────────────────────────────────────────────────
// Error Types
// ─────────────────────────────────────────────────────────────────────────────

/// Errors that can occur while talking to the recognition service.
#[derive(Debug, Error)]
pub enum SpeechError {
    /// HTTP request to the service failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Service returned a non-success HTTP status.
    #[error("HTTP error {0}: {1}")]
    HttpStatus(u16, String),

    /// Failed to parse the service response.
    #[error("Failed to parse recognition response: {0}")]
    Parse(String),

    /// Configured endpoint is not a valid URL.
    #[error("Invalid recognition endpoint: {0}")]
    InvalidEndpoint(String),

    /// Reading audio from the pull stream failed.
    #[error("Failed to read audio: {0}")]
    Audio(#[from] WavError),

    /// The blocking audio task panicked or was cancelled.
    #[error("Audio task failed: {0}")]
    Task(String),
}

/// Convenient Result alias for speech operations.
pub type SpeechResult<T> = Result<T, SpeechError>;

impl SpeechError {
    /// Returns true if this error is transient and the request should be retried.
    ///
    /// Throttling (429), server-side failures and network timeouts are transient.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            SpeechError::HttpStatus(status, _) => matches!(status, 429 | 500 | 502 | 503 | 504),
            SpeechError::Http(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }

    /// Maps the error to the cancellation code reported to callers.
    #[must_use]
    pub fn cancellation_code(&self) -> CancellationErrorCode {
        match self {
            SpeechError::HttpStatus(400, _) => CancellationErrorCode::BadRequest,
            SpeechError::HttpStatus(401, _) => CancellationErrorCode::AuthenticationFailure,
            SpeechError::HttpStatus(403, _) => CancellationErrorCode::Forbidden,
            SpeechError::HttpStatus(429, _) => CancellationErrorCode::TooManyRequests,
            SpeechError::HttpStatus(408 | 504, _) => CancellationErrorCode::ServiceTimeout,
            SpeechError::HttpStatus(status, _) if *status >= 500 => {
                CancellationErrorCode::ServiceError
            }
            SpeechError::HttpStatus(_, _) => CancellationErrorCode::BadRequest,
            SpeechError::Http(e) if e.is_timeout() => CancellationErrorCode::ServiceTimeout,
            SpeechError::Http(_) => CancellationErrorCode::ConnectionFailure,
            SpeechError::Parse(_) => CancellationErrorCode::ServiceError,
            SpeechError::InvalidEndpoint(_) | SpeechError::Audio(_) | SpeechError::Task(_) => {
                CancellationErrorCode::RuntimeError
            }
        }
    }
}

impl crate::retry::Transient for SpeechError {
    fn is_transient(&self) -> bool {
        SpeechError::is_transient(self)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Credentials and options for the recognition service.
///
/// The key is redacted from `Debug` output.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    /// Subscription key sent with every request.
    pub subscription_key: String,

    /// Service region (e.g. `westeurope`). Used to build the endpoint.
    pub region: String,

    /// Recognition language (BCP-47).
    pub language: String,

    /// Base URL overriding the region endpoint (sovereign clouds, proxies, tests).
    pub endpoint: Option<String>,

    /// Per-request timeout (seconds).
    pub timeout_secs: u64,
}

impl SpeechConfig {
    /// Creates a configuration from a subscription key and region.
    pub fn from_subscription(subscription_key: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            subscription_key: subscription_key.into(),
            region: region.into(),
            ..Default::default()
        }
    }

    /// Base URL of the recognition service, without a trailing slash.
    pub fn base_url(&self) -> String {
        match &self.endpoint {
            Some(endpoint) => endpoint.trim_end_matches('/').to_string(),
            None => format!("https://{}.stt.speech.microsoft.com", self.region),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Validates the configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.subscription_key.trim().is_empty() {
            return Err("speech subscription key must be set".to_string());
        }
        if self.endpoint.is_none() && self.region.trim().is_empty() {
            return Err("speech region must be set when no endpoint is configured".to_string());
        }
        if self.language.trim().is_empty() {
            return Err("speech language must not be empty".to_string());
        }
        if self.timeout_secs == 0 {
            return Err("speech timeout_secs must be >= 1".to_string());
        }
        Ok(())
    }
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            subscription_key: String::new(),
            region: String::new(),
            language: DEFAULT_LANGUAGE.to_string(),
            endpoint: None,
            timeout_secs: RECOGNITION_TIMEOUT_SECS,
        }
    }
}

impl fmt::Debug for SpeechConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let key = if self.subscription_key.is_empty() {
            "<unset>"
        } else {
            "<redacted>"
        };
        f.debug_struct("SpeechConfig")
            .field("subscription_key", &key)
            .field("region", &self.region)
            .field("language", &self.language)
            .field("endpoint", &self.endpoint)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Results
// ─────────────────────────────────────────────────────────────────────────────

/// Outcome of a single-utterance recognition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionResult {
    /// Speech was recognized.
    RecognizedSpeech {
        text: String,
        /// Start of the utterance within the audio.
        offset: Duration,
        /// Length of the utterance.
        duration: Duration,
    },

    /// Audio was processed but nothing could be recognized.
    NoMatch(NoMatchReason),

    /// Recognition did not complete.
    Canceled(CancellationDetails),
}

impl RecognitionResult {
    /// Cancellation result describing a failed request.
    pub fn canceled_by(error: &SpeechError) -> Self {
        Self::Canceled(CancellationDetails {
            reason: CancellationReason::Error,
            error_code: error.cancellation_code(),
            error_details: error.to_string(),
        })
    }
}

/// Why nothing was recognized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoMatchReason {
    /// Speech was detected but not recognized.
    NotRecognized,
    /// The audio started with silence for too long.
    InitialSilenceTimeout,
    /// The audio started with noise for too long.
    InitialBabbleTimeout,
}

/// Why recognition was canceled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancellationReason {
    /// The request failed; see the error code and details.
    Error,
    /// The audio stream ended before anything could be sent.
    EndOfStream,
}

impl fmt::Display for CancellationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Error => "Error",
            Self::EndOfStream => "EndOfStream",
        })
    }
}

/// Machine-readable cause of a cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancellationErrorCode {
    NoError,
    AuthenticationFailure,
    BadRequest,
    TooManyRequests,
    Forbidden,
    ConnectionFailure,
    ServiceTimeout,
    ServiceError,
    RuntimeError,
}

impl fmt::Display for CancellationErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Details attached to [`RecognitionResult::Canceled`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancellationDetails {
    pub reason: CancellationReason,
    pub error_code: CancellationErrorCode,
    pub error_details: String,
}

impl CancellationDetails {
    /// Cancellation for an audio stream that held no samples.
    pub fn end_of_stream() -> Self {
        Self {
            reason: CancellationReason::EndOfStream,
            error_code: CancellationErrorCode::NoError,
            error_details: "audio stream contained no samples".to_string(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Recognizer Trait
// ─────────────────────────────────────────────────────────────────────────────

/// Trait for single-shot speech recognition.
///
/// Implementations take ownership of the audio stream and must release it
/// (drop or close) before returning.
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    /// Recognizes the first utterance in `audio`.
    async fn recognize_once(&self, audio: AudioConfig) -> RecognitionResult;
}
