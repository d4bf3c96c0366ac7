//! Centralized error types for the Blobscribe core library.
//!
//! Module-level errors (`WavError`, `SpeechError`, `AnalyticsError`) stay
//! close to the code that raises them. This module gives them
//! machine-readable codes. Only analytics failures cross into
//! [`BlobscribeError`]; audio and recognition problems end up in the
//! transcript document instead.

use serde::Serialize;
use thiserror::Error;

use crate::analytics::AnalyticsError;
use crate::speech::SpeechError;
use crate::wav::WavError;

/// Trait for error types that provide machine-readable error codes.
pub trait ErrorCode {
    /// Returns a machine-readable error code for logs and reports.
    fn code(&self) -> &'static str;
}

impl ErrorCode for WavError {
    fn code(&self) -> &'static str {
        match self {
            Self::MalformedHeader { .. } => "malformed_wav_header",
            Self::TruncatedStream { .. } => "truncated_wav_stream",
            Self::InvalidFormat(_) => "invalid_wav_format",
            Self::SourceUnavailable(_) => "audio_source_unavailable",
            Self::Io(_) => "audio_io_error",
        }
    }
}

impl ErrorCode for SpeechError {
    fn code(&self) -> &'static str {
        match self {
            Self::Http(_) => "http_request_failed",
            Self::HttpStatus(_, _) => "http_error_status",
            Self::Parse(_) => "recognition_parse_error",
            Self::InvalidEndpoint(_) => "invalid_recognition_endpoint",
            Self::Audio(e) => e.code(),
            Self::Task(_) => "audio_task_failed",
        }
    }
}

impl ErrorCode for AnalyticsError {
    fn code(&self) -> &'static str {
        match self {
            Self::Http(_) => "http_request_failed",
            Self::HttpStatus(_, _) => "http_error_status",
            Self::InvalidEndpoint(_) => "invalid_analytics_endpoint",
            Self::Document { .. } => "analytics_document_rejected",
            Self::MissingResult => "analytics_result_missing",
        }
    }
}

/// Application-wide error type for Blobscribe.
#[derive(Debug, Error, Serialize)]
#[serde(tag = "type", content = "details")]
pub enum BlobscribeError {
    /// Listing or reading the input container failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Writing a transcript to the output container failed.
    #[error("Output error: {0}")]
    Output(String),

    /// Analyzing a transcript failed.
    #[error("Analytics failed: {0}")]
    Analytics(String),

    /// Invalid or missing configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl BlobscribeError {
    /// Returns a machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Storage(_) => "storage_error",
            Self::Output(_) => "output_error",
            Self::Analytics(_) => "analytics_failed",
            Self::Configuration(_) => "configuration_error",
            Self::Internal(_) => "internal_error",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Result Type Aliases
// ─────────────────────────────────────────────────────────────────────────────

pub use crate::analytics::AnalyticsResult;
pub use crate::speech::SpeechResult;
pub use crate::wav::WavResult;

/// Convenient Result alias for application-wide operations.
pub type BlobscribeResult<T> = Result<T, BlobscribeError>;

impl From<AnalyticsError> for BlobscribeError {
    fn from(err: AnalyticsError) -> Self {
        Self::Analytics(err.to_string())
    }
}
