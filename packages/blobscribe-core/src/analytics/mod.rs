//! Text analytics over finished transcripts.
//!
//! Every transcript with recognized text is sent through three analyses:
//! sentiment, named entities and key phrases. Each produces its own JSON
//! document carrying the analyzed text and the transcript it came from.
//! The service sits behind the [`TextAnalyzer`] trait.

pub mod rest;

pub use rest::RestTextAnalyzer;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::protocol_constants::{ANALYTICS_TIMEOUT_SECS, DEFAULT_ANALYTICS_LANGUAGE};

// ─────────────────────────────────────────────────────────────────────────────
// Error Types
// ─────────────────────────────────────────────────────────────────────────────

/// Errors that can occur while talking to the text analytics service.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// HTTP request to the service failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Service returned a non-success HTTP status.
    #[error("HTTP error {0}: {1}")]
    HttpStatus(u16, String),

    /// Configured endpoint is not a valid URL.
    #[error("Invalid analytics endpoint: {0}")]
    InvalidEndpoint(String),

    /// The service rejected the document itself.
    #[error("Document rejected ({code}): {message}")]
    Document { code: String, message: String },

    /// The response held neither a result nor an error for the document.
    #[error("No result for the analyzed document")]
    MissingResult,
}

/// Convenient Result alias for analytics operations.
pub type AnalyticsResult<T> = Result<T, AnalyticsError>;

impl AnalyticsError {
    /// Returns true if this error is transient and the request should be retried.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::HttpStatus(status, _) => matches!(status, 429 | 500 | 502 | 503 | 504),
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}

impl crate::retry::Transient for AnalyticsError {
    fn is_transient(&self) -> bool {
        AnalyticsError::is_transient(self)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Credentials and options for the text analytics service.
///
/// The key is redacted from `Debug` output.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct TextAnalyticsConfig {
    /// Key sent with every request.
    pub api_key: String,

    /// Resource endpoint, e.g. `https://myresource.cognitiveservices.azure.com`.
    pub endpoint: String,

    /// Language of the analyzed documents (ISO 639-1).
    pub language: String,

    /// Per-request timeout (seconds).
    pub timeout_secs: u64,
}

impl TextAnalyticsConfig {
    pub fn new(api_key: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Validates the configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.api_key.trim().is_empty() {
            return Err("text analytics api key must be set".to_string());
        }
        if self.endpoint.trim().is_empty() {
            return Err("text analytics endpoint must be set".to_string());
        }
        if self.language.trim().is_empty() {
            return Err("text analytics language must not be empty".to_string());
        }
        if self.timeout_secs == 0 {
            return Err("text analytics timeout_secs must be >= 1".to_string());
        }
        Ok(())
    }
}

impl Default for TextAnalyticsConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            endpoint: String::new(),
            language: DEFAULT_ANALYTICS_LANGUAGE.to_string(),
            timeout_secs: ANALYTICS_TIMEOUT_SECS,
        }
    }
}

impl fmt::Debug for TextAnalyticsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let key = if self.api_key.is_empty() {
            "<unset>"
        } else {
            "<redacted>"
        };
        f.debug_struct("TextAnalyticsConfig")
            .field("api_key", &key)
            .field("endpoint", &self.endpoint)
            .field("language", &self.language)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Result Documents
// ─────────────────────────────────────────────────────────────────────────────

/// The three analyses run on each transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnalysisKind {
    Sentiment,
    Entities,
    KeyPhrases,
}

impl AnalysisKind {
    pub const ALL: [AnalysisKind; 3] = [Self::Sentiment, Self::Entities, Self::KeyPhrases];

    /// Name segment used in result blob names.
    pub fn suffix(self) -> &'static str {
        match self {
            Self::Sentiment => "sentiment",
            Self::Entities => "entities",
            Self::KeyPhrases => "keyphrases",
        }
    }
}

impl fmt::Display for AnalysisKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

/// Positive, negative and neutral confidence, each in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SentimentScores {
    pub positive: f64,
    pub negative: f64,
    pub neutral: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentenceSentiment {
    pub sentence_sentiment: String,
    pub score: SentimentScores,
}

/// Sentiment of a transcript as a whole and per sentence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentimentDocument {
    /// The analyzed text, as a one-element batch.
    pub document: Vec<String>,
    /// Transcript the text was read from.
    pub source: String,
    pub document_sentiment: String,
    pub overall_score: SentimentScores,
    pub sentences: Vec<SentenceSentiment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamedEntity {
    pub text: String,
    pub category: String,
    pub sub_category: Option<String>,
    /// Rounded to two decimals.
    pub confidence_score: f64,
}

/// Named entities found in a transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityDocument {
    pub document: Vec<String>,
    pub source: String,
    pub entities: Vec<NamedEntity>,
}

/// Key phrases extracted from a transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyPhraseDocument {
    pub document: Vec<String>,
    pub source: String,
    pub key_phrases: Vec<String>,
}

/// Rounds a confidence score to two decimals.
pub(crate) fn round_score(score: f64) -> f64 {
    (score * 100.0).round() / 100.0
}

// ─────────────────────────────────────────────────────────────────────────────
// Analyzer Trait
// ─────────────────────────────────────────────────────────────────────────────

/// Backend that analyzes a single text.
///
/// `source` names the transcript the text came from and is copied into the
/// result document.
#[async_trait]
pub trait TextAnalyzer: Send + Sync {
    async fn analyze_sentiment(&self, text: &str, source: &str)
        -> AnalyticsResult<SentimentDocument>;

    async fn recognize_entities(&self, text: &str, source: &str)
        -> AnalyticsResult<EntityDocument>;

    async fn extract_key_phrases(
        &self,
        text: &str,
        source: &str,
    ) -> AnalyticsResult<KeyPhraseDocument>;
}

/// All three result documents for one transcript.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptAnalysis {
    pub sentiment: SentimentDocument,
    pub entities: EntityDocument,
    pub key_phrases: KeyPhraseDocument,
}

/// Runs every analysis on `text`, stopping at the first failure.
pub async fn analyze_text(
    analyzer: &dyn TextAnalyzer,
    text: &str,
    source: &str,
) -> AnalyticsResult<TranscriptAnalysis> {
    let sentiment = analyzer.analyze_sentiment(text, source).await?;
    let entities = analyzer.recognize_entities(text, source).await?;
    let key_phrases = analyzer.extract_key_phrases(text, source).await?;
    log::debug!(
        "[Analytics] {}: {} sentiment, {} entities, {} key phrases",
        source,
        sentiment.document_sentiment,
        entities.entities.len(),
        key_phrases.key_phrases.len()
    );
    Ok(TranscriptAnalysis {
        sentiment,
        entities,
        key_phrases,
    })
}
