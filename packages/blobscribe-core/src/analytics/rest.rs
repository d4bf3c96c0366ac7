//! Analyzer backed by the text analytics v3.1 REST API.
//!
//! Each analysis is one POST carrying a single-document batch. The first
//! document (or the first per-document error) of the response is mapped to
//! the matching result document.

use std::time::Instant;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::{
    round_score, AnalysisKind, AnalyticsError, AnalyticsResult, EntityDocument,
    KeyPhraseDocument, NamedEntity, SentenceSentiment, SentimentDocument, SentimentScores,
    TextAnalyticsConfig, TextAnalyzer,
};
use crate::protocol_constants::{
    ENTITIES_PATH, KEY_PHRASES_PATH, SENTIMENT_PATH, SUBSCRIPTION_KEY_HEADER, TEXT_ANALYTICS_PATH,
};
use crate::retry::with_retry;

/// Id of the only document in each request batch.
const DOCUMENT_ID: &str = "1";

/// Text analyzer that calls the REST API.
pub struct RestTextAnalyzer {
    client: Client,
    config: TextAnalyticsConfig,
}

impl RestTextAnalyzer {
    /// Creates an analyzer using a shared HTTP client.
    pub fn new(client: Client, config: TextAnalyticsConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &TextAnalyticsConfig {
        &self.config
    }

    /// Full URL of the operation behind `kind`.
    pub fn operation_url(&self, kind: AnalysisKind) -> AnalyticsResult<Url> {
        let path = match kind {
            AnalysisKind::Sentiment => SENTIMENT_PATH,
            AnalysisKind::Entities => ENTITIES_PATH,
            AnalysisKind::KeyPhrases => KEY_PHRASES_PATH,
        };
        let url = format!(
            "{}{}{}",
            self.config.endpoint.trim_end_matches('/'),
            TEXT_ANALYTICS_PATH,
            path
        );
        Url::parse(&url).map_err(|e| AnalyticsError::InvalidEndpoint(format!("{}: {}", url, e)))
    }

    /// Posts `text` to the `kind` operation and returns its document result.
    async fn analyze<D: DeserializeOwned>(
        &self,
        kind: AnalysisKind,
        text: &str,
    ) -> AnalyticsResult<D> {
        let url = self.operation_url(kind)?;
        let request = BatchRequest {
            documents: [InputDocument {
                id: DOCUMENT_ID,
                language: &self.config.language,
                text,
            }],
        };

        let action = kind.to_string();
        let batch: BatchResponse<D> =
            with_retry("Analytics", &action, || self.send_request(&url, &request)).await?;
        batch.into_document()
    }

    async fn send_request<D: DeserializeOwned>(
        &self,
        url: &Url,
        request: &BatchRequest<'_>,
    ) -> AnalyticsResult<BatchResponse<D>> {
        log::info!("[Analytics] POST {}", url.path());

        let start = Instant::now();
        let res = self
            .client
            .post(url.clone())
            .header(SUBSCRIPTION_KEY_HEADER, &self.config.api_key)
            .header(ACCEPT, "application/json")
            .json(request)
            .timeout(self.config.timeout())
            .send()
            .await;

        log::info!(
            "[Analytics] Request completed in {:?}: {:?}",
            start.elapsed(),
            res.as_ref().map(|r| r.status())
        );

        let res = res?;
        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(AnalyticsError::HttpStatus(status.as_u16(), body));
        }

        Ok(res.json().await?)
    }
}

#[async_trait]
impl TextAnalyzer for RestTextAnalyzer {
    async fn analyze_sentiment(
        &self,
        text: &str,
        source: &str,
    ) -> AnalyticsResult<SentimentDocument> {
        let result: SentimentResult = self.analyze(AnalysisKind::Sentiment, text).await?;
        Ok(SentimentDocument {
            document: vec![text.to_string()],
            source: source.to_string(),
            document_sentiment: result.sentiment,
            overall_score: result.confidence_scores,
            sentences: result
                .sentences
                .into_iter()
                .map(|s| SentenceSentiment {
                    sentence_sentiment: s.sentiment,
                    score: s.confidence_scores,
                })
                .collect(),
        })
    }

    async fn recognize_entities(
        &self,
        text: &str,
        source: &str,
    ) -> AnalyticsResult<EntityDocument> {
        let result: EntitiesResult = self.analyze(AnalysisKind::Entities, text).await?;
        Ok(EntityDocument {
            document: vec![text.to_string()],
            source: source.to_string(),
            entities: result
                .entities
                .into_iter()
                .map(|e| NamedEntity {
                    text: e.text,
                    category: e.category,
                    sub_category: e.subcategory,
                    confidence_score: round_score(e.confidence_score),
                })
                .collect(),
        })
    }

    async fn extract_key_phrases(
        &self,
        text: &str,
        source: &str,
    ) -> AnalyticsResult<KeyPhraseDocument> {
        let result: KeyPhrasesResult = self.analyze(AnalysisKind::KeyPhrases, text).await?;
        Ok(KeyPhraseDocument {
            document: vec![text.to_string()],
            source: source.to_string(),
            key_phrases: result.key_phrases,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Wire Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct BatchRequest<'a> {
    documents: [InputDocument<'a>; 1],
}

#[derive(Debug, Serialize)]
struct InputDocument<'a> {
    id: &'a str,
    language: &'a str,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "D: Deserialize<'de>"))]
struct BatchResponse<D> {
    #[serde(default)]
    documents: Vec<D>,
    #[serde(default)]
    errors: Vec<DocumentError>,
}

impl<D> BatchResponse<D> {
    fn into_document(self) -> AnalyticsResult<D> {
        if let Some(doc) = self.documents.into_iter().next() {
            return Ok(doc);
        }
        match self.errors.into_iter().next() {
            Some(err) => Err(AnalyticsError::Document {
                code: err.error.code,
                message: err.error.message,
            }),
            None => Err(AnalyticsError::MissingResult),
        }
    }
}

#[derive(Debug, Deserialize)]
struct DocumentError {
    error: ServiceError,
}

#[derive(Debug, Deserialize)]
struct ServiceError {
    code: String,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SentimentResult {
    sentiment: String,
    confidence_scores: SentimentScores,
    #[serde(default)]
    sentences: Vec<SentenceResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SentenceResult {
    sentiment: String,
    confidence_scores: SentimentScores,
}

#[derive(Debug, Deserialize)]
struct EntitiesResult {
    #[serde(default)]
    entities: Vec<EntityResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EntityResult {
    text: String,
    category: String,
    #[serde(default)]
    subcategory: Option<String>,
    confidence_score: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KeyPhrasesResult {
    #[serde(default)]
    key_phrases: Vec<String>,
}
