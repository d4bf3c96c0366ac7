//! Recognizer backed by the short-audio speech-to-text REST endpoint.
//!
//! The endpoint takes a whole WAV file per request, so the PCM stream is
//! drained on a blocking thread first and re-wrapped in a canonical header.
//! For high-level usage see [`SpeechRecognizer`].

use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Url};
use serde::Deserialize;

use super::{
    CancellationDetails, CancellationErrorCode, CancellationReason, NoMatchReason,
    RecognitionResult, SpeechConfig, SpeechError, SpeechRecognizer, SpeechResult,
};
use crate::protocol_constants::{
    CANONICAL_HEADER_LEN, PULL_CHUNK_SIZE, RECOGNITION_PATH, SUBSCRIPTION_KEY_HEADER, TICK_NANOS,
    WAV_STREAM_SIZE_MAX,
};
use crate::error::ErrorCode;
use crate::retry::with_retry;
use crate::wav::{pump, AudioConfig, PcmSinkCollector, PullAudioInputStream, PushAudioOutputStream, WaveFormat};

/// Speech recognizer that posts audio to the REST endpoint.
pub struct RestSpeechRecognizer {
    client: Client,
    config: SpeechConfig,
}

impl RestSpeechRecognizer {
    /// Creates a recognizer using a shared HTTP client.
    pub fn new(client: Client, config: SpeechConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &SpeechConfig {
        &self.config
    }

    /// Full recognition URL including the query string.
    pub fn recognition_url(&self) -> SpeechResult<Url> {
        let base = format!("{}{}", self.config.base_url(), RECOGNITION_PATH);
        Url::parse_with_params(
            &base,
            &[
                ("language", self.config.language.as_str()),
                ("format", "simple"),
            ],
        )
        .map_err(|e| SpeechError::InvalidEndpoint(format!("{}: {}", base, e)))
    }

    async fn try_recognize(&self, audio: AudioConfig) -> SpeechResult<RecognitionResult> {
        let (format, pcm) = collect_audio(audio).await?;
        if pcm.is_empty() {
            log::warn!("[Speech] Audio stream held no samples, nothing to recognize");
            return Ok(RecognitionResult::Canceled(
                CancellationDetails::end_of_stream(),
            ));
        }

        let url = self.recognition_url()?;
        let body = wav_body(&format, &pcm);

        let response =
            with_retry("Speech", "recognize", || self.send_request(&url, &format, body.clone())).await?;
        Ok(response.into_result())
    }

    async fn send_request(
        &self,
        url: &Url,
        format: &WaveFormat,
        body: Bytes,
    ) -> SpeechResult<SimpleRecognitionResponse> {
        log::info!(
            "[Speech] POST {} ({} bytes, {})",
            url.path(),
            body.len(),
            format
        );

        let start = Instant::now();
        let res = self
            .client
            .post(url.clone())
            .header(SUBSCRIPTION_KEY_HEADER, &self.config.subscription_key)
            .header(CONTENT_TYPE, content_type(format))
            .header(ACCEPT, "application/json")
            .body(body)
            .timeout(self.config.timeout())
            .send()
            .await;

        log::info!(
            "[Speech] Recognition request completed in {:?}: {:?}",
            start.elapsed(),
            res.as_ref().map(|r| r.status())
        );

        let res = res?;
        let status = res.status();
        let response_text = res.text().await?;

        if !status.is_success() {
            return Err(SpeechError::HttpStatus(status.as_u16(), response_text));
        }

        parse_response(&response_text)
    }
}

#[async_trait]
impl SpeechRecognizer for RestSpeechRecognizer {
    async fn recognize_once(&self, audio: AudioConfig) -> RecognitionResult {
        match self.try_recognize(audio).await {
            Ok(result) => result,
            Err(e) => {
                log::warn!("[Speech] Recognition failed ({}): {}", e.code(), e);
                RecognitionResult::canceled_by(&e)
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Audio Upload
// ─────────────────────────────────────────────────────────────────────────────

/// Pulls every PCM byte out of `audio` and releases the stream.
async fn collect_audio(audio: AudioConfig) -> SpeechResult<(WaveFormat, Bytes)> {
    let collected = tokio::task::spawn_blocking(move || {
        let (format, mut stream) = audio.into_parts();
        let mut sink = PcmSinkCollector::with_capacity(format.byte_rate() as usize);
        let pumped = pump(&mut stream, &mut sink, PULL_CHUNK_SIZE);
        stream.close();
        sink.close();
        pumped.map(|total| {
            log::debug!("[Speech] Collected {} PCM bytes ({})", total, format);
            (format, sink.into_bytes())
        })
    })
    .await
    .map_err(|e| SpeechError::Task(e.to_string()))?;

    Ok(collected?)
}

/// Content type announcing PCM WAV at the format's sample rate.
fn content_type(format: &WaveFormat) -> String {
    format!(
        "audio/wav; codecs=audio/pcm; samplerate={}",
        format.sample_rate()
    )
}

/// Canonical WAV file holding `pcm`.
fn wav_body(format: &WaveFormat, pcm: &[u8]) -> Bytes {
    let data_len = u32::try_from(pcm.len()).unwrap_or(WAV_STREAM_SIZE_MAX);
    let mut body = BytesMut::with_capacity(CANONICAL_HEADER_LEN + pcm.len());
    body.extend_from_slice(&format.encode_header(data_len));
    body.extend_from_slice(pcm);
    body.freeze()
}

// ─────────────────────────────────────────────────────────────────────────────
// Response Parsing
// ─────────────────────────────────────────────────────────────────────────────

/// Body of a `format=simple` recognition response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SimpleRecognitionResponse {
    recognition_status: String,
    #[serde(default)]
    display_text: String,
    /// Start of the utterance in 100ns ticks.
    #[serde(default)]
    offset: u64,
    /// Length of the utterance in 100ns ticks.
    #[serde(default)]
    duration: u64,
}

impl SimpleRecognitionResponse {
    fn into_result(self) -> RecognitionResult {
        match self.recognition_status.as_str() {
            "Success" => RecognitionResult::RecognizedSpeech {
                text: self.display_text,
                offset: ticks_to_duration(self.offset),
                duration: ticks_to_duration(self.duration),
            },
            "NoMatch" => RecognitionResult::NoMatch(NoMatchReason::NotRecognized),
            "InitialSilenceTimeout" => {
                RecognitionResult::NoMatch(NoMatchReason::InitialSilenceTimeout)
            }
            "BabbleTimeout" => RecognitionResult::NoMatch(NoMatchReason::InitialBabbleTimeout),
            "Error" => RecognitionResult::Canceled(CancellationDetails {
                reason: CancellationReason::Error,
                error_code: CancellationErrorCode::ServiceError,
                error_details: "recognition service reported an error".to_string(),
            }),
            other => RecognitionResult::Canceled(CancellationDetails {
                reason: CancellationReason::Error,
                error_code: CancellationErrorCode::ServiceError,
                error_details: format!("unexpected recognition status: {}", other),
            }),
        }
    }
}

fn parse_response(body: &str) -> SpeechResult<SimpleRecognitionResponse> {
    serde_json::from_str(body).map_err(|e| SpeechError::Parse(format!("{}: {}", e, body)))
}

fn ticks_to_duration(ticks: u64) -> Duration {
    Duration::from_nanos(ticks.saturating_mul(TICK_NANOS))
}
