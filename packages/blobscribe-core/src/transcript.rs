//! JSON transcript document written next to each processed blob.

use std::io::{self, Write};

use serde::{Deserialize, Serialize};

use crate::speech::{CancellationDetails, CancellationReason, RecognitionResult};

/// Message stored when the service heard audio but recognized nothing.
pub const NO_MATCH_MESSAGE: &str = "Speech could not be recognized.";

/// Output document: `{ "Text": ..., "ErrorMessage": ... }`.
///
/// At most one field is non-empty. A canceled recognition is reported in
/// `Text` as `CANCELED: Reason=...`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptDocument {
    #[serde(rename = "Text", default)]
    pub text: String,
    #[serde(rename = "ErrorMessage", default)]
    pub error_message: String,
}

impl TranscriptDocument {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            error_message: String::new(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            text: String::new(),
            error_message: message.into(),
        }
    }

    pub fn is_failure(&self) -> bool {
        !self.error_message.is_empty()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl From<&RecognitionResult> for TranscriptDocument {
    fn from(result: &RecognitionResult) -> Self {
        match result {
            RecognitionResult::RecognizedSpeech { text, .. } => Self::success(text.clone()),
            RecognitionResult::NoMatch(reason) => {
                log::info!("[Transcript] No match: {:?}", reason);
                Self::failure(NO_MATCH_MESSAGE)
            }
            RecognitionResult::Canceled(details) => {
                let diagnostics = cancellation_diagnostics(details);
                if diagnostics.is_empty() {
                    log::info!("[Transcript] CANCELED: Reason={}", details.reason);
                }
                for line in diagnostics {
                    log::error!("[Transcript] {}", line);
                }
                Self::success(format!("CANCELED: Reason={}", details.reason))
            }
        }
    }
}

/// Error-level log lines for a cancellation; empty unless the request failed.
fn cancellation_diagnostics(details: &CancellationDetails) -> Vec<String> {
    if details.reason != CancellationReason::Error {
        return Vec::new();
    }
    vec![
        format!("CANCELED: ErrorCode={}", details.error_code),
        format!("CANCELED: ErrorDetails={}", details.error_details),
        "CANCELED: Did you update the subscription info?".to_string(),
    ]
}

impl From<RecognitionResult> for TranscriptDocument {
    fn from(result: RecognitionResult) -> Self {
        Self::from(&result)
    }
}

/// Writes `doc` as pretty-printed JSON followed by a newline.
pub fn write_transcript<W: Write>(mut writer: W, doc: &TranscriptDocument) -> io::Result<()> {
    let json = doc.to_json()?;
    writer.write_all(json.as_bytes())?;
    writer.write_all(b"\n")
}
