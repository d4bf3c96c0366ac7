//! Turns one audio blob into one transcript document.

use std::io::Read;
use std::sync::Arc;
use std::time::Instant;

use crate::error::ErrorCode;
use crate::speech::SpeechRecognizer;
use crate::transcript::TranscriptDocument;
use crate::wav::{open_wav, HeaderMode};

/// Parses a WAV blob and hands it to the recognizer.
///
/// Processing never fails. Header problems and unrecognized speech end up in
/// [`TranscriptDocument::error_message`]; a canceled recognition is reported
/// in the transcript text.
pub struct SoundFileProcessor {
    recognizer: Arc<dyn SpeechRecognizer>,
    header_mode: HeaderMode,
}

impl SoundFileProcessor {
    pub fn new(recognizer: Arc<dyn SpeechRecognizer>, header_mode: HeaderMode) -> Self {
        Self {
            recognizer,
            header_mode,
        }
    }

    pub fn header_mode(&self) -> HeaderMode {
        self.header_mode
    }

    /// Transcribes the blob `name` read from `input`.
    ///
    /// `size` is only used for logging.
    pub async fn process<R>(&self, name: &str, input: R, size: Option<u64>) -> TranscriptDocument
    where
        R: Read + Send + 'static,
    {
        match size {
            Some(size) => log::info!("[Processor] Processing {} ({} bytes)", name, size),
            None => log::info!("[Processor] Processing {}", name),
        }
        let start = Instant::now();

        let mode = self.header_mode;
        let opened = tokio::task::spawn_blocking(move || open_wav(input, mode)).await;

        let audio = match opened {
            Ok(Ok(audio)) => audio,
            Ok(Err(e)) => {
                log::warn!("[Processor] {} rejected ({}): {}", name, e.code(), e);
                return TranscriptDocument::failure(e.to_string());
            }
            Err(e) => {
                log::error!("[Processor] Header task for {} failed: {}", name, e);
                return TranscriptDocument::failure(format!("Internal error: {}", e));
            }
        };

        log::debug!("[Processor] {} format: {}", name, audio.format());

        let result = self.recognizer.recognize_once(audio).await;
        let doc = TranscriptDocument::from(&result);

        log::info!(
            "[Processor] Finished {} in {:?} ({})",
            name,
            start.elapsed(),
            if doc.is_failure() { "failed" } else { "ok" }
        );
        doc
    }
}
