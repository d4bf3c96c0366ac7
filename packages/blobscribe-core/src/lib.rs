//! Blobscribe Core - transcription of stored audio blobs.
//!
//! When a WAV file lands in the input container it is parsed, handed to a
//! remote speech-recognition service, and the transcript (or the reason
//! there is none) is written to the output container as `{name}.json`.
//!
//! # Architecture
//!
//! - [`wav`]: WAV header parsing, PCM pull stream and push sink
//! - [`speech`]: Recognizer trait, result model and the REST recognizer
//! - [`analytics`]: Sentiment, entity and key phrase analysis of transcripts
//! - [`transcript`]: Output document and result mapping
//! - [`processor`]: One blob in, one transcript out
//! - [`storage`]: Local directories acting as blob containers
//! - [`trigger`]: Polling trigger with bounded concurrency
//! - [`bootstrap`]: Composition root
//! - [`error`]: Centralized error types
//!
//! # Abstraction Traits
//!
//! - [`SpeechRecognizer`](speech::SpeechRecognizer): Recognition backend
//! - [`TextAnalyzer`](analytics::TextAnalyzer): Transcript analysis backend
//! - [`PullAudioInputStream`](wav::PullAudioInputStream): Audio the recognizer reads from
//! - [`PushAudioOutputStream`](wav::PushAudioOutputStream): Audio a producer writes into

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod analytics;
pub mod bootstrap;
pub mod config;
pub mod error;
pub mod processor;
pub mod protocol_constants;
mod retry;
pub mod speech;
pub mod storage;
pub mod transcript;
pub mod trigger;
pub mod wav;

// Re-export commonly used types at the crate root
pub use config::{Config, StorageConfig, TriggerConfig};
pub use error::{
    AnalyticsResult, BlobscribeError, BlobscribeResult, ErrorCode, SpeechResult, WavResult,
};
pub use processor::SoundFileProcessor;
pub use storage::LocalBlobStore;
pub use transcript::{write_transcript, TranscriptDocument};
pub use trigger::BlobTrigger;

// Re-export audio types
pub use wav::{
    create_wav_header, create_wav_reader, open_wav, open_wav_file, pump, read_wave_header,
    read_wave_header_with, AudioConfig, HeaderMode, PcmSinkCollector, PcmStreamAdapter,
    PullAudioInputStream, PushAudioOutputStream, WavError, WaveFormat,
};

// Re-export speech types
pub use speech::{
    CancellationDetails, CancellationErrorCode, CancellationReason, NoMatchReason,
    RecognitionResult, RestSpeechRecognizer, SpeechConfig, SpeechError, SpeechRecognizer,
};

// Re-export analytics types
pub use analytics::{
    AnalysisKind, AnalyticsError, EntityDocument, KeyPhraseDocument, RestTextAnalyzer,
    SentimentDocument, TextAnalyticsConfig, TextAnalyzer,
};

// Re-export bootstrap types
pub use bootstrap::{
    bootstrap_services, bootstrap_with_backends, bootstrap_with_recognizer, BootstrappedServices,
};
