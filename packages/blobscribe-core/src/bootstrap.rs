//! Application bootstrap and dependency wiring.
//!
//! This module is the composition root: the HTTP client, recognizer,
//! analyzer, processor and trigger are created and wired together here and
//! nowhere else. Tests swap the backends through [`bootstrap_with_backends`].

use std::sync::Arc;

use reqwest::Client;
use tokio_util::sync::CancellationToken;

use crate::analytics::{RestTextAnalyzer, TextAnalyzer};
use crate::config::Config;
use crate::error::{BlobscribeError, BlobscribeResult};
use crate::processor::SoundFileProcessor;
use crate::speech::{RestSpeechRecognizer, SpeechRecognizer};
use crate::storage::LocalBlobStore;
use crate::trigger::BlobTrigger;

/// Container for all bootstrapped services.
#[derive(Clone)]
pub struct BootstrappedServices {
    /// Recognition backend.
    pub recognizer: Arc<dyn SpeechRecognizer>,
    /// Transcript analysis backend, when configured.
    pub analyzer: Option<Arc<dyn TextAnalyzer>>,
    /// Turns blobs into transcripts.
    pub processor: Arc<SoundFileProcessor>,
    /// Polls the input container.
    pub trigger: Arc<BlobTrigger>,
    /// Cancellation token for graceful shutdown.
    pub cancel_token: CancellationToken,
}

impl BootstrappedServices {
    /// Runs the trigger until shutdown is requested.
    pub async fn run(&self) {
        self.trigger.run(self.cancel_token.clone()).await;
    }

    /// Processes everything pending once and returns the transcript count.
    ///
    /// New transcripts are analyzed before returning when an analyzer is set.
    pub async fn run_once(&self) -> BlobscribeResult<usize> {
        let written = self.trigger.run_once().await?;
        let analyzed = self.trigger.analyze_once().await?;
        if analyzed > 0 {
            log::info!("[Bootstrap] Analyzed {} transcript(s)", analyzed);
        }
        Ok(written)
    }

    /// Initiates graceful shutdown of all services.
    pub async fn shutdown(&self) {
        log::info!("[Bootstrap] Beginning graceful shutdown...");

        self.cancel_token.cancel();

        let in_flight = self.trigger.in_flight_count();
        if in_flight > 0 {
            log::info!("[Bootstrap] Waiting on {} blob(s) in flight", in_flight);
        }

        log::info!("[Bootstrap] Shutdown complete");
    }
}

/// Creates the shared HTTP client for all service requests.
///
/// Per-request timeouts come from the speech and analytics configs.
fn create_http_client() -> BlobscribeResult<Client> {
    Client::builder()
        .build()
        .map_err(|e| BlobscribeError::Internal(format!("Failed to create HTTP client: {}", e)))
}

/// Bootstraps all services with the REST backends.
///
/// # Errors
///
/// Returns an error if the configuration is invalid, the storage
/// directories cannot be created or the HTTP client fails to build.
pub fn bootstrap_services(config: &Config) -> BlobscribeResult<BootstrappedServices> {
    config.validate().map_err(BlobscribeError::Configuration)?;

    let http_client = create_http_client()?;
    let recognizer: Arc<dyn SpeechRecognizer> = Arc::new(RestSpeechRecognizer::new(
        http_client.clone(),
        config.speech.clone(),
    ));
    log::info!(
        "[Bootstrap] Recognizer: {} ({})",
        config.speech.base_url(),
        config.speech.language
    );

    let analyzer = config.text_analytics.as_ref().map(|analytics| {
        log::info!(
            "[Bootstrap] Text analytics: {} ({})",
            analytics.endpoint,
            analytics.language
        );
        Arc::new(RestTextAnalyzer::new(http_client.clone(), analytics.clone()))
            as Arc<dyn TextAnalyzer>
    });

    bootstrap_with_backends(config, recognizer, analyzer)
}

/// Bootstraps all services around an existing recognizer, without analysis.
pub fn bootstrap_with_recognizer(
    config: &Config,
    recognizer: Arc<dyn SpeechRecognizer>,
) -> BlobscribeResult<BootstrappedServices> {
    bootstrap_with_backends(config, recognizer, None)
}

/// Bootstraps all services around existing backends.
///
/// Wiring order: storage, processor (depends on recognizer), trigger
/// (depends on storage, processor and analyzer).
pub fn bootstrap_with_backends(
    config: &Config,
    recognizer: Arc<dyn SpeechRecognizer>,
    analyzer: Option<Arc<dyn TextAnalyzer>>,
) -> BlobscribeResult<BootstrappedServices> {
    config
        .trigger
        .validate()
        .map_err(BlobscribeError::Configuration)?;

    let store = LocalBlobStore::from_config(&config.storage);
    store.ensure_dirs()?;
    log::info!(
        "[Bootstrap] Input: {}, output: {}",
        store.input_dir().display(),
        store.output_dir().display()
    );

    let processor = Arc::new(SoundFileProcessor::new(
        Arc::clone(&recognizer),
        config.header_mode,
    ));
    let mut trigger = BlobTrigger::new(store, Arc::clone(&processor), config.trigger.clone());
    if let Some(analyzer) = &analyzer {
        trigger = trigger.with_analyzer(Arc::clone(analyzer));
    }
    let trigger = Arc::new(trigger);

    Ok(BootstrappedServices {
        recognizer,
        analyzer,
        processor,
        trigger,
        cancel_token: CancellationToken::new(),
    })
}
