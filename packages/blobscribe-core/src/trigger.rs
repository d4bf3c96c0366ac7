//! Polling trigger that feeds new blobs to the processor.
//!
//! Each scan lists the input container, claims blobs that are neither done
//! nor already in flight, and processes them with bounded concurrency. A
//! transcript is written for every claimed blob, success or not. With an
//! analyzer attached, transcripts with text are then analyzed the same way.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures::StreamExt;
use parking_lot::Mutex;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::analytics::{analyze_text, AnalysisKind, TextAnalyzer};
use crate::config::TriggerConfig;
use crate::error::{BlobscribeError, BlobscribeResult, ErrorCode};
use crate::processor::SoundFileProcessor;
use crate::storage::LocalBlobStore;

/// Runs blocking storage work off the async threads.
async fn blocking<T, F>(f: F) -> BlobscribeResult<T>
where
    F: FnOnce() -> BlobscribeResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| BlobscribeError::Internal(format!("storage task failed: {}", e)))?
}

/// Removes a blob from the in-flight set when processing ends.
struct InFlightGuard<'a> {
    in_flight: &'a Mutex<HashSet<String>>,
    name: String,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.in_flight.lock().remove(&self.name);
    }
}

/// Adds the names not yet in `set` and not already `done` to it.
///
/// `done` is checked under the lock since the listing may be stale.
fn claim_from<'a>(
    set: &'a Mutex<HashSet<String>>,
    pending: Vec<String>,
    done: impl Fn(&str) -> bool,
) -> Vec<InFlightGuard<'a>> {
    let mut claimed = set.lock();
    pending
        .into_iter()
        .filter(|name| {
            !claimed.contains(name) && !done(name.as_str()) && claimed.insert(name.clone())
        })
        .map(|name| InFlightGuard {
            in_flight: set,
            name,
        })
        .collect()
}

/// Watches the input container and transcribes new blobs.
pub struct BlobTrigger {
    store: LocalBlobStore,
    processor: Arc<SoundFileProcessor>,
    config: TriggerConfig,
    in_flight: Mutex<HashSet<String>>,
    analyzer: Option<Arc<dyn TextAnalyzer>>,
    analyzing: Mutex<HashSet<String>>,
    /// Transcripts that are never analyzed: no text, or rejected by the service.
    analysis_skipped: Mutex<HashSet<String>>,
}

impl BlobTrigger {
    pub fn new(
        store: LocalBlobStore,
        processor: Arc<SoundFileProcessor>,
        config: TriggerConfig,
    ) -> Self {
        Self {
            store,
            processor,
            config,
            in_flight: Mutex::new(HashSet::new()),
            analyzer: None,
            analyzing: Mutex::new(HashSet::new()),
            analysis_skipped: Mutex::new(HashSet::new()),
        }
    }

    /// Analyzes every transcript with text after it is written.
    pub fn with_analyzer(mut self, analyzer: Arc<dyn TextAnalyzer>) -> Self {
        self.analyzer = Some(analyzer);
        self
    }

    pub fn store(&self) -> &LocalBlobStore {
        &self.store
    }

    /// Number of blobs currently being processed.
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.lock().len()
    }

    /// Claims pending blobs nobody else is working on.
    ///
    /// The listing may be stale, so the transcript is checked again under the
    /// lock. Transcripts are written before a blob leaves the in-flight set.
    fn claim(&self, pending: Vec<String>) -> Vec<InFlightGuard<'_>> {
        claim_from(&self.in_flight, pending, |name| {
            self.store.output_path(name).exists()
        })
    }

    /// Processes every pending blob once.
    ///
    /// Returns the number of transcripts written. Failures of single blobs
    /// are logged and do not abort the scan.
    pub async fn run_once(&self) -> BlobscribeResult<usize> {
        let store = self.store.clone();
        let settle = self.config.settle();
        let pending = blocking(move || store.pending(settle)).await?;
        let claimed = self.claim(pending);
        if claimed.is_empty() {
            return Ok(0);
        }

        log::info!("[Trigger] Found {} new blob(s)", claimed.len());
        let written = AtomicUsize::new(0);

        futures::stream::iter(claimed)
            .for_each_concurrent(self.config.max_concurrent_jobs.max(1), |guard| {
                let written = &written;
                async move {
                    match self.process_blob(&guard.name).await {
                        Ok(()) => {
                            written.fetch_add(1, Ordering::Relaxed);
                        }
                        Err(e) => {
                            log::error!("[Trigger] {} failed ({}): {}", guard.name, e.code(), e);
                        }
                    }
                }
            })
            .await;

        Ok(written.into_inner())
    }

    async fn process_blob(&self, name: &str) -> BlobscribeResult<()> {
        let store = self.store.clone();
        let owned = name.to_string();
        let (file, size) = blocking(move || store.open_input(&owned)).await?;

        let doc = self.processor.process(name, file, Some(size)).await;

        let store = self.store.clone();
        let owned = name.to_string();
        let path = blocking(move || store.write_output(&owned, &doc)).await?;
        log::info!("[Trigger] {} -> {}", name, path.display());
        Ok(())
    }

    /// Analyzes every transcript that is missing results once.
    ///
    /// Returns the number of transcripts fully analyzed. Does nothing when no
    /// analyzer is attached. Transcripts without text and documents the
    /// service rejects are remembered and not tried again; transient failures
    /// are retried on the next scan.
    pub async fn analyze_once(&self) -> BlobscribeResult<usize> {
        let Some(analyzer) = self.analyzer.as_deref() else {
            return Ok(0);
        };

        let store = self.store.clone();
        let pending = blocking(move || store.pending_transcripts()).await?;
        let pending: Vec<String> = {
            let skipped = self.analysis_skipped.lock();
            pending
                .into_iter()
                .filter(|name| !skipped.contains(name))
                .collect()
        };
        let claimed = claim_from(&self.analyzing, pending, |name| {
            AnalysisKind::ALL
                .iter()
                .all(|kind| self.store.analysis_path(name, *kind).exists())
        });
        if claimed.is_empty() {
            return Ok(0);
        }

        log::info!("[Trigger] Analyzing {} transcript(s)", claimed.len());
        let analyzed = AtomicUsize::new(0);

        futures::stream::iter(claimed)
            .for_each_concurrent(self.config.max_concurrent_jobs.max(1), |guard| {
                let analyzed = &analyzed;
                async move {
                    match self.analyze_transcript(analyzer, &guard.name).await {
                        Ok(true) => {
                            analyzed.fetch_add(1, Ordering::Relaxed);
                        }
                        Ok(false) => {
                            self.analysis_skipped.lock().insert(guard.name.clone());
                        }
                        Err(e) => {
                            log::error!(
                                "[Trigger] Analysis of {} failed ({}): {}",
                                guard.name,
                                e.code(),
                                e
                            );
                        }
                    }
                }
            })
            .await;

        Ok(analyzed.into_inner())
    }

    /// Returns `Ok(false)` when the transcript should not be analyzed again.
    async fn analyze_transcript(
        &self,
        analyzer: &dyn TextAnalyzer,
        name: &str,
    ) -> BlobscribeResult<bool> {
        let store = self.store.clone();
        let owned = name.to_string();
        let doc = blocking(move || store.read_transcript(&owned)).await?;
        if doc.text.trim().is_empty() {
            log::debug!("[Trigger] {} has no text to analyze", name);
            return Ok(false);
        }

        let source = self.store.transcript_source(name);
        let analysis = match analyze_text(analyzer, &doc.text, &source).await {
            Ok(analysis) => analysis,
            Err(e) if e.is_transient() => return Err(e.into()),
            Err(e) => {
                log::warn!("[Trigger] {} will not be analyzed ({}): {}", name, e.code(), e);
                return Ok(false);
            }
        };

        let store = self.store.clone();
        let owned = name.to_string();
        blocking(move || {
            store.write_analysis(&owned, AnalysisKind::Sentiment, &analysis.sentiment)?;
            store.write_analysis(&owned, AnalysisKind::Entities, &analysis.entities)?;
            store.write_analysis(&owned, AnalysisKind::KeyPhrases, &analysis.key_phrases)?;
            Ok(())
        })
        .await?;
        log::info!("[Trigger] {} analyzed", name);
        Ok(true)
    }

    /// Scans the input container every poll interval until `cancel` fires.
    ///
    /// A scan in progress finishes before the loop exits.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.config.poll_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        log::info!(
            "[Trigger] Watching {} every {:?}",
            self.store.input_dir().display(),
            self.config.poll_interval()
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    if let Err(e) = self.run_once().await {
                        log::warn!("[Trigger] Scan failed: {}", e);
                    }
                    if let Err(e) = self.analyze_once().await {
                        log::warn!("[Trigger] Analysis scan failed: {}", e);
                    }
                }
            }
        }

        log::info!("[Trigger] Stopped");
    }
}
