//! Core configuration types.
//!
//! Values arrive fully resolved. Reading files and the environment is the
//! binary's job.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::analytics::TextAnalyticsConfig;
use crate::speech::SpeechConfig;
use crate::wav::HeaderMode;

/// Locations of the input and output containers.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory watched for new audio blobs.
    pub input_dir: PathBuf,
    /// Directory receiving `{name}.json` transcripts.
    pub output_dir: PathBuf,
    /// Directory receiving text analytics results.
    pub analytics_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("soundfiles"),
            output_dir: PathBuf::from("sroutput"),
            analytics_dir: PathBuf::from("saoutput"),
        }
    }
}

/// Polling and concurrency settings for the blob trigger.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TriggerConfig {
    /// Seconds between scans of the input container.
    pub poll_interval_secs: u64,
    /// Maximum number of blobs processed at once.
    pub max_concurrent_jobs: usize,
    /// Seconds a blob must stay unmodified before it is picked up.
    pub settle_secs: u64,
}

impl TriggerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_secs(self.settle_secs)
    }

    /// Validates the configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.poll_interval_secs == 0 {
            return Err("poll_interval_secs must be >= 1".to_string());
        }
        if self.max_concurrent_jobs == 0 {
            return Err("max_concurrent_jobs must be >= 1".to_string());
        }
        Ok(())
    }
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 5,
            max_concurrent_jobs: 4,
            settle_secs: 2,
        }
    }
}

/// Configuration for Blobscribe.
///
/// All fields except the speech credentials have usable defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub speech: SpeechConfig,
    pub storage: StorageConfig,
    pub trigger: TriggerConfig,
    /// Enables transcript analysis when set.
    pub text_analytics: Option<TextAnalyticsConfig>,
    /// How strictly WAV chunk order is enforced.
    pub header_mode: HeaderMode,
}

impl Config {
    /// Validates every section.
    pub fn validate(&self) -> Result<(), String> {
        self.speech.validate()?;
        self.trigger.validate()?;
        if let Some(analytics) = &self.text_analytics {
            analytics.validate()?;
        }
        if self.storage.input_dir.as_os_str().is_empty() {
            return Err("storage input_dir must not be empty".to_string());
        }
        if self.storage.output_dir.as_os_str().is_empty() {
            return Err("storage output_dir must not be empty".to_string());
        }
        if self.text_analytics.is_some() && self.storage.analytics_dir.as_os_str().is_empty() {
            return Err("storage analytics_dir must not be empty".to_string());
        }
        Ok(())
    }
}
