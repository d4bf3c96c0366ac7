//! Worker configuration.
//!
//! Supports loading from YAML files with environment variable overrides.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use blobscribe_core::{
    Config, HeaderMode, SpeechConfig, StorageConfig, TextAnalyticsConfig, TriggerConfig,
};
use serde::Deserialize;

/// Environment variable holding the speech subscription key.
pub const ENV_SPEECH_API_KEY: &str = "speechApiKey";
/// Environment variable holding the speech service region.
pub const ENV_SPEECH_API_REGION: &str = "speechApiRegion";
/// Environment variable holding the text analytics key.
pub const ENV_TEXT_ANALYTICS_API_KEY: &str = "textAnalyticsApiKey";
/// Environment variable holding the text analytics endpoint.
pub const ENV_TEXT_ANALYTICS_API_ENDPOINT: &str = "textAnalyticsApiEndpoint";
pub const ENV_LANGUAGE: &str = "BLOBSCRIBE_LANGUAGE";
pub const ENV_ENDPOINT: &str = "BLOBSCRIBE_ENDPOINT";
pub const ENV_POLL_INTERVAL: &str = "BLOBSCRIBE_POLL_INTERVAL";

/// Worker configuration loaded from YAML with environment overrides.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Speech service subscription key.
    /// Override: `speechApiKey`
    pub subscription_key: String,

    /// Speech service region (e.g. `westeurope`).
    /// Override: `speechApiRegion`
    pub region: String,

    /// Recognition language.
    /// Override: `BLOBSCRIBE_LANGUAGE`
    pub language: String,

    /// Base URL replacing the regional endpoint.
    /// Override: `BLOBSCRIBE_ENDPOINT`
    pub endpoint: Option<String>,

    /// Timeout for a single recognition request in seconds.
    pub request_timeout: u64,

    /// Directory watched for audio blobs.
    pub input_dir: PathBuf,

    /// Directory receiving transcripts.
    pub output_dir: PathBuf,

    /// Directory receiving text analytics results.
    pub analytics_dir: PathBuf,

    /// Seconds between scans of the input directory.
    /// Override: `BLOBSCRIBE_POLL_INTERVAL`
    pub poll_interval: u64,

    /// Maximum number of blobs transcribed at once.
    pub max_concurrent_jobs: usize,

    /// Seconds a blob must stay unmodified before it is transcribed.
    pub settle_time: u64,

    /// Text analytics key. Analysis is off while key and endpoint are empty.
    /// Override: `textAnalyticsApiKey`
    pub analytics_key: String,

    /// Text analytics resource endpoint.
    /// Override: `textAnalyticsApiEndpoint`
    pub analytics_endpoint: String,

    /// Language of transcripts sent for analysis.
    pub analytics_language: String,

    /// WAV chunk handling (`strict` or `scan_chunks`).
    pub header_mode: HeaderMode,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        let speech = SpeechConfig::default();
        let storage = StorageConfig::default();
        let trigger = TriggerConfig::default();
        let analytics = TextAnalyticsConfig::default();
        Self {
            subscription_key: speech.subscription_key,
            region: speech.region,
            language: speech.language,
            endpoint: speech.endpoint,
            request_timeout: speech.timeout_secs,
            input_dir: storage.input_dir,
            output_dir: storage.output_dir,
            analytics_dir: storage.analytics_dir,
            poll_interval: trigger.poll_interval_secs,
            max_concurrent_jobs: trigger.max_concurrent_jobs,
            settle_time: trigger.settle_secs,
            analytics_key: analytics.api_key,
            analytics_endpoint: analytics.endpoint,
            analytics_language: analytics.language,
            header_mode: HeaderMode::default(),
        }
    }
}

impl WorkerConfig {
    /// Loads configuration from a YAML file, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = if let Some(path) = path {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            Self::from_yaml(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Parses a YAML document. Missing keys keep their defaults.
    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Applies environment variable overrides to the configuration.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies overrides looked up by variable name.
    ///
    /// Empty values are ignored, as are values that fail to parse.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = lookup(ENV_SPEECH_API_KEY) {
            self.subscription_key = key;
        }

        if let Some(region) = lookup(ENV_SPEECH_API_REGION) {
            self.region = region;
        }

        if let Some(key) = lookup(ENV_TEXT_ANALYTICS_API_KEY) {
            self.analytics_key = key;
        }

        if let Some(endpoint) = lookup(ENV_TEXT_ANALYTICS_API_ENDPOINT) {
            self.analytics_endpoint = endpoint;
        }

        if let Some(language) = lookup(ENV_LANGUAGE) {
            self.language = language;
        }

        if let Some(endpoint) = lookup(ENV_ENDPOINT) {
            self.endpoint = Some(endpoint);
        }

        if let Some(val) = lookup(ENV_POLL_INTERVAL) {
            match val.parse() {
                Ok(interval) => self.poll_interval = interval,
                Err(_) => log::warn!("Ignoring invalid {}: {}", ENV_POLL_INTERVAL, val),
            }
        }

        // Note: input/output directories are handled by clap via #[arg(env = ...)] in main.rs
    }

    /// Analytics settings, or `None` when neither key nor endpoint is set.
    ///
    /// A half-configured service is passed on so validation can report it.
    fn text_analytics(&self) -> Option<TextAnalyticsConfig> {
        if self.analytics_key.trim().is_empty() && self.analytics_endpoint.trim().is_empty() {
            return None;
        }
        Some(TextAnalyticsConfig {
            api_key: self.analytics_key.clone(),
            endpoint: self.analytics_endpoint.clone(),
            language: self.analytics_language.clone(),
            ..Default::default()
        })
    }

    /// Converts to blobscribe-core's Config type.
    pub fn to_core_config(&self) -> Config {
        Config {
            speech: SpeechConfig {
                subscription_key: self.subscription_key.clone(),
                region: self.region.clone(),
                language: self.language.clone(),
                endpoint: self.endpoint.clone(),
                timeout_secs: self.request_timeout,
            },
            storage: StorageConfig {
                input_dir: self.input_dir.clone(),
                output_dir: self.output_dir.clone(),
                analytics_dir: self.analytics_dir.clone(),
            },
            trigger: TriggerConfig {
                poll_interval_secs: self.poll_interval,
                max_concurrent_jobs: self.max_concurrent_jobs,
                settle_secs: self.settle_time,
            },
            text_analytics: self.text_analytics(),
            header_mode: self.header_mode,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn yaml_keys_override_defaults() {
        let config = WorkerConfig::from_yaml(
            "region: northeurope\nlanguage: fr-FR\ninput_dir: /data/in\nmax_concurrent_jobs: 8\nheader_mode: scan_chunks\n",
        )
        .unwrap();

        assert_eq!(config.region, "northeurope");
        assert_eq!(config.language, "fr-FR");
        assert_eq!(config.input_dir, PathBuf::from("/data/in"));
        assert_eq!(config.output_dir, PathBuf::from("sroutput"));
        assert_eq!(config.max_concurrent_jobs, 8);
        assert_eq!(config.poll_interval, 5);
        assert_eq!(config.header_mode, HeaderMode::ScanChunks);
    }

    #[test]
    fn unknown_header_mode_is_rejected() {
        assert!(WorkerConfig::from_yaml("header_mode: lenient\n").is_err());
    }

    #[test]
    fn environment_overrides_file_values() {
        let mut config = WorkerConfig::from_yaml("subscription_key: from-file\nregion: westus\n").unwrap();
        config.apply_overrides(env(&[
            (ENV_SPEECH_API_KEY, "from-env"),
            (ENV_SPEECH_API_REGION, ""),
            (ENV_ENDPOINT, "http://localhost:5000"),
            (ENV_POLL_INTERVAL, "30"),
        ]));

        assert_eq!(config.subscription_key, "from-env");
        assert_eq!(config.region, "westus");
        assert_eq!(config.endpoint.as_deref(), Some("http://localhost:5000"));
        assert_eq!(config.poll_interval, 30);
    }

    #[test]
    fn invalid_poll_interval_is_ignored() {
        let mut config = WorkerConfig::default();
        config.apply_overrides(env(&[(ENV_POLL_INTERVAL, "soon")]));
        assert_eq!(config.poll_interval, 5);
    }

    #[test]
    fn load_reads_yaml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("worker.yaml");
        std::fs::write(&path, "request_timeout: 15\nlanguage: de-DE\n").unwrap();

        let config = WorkerConfig::load(Some(&path)).unwrap();
        assert_eq!(config.request_timeout, 15);

        let core = config.to_core_config();
        assert_eq!(core.speech.timeout_secs, 15);
        assert_eq!(core.trigger.max_concurrent_jobs, 4);
        assert_eq!(core.trigger.settle_secs, 2);
        assert!(core.text_analytics.is_none());
    }

    #[test]
    fn analytics_credentials_come_from_environment() {
        let mut config = WorkerConfig::from_yaml("analytics_language: de
settle_time: 0
").unwrap();
        config.apply_overrides(env(&[
            (ENV_TEXT_ANALYTICS_API_KEY, "ta-key"),
            (ENV_TEXT_ANALYTICS_API_ENDPOINT, "https://ta.example"),
        ]));

        let core = config.to_core_config();
        let analytics = core.text_analytics.expect("analytics enabled");
        assert_eq!(analytics.api_key, "ta-key");
        assert_eq!(analytics.endpoint, "https://ta.example");
        assert_eq!(analytics.language, "de");
        assert_eq!(core.trigger.settle_secs, 0);
    }

    #[test]
    fn half_configured_analytics_fails_validation() {
        let mut config = WorkerConfig::default();
        config.apply_overrides(env(&[
            (ENV_SPEECH_API_KEY, "key"),
            (ENV_SPEECH_API_REGION, "westus"),
            (ENV_TEXT_ANALYTICS_API_KEY, "ta-key"),
        ]));
        assert!(config.to_core_config().validate().is_err());
    }

    #[test]
    fn load_fails_on_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(WorkerConfig::load(Some(&dir.path().join("absent.yaml"))).is_err());
    }
}
