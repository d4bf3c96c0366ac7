//! Local directories standing in for the input and output blob containers.
//!
//! Input blobs are regular files in `input_dir`. The transcript for blob
//! `name` is `output_dir/{name}.json`; its presence marks the blob as done.
//! Analysis results for transcript `{name}.json` land in `analytics_dir` as
//! `{name}.{kind}.json`.

use std::fs::{self, File, Metadata};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use serde::Serialize;

use crate::analytics::AnalysisKind;
use crate::config::StorageConfig;
use crate::error::{BlobscribeError, BlobscribeResult};
use crate::protocol_constants::{ANALYSIS_EXTENSION, TRANSCRIPT_EXTENSION};
use crate::transcript::{write_transcript, TranscriptDocument};

/// Input, output and analytics directories acting as blob containers.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    input_dir: PathBuf,
    output_dir: PathBuf,
    analytics_dir: PathBuf,
}

impl LocalBlobStore {
    /// Analysis results go to `output_dir/analytics` unless
    /// [`with_analytics_dir`](Self::with_analytics_dir) says otherwise.
    pub fn new(input_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        let output_dir = output_dir.into();
        Self {
            input_dir: input_dir.into(),
            analytics_dir: output_dir.join("analytics"),
            output_dir,
        }
    }

    pub fn with_analytics_dir(mut self, analytics_dir: impl Into<PathBuf>) -> Self {
        self.analytics_dir = analytics_dir.into();
        self
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(&config.input_dir, &config.output_dir).with_analytics_dir(&config.analytics_dir)
    }

    pub fn input_dir(&self) -> &Path {
        &self.input_dir
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn analytics_dir(&self) -> &Path {
        &self.analytics_dir
    }

    /// Creates the input and output directories if they are missing.
    ///
    /// The analytics directory is created on first write.
    pub fn ensure_dirs(&self) -> BlobscribeResult<()> {
        fs::create_dir_all(&self.input_dir).map_err(|e| {
            BlobscribeError::Storage(format!("{}: {}", self.input_dir.display(), e))
        })?;
        fs::create_dir_all(&self.output_dir).map_err(|e| {
            BlobscribeError::Output(format!("{}: {}", self.output_dir.display(), e))
        })?;
        Ok(())
    }

    /// Path of the transcript written for blob `name`.
    pub fn output_path(&self, name: &str) -> PathBuf {
        self.output_dir
            .join(format!("{}.{}", name, TRANSCRIPT_EXTENSION))
    }

    /// Names of input blobs without a transcript, sorted.
    ///
    /// Hidden files are ignored. When both containers share a directory,
    /// transcripts are not treated as input. Blobs modified less than
    /// `settle` ago are left for a later scan, since they may still be
    /// uploading.
    pub fn pending(&self, settle: Duration) -> BlobscribeResult<Vec<String>> {
        let shared_dir = self.input_dir == self.output_dir;

        let mut names = Vec::new();
        for (name, meta) in list_files(&self.input_dir)? {
            if shared_dir && has_extension(&name, TRANSCRIPT_EXTENSION) {
                continue;
            }
            if self.output_path(&name).exists() {
                continue;
            }
            if !is_settled(&meta, settle) {
                log::debug!("[Storage] {} is still being written, skipping", name);
                continue;
            }
            names.push(name);
        }
        names.sort();
        Ok(names)
    }

    /// Opens blob `name` and returns it with its size in bytes.
    pub fn open_input(&self, name: &str) -> BlobscribeResult<(File, u64)> {
        let path = self.input_dir.join(name);
        let file = File::open(&path)
            .map_err(|e| BlobscribeError::Storage(format!("{}: {}", path.display(), e)))?;
        let size = file
            .metadata()
            .map_err(|e| BlobscribeError::Storage(format!("{}: {}", path.display(), e)))?
            .len();
        Ok((file, size))
    }

    /// Writes the transcript for blob `name`.
    ///
    /// The document goes to a hidden temp file first and is renamed into
    /// place, so a crash never leaves a partial transcript behind.
    pub fn write_output(&self, name: &str, doc: &TranscriptDocument) -> BlobscribeResult<PathBuf> {
        let target = self.output_path(name);
        write_atomically(&target, |writer| write_transcript(writer, doc))
            .map_err(|e| BlobscribeError::Output(format!("{}: {}", target.display(), e)))?;

        log::debug!("[Storage] Wrote {}", target.display());
        Ok(target)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Transcript analysis
    // ─────────────────────────────────────────────────────────────────────

    /// Path of the `kind` result for transcript `transcript`.
    pub fn analysis_path(&self, transcript: &str, kind: AnalysisKind) -> PathBuf {
        let stem = transcript
            .strip_suffix(&format!(".{}", TRANSCRIPT_EXTENSION))
            .unwrap_or(transcript);
        self.analytics_dir
            .join(format!("{}.{}.{}", stem, kind.suffix(), ANALYSIS_EXTENSION))
    }

    /// Source name recorded in analysis results, e.g. `sroutput/clip.wav.json`.
    pub fn transcript_source(&self, transcript: &str) -> String {
        match self.output_dir.file_name().and_then(|n| n.to_str()) {
            Some(container) => format!("{}/{}", container, transcript),
            None => transcript.to_string(),
        }
    }

    /// Transcripts that are missing at least one analysis result, sorted.
    pub fn pending_transcripts(&self) -> BlobscribeResult<Vec<String>> {
        let mut names = Vec::new();
        for (name, _meta) in list_files(&self.output_dir)? {
            if !has_extension(&name, TRANSCRIPT_EXTENSION) || is_analysis_name(&name) {
                continue;
            }
            let analyzed = AnalysisKind::ALL
                .iter()
                .all(|kind| self.analysis_path(&name, *kind).exists());
            if !analyzed {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    /// Reads transcript `name` back from the output directory.
    pub fn read_transcript(&self, name: &str) -> BlobscribeResult<TranscriptDocument> {
        let path = self.output_dir.join(name);
        let json = fs::read_to_string(&path)
            .map_err(|e| BlobscribeError::Storage(format!("{}: {}", path.display(), e)))?;
        serde_json::from_str(&json)
            .map_err(|e| BlobscribeError::Storage(format!("{}: {}", path.display(), e)))
    }

    /// Writes the `kind` result for transcript `transcript`.
    pub fn write_analysis<T: Serialize>(
        &self,
        transcript: &str,
        kind: AnalysisKind,
        doc: &T,
    ) -> BlobscribeResult<PathBuf> {
        let target = self.analysis_path(transcript, kind);
        let output_error =
            |e: io::Error| BlobscribeError::Output(format!("{}: {}", target.display(), e));

        fs::create_dir_all(&self.analytics_dir).map_err(output_error)?;
        write_atomically(&target, |writer| {
            serde_json::to_writer_pretty(&mut *writer, doc)?;
            writer.write_all(b"\n")
        })
        .map_err(output_error)?;

        log::debug!("[Storage] Wrote {}", target.display());
        Ok(target)
    }
}

/// Regular, non-hidden files in `dir` with UTF-8 names.
fn list_files(dir: &Path) -> BlobscribeResult<Vec<(String, Metadata)>> {
    let entries = fs::read_dir(dir)
        .map_err(|e| BlobscribeError::Storage(format!("{}: {}", dir.display(), e)))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| BlobscribeError::Storage(e.to_string()))?;
        let Ok(meta) = entry.metadata() else {
            continue;
        };
        if !meta.is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            log::warn!(
                "[Storage] Skipping non UTF-8 blob name: {:?}",
                entry.file_name()
            );
            continue;
        };
        if name.starts_with('.') {
            continue;
        }
        files.push((name, meta));
    }
    Ok(files)
}

fn has_extension(name: &str, extension: &str) -> bool {
    Path::new(name).extension().and_then(|e| e.to_str()) == Some(extension)
}

/// True for `{stem}.{kind}.json` names, which share a directory with
/// transcripts when both containers point at the same place.
fn is_analysis_name(name: &str) -> bool {
    AnalysisKind::ALL.iter().any(|kind| {
        name.ends_with(&format!(".{}.{}", kind.suffix(), ANALYSIS_EXTENSION))
    })
}

/// A file counts as settled once its mtime is at least `settle` old.
///
/// Missing or future timestamps count as settled.
fn is_settled(meta: &Metadata, settle: Duration) -> bool {
    if settle.is_zero() {
        return true;
    }
    meta.modified()
        .ok()
        .and_then(|modified| SystemTime::now().duration_since(modified).ok())
        .map_or(true, |age| age >= settle)
}

/// Writes `target` through a hidden temp file in the same directory.
fn write_atomically<F>(target: &Path, write: F) -> io::Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> io::Result<()>,
{
    let file_name = target
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "target has no file name"))?;
    let tmp = target.with_file_name(format!(".{}.tmp", file_name));

    let result = (|| -> io::Result<()> {
        let mut writer = BufWriter::new(File::create(&tmp)?);
        write(&mut writer)?;
        writer.into_inner().map_err(|e| e.into_error())?.sync_all()?;
        fs::rename(&tmp, target)
    })();

    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}
