//! WAV container handling: header parsing, PCM pull/push adapters.
//!
//! The recognition path is:
//! 1. [`read_wave_header_with`] consumes and validates the RIFF/WAVE header.
//! 2. [`PcmStreamAdapter`] takes over the reader, now positioned at the samples.
//! 3. A recognizer pulls bytes through [`PullAudioInputStream`].
//!
//! [`open_wav`] bundles steps 1 and 2 into an [`AudioConfig`].

pub mod header;
pub mod pull;
pub mod push;
#[cfg(test)]
pub(crate) mod test_fixtures;

pub use header::{create_wav_header, read_wave_header, read_wave_header_with, HeaderMode};
pub use pull::{PcmStreamAdapter, PullAudioInputStream};
pub use push::{PcmSinkCollector, PushAudioOutputStream};

use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use bytes::Bytes;
use thiserror::Error;

use crate::protocol_constants::{DATA_TAG, FMT_TAG, PCM_FORMAT_TAG, PULL_CHUNK_SIZE, RIFF_TAG, WAVE_TAG};

// ─────────────────────────────────────────────────────────────────────────────
// Error Types
// ─────────────────────────────────────────────────────────────────────────────

/// Errors raised while parsing a WAV header or reading PCM data.
#[derive(Debug, Error)]
pub enum WavError {
    /// A mandatory four-byte tag did not match.
    #[error("Malformed WAV header: expected \"{expected}\" tag at offset {offset}, found \"{found}\"")]
    MalformedHeader {
        expected: ChunkTag,
        found: FourCc,
        offset: u64,
    },

    /// The stream ended before a fixed-size header field was complete.
    #[error("WAV stream truncated while reading {field} at offset {offset}")]
    TruncatedStream { field: &'static str, offset: u64 },

    /// The header declares a format that cannot be represented.
    #[error("Invalid WAV format: {0}")]
    InvalidFormat(String),

    /// The byte source was already released.
    #[error("Audio source unavailable: {0}")]
    SourceUnavailable(&'static str),

    /// The underlying reader failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Convenient Result alias for WAV operations.
pub type WavResult<T> = Result<T, WavError>;

/// The four mandatory tags of a PCM WAV header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkTag {
    Riff,
    Wave,
    Fmt,
    Data,
}

impl ChunkTag {
    /// Raw tag bytes as they appear in the file.
    pub const fn bytes(self) -> [u8; 4] {
        match self {
            Self::Riff => RIFF_TAG,
            Self::Wave => WAVE_TAG,
            Self::Fmt => FMT_TAG,
            Self::Data => DATA_TAG,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Riff => "RIFF",
            Self::Wave => "WAVE",
            Self::Fmt => "fmt ",
            Self::Data => "data",
        }
    }

    pub(crate) const fn field_name(self) -> &'static str {
        match self {
            Self::Riff => "RIFF tag",
            Self::Wave => "WAVE tag",
            Self::Fmt => "fmt tag",
            Self::Data => "data tag",
        }
    }

    pub(crate) const fn size_field_name(self) -> &'static str {
        match self {
            Self::Riff => "RIFF chunk size",
            Self::Wave => "WAVE chunk size",
            Self::Fmt => "fmt chunk size",
            Self::Data => "data chunk size",
        }
    }
}

impl fmt::Display for ChunkTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Four bytes read where a tag was expected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FourCc(pub [u8; 4]);

impl fmt::Display for FourCc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.escape_ascii())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Wave Format
// ─────────────────────────────────────────────────────────────────────────────

/// PCM format declared by a WAV header.
///
/// Values are exactly what the header declared; nothing is resampled or
/// reinterpreted. The sample rate is always non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaveFormat {
    sample_rate: u32,
    bits_per_sample: u8,
    channels: u8,
    format_tag: u16,
}

impl WaveFormat {
    /// Describes linear PCM audio.
    pub fn pcm(sample_rate: u32, bits_per_sample: u8, channels: u8) -> WavResult<Self> {
        if sample_rate == 0 {
            return Err(WavError::InvalidFormat("sample rate must be non-zero".into()));
        }
        Ok(Self {
            sample_rate,
            bits_per_sample,
            channels,
            format_tag: PCM_FORMAT_TAG,
        })
    }

    /// Builds a format from raw header fields.
    pub(crate) fn from_declared(
        format_tag: u16,
        channels: u16,
        sample_rate: u32,
        bits_per_sample: u16,
    ) -> WavResult<Self> {
        let channels = u8::try_from(channels).map_err(|_| {
            WavError::InvalidFormat(format!("channel count {} does not fit in 8 bits", channels))
        })?;
        let bits_per_sample = u8::try_from(bits_per_sample).map_err(|_| {
            WavError::InvalidFormat(format!(
                "bits per sample {} does not fit in 8 bits",
                bits_per_sample
            ))
        })?;

        let mut format = Self::pcm(sample_rate, bits_per_sample, channels)?;
        format.format_tag = format_tag;
        Ok(format)
    }

    #[inline]
    pub const fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    #[inline]
    pub const fn bits_per_sample(&self) -> u8 {
        self.bits_per_sample
    }

    #[inline]
    pub const fn channels(&self) -> u8 {
        self.channels
    }

    /// Format tag from the header (1 = PCM). Informational only.
    #[inline]
    pub const fn format_tag(&self) -> u16 {
        self.format_tag
    }

    /// Bytes per sample frame (all channels).
    #[inline]
    pub fn block_align(&self) -> u16 {
        u16::from(self.channels) * u16::from(self.bits_per_sample).div_ceil(8)
    }

    /// Bytes per second of audio, saturating at `u32::MAX`.
    #[inline]
    pub fn byte_rate(&self) -> u32 {
        let rate = u64::from(self.sample_rate) * u64::from(self.block_align());
        u32::try_from(rate).unwrap_or(u32::MAX)
    }

    /// Canonical 44-byte header describing this format.
    pub fn encode_header(&self, data_len: u32) -> Bytes {
        create_wav_header(self, data_len)
    }
}

impl fmt::Display for WaveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} Hz, {} ch, {} bit",
            self.sample_rate, self.channels, self.bits_per_sample
        )
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Audio Input
// ─────────────────────────────────────────────────────────────────────────────

/// A parsed format plus the PCM stream positioned after the header.
///
/// This is what recognizers consume.
#[derive(Debug)]
pub struct AudioConfig {
    format: WaveFormat,
    stream: PcmStreamAdapter,
}

impl AudioConfig {
    /// Pairs a stream whose header has been consumed with its format.
    pub fn from_stream_input(stream: PcmStreamAdapter, format: WaveFormat) -> Self {
        Self { format, stream }
    }

    pub fn format(&self) -> &WaveFormat {
        &self.format
    }

    pub fn stream_mut(&mut self) -> &mut PcmStreamAdapter {
        &mut self.stream
    }

    pub fn into_parts(self) -> (WaveFormat, PcmStreamAdapter) {
        (self.format, self.stream)
    }
}

/// Parses the WAV header from `reader` and wraps the rest as a PCM stream.
///
/// The reader is dropped if the header is rejected.
pub fn open_wav<R: Read + Send + 'static>(mut reader: R, mode: HeaderMode) -> WavResult<AudioConfig> {
    let format = read_wave_header_with(&mut reader, mode)?;
    Ok(AudioConfig::from_stream_input(
        PcmStreamAdapter::new(reader),
        format,
    ))
}

/// Opens a WAV file from disk. See [`open_wav`].
pub fn open_wav_file(path: impl AsRef<Path>, mode: HeaderMode) -> WavResult<AudioConfig> {
    let file = File::open(path.as_ref())?;
    open_wav(BufReader::new(file), mode)
}

/// Opens a WAV file and returns only the PCM stream, header already consumed.
pub fn create_wav_reader(path: impl AsRef<Path>, mode: HeaderMode) -> WavResult<PcmStreamAdapter> {
    let (format, stream) = open_wav_file(path.as_ref(), mode)?.into_parts();
    log::debug!(
        "[WAV] Opened {} ({})",
        path.as_ref().display(),
        format
    );
    Ok(stream)
}

/// Drains `source` into `sink` and returns the number of bytes moved.
///
/// Neither side is closed. A `chunk_size` of 0 uses [`PULL_CHUNK_SIZE`].
pub fn pump(
    source: &mut dyn PullAudioInputStream,
    sink: &mut dyn PushAudioOutputStream,
    chunk_size: usize,
) -> WavResult<u64> {
    let mut buf = vec![0u8; if chunk_size == 0 { PULL_CHUNK_SIZE } else { chunk_size }];
    let mut total = 0u64;
    loop {
        let n = source.read(&mut buf)?;
        if n == 0 {
            return Ok(total);
        }
        let mut written = 0;
        while written < n {
            let accepted = sink.write(&buf[written..n]) as usize;
            if accepted == 0 {
                return Err(WavError::Io(io::Error::from(io::ErrorKind::WriteZero)));
            }
            written += accepted;
        }
        total += n as u64;
    }
}
