//! Push-style collection of audio bytes.

use bytes::{Bytes, BytesMut};

/// A sink that audio producers push chunks into.
pub trait PushAudioOutputStream: Send {
    /// Accepts a chunk and returns how many bytes were taken.
    fn write(&mut self, data: &[u8]) -> u32;

    /// Signals that no more audio will be written.
    fn close(&mut self);
}

/// Accumulates every pushed chunk into one growing buffer.
#[derive(Debug, Default)]
pub struct PcmSinkCollector {
    audio: BytesMut,
    closed: bool,
}

impl PcmSinkCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a collector with room for `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            audio: BytesMut::with_capacity(capacity),
            closed: false,
        }
    }

    /// Bytes received so far.
    pub fn audio_data(&self) -> &[u8] {
        &self.audio
    }

    pub fn len(&self) -> usize {
        self.audio.len()
    }

    pub fn is_empty(&self) -> bool {
        self.audio.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Consumes the collector and returns the accumulated bytes.
    pub fn into_bytes(self) -> Bytes {
        self.audio.freeze()
    }
}

impl PushAudioOutputStream for PcmSinkCollector {
    fn write(&mut self, data: &[u8]) -> u32 {
        // Accept at most what the return value can report.
        let accepted = u32::try_from(data.len()).unwrap_or(u32::MAX);
        self.audio.extend_from_slice(&data[..accepted as usize]);
        log::trace!("[WAV] {} bytes received", accepted);
        accepted
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            log::debug!("[WAV] Push stream closed with {} bytes", self.audio.len());
        }
    }
}
