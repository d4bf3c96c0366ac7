//! Pull-style access to raw PCM bytes.

use std::io::{self, Read};

use super::{WavError, WavResult};

/// A source that yields audio bytes when the consumer asks for them.
///
/// This is the contract recognizers consume audio through. Implementations
/// are driven by one consumer at a time and may block.
pub trait PullAudioInputStream: Send {
    /// Fills `buf` with up to `buf.len()` bytes and returns how many were written.
    ///
    /// Returns `Ok(0)` only once the source is permanently exhausted (or when
    /// `buf` is empty). If no bytes are available yet, blocks until at least
    /// one byte arrives or the source ends.
    fn read(&mut self, buf: &mut [u8]) -> WavResult<usize>;

    /// Releases the underlying source. Calling it again is a no-op.
    fn close(&mut self);
}

/// Exposes the sample bytes that follow a parsed WAV header.
///
/// The adapter owns the wrapped reader from construction on and releases it
/// exactly once, either through [`PullAudioInputStream::close`] or on drop.
/// The header must already have been consumed; nothing here re-parses it.
pub struct PcmStreamAdapter {
    source: Option<Box<dyn Read + Send>>,
    bytes_read: u64,
}

impl PcmStreamAdapter {
    /// Wraps `reader`, taking ownership of it.
    pub fn new<R: Read + Send + 'static>(reader: R) -> Self {
        Self {
            source: Some(Box::new(reader)),
            bytes_read: 0,
        }
    }

    /// Returns true once the source has been released.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.source.is_none()
    }

    /// Total number of bytes handed out so far.
    #[must_use]
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }
}

impl PullAudioInputStream for PcmStreamAdapter {
    fn read(&mut self, buf: &mut [u8]) -> WavResult<usize> {
        let source = self
            .source
            .as_mut()
            .ok_or(WavError::SourceUnavailable("PCM stream already closed"))?;

        loop {
            match source.read(buf) {
                Ok(n) => {
                    self.bytes_read += n as u64;
                    return Ok(n);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(WavError::Io(e)),
            }
        }
    }

    fn close(&mut self) {
        if let Some(source) = self.source.take() {
            drop(source);
            log::debug!(
                "[WAV] PCM stream closed after {} bytes",
                self.bytes_read
            );
        }
    }
}

impl Read for PcmStreamAdapter {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        PullAudioInputStream::read(self, buf).map_err(|e| match e {
            WavError::Io(e) => e,
            other => io::Error::new(io::ErrorKind::BrokenPipe, other),
        })
    }
}

impl Drop for PcmStreamAdapter {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for PcmStreamAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PcmStreamAdapter")
            .field("closed", &self.is_closed())
            .field("bytes_read", &self.bytes_read)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::wav::read_wave_header;
    use crate::wav::test_fixtures::wav_file;

    /// Reader that records when it is dropped.
    struct DropTracker {
        inner: Cursor<Vec<u8>>,
        dropped: Arc<AtomicUsize>,
    }

    impl Read for DropTracker {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.inner.read(buf)
        }
    }

    impl Drop for DropTracker {
        fn drop(&mut self) {
            self.dropped.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn tracked(bytes: Vec<u8>) -> (DropTracker, Arc<AtomicUsize>) {
        let dropped = Arc::new(AtomicUsize::new(0));
        let reader = DropTracker {
            inner: Cursor::new(bytes),
            dropped: Arc::clone(&dropped),
        };
        (reader, dropped)
    }

    /// Reader that fails once with `Interrupted` before every successful read.
    struct Flaky {
        inner: Cursor<Vec<u8>>,
        interrupt_next: AtomicBool,
    }

    impl Read for Flaky {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.interrupt_next.swap(false, Ordering::SeqCst) {
                return Err(io::Error::from(io::ErrorKind::Interrupted));
            }
            self.interrupt_next.store(true, Ordering::SeqCst);
            self.inner.read(buf)
        }
    }

    #[test]
    fn streams_payload_after_header_then_exhausts() {
        let payload: Vec<u8> = (0..100u8).collect();
        let mut cursor = Cursor::new(wav_file(16000, 1, 16, &payload));
        let format = read_wave_header(&mut cursor).expect("header should parse");
        assert_eq!(format.sample_rate(), 16000);
        assert_eq!(format.channels(), 1);
        assert_eq!(format.bits_per_sample(), 16);

        let mut adapter = PcmStreamAdapter::new(cursor);
        let mut collected = Vec::new();
        let mut buf = [0u8; 32];
        loop {
            let n = PullAudioInputStream::read(&mut adapter, &mut buf).unwrap();
            if n == 0 {
                break;
            }
            collected.extend_from_slice(&buf[..n]);
        }

        assert_eq!(collected, payload);
        assert_eq!(adapter.bytes_read(), 100);
    }

    #[test]
    fn reads_past_exhaustion_keep_returning_zero() {
        let mut adapter = PcmStreamAdapter::new(Cursor::new(vec![1, 2, 3]));
        let mut buf = [0u8; 8];
        assert_eq!(PullAudioInputStream::read(&mut adapter, &mut buf).unwrap(), 3);
        for _ in 0..5 {
            assert_eq!(PullAudioInputStream::read(&mut adapter, &mut buf).unwrap(), 0);
        }
    }

    #[test]
    fn retries_interrupted_reads() {
        let mut adapter = PcmStreamAdapter::new(Flaky {
            inner: Cursor::new(vec![9; 10]),
            interrupt_next: AtomicBool::new(true),
        });
        let mut buf = [0u8; 4];
        assert_eq!(PullAudioInputStream::read(&mut adapter, &mut buf).unwrap(), 4);
        assert_eq!(PullAudioInputStream::read(&mut adapter, &mut buf).unwrap(), 4);
    }

    #[test]
    fn close_releases_source_once() {
        let (reader, dropped) = tracked(vec![0; 16]);
        let mut adapter = PcmStreamAdapter::new(reader);

        adapter.close();
        assert!(adapter.is_closed());
        assert_eq!(dropped.load(Ordering::SeqCst), 1);

        adapter.close();
        assert_eq!(dropped.load(Ordering::SeqCst), 1);

        drop(adapter);
        assert_eq!(dropped.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn drop_without_reading_releases_source() {
        let (reader, dropped) = tracked(vec![0; 16]);
        let adapter = PcmStreamAdapter::new(reader);
        drop(adapter);
        assert_eq!(dropped.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn read_after_close_fails() {
        let mut adapter = PcmStreamAdapter::new(Cursor::new(vec![1, 2, 3]));
        adapter.close();
        let mut buf = [0u8; 4];
        assert!(matches!(
            PullAudioInputStream::read(&mut adapter, &mut buf),
            Err(WavError::SourceUnavailable(_))
        ));
        assert!(Read::read(&mut adapter, &mut buf).is_err());
    }

    #[test]
    fn io_errors_are_propagated() {
        struct Broken;
        impl Read for Broken {
            fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::ConnectionReset, "gone"))
            }
        }

        let mut adapter = PcmStreamAdapter::new(Broken);
        let mut buf = [0u8; 4];
        match PullAudioInputStream::read(&mut adapter, &mut buf) {
            Err(WavError::Io(e)) => assert_eq!(e.kind(), io::ErrorKind::ConnectionReset),
            other => panic!("expected Io error, got {:?}", other),
        }
    }

    #[test]
    fn std_read_impl_supports_read_to_end() {
        let mut adapter = PcmStreamAdapter::new(Cursor::new(vec![7; 5000]));
        let mut out = Vec::new();
        adapter.read_to_end(&mut out).unwrap();
        assert_eq!(out.len(), 5000);
    }
}
