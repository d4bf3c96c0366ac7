//! RIFF/WAVE header parsing and generation.
//!
//! The parser consumes exactly the header of a PCM WAV container and leaves the
//! reader positioned at the first sample byte. It never looks at the payload,
//! so it works on unbounded streams as well as files.

use std::io::{self, Read};

use bytes::{BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};

use super::{ChunkTag, FourCc, WavError, WavResult, WaveFormat};
use crate::protocol_constants::{CANONICAL_HEADER_LEN, FMT_CHUNK_BASE_SIZE, WAV_STREAM_SIZE_MAX};

/// How strictly the chunk layout of a header is enforced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderMode {
    /// Exactly `RIFF`, `WAVE`, `fmt `, `data` in that order. Any other chunk
    /// where `fmt ` or `data` is expected fails the parse.
    #[default]
    Strict,
    /// Skips unrecognised chunks (`LIST`, `fact`, ...) that appear before
    /// `fmt ` or before `data`.
    ScanChunks,
}

/// Parses a WAV header in [`HeaderMode::Strict`] mode.
///
/// See [`read_wave_header_with`].
pub fn read_wave_header<R: Read + ?Sized>(reader: &mut R) -> WavResult<WaveFormat> {
    read_wave_header_with(reader, HeaderMode::Strict)
}

/// Parses a RIFF/WAVE header and returns the declared PCM format.
///
/// On success the reader is positioned at the first byte of sample data: byte
/// 44 for a canonical header, later if the `fmt ` chunk carries extension bytes
/// (or, in scan mode, if extra chunks were skipped).
///
/// # Errors
/// - [`WavError::MalformedHeader`] if a mandatory tag does not match. Nothing
///   past the four mismatching bytes is consumed.
/// - [`WavError::TruncatedStream`] if the reader ends inside the header.
/// - [`WavError::InvalidFormat`] if the declared format cannot be represented.
pub fn read_wave_header_with<R: Read + ?Sized>(
    reader: &mut R,
    mode: HeaderMode,
) -> WavResult<WaveFormat> {
    let mut state = HeaderParseState::new(reader, mode);

    state.expect_tag(ChunkTag::Riff)?;
    let _riff_size = state.read_u32("RIFF chunk size")?;
    state.expect_tag(ChunkTag::Wave)?;

    let fmt_size = state.enter_chunk(ChunkTag::Fmt)?;
    let format_tag = state.read_u16("format tag")?;
    let channels = state.read_u16("channel count")?;
    let sample_rate = state.read_u32("sample rate")?;
    let _avg_bytes_per_sec = state.read_u32("average bytes per second")?;
    let _block_align = state.read_u16("block alignment")?;
    let bits_per_sample = state.read_u16("bits per sample")?;

    if fmt_size > FMT_CHUNK_BASE_SIZE {
        state.skip(u64::from(fmt_size - FMT_CHUNK_BASE_SIZE), "fmt chunk extension")?;
    }
    if mode == HeaderMode::ScanChunks && fmt_size % 2 == 1 {
        state.skip(1, "fmt chunk padding")?;
    }

    let data_size = state.enter_chunk(ChunkTag::Data)?;

    log::debug!(
        "[WAV] Header parsed: {} Hz, {} ch, {} bit, format tag {}, data size {}, header length {}",
        sample_rate,
        channels,
        bits_per_sample,
        format_tag,
        data_size,
        state.offset
    );

    WaveFormat::from_declared(format_tag, channels, sample_rate, bits_per_sample)
}

/// Generates a canonical 44-byte WAVE header for `format`.
///
/// `data_len` is written into the data chunk size; pass
/// [`WAV_STREAM_SIZE_MAX`] for a stream of unknown length.
pub fn create_wav_header(format: &WaveFormat, data_len: u32) -> Bytes {
    let mut header = BytesMut::with_capacity(CANONICAL_HEADER_LEN);

    let riff_size = if data_len == WAV_STREAM_SIZE_MAX {
        WAV_STREAM_SIZE_MAX
    } else {
        data_len.saturating_add((CANONICAL_HEADER_LEN - 8) as u32)
    };

    // RIFF header
    header.put_slice(&ChunkTag::Riff.bytes());
    header.put_u32_le(riff_size);
    header.put_slice(&ChunkTag::Wave.bytes());

    // fmt chunk
    header.put_slice(&ChunkTag::Fmt.bytes());
    header.put_u32_le(FMT_CHUNK_BASE_SIZE);
    header.put_u16_le(format.format_tag());
    header.put_u16_le(u16::from(format.channels()));
    header.put_u32_le(format.sample_rate());
    header.put_u32_le(format.byte_rate());
    header.put_u16_le(format.block_align());
    header.put_u16_le(u16::from(format.bits_per_sample()));

    // data chunk
    header.put_slice(&ChunkTag::Data.bytes());
    header.put_u32_le(data_len);

    header.freeze()
}

// ─────────────────────────────────────────────────────────────────────────────
// Parse State
// ─────────────────────────────────────────────────────────────────────────────

/// Cursor over the header bytes, alive only for the duration of one parse.
struct HeaderParseState<'a, R: ?Sized> {
    reader: &'a mut R,
    mode: HeaderMode,
    /// Bytes consumed so far.
    offset: u64,
}

impl<'a, R: Read + ?Sized> HeaderParseState<'a, R> {
    fn new(reader: &'a mut R, mode: HeaderMode) -> Self {
        Self {
            reader,
            mode,
            offset: 0,
        }
    }

    fn read_exact<const N: usize>(&mut self, field: &'static str) -> WavResult<[u8; N]> {
        let mut buf = [0u8; N];
        match self.reader.read_exact(&mut buf) {
            Ok(()) => {
                self.offset += N as u64;
                Ok(buf)
            }
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Err(WavError::TruncatedStream {
                field,
                offset: self.offset,
            }),
            Err(e) => Err(WavError::Io(e)),
        }
    }

    fn read_u16(&mut self, field: &'static str) -> WavResult<u16> {
        self.read_exact::<2>(field).map(u16::from_le_bytes)
    }

    fn read_u32(&mut self, field: &'static str) -> WavResult<u32> {
        self.read_exact::<4>(field).map(u32::from_le_bytes)
    }

    fn expect_tag(&mut self, expected: ChunkTag) -> WavResult<()> {
        let offset = self.offset;
        let found = self.read_exact::<4>(expected.field_name())?;
        if found != expected.bytes() {
            return Err(WavError::MalformedHeader {
                expected,
                found: FourCc(found),
                offset,
            });
        }
        Ok(())
    }

    /// Consumes the tag and size field of the chunk `tag`, returning the size.
    ///
    /// In scan mode any other chunks met first are skipped whole.
    fn enter_chunk(&mut self, tag: ChunkTag) -> WavResult<u32> {
        if self.mode == HeaderMode::Strict {
            self.expect_tag(tag)?;
            return self.read_u32(tag.size_field_name());
        }

        loop {
            let found = self.read_exact::<4>(tag.field_name())?;
            let size = self.read_u32(tag.size_field_name())?;
            if found == tag.bytes() {
                return Ok(size);
            }
            log::debug!(
                "[WAV] Skipping \"{}\" chunk ({} bytes) while looking for \"{}\"",
                FourCc(found),
                size,
                tag
            );
            // RIFF chunks are word aligned: odd sizes carry one pad byte.
            self.skip(u64::from(size) + u64::from(size % 2), "skipped chunk")?;
        }
    }

    fn skip(&mut self, len: u64, field: &'static str) -> WavResult<()> {
        let skipped = io::copy(&mut Read::take(&mut *self.reader, len), &mut io::sink())?;
        self.offset += skipped;
        if skipped < len {
            return Err(WavError::TruncatedStream {
                field,
                offset: self.offset,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::wav::test_fixtures::{
        canonical_header, chunk, header_with_fmt_extension, wav_file, DATA_TAG_OFFSET,
        FMT_TAG_OFFSET, RIFF_TAG_OFFSET, WAVE_TAG_OFFSET,
    };

    fn parse(bytes: &[u8]) -> (WavResult<WaveFormat>, u64) {
        let mut cursor = Cursor::new(bytes);
        let result = read_wave_header(&mut cursor);
        (result, cursor.position())
    }

    mod canonical {
        use super::*;

        #[test]
        fn returns_declared_format() {
            let bytes = canonical_header(44100, 2, 16, 0);
            let (result, _) = parse(&bytes);
            let format = result.expect("canonical header should parse");
            assert_eq!(format.sample_rate(), 44100);
            assert_eq!(format.channels(), 2);
            assert_eq!(format.bits_per_sample(), 16);
            assert_eq!(format.format_tag(), 1);
        }

        #[test]
        fn leaves_stream_at_offset_44() {
            let bytes = wav_file(16000, 1, 16, &[1, 2, 3, 4]);
            let (result, position) = parse(&bytes);
            assert!(result.is_ok());
            assert_eq!(position, 44);
        }

        #[test]
        fn accepts_any_format_tag() {
            let mut bytes = canonical_header(8000, 1, 8, 0);
            // WAVE_FORMAT_MULAW
            bytes[20..22].copy_from_slice(&7u16.to_le_bytes());
            let (result, _) = parse(&bytes);
            assert_eq!(result.expect("should parse").format_tag(), 7);
        }

        #[test]
        fn ignores_declared_sizes() {
            let mut bytes = canonical_header(16000, 1, 16, 0);
            bytes[4..8].copy_from_slice(&0u32.to_le_bytes());
            bytes[40..44].copy_from_slice(&u32::MAX.to_le_bytes());
            let (result, position) = parse(&bytes);
            assert!(result.is_ok());
            assert_eq!(position, 44);
        }
    }

    mod fmt_extension {
        use super::*;

        #[test]
        fn skips_two_extension_bytes() {
            let bytes = header_with_fmt_extension(&[0, 0]);
            let (result, position) = parse(&bytes);
            assert_eq!(result.expect("should parse").sample_rate(), 16000);
            assert_eq!(position, 46);
        }

        #[test]
        fn skips_long_extension() {
            let bytes = header_with_fmt_extension(&[0xAB; 24]);
            let (result, position) = parse(&bytes);
            assert!(result.is_ok());
            assert_eq!(position, 44 + 24);
        }

        #[test]
        fn truncated_extension_is_reported() {
            let mut bytes = header_with_fmt_extension(&[0; 8]);
            bytes.truncate(40);
            let (result, _) = parse(&bytes);
            assert!(matches!(
                result,
                Err(WavError::TruncatedStream {
                    field: "fmt chunk extension",
                    offset: 40
                })
            ));
        }
    }

    mod malformed {
        use super::*;

        fn corrupt(offset: usize) -> Vec<u8> {
            let mut bytes = canonical_header(16000, 1, 16, 0);
            bytes[offset..offset + 4].copy_from_slice(b"JUNK");
            bytes
        }

        fn assert_malformed(offset: usize, expected_tag: ChunkTag) {
            let bytes = corrupt(offset);
            let (result, position) = parse(&bytes);
            match result {
                Err(WavError::MalformedHeader {
                    expected,
                    found,
                    offset: reported,
                }) => {
                    assert_eq!(expected, expected_tag);
                    assert_eq!(found, FourCc(*b"JUNK"));
                    assert_eq!(reported, offset as u64);
                }
                other => panic!("expected MalformedHeader, got {:?}", other),
            }
            assert_eq!(position, offset as u64 + 4, "must stop right after the bad tag");
        }

        #[test]
        fn bad_riff_tag() {
            assert_malformed(RIFF_TAG_OFFSET, ChunkTag::Riff);
        }

        #[test]
        fn bad_wave_tag() {
            assert_malformed(WAVE_TAG_OFFSET, ChunkTag::Wave);
        }

        #[test]
        fn bad_fmt_tag() {
            assert_malformed(FMT_TAG_OFFSET, ChunkTag::Fmt);
        }

        #[test]
        fn bad_data_tag() {
            assert_malformed(DATA_TAG_OFFSET, ChunkTag::Data);
        }

        #[test]
        fn fmt_tag_without_trailing_space_is_rejected() {
            let mut bytes = canonical_header(16000, 1, 16, 0);
            bytes[FMT_TAG_OFFSET..FMT_TAG_OFFSET + 4].copy_from_slice(b"fmt\0");
            let (result, _) = parse(&bytes);
            assert!(matches!(
                result,
                Err(WavError::MalformedHeader {
                    expected: ChunkTag::Fmt,
                    ..
                })
            ));
        }

        #[test]
        fn failure_is_deterministic() {
            let bytes = corrupt(WAVE_TAG_OFFSET);
            let first = parse(&bytes).0.unwrap_err().to_string();
            let second = parse(&bytes).0.unwrap_err().to_string();
            assert_eq!(first, second);
            assert!(first.contains("WAVE"));
            assert!(first.contains("JUNK"));
        }

        #[test]
        fn list_chunk_before_data_fails_in_strict_mode() {
            let mut bytes = canonical_header(16000, 1, 16, 0);
            let data_header = bytes.split_off(DATA_TAG_OFFSET);
            bytes.extend(chunk(b"LIST", b"INFOtest"));
            bytes.extend(data_header);

            let (result, _) = parse(&bytes);
            match result {
                Err(WavError::MalformedHeader {
                    expected, found, ..
                }) => {
                    assert_eq!(expected, ChunkTag::Data);
                    assert_eq!(found, FourCc(*b"LIST"));
                }
                other => panic!("expected MalformedHeader, got {:?}", other),
            }
        }
    }

    mod truncated {
        use super::*;

        #[test]
        fn empty_input() {
            let (result, _) = parse(&[]);
            assert!(matches!(
                result,
                Err(WavError::TruncatedStream {
                    field: "RIFF tag",
                    offset: 0
                })
            ));
        }

        #[test]
        fn every_prefix_of_the_header_fails() {
            let bytes = canonical_header(16000, 1, 16, 0);
            for len in 0..bytes.len() {
                let (result, _) = parse(&bytes[..len]);
                assert!(
                    matches!(result, Err(WavError::TruncatedStream { .. })),
                    "prefix of {} bytes should be truncated, got {:?}",
                    len,
                    result
                );
            }
        }

        #[test]
        fn cut_inside_sample_rate() {
            let bytes = canonical_header(16000, 1, 16, 0);
            let (result, _) = parse(&bytes[..26]);
            assert!(matches!(
                result,
                Err(WavError::TruncatedStream {
                    field: "sample rate",
                    offset: 24
                })
            ));
        }
    }

    mod invalid_format {
        use super::*;

        #[test]
        fn zero_sample_rate() {
            let bytes = canonical_header(0, 1, 16, 0);
            let (result, _) = parse(&bytes);
            assert!(matches!(result, Err(WavError::InvalidFormat(_))));
        }

        #[test]
        fn channel_count_beyond_eight_bits() {
            let bytes = canonical_header(16000, 300, 16, 0);
            let (result, _) = parse(&bytes);
            assert!(matches!(result, Err(WavError::InvalidFormat(_))));
        }
    }

    mod scan_chunks {
        use super::*;

        fn parse_scanning(bytes: &[u8]) -> (WavResult<WaveFormat>, u64) {
            let mut cursor = Cursor::new(bytes);
            let result = read_wave_header_with(&mut cursor, HeaderMode::ScanChunks);
            (result, cursor.position())
        }

        #[test]
        fn canonical_header_parses_identically() {
            let bytes = canonical_header(22050, 2, 8, 0);
            let (strict, strict_pos) = parse(&bytes);
            let (scanned, scanned_pos) = parse_scanning(&bytes);
            assert_eq!(strict.unwrap(), scanned.unwrap());
            assert_eq!(strict_pos, scanned_pos);
        }

        #[test]
        fn skips_list_and_fact_chunks() {
            let mut bytes = canonical_header(16000, 1, 16, 0);
            let data_header = bytes.split_off(DATA_TAG_OFFSET);
            let list = chunk(b"LIST", b"INFOISFT");
            let fact = chunk(b"fact", &1234u32.to_le_bytes());
            let extra = list.len() + fact.len();
            bytes.extend(list);
            bytes.extend(fact);
            bytes.extend(data_header);

            let (result, position) = parse_scanning(&bytes);
            assert_eq!(result.expect("should parse").sample_rate(), 16000);
            assert_eq!(position, (44 + extra) as u64);
        }

        #[test]
        fn skips_odd_sized_chunk_with_padding() {
            let mut bytes = canonical_header(16000, 1, 16, 0);
            let fmt_and_data = bytes.split_off(FMT_TAG_OFFSET);
            let junk = chunk(b"junk", &[1, 2, 3]);
            assert_eq!(junk.len(), 8 + 3 + 1);
            bytes.extend(junk);
            bytes.extend(fmt_and_data);

            let (result, position) = parse_scanning(&bytes);
            assert!(result.is_ok());
            assert_eq!(position, 44 + 12);
        }

        #[test]
        fn odd_fmt_size_skips_extension_and_pad_byte() {
            // fmt size 17: one extension byte, then one pad byte before data
            let mut bytes = header_with_fmt_extension(&[0xAA]);
            let data_header = bytes.split_off(FMT_TAG_OFFSET + 8 + 17);
            bytes.push(0);
            bytes.extend(data_header);
            bytes.extend_from_slice(&[7, 7]);
            assert_eq!(&bytes[16..20], &17u32.to_le_bytes());

            let (result, position) = parse_scanning(&bytes);
            assert_eq!(result.expect("should parse").sample_rate(), 16000);
            assert_eq!(position, 46);

            let (strict, _) = parse(&bytes);
            assert!(matches!(
                strict,
                Err(WavError::MalformedHeader {
                    expected: ChunkTag::Data,
                    ..
                })
            ));
        }

        #[test]
        fn missing_data_chunk_is_truncated() {
            let mut bytes = canonical_header(16000, 1, 16, 0);
            bytes.truncate(DATA_TAG_OFFSET);
            bytes.extend(chunk(b"LIST", b"INFO"));

            let (result, _) = parse_scanning(&bytes);
            assert!(matches!(
                result,
                Err(WavError::TruncatedStream {
                    field: "data tag",
                    ..
                })
            ));
        }

        #[test]
        fn riff_and_wave_are_still_mandatory() {
            let mut bytes = canonical_header(16000, 1, 16, 0);
            bytes[WAVE_TAG_OFFSET..WAVE_TAG_OFFSET + 4].copy_from_slice(b"AVI ");
            let (result, _) = parse_scanning(&bytes);
            assert!(matches!(
                result,
                Err(WavError::MalformedHeader {
                    expected: ChunkTag::Wave,
                    ..
                })
            ));
        }
    }

    mod generation {
        use super::*;

        #[test]
        fn matches_hand_built_canonical_header() {
            let format = WaveFormat::pcm(16000, 16, 1).unwrap();
            let header = create_wav_header(&format, 3200);
            assert_eq!(&header[..], &canonical_header(16000, 1, 16, 3200)[..]);
        }

        #[test]
        fn unknown_length_uses_max_sizes() {
            let format = WaveFormat::pcm(48000, 16, 2).unwrap();
            let header = create_wav_header(&format, WAV_STREAM_SIZE_MAX);
            assert_eq!(header.len(), CANONICAL_HEADER_LEN);
            assert_eq!(&header[4..8], &u32::MAX.to_le_bytes());
            assert_eq!(&header[40..44], &u32::MAX.to_le_bytes());
        }

        #[test]
        fn round_trip_preserves_format_and_payload() {
            let payload: Vec<u8> = (0..=255u8).cycle().take(1000).collect();
            for format in [
                WaveFormat::pcm(8000, 8, 1).unwrap(),
                WaveFormat::pcm(16000, 16, 1).unwrap(),
                WaveFormat::pcm(44100, 16, 2).unwrap(),
                WaveFormat::pcm(96000, 24, 2).unwrap(),
            ] {
                let mut bytes = create_wav_header(&format, payload.len() as u32).to_vec();
                bytes.extend_from_slice(&payload);

                let mut cursor = Cursor::new(bytes);
                let parsed = read_wave_header(&mut cursor).expect("should parse");
                let mut rest = Vec::new();
                cursor.read_to_end(&mut rest).unwrap();

                assert_eq!(parsed, format);
                assert_eq!(rest, payload);
            }
        }
    }
}
