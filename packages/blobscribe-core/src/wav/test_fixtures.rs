//! Shared WAV byte fixtures for tests.
//!
//! Headers are assembled field by field here rather than through
//! `create_wav_header`, so parser tests do not depend on the generator.

/// Byte offset of the `RIFF` tag in a canonical header.
pub const RIFF_TAG_OFFSET: usize = 0;
/// Byte offset of the `WAVE` tag in a canonical header.
pub const WAVE_TAG_OFFSET: usize = 8;
/// Byte offset of the `fmt ` tag in a canonical header.
pub const FMT_TAG_OFFSET: usize = 12;
/// Byte offset of the `data` tag in a canonical header.
pub const DATA_TAG_OFFSET: usize = 36;

/// Builds a header whose `fmt ` chunk carries `extension` after the 16 base bytes.
pub fn fmt_header(
    sample_rate: u32,
    channels: u16,
    bits_per_sample: u16,
    extension: &[u8],
    data_len: u32,
) -> Vec<u8> {
    let fmt_size = 16 + extension.len() as u32;
    let block_align = channels * bits_per_sample.div_ceil(8);
    let byte_rate = sample_rate.wrapping_mul(u32::from(block_align));

    let mut bytes = Vec::with_capacity(44 + extension.len());
    bytes.extend_from_slice(b"RIFF");
    bytes.extend_from_slice(&(36 + extension.len() as u32 + data_len).to_le_bytes());
    bytes.extend_from_slice(b"WAVE");
    bytes.extend_from_slice(b"fmt ");
    bytes.extend_from_slice(&fmt_size.to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes());
    bytes.extend_from_slice(&channels.to_le_bytes());
    bytes.extend_from_slice(&sample_rate.to_le_bytes());
    bytes.extend_from_slice(&byte_rate.to_le_bytes());
    bytes.extend_from_slice(&block_align.to_le_bytes());
    bytes.extend_from_slice(&bits_per_sample.to_le_bytes());
    bytes.extend_from_slice(extension);
    bytes.extend_from_slice(b"data");
    bytes.extend_from_slice(&data_len.to_le_bytes());
    bytes
}

/// Canonical 44-byte PCM header.
pub fn canonical_header(sample_rate: u32, channels: u16, bits_per_sample: u16, data_len: u32) -> Vec<u8> {
    fmt_header(sample_rate, channels, bits_per_sample, &[], data_len)
}

/// 16 kHz mono 16-bit header with `extension` bytes in the `fmt ` chunk.
pub fn header_with_fmt_extension(extension: &[u8]) -> Vec<u8> {
    fmt_header(16000, 1, 16, extension, 0)
}

/// Complete WAV file: canonical header followed by `payload`.
pub fn wav_file(sample_rate: u32, channels: u16, bits_per_sample: u16, payload: &[u8]) -> Vec<u8> {
    let mut bytes = canonical_header(sample_rate, channels, bits_per_sample, payload.len() as u32);
    bytes.extend_from_slice(payload);
    bytes
}

/// A RIFF chunk with `tag`, size and payload, padded to an even length.
pub fn chunk(tag: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(8 + payload.len() + 1);
    bytes.extend_from_slice(tag);
    bytes.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    bytes.extend_from_slice(payload);
    if payload.len() % 2 == 1 {
        bytes.push(0);
    }
    bytes
}
