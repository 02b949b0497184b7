//! Minimal WAV (RIFF, PCM 16-bit mono) encoder for finalized clips

use tracing::warn;

/// MIME type of clips produced by [`encode_wav`]
pub const WAV_CONTENT_TYPE: &str = "audio/wav";

/// Size of the canonical RIFF/WAVE header in bytes
pub const WAV_HEADER_LEN: usize = 44;

const BITS_PER_SAMPLE: u16 = 16;
const CHANNELS: u16 = 1;
const BYTES_PER_SAMPLE: usize = 2;

/// RIFF chunk size minus the data length: "WAVE" plus the fmt chunk plus the data chunk header
const RIFF_OVERHEAD: u32 = 36;

/// Most samples whose length a RIFF header can still describe; longer input is truncated
pub const MAX_WAV_SAMPLES: usize = ((u32::MAX - RIFF_OVERHEAD) / BYTES_PER_SAMPLE as u32) as usize;

/// Number of samples kept and the data chunk length for `sample_count` samples
fn data_chunk_len(sample_count: usize) -> (usize, u32) {
    let kept = sample_count.min(MAX_WAV_SAMPLES);
    let data_len = u32::try_from(kept * BYTES_PER_SAMPLE).unwrap_or(u32::MAX - RIFF_OVERHEAD);
    (kept, data_len)
}

/// Encode mono 16-bit samples as a complete WAV file
pub fn encode_wav(samples: &[i16], sample_rate: u32) -> Vec<u8> {
    let (kept, data_len) = data_chunk_len(samples.len());
    if kept < samples.len() {
        warn!(
            dropped = samples.len() - kept,
            "Recording exceeds the WAV size limit, truncating"
        );
    }
    let samples = &samples[..kept];

    let block_align = CHANNELS * BITS_PER_SAMPLE / 8;
    let byte_rate = sample_rate.saturating_mul(u32::from(block_align));

    let mut bytes = Vec::with_capacity(WAV_HEADER_LEN + kept * BYTES_PER_SAMPLE);
    bytes.extend_from_slice(b"RIFF");
    bytes.extend_from_slice(&RIFF_OVERHEAD.saturating_add(data_len).to_le_bytes());
    bytes.extend_from_slice(b"WAVE");

    bytes.extend_from_slice(b"fmt ");
    bytes.extend_from_slice(&16u32.to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes()); // PCM
    bytes.extend_from_slice(&CHANNELS.to_le_bytes());
    bytes.extend_from_slice(&sample_rate.to_le_bytes());
    bytes.extend_from_slice(&byte_rate.to_le_bytes());
    bytes.extend_from_slice(&block_align.to_le_bytes());
    bytes.extend_from_slice(&BITS_PER_SAMPLE.to_le_bytes());

    bytes.extend_from_slice(b"data");
    bytes.extend_from_slice(&data_len.to_le_bytes());
    for sample in samples {
        bytes.extend_from_slice(&sample.to_le_bytes());
    }
    bytes
}
