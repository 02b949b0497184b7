//! Finalized audio clips

use crate::audio::wav::{encode_wav, MAX_WAV_SAMPLES, WAV_CONTENT_TYPE, WAV_HEADER_LEN};
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::time::Duration;

/// A finalized, immutable audio recording ready for transmission
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    /// Sequence number of the clip within this process
    pub id: u64,
    /// MIME type of `data`
    pub content_type: String,
    /// Encoded clip bytes
    pub data: Vec<u8>,
    pub sample_rate: u32,
    pub sample_count: usize,
    pub recorded_at: DateTime<Utc>,
    /// Where the clip was written to disk, if it was kept
    pub saved_path: Option<PathBuf>,
}

impl AudioClip {
    /// Build a WAV clip from mono 16-bit samples
    pub fn from_samples(id: u64, samples: &[i16], sample_rate: u32) -> Self {
        Self {
            id,
            content_type: WAV_CONTENT_TYPE.to_string(),
            data: encode_wav(samples, sample_rate),
            sample_rate,
            sample_count: samples.len().min(MAX_WAV_SAMPLES),
            recorded_at: Utc::now(),
            saved_path: None,
        }
    }

    /// Playback length of the clip
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.sample_count as f64 / self.sample_rate as f64)
    }

    /// Whether the clip carries no audio samples
    pub fn is_empty(&self) -> bool {
        self.data.len() <= WAV_HEADER_LEN
    }

    /// File extension matching the clip content type
    pub fn extension(&self) -> &'static str {
        extension_for(&self.content_type)
    }

    /// Upload file name, `recording.<ext>`
    pub fn file_name(&self) -> String {
        format!("recording.{}", self.extension())
    }
}

/// Map an audio MIME type to the file extension used for uploads
pub(crate) fn extension_for(content_type: &str) -> &'static str {
    match content_type {
        "audio/wav" | "audio/x-wav" | "audio/wave" => "wav",
        "audio/mpeg" | "audio/mp3" => "mp3",
        "audio/webm" => "webm",
        "audio/ogg" => "ogg",
        "audio/mp4" | "audio/m4a" => "m4a",
        _ => "bin",
    }
}
