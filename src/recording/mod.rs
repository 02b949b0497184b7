//! Recording session management module
//!
//! A [`RecordingSession`] wraps one microphone capture lifecycle:
//! acquire the input stream, accumulate fragments in arrival order, then
//! finalize them into a single [`AudioClip`].
//!
//! # State machine
//! - Idle -> Capturing (`start`, microphone acquired)
//! - Capturing -> Finalized (`stop`, stream released and clip built)
//! - Finalized -> Idle (clip handed to the caller, buffer cleared)
//!
//! A failed `start` never leaves `Idle`. `start` while capturing and `stop`
//! while idle are no-ops.

mod clip;

pub use clip::AudioClip;

use crate::audio::{AudioChunk, AudioInput, CaptureStream};
use crate::error::RecordingError;
use std::fmt;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Lifecycle state of a recording session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordingState {
    /// No microphone held
    #[default]
    Idle,
    /// Microphone held, fragments accumulating
    Capturing,
    /// Stream released, clip built, not yet handed over
    Finalized,
}

impl fmt::Display for RecordingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordingState::Idle => write!(f, "Idle"),
            RecordingState::Capturing => write!(f, "Capturing"),
            RecordingState::Finalized => write!(f, "Finalized"),
        }
    }
}

impl RecordingState {
    /// Returns whether a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: &RecordingState) -> bool {
        matches!(
            (self, target),
            (RecordingState::Idle, RecordingState::Capturing)
                | (RecordingState::Capturing, RecordingState::Finalized)
                | (RecordingState::Finalized, RecordingState::Idle)
        )
    }
}

/// One microphone capture lifecycle
///
/// Owns the capture stream exclusively; dropping the session releases the
/// microphone.
#[derive(Default)]
pub struct RecordingSession {
    state: RecordingState,
    chunks: Vec<AudioChunk>,
    stream: Option<CaptureStream>,
    next_clip_id: u64,
}

impl RecordingSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> RecordingState {
        self.state
    }

    /// Number of fragments accumulated so far
    pub fn fragment_count(&self) -> usize {
        self.chunks.len()
    }

    /// Acquire the microphone and start accumulating fragments
    ///
    /// Does nothing if the session is already capturing. On failure the
    /// session stays `Idle` and nothing is held.
    pub fn start(&mut self, input: &dyn AudioInput) -> Result<(), RecordingError> {
        if self.state == RecordingState::Capturing {
            debug!("Recording already in progress, ignoring start");
            return Ok(());
        }

        let stream = input.open()?;
        info!(sample_rate = stream.sample_rate, "Recording started");
        self.chunks.clear();
        self.stream = Some(stream);
        self.transition(RecordingState::Capturing);
        Ok(())
    }

    /// Move fragments that already arrived into the session buffer
    ///
    /// Returns how many fragments were collected.
    pub fn collect_pending(&mut self) -> usize {
        match self.stream.as_mut() {
            Some(stream) => drain_fragments(&mut stream.fragments, &mut self.chunks),
            None => 0,
        }
    }

    /// Finalize the recording into a clip
    ///
    /// Returns `None` if the session was not capturing.
    pub fn stop(&mut self) -> Option<AudioClip> {
        if self.state != RecordingState::Capturing {
            debug!("No recording in progress, ignoring stop");
            return None;
        }

        let Some(mut stream) = self.stream.take() else {
            warn!("Capturing without a stream, resetting session");
            self.state = RecordingState::Idle;
            self.chunks.clear();
            return None;
        };

        // Joining the capture thread guarantees every fragment is in the channel.
        stream.handle.stop();
        drain_fragments(&mut stream.fragments, &mut self.chunks);
        let sample_rate = stream.sample_rate;
        drop(stream);
        self.transition(RecordingState::Finalized);

        let samples: Vec<i16> = self
            .chunks
            .drain(..)
            .flat_map(|chunk| chunk.samples)
            .collect();
        let clip = AudioClip::from_samples(self.next_clip_id, &samples, sample_rate);
        self.next_clip_id += 1;

        self.transition(RecordingState::Idle);
        info!(
            clip_id = clip.id,
            duration_ms = clip.duration().as_millis() as u64,
            bytes = clip.data.len(),
            "Recording finalized"
        );
        Some(clip)
    }

    fn transition(&mut self, target: RecordingState) {
        debug_assert!(
            self.state.can_transition_to(&target),
            "invalid recording transition {} -> {}",
            self.state,
            target
        );
        debug!("Recording state: {} -> {}", self.state, target);
        self.state = target;
    }
}

fn drain_fragments(rx: &mut mpsc::UnboundedReceiver<AudioChunk>, chunks: &mut Vec<AudioChunk>) -> usize {
    let mut collected = 0;
    while let Ok(chunk) = rx.try_recv() {
        chunks.push(chunk);
        collected += 1;
    }
    collected
}
