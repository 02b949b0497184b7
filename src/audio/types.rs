//! Audio types and error definitions

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tokio::sync::mpsc;
use tracing::info;

/// Fragment of captured audio, delivered in arrival order
#[derive(Debug, Clone)]
pub struct AudioChunk {
    /// PCM 16-bit signed samples (mono)
    pub samples: Vec<i16>,
    /// Sample rate in Hz of the capturing device
    pub sample_rate: u32,
}

/// Handle for controlling audio capture from outside the capture thread
///
/// The capture automatically stops when this handle is dropped.
pub struct AudioCaptureHandle {
    pub(crate) is_capturing: Arc<AtomicBool>,
    pub(crate) thread_handle: Option<JoinHandle<()>>,
}

impl AudioCaptureHandle {
    pub(crate) fn new(is_capturing: Arc<AtomicBool>, thread_handle: Option<JoinHandle<()>>) -> Self {
        Self {
            is_capturing,
            thread_handle,
        }
    }

    /// Stop capturing audio and wait for the capture thread to release the device
    pub fn stop(&mut self) {
        let was_capturing = self.is_capturing.swap(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
        if was_capturing {
            info!("Audio capture stopped");
        }
    }

    /// Check if currently capturing
    pub fn is_capturing(&self) -> bool {
        self.is_capturing.load(Ordering::SeqCst)
    }
}

impl Drop for AudioCaptureHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// An open microphone stream: the control handle plus the fragment channel
pub struct CaptureStream {
    pub handle: AudioCaptureHandle,
    pub fragments: mpsc::UnboundedReceiver<AudioChunk>,
    /// Sample rate the fragments are delivered at
    pub sample_rate: u32,
}

/// Source of microphone audio
///
/// Implemented by [`super::MicrophoneInput`] for real devices; tests provide
/// in-memory sources.
pub trait AudioInput: Send + Sync {
    /// Acquire the input device and start delivering fragments
    fn open(&self) -> Result<CaptureStream, AudioCaptureError>;
}

/// Errors that can occur during audio capture
#[derive(Debug, thiserror::Error)]
pub enum AudioCaptureError {
    #[error("No audio input device found")]
    NoInputDevice,

    #[error("Audio configuration error: {0}")]
    ConfigError(String),

    #[error("Unsupported audio format: {0}")]
    UnsupportedFormat(String),

    #[error("Capture thread exited before the stream started")]
    ThreadExited,

    #[error("Audio stream error: {0}")]
    StreamError(#[from] cpal::BuildStreamError),

    #[error("Audio play error: {0}")]
    PlayError(#[from] cpal::PlayStreamError),

    #[error("Default config error: {0}")]
    DefaultConfigError(#[from] cpal::DefaultStreamConfigError),
}
