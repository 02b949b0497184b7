//! Audio capture module using cpal for cross-platform microphone access
//!
//! Captures audio from the default input device on a dedicated thread and
//! delivers mono 16-bit PCM fragments over a channel. The device is held only
//! while the returned [`AudioCaptureHandle`] is capturing.

mod types;
pub mod wav;

pub use types::{AudioCaptureError, AudioCaptureHandle, AudioChunk, AudioInput, CaptureStream};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::SampleFormat;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc as std_mpsc, Arc};
use std::thread;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info};

/// How often the capture thread checks whether it should release the device
const STOP_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// The system default microphone
#[derive(Debug, Default, Clone, Copy)]
pub struct MicrophoneInput;

impl AudioInput for MicrophoneInput {
    fn open(&self) -> Result<CaptureStream, AudioCaptureError> {
        start_capture()
    }
}

/// Start audio capture on a dedicated thread
///
/// Blocks until the capture thread has either started the input stream or
/// failed to, so a denied or missing microphone is reported to the caller
/// instead of only being logged from the thread.
///
/// # Errors
/// Returns `AudioCaptureError` if:
/// - No audio input device is available
/// - The audio device configuration is not supported
/// - The audio stream cannot be started
pub(crate) fn start_capture() -> Result<CaptureStream, AudioCaptureError> {
    let is_capturing = Arc::new(AtomicBool::new(true));
    let is_capturing_clone = is_capturing.clone();

    let (chunk_tx, chunk_rx) = mpsc::unbounded_channel();
    let (ready_tx, ready_rx) = std_mpsc::sync_channel(1);

    let thread_handle = thread::spawn(move || {
        if let Err(e) = run_capture(is_capturing_clone, chunk_tx, &ready_tx) {
            error!("Audio capture error: {}", e);
            let _ = ready_tx.send(Err(e));
        }
    });

    let mut handle = AudioCaptureHandle::new(is_capturing, Some(thread_handle));

    match ready_rx.recv() {
        Ok(Ok(sample_rate)) => Ok(CaptureStream {
            handle,
            fragments: chunk_rx,
            sample_rate,
        }),
        Ok(Err(e)) => {
            handle.stop();
            Err(e)
        }
        Err(_) => {
            handle.stop();
            Err(AudioCaptureError::ThreadExited)
        }
    }
}

/// Run audio capture on the current thread (blocking)
///
/// Reports the stream sample rate through `ready_tx` once the stream plays,
/// then keeps the stream alive until `is_capturing` is cleared.
fn run_capture(
    is_capturing: Arc<AtomicBool>,
    chunk_tx: mpsc::UnboundedSender<AudioChunk>,
    ready_tx: &std_mpsc::SyncSender<Result<u32, AudioCaptureError>>,
) -> Result<(), AudioCaptureError> {
    let host = cpal::default_host();

    let device = host
        .default_input_device()
        .ok_or(AudioCaptureError::NoInputDevice)?;

    let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
    info!("Using audio input device: {}", device_name);

    let supported_config = device.default_input_config()?;
    let sample_format = supported_config.sample_format();
    let config: cpal::StreamConfig = supported_config.into();
    let sample_rate = config.sample_rate.0;
    let channels = config.channels as usize;
    if channels == 0 {
        return Err(AudioCaptureError::ConfigError(
            "input device reports zero channels".to_string(),
        ));
    }

    info!("Audio config: {} channels, {} Hz", channels, sample_rate);

    let err_callback = |err| {
        error!("Audio stream error: {}", err);
    };

    let stream = match sample_format {
        SampleFormat::I16 => {
            let is_capturing_i16 = is_capturing.clone();
            device.build_input_stream(
                &config,
                move |data: &[i16], _| {
                    if !is_capturing_i16.load(Ordering::SeqCst) {
                        return;
                    }
                    forward_fragment(to_mono(data, channels), sample_rate, &chunk_tx);
                },
                err_callback,
                None,
            )?
        }
        SampleFormat::F32 => {
            let is_capturing_f32 = is_capturing.clone();
            device.build_input_stream(
                &config,
                move |data: &[f32], _| {
                    if !is_capturing_f32.load(Ordering::SeqCst) {
                        return;
                    }
                    let samples: Vec<i16> = data
                        .iter()
                        .map(|&s| (s.clamp(-1.0, 1.0) * 32767.0) as i16)
                        .collect();
                    forward_fragment(to_mono(&samples, channels), sample_rate, &chunk_tx);
                },
                err_callback,
                None,
            )?
        }
        sample_format => {
            return Err(AudioCaptureError::UnsupportedFormat(format!(
                "{:?}",
                sample_format
            )));
        }
    };

    stream.play()?;
    info!("Audio capture started");
    let _ = ready_tx.send(Ok(sample_rate));

    while is_capturing.load(Ordering::SeqCst) {
        thread::sleep(STOP_POLL_INTERVAL);
    }

    drop(stream);
    info!("Audio input device released");
    Ok(())
}

fn forward_fragment(samples: Vec<i16>, sample_rate: u32, sender: &mpsc::UnboundedSender<AudioChunk>) {
    if samples.is_empty() {
        return;
    }
    // The receiver is gone once the session finalized; late fragments are dropped.
    let _ = sender.send(AudioChunk {
        samples,
        sample_rate,
    });
}

/// Convert interleaved samples to mono by averaging channels
pub(crate) fn to_mono(data: &[i16], channels: usize) -> Vec<i16> {
    if channels > 1 {
        data.chunks(channels)
            .map(|frame| {
                let sum: i32 = frame.iter().map(|&s| s as i32).sum();
                (sum / frame.len() as i32) as i16
            })
            .collect()
    } else {
        data.to_vec()
    }
}
