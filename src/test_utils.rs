//! Shared helpers for unit tests: in-memory audio sources

use crate::audio::{AudioCaptureError, AudioCaptureHandle, AudioChunk, AudioInput, CaptureStream};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// Sample rate used by scripted fragments
pub(crate) const TEST_SAMPLE_RATE: u32 = 16000;

/// Build a fragment at the test sample rate
pub(crate) fn chunk(samples: &[i16]) -> AudioChunk {
    AudioChunk {
        samples: samples.to_vec(),
        sample_rate: TEST_SAMPLE_RATE,
    }
}

/// Audio source that replays a fixed list of fragments on every open
pub(crate) struct ScriptedInput {
    fragments: Vec<AudioChunk>,
    opens: AtomicUsize,
    last_flag: Mutex<Option<Arc<AtomicBool>>>,
    open_delay: Duration,
    release_delay: Duration,
    opened_at: Mutex<Option<Instant>>,
    released_at: Arc<Mutex<Option<Instant>>>,
}

impl ScriptedInput {
    pub(crate) fn new(fragments: Vec<AudioChunk>) -> Self {
        Self {
            fragments,
            opens: AtomicUsize::new(0),
            last_flag: Mutex::new(None),
            open_delay: Duration::ZERO,
            release_delay: Duration::ZERO,
            opened_at: Mutex::new(None),
            released_at: Arc::new(Mutex::new(None)),
        }
    }

    /// Make `open` block like a slow device handshake
    pub(crate) fn with_open_delay(mut self, delay: Duration) -> Self {
        self.open_delay = delay;
        self
    }

    /// Back each stream with a capture thread that takes `delay` to release
    pub(crate) fn with_release_delay(mut self, delay: Duration) -> Self {
        self.release_delay = delay;
        self
    }

    /// When the last `open` returned
    pub(crate) fn opened_at(&self) -> Option<Instant> {
        *self.opened_at.lock().unwrap()
    }

    /// When the last capture thread finished releasing the device
    pub(crate) fn released_at(&self) -> Option<Instant> {
        *self.released_at.lock().unwrap()
    }

    /// How many times the device was acquired
    pub(crate) fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    /// Whether the most recently opened stream is still capturing
    pub(crate) fn is_held(&self) -> bool {
        self.last_flag
            .lock()
            .unwrap()
            .as_ref()
            .map(|flag| flag.load(Ordering::SeqCst))
            .unwrap_or(false)
    }
}

impl AudioInput for ScriptedInput {
    fn open(&self) -> Result<CaptureStream, AudioCaptureError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = mpsc::unbounded_channel();
        for fragment in &self.fragments {
            tx.send(fragment.clone()).unwrap();
        }
        let flag = Arc::new(AtomicBool::new(true));
        *self.last_flag.lock().unwrap() = Some(flag.clone());

        let thread_handle = (!self.release_delay.is_zero()).then(|| {
            let flag = flag.clone();
            let delay = self.release_delay;
            let released_at = self.released_at.clone();
            thread::spawn(move || {
                while flag.load(Ordering::SeqCst) {
                    thread::sleep(Duration::from_millis(5));
                }
                thread::sleep(delay);
                *released_at.lock().unwrap() = Some(Instant::now());
            })
        });

        if !self.open_delay.is_zero() {
            thread::sleep(self.open_delay);
        }
        *self.opened_at.lock().unwrap() = Some(Instant::now());

        Ok(CaptureStream {
            handle: AudioCaptureHandle::new(flag, thread_handle),
            fragments: rx,
            sample_rate: TEST_SAMPLE_RATE,
        })
    }
}

/// Audio source with no microphone behind it
pub(crate) struct UnavailableInput;

impl AudioInput for UnavailableInput {
    fn open(&self) -> Result<CaptureStream, AudioCaptureError> {
        Err(AudioCaptureError::NoInputDevice)
    }
}
