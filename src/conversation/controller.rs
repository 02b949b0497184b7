//! Conversation controller
//!
//! Turns user actions (send text, start/stop recording) into messages and
//! trip requests. Only planner replies, including planner-reported errors,
//! become system messages: a busy refusal, a missing microphone, a transport
//! failure or a malformed response is logged and leaves the log untouched.

use super::message::{Payload, Sender};
use super::store::MessageStore;
use crate::audio::AudioInput;
use crate::error::TripRequestError;
use crate::recording::{RecordingSession, RecordingState};
use crate::storage;
use crate::trips::{ConversationReply, TripInput, TripRequestClient};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, TryLockError};
use tracing::{debug, error, info, warn};

/// Outcome of a user action that may reach the planner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// The exchange ran to completion; `replied` tells whether a system
    /// message was appended
    Completed { replied: bool },
    /// Refused because a request is already in flight
    Busy,
    /// Nothing to send (blank text, or no recording to stop)
    Empty,
}

/// Drives one conversation
pub struct ChatController {
    store: Arc<MessageStore>,
    client: TripRequestClient,
    recorder: Arc<Mutex<RecordingSession>>,
    input: Arc<dyn AudioInput>,
    recordings_dir: Option<PathBuf>,
}

impl ChatController {
    pub fn new(store: Arc<MessageStore>, client: TripRequestClient, input: Arc<dyn AudioInput>) -> Self {
        Self {
            store,
            client,
            recorder: Arc::new(Mutex::new(RecordingSession::new())),
            input,
            recordings_dir: None,
        }
    }

    /// Keep a copy of every finalized clip in `dir`
    pub fn with_recordings_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.recordings_dir = dir;
        self
    }

    pub fn store(&self) -> &Arc<MessageStore> {
        &self.store
    }

    pub fn recording_state(&self) -> RecordingState {
        lock_session(&self.recorder).state()
    }

    /// Pull fragments that arrived since the last call into the active session
    ///
    /// Skips the round while a start or stop holds the session.
    pub fn poll_recording(&self) -> usize {
        match self.recorder.try_lock() {
            Ok(mut recorder) => recorder.collect_pending(),
            Err(TryLockError::WouldBlock) => 0,
            Err(TryLockError::Poisoned(poisoned)) => {
                warn!("Recorder mutex was poisoned, recovering session");
                poisoned.into_inner().collect_pending()
            }
        }
    }

    /// Send a typed query
    pub async fn send_text(&self, text: &str) -> Dispatch {
        let text = text.trim();
        if text.is_empty() {
            return Dispatch::Empty;
        }
        if self.store.is_busy() {
            debug!("Ignoring message while a request is in flight");
            return Dispatch::Busy;
        }

        self.store.append(
            Sender::User,
            Payload::Text {
                content: text.to_string(),
            },
        );
        let result = self
            .client
            .submit(&self.store, TripInput::Text(text.to_string()))
            .await;
        self.apply(result)
    }

    /// Start capturing a voice request
    ///
    /// Returns whether a recording is in progress afterwards.
    pub async fn start_recording(&self) -> bool {
        if self.store.is_busy() {
            debug!("Ignoring record request while a request is in flight");
            return false;
        }

        let recorder = self.recorder.clone();
        let input = self.input.clone();
        // Opening waits on the capture thread's readiness handshake
        let started =
            tokio::task::spawn_blocking(move || lock_session(&recorder).start(input.as_ref()))
                .await;

        match started {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                error!("Error accessing microphone: {}", e);
                false
            }
            Err(e) => {
                error!("Recording start task failed: {}", e);
                false
            }
        }
    }

    /// Stop the active recording and send the clip
    ///
    /// Allowed while a request is in flight; the clip is still added to the
    /// conversation, but its request is refused.
    pub async fn stop_recording(&self) -> Dispatch {
        let recorder = self.recorder.clone();
        let recordings_dir = self.recordings_dir.clone();
        // Releasing the device joins the capture thread; keeping the clip writes a file
        let finished = tokio::task::spawn_blocking(move || {
            let mut clip = lock_session(&recorder).stop()?;
            if let Some(dir) = &recordings_dir {
                match storage::save_clip(dir, &clip) {
                    Ok(path) => clip.saved_path = Some(path),
                    Err(e) => warn!("Failed to keep recording: {}", e),
                }
            }
            Some(clip)
        })
        .await;

        let clip = match finished {
            Ok(Some(clip)) => Arc::new(clip),
            Ok(None) => return Dispatch::Empty,
            Err(e) => {
                error!("Recording stop task failed: {}", e);
                return Dispatch::Empty;
            }
        };

        self.store.append(Sender::User, Payload::Audio { clip: clip.clone() });
        let result = self.client.submit(&self.store, TripInput::Audio(clip)).await;
        self.apply(result)
    }

    fn apply(&self, result: Result<ConversationReply, TripRequestError>) -> Dispatch {
        let payload = match result {
            Ok(ConversationReply::Text(content)) => Payload::Text { content },
            Ok(ConversationReply::Itinerary(journey)) => {
                info!(route = %journey, "Itinerary received");
                Payload::Itinerary { journey }
            }
            Ok(ConversationReply::Error(message)) => {
                warn!(error = %message, "Planner reported an error");
                Payload::Error { message }
            }
            Err(TripRequestError::Busy) => {
                warn!("Request refused: another request is in flight");
                return Dispatch::Busy;
            }
            Err(e) if e.is_transport() => {
                error!("Error sending request: {}", e);
                return Dispatch::Completed { replied: false };
            }
            Err(e) => {
                warn!("Dropping planner response: {}", e);
                return Dispatch::Completed { replied: false };
            }
        };

        self.store.append(Sender::System, payload);
        Dispatch::Completed { replied: true }
    }
}

fn lock_session(recorder: &Mutex<RecordingSession>) -> MutexGuard<'_, RecordingSession> {
    match recorder.lock() {
        Ok(recorder) => recorder,
        Err(poisoned) => {
            warn!("Recorder mutex was poisoned, recovering session");
            poisoned.into_inner()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{chunk, ScriptedInput, UnavailableInput};
    use crate::trips::ReplyMode;
    use serde_json::json;
    use std::time::Duration;
    use url::Url;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn controller(server: &MockServer, mode: ReplyMode, input: Arc<dyn AudioInput>) -> ChatController {
        let base = Url::parse(&server.uri()).unwrap();
        let client = TripRequestClient::new(&base, mode, Duration::from_secs(5)).unwrap();
        ChatController::new(Arc::new(MessageStore::new()), client, input)
    }

    async fn respond_with(server: &MockServer, template: ResponseTemplate) {
        Mock::given(method("POST"))
            .and(path("/trips"))
            .respond_with(template)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_send_text_appends_itinerary() {
        let server = MockServer::start().await;
        respond_with(
            &server,
            ResponseTemplate::new(200).set_body_json(json!({
                "itineraire": "X -> Y",
                "duree": "2h",
                "next_dep_time": "10:00"
            })),
        )
        .await;

        let chat = controller(&server, ReplyMode::Itinerary, Arc::new(UnavailableInput));
        let outcome = chat.send_text("  from X to Y  ").await;
        assert_eq!(outcome, Dispatch::Completed { replied: true });

        let snapshot = chat.store().snapshot();
        assert!(!snapshot.busy);
        assert_eq!(snapshot.messages.len(), 2);
        assert_eq!(snapshot.messages[0].sender, Sender::User);
        assert_eq!(snapshot.messages[0].text(), Some("from X to Y"));
        assert_eq!(snapshot.messages[1].sender, Sender::System);
        match &snapshot.messages[1].payload {
            Payload::Itinerary { journey } => {
                assert_eq!(journey.departure, "X");
                assert_eq!(journey.arrival, "Y");
                assert_eq!(journey.duration, "2h");
                assert_eq!(journey.next_departure, "10:00");
            }
            other => panic!("unexpected payload: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_backend_error_is_shown() {
        let server = MockServer::start().await;
        respond_with(
            &server,
            ResponseTemplate::new(200).set_body_json(json!({ "error": "No route found" })),
        )
        .await;

        let chat = controller(&server, ReplyMode::Itinerary, Arc::new(UnavailableInput));
        chat.send_text("Paris to Atlantis").await;

        let snapshot = chat.store().snapshot();
        let reply = snapshot.messages.last().unwrap();
        assert_eq!(reply.sender, Sender::System);
        assert!(reply.is_error());
        assert_eq!(reply.text(), Some("No route found"));
    }

    #[tokio::test]
    async fn test_transport_failure_appends_nothing() {
        let server = MockServer::start().await;
        respond_with(&server, ResponseTemplate::new(503)).await;

        let chat = controller(&server, ReplyMode::Itinerary, Arc::new(UnavailableInput));
        let outcome = chat.send_text("Paris to Lyon").await;
        assert_eq!(outcome, Dispatch::Completed { replied: false });

        let snapshot = chat.store().snapshot();
        assert_eq!(snapshot.messages.len(), 1);
        assert_eq!(snapshot.messages[0].sender, Sender::User);
        assert!(!snapshot.busy);
    }

    #[tokio::test]
    async fn test_malformed_response_appends_nothing() {
        let server = MockServer::start().await;
        respond_with(&server, ResponseTemplate::new(200).set_body_json(json!({}))).await;

        let chat = controller(&server, ReplyMode::Itinerary, Arc::new(UnavailableInput));
        let outcome = chat.send_text("Paris to Lyon").await;
        assert_eq!(outcome, Dispatch::Completed { replied: false });
        assert_eq!(chat.store().len(), 1);
    }

    #[tokio::test]
    async fn test_send_while_busy_has_no_effect() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "text": "hi" })))
            .expect(0)
            .mount(&server)
            .await;

        let chat = controller(&server, ReplyMode::PlainText, Arc::new(UnavailableInput));
        let _in_flight = chat.store().begin_request().unwrap();

        assert_eq!(chat.send_text("hello").await, Dispatch::Busy);
        assert!(chat.store().is_empty());
    }

    #[tokio::test]
    async fn test_blank_text_is_ignored() {
        let server = MockServer::start().await;
        let chat = controller(&server, ReplyMode::PlainText, Arc::new(UnavailableInput));
        assert_eq!(chat.send_text("   \t").await, Dispatch::Empty);
        assert!(chat.store().is_empty());
    }

    #[tokio::test]
    async fn test_missing_microphone_is_silent() {
        let server = MockServer::start().await;
        let chat = controller(&server, ReplyMode::Itinerary, Arc::new(UnavailableInput));

        assert!(!chat.start_recording().await);
        assert_eq!(chat.recording_state(), RecordingState::Idle);
        assert_eq!(chat.stop_recording().await, Dispatch::Empty);
        assert!(chat.store().is_empty());
    }

    #[tokio::test]
    async fn test_record_start_refused_while_busy() {
        let server = MockServer::start().await;
        let input = Arc::new(ScriptedInput::new(vec![chunk(&[1])]));
        let chat = controller(&server, ReplyMode::Itinerary, input.clone());

        let guard = chat.store().begin_request().unwrap();
        assert!(!chat.start_recording().await);
        assert_eq!(input.open_count(), 0);
        drop(guard);

        assert!(chat.start_recording().await);
        assert_eq!(chat.recording_state(), RecordingState::Capturing);
    }

    #[tokio::test]
    async fn test_voice_request_round_trip() {
        let server = MockServer::start().await;
        respond_with(
            &server,
            ResponseTemplate::new(200).set_body_json(json!({ "itineraire": "Paris -> Lyon -> Marseille" })),
        )
        .await;

        let input = Arc::new(ScriptedInput::new(vec![chunk(&[1, 2]), chunk(&[3])]));
        let chat = controller(&server, ReplyMode::Itinerary, input.clone());

        assert!(chat.start_recording().await);
        assert_eq!(chat.poll_recording(), 2);
        let outcome = chat.stop_recording().await;
        assert_eq!(outcome, Dispatch::Completed { replied: true });
        assert!(!input.is_held());

        let snapshot = chat.store().snapshot();
        assert_eq!(snapshot.messages.len(), 2);
        match &snapshot.messages[0].payload {
            Payload::Audio { clip } => {
                assert_eq!(clip.sample_count, 3);
                assert!(clip.saved_path.is_none());
            }
            other => panic!("unexpected payload: {:?}", other),
        }
        match &snapshot.messages[1].payload {
            Payload::Itinerary { journey } => {
                assert_eq!(journey.intermediate_stops, vec!["Lyon".to_string()])
            }
            other => panic!("unexpected payload: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_stop_while_busy_keeps_clip_but_refuses_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "text": "hi" })))
            .expect(0)
            .mount(&server)
            .await;

        let input = Arc::new(ScriptedInput::new(vec![chunk(&[5])]));
        let chat = controller(&server, ReplyMode::PlainText, input.clone());
        assert!(chat.start_recording().await);

        let _in_flight = chat.store().begin_request().unwrap();
        assert_eq!(chat.stop_recording().await, Dispatch::Busy);
        assert_eq!(chat.recording_state(), RecordingState::Idle);
        assert!(!input.is_held());

        let snapshot = chat.store().snapshot();
        assert_eq!(snapshot.messages.len(), 1);
        assert!(matches!(snapshot.messages[0].payload, Payload::Audio { .. }));
    }

    #[tokio::test]
    async fn test_kept_recordings_are_saved() {
        let server = MockServer::start().await;
        respond_with(
            &server,
            ResponseTemplate::new(200).set_body_json(json!({ "text": "ok" })),
        )
        .await;

        let tmp = tempfile::tempdir().unwrap();
        let input = Arc::new(ScriptedInput::new(vec![chunk(&[1, 2, 3])]));
        let chat = controller(&server, ReplyMode::PlainText, input)
            .with_recordings_dir(Some(tmp.path().to_path_buf()));

        assert!(chat.start_recording().await);
        chat.stop_recording().await;

        let snapshot = chat.store().snapshot();
        match &snapshot.messages[0].payload {
            Payload::Audio { clip } => {
                let saved = clip.saved_path.as_ref().expect("saved path");
                assert!(saved.exists());
                assert!(saved.starts_with(tmp.path()));
            }
            other => panic!("unexpected payload: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_device_open_runs_off_the_event_loop() {
        let server = MockServer::start().await;
        let input = Arc::new(
            ScriptedInput::new(vec![chunk(&[1])]).with_open_delay(Duration::from_millis(300)),
        );
        let chat = controller(&server, ReplyMode::Itinerary, input.clone());

        let tick = async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            std::time::Instant::now()
        };
        let (started, ticked_at) = tokio::join!(chat.start_recording(), tick);

        assert!(started);
        assert!(ticked_at < input.opened_at().unwrap());
    }

    #[tokio::test]
    async fn test_device_release_runs_off_the_event_loop() {
        let server = MockServer::start().await;
        respond_with(
            &server,
            ResponseTemplate::new(200).set_body_json(json!({ "text": "ok" })),
        )
        .await;

        let input = Arc::new(
            ScriptedInput::new(vec![chunk(&[1, 2])]).with_release_delay(Duration::from_millis(300)),
        );
        let chat = controller(&server, ReplyMode::PlainText, input.clone());
        assert!(chat.start_recording().await);

        let tick = async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            std::time::Instant::now()
        };
        let (outcome, ticked_at) = tokio::join!(chat.stop_recording(), tick);

        assert_eq!(outcome, Dispatch::Completed { replied: true });
        assert!(!input.is_held());
        assert!(ticked_at < input.released_at().unwrap());
    }
}
