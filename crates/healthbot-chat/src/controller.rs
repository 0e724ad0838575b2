//! Session controller.
//!
//! Turns user intents (typed text, a mic press, reset, speak) into backend
//! requests and transcript updates. Every path, including failures and
//! dropped futures, leaves the session `Idle` with a consistent transcript.

use std::sync::{Arc, Mutex, MutexGuard};

use healthbot_core::{Message, Severity};
use healthbot_feedback::FeedbackEmitter;
use healthbot_speech::{
    SpeechRecognizer, SpeechSynthesizer, UnavailableRecognizer, UnavailableSynthesizer,
};

use crate::backend::AnalysisBackend;
use crate::label::strip_severity_label;
use crate::render::{Status, StatusLine, TranscriptRenderer};
use crate::state::{IdleOnDrop, SessionState, StateMachine};
use crate::transcript::Transcript;

pub const WELCOME_MESSAGE: &str =
    "Welcome. Please describe your symptoms. Example: “Fever and headache since yesterday.”";
pub const RESET_GREETING: &str = "History cleared. How can I help today?";
pub const APOLOGY_MESSAGE: &str = "Sorry, something went wrong.";
pub const SPEECH_INPUT_UNAVAILABLE: &str = "Speech recognition is not supported on this system.";
pub const SPEECH_OUTPUT_UNAVAILABLE: &str = "Speech output is not supported on this system.";

/// Result of [`SessionController::submit_text`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Nothing but whitespace; no message, no request.
    Empty,
    /// Another operation is in progress; the text was dropped.
    Busy,
    /// The backend replied with this severity.
    Answered(Severity),
    /// The backend call failed and the apology was appended.
    Failed,
}

/// Result of [`SessionController::start_voice_input`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceOutcome {
    /// No speech recognizer on this host.
    Unavailable,
    Busy,
    /// The recognizer reported an error; the mic error status is shown.
    RecognitionFailed,
    /// The recognizer returned an empty transcript.
    NothingHeard,
    /// The utterance was submitted.
    Submitted(SubmitOutcome),
}

/// Result of [`SessionController::reset_session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetOutcome {
    /// History was cleared and the greeting is the only message.
    Cleared,
    /// A request or listen is in progress; nothing was touched.
    Busy,
}

/// Result of [`SessionController::speak_last_bot_message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeakOutcome {
    NothingToSpeak,
    Unavailable,
    Spoken,
    Failed,
}

/// Shows a status for as long as it is alive.
struct StatusGuard<'a> {
    line: &'a dyn StatusLine,
}

impl<'a> StatusGuard<'a> {
    fn show(line: &'a dyn StatusLine, status: Status) -> Self {
        line.set(status);
        Self { line }
    }
}

impl Drop for StatusGuard<'_> {
    fn drop(&mut self) {
        self.line.clear();
    }
}

/// Coordinates one conversation view.
pub struct SessionController {
    backend: Arc<dyn AnalysisBackend>,
    renderer: Arc<dyn TranscriptRenderer>,
    status: Arc<dyn StatusLine>,
    recognizer: Arc<dyn SpeechRecognizer>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    feedback: FeedbackEmitter,
    state: StateMachine,
    transcript: Mutex<Transcript>,
}

impl SessionController {
    /// Controller with no speech capabilities and silent feedback.
    pub fn new(
        backend: Arc<dyn AnalysisBackend>,
        renderer: Arc<dyn TranscriptRenderer>,
        status: Arc<dyn StatusLine>,
    ) -> Self {
        Self {
            backend,
            renderer,
            status,
            recognizer: Arc::new(UnavailableRecognizer),
            synthesizer: Arc::new(UnavailableSynthesizer),
            feedback: FeedbackEmitter::silent(),
            state: StateMachine::new(),
            transcript: Mutex::new(Transcript::new()),
        }
    }

    pub fn with_recognizer(mut self, recognizer: Arc<dyn SpeechRecognizer>) -> Self {
        self.recognizer = recognizer;
        self
    }

    pub fn with_synthesizer(mut self, synthesizer: Arc<dyn SpeechSynthesizer>) -> Self {
        self.synthesizer = synthesizer;
        self
    }

    pub fn with_feedback(mut self, feedback: FeedbackEmitter) -> Self {
        self.feedback = feedback;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state.current()
    }

    /// Snapshot of the transcript.
    pub fn transcript(&self) -> Vec<Message> {
        self.lock_transcript().messages().to_vec()
    }

    pub fn last_bot_message(&self) -> Option<Message> {
        self.lock_transcript().last_bot().cloned()
    }

    fn lock_transcript(&self) -> MutexGuard<'_, Transcript> {
        self.transcript.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Append to the transcript and its projection in one step, then chime.
    fn append(&self, message: Message) {
        let sender = message.sender;
        {
            let mut transcript = self.lock_transcript();
            self.renderer.append(&message);
            transcript.push(message);
        }
        self.feedback.on_message(sender);
    }

    /// Greet the user when the view opens.
    pub fn open(&self) {
        self.append(Message::bot(WELCOME_MESSAGE));
    }

    /// Submit typed text for analysis.
    pub async fn submit_text(&self, text: &str) -> SubmitOutcome {
        let text = text.trim();
        if text.is_empty() {
            return SubmitOutcome::Empty;
        }
        if let Err(e) = self.state.transition(SessionState::AwaitingResponse) {
            tracing::debug!(error = %e, "Submission dropped");
            return SubmitOutcome::Busy;
        }
        let _idle = IdleOnDrop::new(&self.state);
        self.dispatch(text).await
    }

    /// Send `text` to the backend. The session must already be
    /// `AwaitingResponse`.
    async fn dispatch(&self, text: &str) -> SubmitOutcome {
        self.append(Message::user(text));
        let _status = StatusGuard::show(self.status.as_ref(), Status::Analyzing);

        match self.backend.analyze(text).await {
            Ok(analysis) => {
                tracing::info!(severity = %analysis.severity, "Bot reply appended");
                let severity = analysis.severity;
                self.append(Message::bot_with_severity(analysis.text, severity));
                SubmitOutcome::Answered(severity)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Analysis failed");
                self.append(Message::bot(APOLOGY_MESSAGE));
                SubmitOutcome::Failed
            }
        }
    }

    /// Listen for one utterance and submit it.
    pub async fn start_voice_input(&self) -> VoiceOutcome {
        self.feedback.resume();
        if !self.recognizer.is_available() {
            self.status.notify(SPEECH_INPUT_UNAVAILABLE);
            return VoiceOutcome::Unavailable;
        }
        if let Err(e) = self.state.transition(SessionState::Listening) {
            tracing::debug!(error = %e, "Voice input dropped");
            return VoiceOutcome::Busy;
        }
        let _idle = IdleOnDrop::new(&self.state);

        let heard = {
            let _status = StatusGuard::show(self.status.as_ref(), Status::Listening);
            self.recognizer.listen_once().await
        };

        let utterance = match heard {
            Ok(utterance) => utterance,
            Err(e) => {
                tracing::warn!(error = %e, "Speech recognition failed");
                self.status.set(Status::MicError);
                return VoiceOutcome::RecognitionFailed;
            }
        };
        let text = utterance.trim();
        if text.is_empty() {
            tracing::debug!("Recognizer returned an empty transcript");
            return VoiceOutcome::NothingHeard;
        }

        if let Err(e) = self.state.transition(SessionState::AwaitingResponse) {
            tracing::warn!(error = %e, "Recognized utterance dropped");
            return VoiceOutcome::Busy;
        }
        VoiceOutcome::Submitted(self.dispatch(text).await)
    }

    /// Clear server and local history, then greet again.
    ///
    /// Only runs from `Idle`, and holds `AwaitingResponse` while the backend
    /// call is out. The backend outcome is logged only; the local transcript
    /// is cleared either way.
    pub async fn reset_session(&self) -> ResetOutcome {
        if let Err(e) = self.state.transition(SessionState::AwaitingResponse) {
            tracing::debug!(error = %e, "Reset dropped");
            return ResetOutcome::Busy;
        }
        let _idle = IdleOnDrop::new(&self.state);

        match self.backend.reset().await {
            Ok(()) => tracing::info!("Backend history cleared"),
            Err(e) => tracing::warn!(error = %e, "Backend reset failed; clearing locally"),
        }
        {
            let mut transcript = self.lock_transcript();
            transcript.clear();
            self.renderer.clear();
            let greeting = Message::bot(RESET_GREETING);
            self.renderer.append(&greeting);
            transcript.push(greeting);
        }
        self.feedback.on_bot_message();
        ResetOutcome::Cleared
    }

    /// Read the most recent bot message aloud, without its severity label.
    pub async fn speak_last_bot_message(&self) -> SpeakOutcome {
        let Some(message) = self.last_bot_message() else {
            return SpeakOutcome::NothingToSpeak;
        };
        if !self.synthesizer.is_available() {
            self.status.notify(SPEECH_OUTPUT_UNAVAILABLE);
            return SpeakOutcome::Unavailable;
        }
        let text = strip_severity_label(&message.text);
        if text.is_empty() {
            return SpeakOutcome::NothingToSpeak;
        }
        match self.synthesizer.speak(text).await {
            Ok(()) => SpeakOutcome::Spoken,
            Err(e) => {
                tracing::warn!(error = %e, "Speech output failed");
                SpeakOutcome::Failed
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use healthbot_core::config::FeedbackConfig;
    use healthbot_core::Sender;
    use healthbot_feedback::MockToneSink;
    use healthbot_speech::{RecordingSynthesizer, ScriptedRecognizer, SpeechError};

    use crate::backend::MockBackend;
    use crate::error::BackendError;
    use crate::render::{RecordingRenderer, RecordingStatusLine, StatusEvent};

    struct Harness {
        controller: Arc<SessionController>,
        backend: Arc<MockBackend>,
        renderer: Arc<RecordingRenderer>,
        status: Arc<RecordingStatusLine>,
        recognizer: Arc<ScriptedRecognizer>,
        synthesizer: Arc<RecordingSynthesizer>,
        tones: Arc<MockToneSink>,
    }

    fn harness_with(
        backend: MockBackend,
        recognizer: ScriptedRecognizer,
        synthesizer: RecordingSynthesizer,
    ) -> Harness {
        let backend = Arc::new(backend);
        let renderer = Arc::new(RecordingRenderer::new());
        let status = Arc::new(RecordingStatusLine::new());
        let recognizer = Arc::new(recognizer);
        let synthesizer = Arc::new(synthesizer);
        let tones = Arc::new(MockToneSink::new());
        let controller = SessionController::new(backend.clone(), renderer.clone(), status.clone())
            .with_recognizer(recognizer.clone())
            .with_synthesizer(synthesizer.clone())
            .with_feedback(FeedbackEmitter::new(tones.clone(), &FeedbackConfig::default()));
        Harness {
            controller: Arc::new(controller),
            backend,
            renderer,
            status,
            recognizer,
            synthesizer,
            tones,
        }
    }

    fn harness() -> Harness {
        harness_with(
            MockBackend::new(),
            ScriptedRecognizer::new(),
            RecordingSynthesizer::new(),
        )
    }

    fn senders(messages: &[Message]) -> Vec<Sender> {
        messages.iter().map(|m| m.sender).collect()
    }

    // -------------------------------------------------------------------------
    // submit_text
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_submit_appends_user_then_bot() {
        let h = harness();
        h.backend.push_reply("Monitor and rest.", Severity::Low);

        let outcome = h.controller.submit_text("  Fever since yesterday  ").await;
        assert_eq!(outcome, SubmitOutcome::Answered(Severity::Low));

        let transcript = h.controller.transcript();
        assert_eq!(senders(&transcript), vec![Sender::User, Sender::Bot]);
        assert_eq!(transcript[0].text, "Fever since yesterday");
        assert_eq!(transcript[1].text, "Monitor and rest.");
        assert_eq!(transcript[1].badge(), Some("LOW"));
        assert_eq!(h.backend.received(), vec!["Fever since yesterday"]);
        assert_eq!(
            h.renderer.lines(),
            vec!["you> Fever since yesterday", "bot> [LOW] Monitor and rest."]
        );
        assert_eq!(h.controller.state(), SessionState::Idle);
    }

    #[tokio::test]
    async fn test_submit_whitespace_is_noop() {
        let h = harness();
        assert_eq!(h.controller.submit_text("").await, SubmitOutcome::Empty);
        assert_eq!(h.controller.submit_text(" \n\t ").await, SubmitOutcome::Empty);
        assert!(h.controller.transcript().is_empty());
        assert!(h.backend.received().is_empty());
        assert!(h.status.events().is_empty());
        assert!(h.tones.played().is_empty());
    }

    #[tokio::test]
    async fn test_submit_error_field_appends_apology() {
        let h = harness();
        h.backend
            .push_error(BackendError::Rejected("Empty message".to_string()));

        let outcome = h.controller.submit_text("cough").await;
        assert_eq!(outcome, SubmitOutcome::Failed);

        let transcript = h.controller.transcript();
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript[1].text, APOLOGY_MESSAGE);
        assert!(transcript[1].severity.is_none());
        assert_eq!(transcript[1].badge(), None);
        assert_eq!(h.renderer.lines()[1], "bot> Sorry, something went wrong.");
        assert_eq!(h.controller.state(), SessionState::Idle);
    }

    #[tokio::test]
    async fn test_submit_transport_failure_appends_apology() {
        let h = harness();
        h.backend
            .push_error(BackendError::Transport("connection refused".to_string()));
        assert_eq!(h.controller.submit_text("cough").await, SubmitOutcome::Failed);
        assert_eq!(h.controller.transcript()[1].text, APOLOGY_MESSAGE);
    }

    #[tokio::test]
    async fn test_status_cleared_on_success_and_failure() {
        let h = harness();
        h.controller.submit_text("fever").await;
        h.backend.push_error(BackendError::Status(500));
        h.controller.submit_text("fever").await;

        assert_eq!(
            h.status.events(),
            vec![
                StatusEvent::Set(Status::Analyzing),
                StatusEvent::Cleared,
                StatusEvent::Set(Status::Analyzing),
                StatusEvent::Cleared,
            ]
        );
        assert_eq!(h.status.current(), None);
    }

    #[tokio::test]
    async fn test_unknown_severity_has_no_badge() {
        let h = harness();
        h.backend.push_reply("Could you share more?", Severity::Unknown);
        let outcome = h.controller.submit_text("hello").await;
        assert_eq!(outcome, SubmitOutcome::Answered(Severity::Unknown));
        assert_eq!(h.renderer.lines()[1], "bot> Could you share more?");
    }

    #[tokio::test]
    async fn test_overlapping_submit_is_dropped() {
        let h = harness_with(
            MockBackend::new().with_delay(Duration::from_millis(200)),
            ScriptedRecognizer::new(),
            RecordingSynthesizer::new(),
        );

        let controller = h.controller.clone();
        let first = tokio::spawn(async move { controller.submit_text("fever").await });
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(h.controller.state(), SessionState::AwaitingResponse);
        assert_eq!(h.status.current(), Some(Status::Analyzing));

        assert_eq!(h.controller.submit_text("cough").await, SubmitOutcome::Busy);
        assert_eq!(
            h.controller.start_voice_input().await,
            VoiceOutcome::Busy
        );

        assert_eq!(
            first.await.unwrap(),
            SubmitOutcome::Answered(Severity::Low)
        );
        assert_eq!(h.backend.received(), vec!["fever"]);
        assert_eq!(h.controller.transcript().len(), 2);
        assert_eq!(h.controller.state(), SessionState::Idle);
    }

    #[tokio::test]
    async fn test_dropped_submit_returns_to_idle() {
        let h = harness_with(
            MockBackend::new().with_delay(Duration::from_secs(5)),
            ScriptedRecognizer::new(),
            RecordingSynthesizer::new(),
        );

        let result =
            tokio::time::timeout(Duration::from_millis(50), h.controller.submit_text("fever"))
                .await;
        assert!(result.is_err());
        assert_eq!(h.controller.state(), SessionState::Idle);
        assert_eq!(h.status.current(), None);
    }

    #[tokio::test]
    async fn test_tones_follow_senders() {
        let h = harness();
        h.controller.open();
        h.controller.submit_text("fever").await;

        let played = h.tones.played();
        assert_eq!(played.len(), 3);
        // Bot tone is 60 ms, user tone 50 ms.
        assert_eq!(played[0].samples, 2646);
        assert_eq!(played[1].samples, 2205);
        assert_eq!(played[2].samples, 2646);
    }

    #[tokio::test]
    async fn test_failing_audio_never_blocks_conversation() {
        let backend = Arc::new(MockBackend::new());
        let renderer = Arc::new(RecordingRenderer::new());
        let status = Arc::new(RecordingStatusLine::new());
        let controller = SessionController::new(backend, renderer.clone(), status).with_feedback(
            FeedbackEmitter::new(Arc::new(MockToneSink::failing()), &FeedbackConfig::default()),
        );

        assert_eq!(
            controller.submit_text("fever").await,
            SubmitOutcome::Answered(Severity::Low)
        );
        assert_eq!(renderer.entries().len(), 2);
    }

    // -------------------------------------------------------------------------
    // open / reset
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_open_shows_welcome() {
        let h = harness();
        h.controller.open();
        let transcript = h.controller.transcript();
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript[0].text, WELCOME_MESSAGE);
        assert!(transcript[0].is_bot());
    }

    #[tokio::test]
    async fn test_reset_leaves_only_greeting() {
        let h = harness();
        h.controller.open();
        h.controller.submit_text("fever").await;
        h.controller.submit_text("cough").await;

        assert_eq!(h.controller.reset_session().await, ResetOutcome::Cleared);

        let transcript = h.controller.transcript();
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript[0].text, RESET_GREETING);
        assert_eq!(h.renderer.lines(), vec!["bot> History cleared. How can I help today?"]);
        assert_eq!(h.renderer.clear_count(), 1);
        assert_eq!(h.backend.reset_count(), 1);
    }

    #[tokio::test]
    async fn test_reset_clears_even_when_backend_fails() {
        let h = harness_with(
            MockBackend::new().with_failing_reset(),
            ScriptedRecognizer::new(),
            RecordingSynthesizer::new(),
        );
        h.controller.submit_text("fever").await;
        assert_eq!(h.controller.reset_session().await, ResetOutcome::Cleared);

        let transcript = h.controller.transcript();
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript[0].text, RESET_GREETING);
        assert_eq!(h.controller.state(), SessionState::Idle);
    }

    #[tokio::test]
    async fn test_reset_during_pending_submit_is_dropped() {
        let h = harness_with(
            MockBackend::new().with_delay(Duration::from_millis(200)),
            ScriptedRecognizer::new(),
            RecordingSynthesizer::new(),
        );
        h.controller.open();

        let controller = h.controller.clone();
        let pending = tokio::spawn(async move { controller.submit_text("fever").await });
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(h.controller.reset_session().await, ResetOutcome::Busy);
        assert_eq!(h.backend.reset_count(), 0);
        assert_eq!(h.renderer.clear_count(), 0);

        assert_eq!(
            pending.await.unwrap(),
            SubmitOutcome::Answered(Severity::Low)
        );
        let transcript = h.controller.transcript();
        assert_eq!(
            senders(&transcript),
            vec![Sender::Bot, Sender::User, Sender::Bot]
        );
        assert_eq!(transcript[0].text, WELCOME_MESSAGE);
        assert_eq!(transcript[2].text, "Monitor and rest.");

        // Once the reply has landed the reset goes through.
        assert_eq!(h.controller.reset_session().await, ResetOutcome::Cleared);
        let transcript = h.controller.transcript();
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript[0].text, RESET_GREETING);
    }

    #[tokio::test]
    async fn test_submit_during_pending_reset_is_dropped() {
        let h = harness_with(
            MockBackend::new().with_delay(Duration::from_millis(200)),
            ScriptedRecognizer::new(),
            RecordingSynthesizer::new(),
        );

        let controller = h.controller.clone();
        let pending = tokio::spawn(async move { controller.reset_session().await });
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(h.controller.state(), SessionState::AwaitingResponse);

        assert_eq!(h.controller.submit_text("fever").await, SubmitOutcome::Busy);
        assert_eq!(h.controller.reset_session().await, ResetOutcome::Busy);

        assert_eq!(pending.await.unwrap(), ResetOutcome::Cleared);
        assert!(h.backend.received().is_empty());
        assert_eq!(h.backend.reset_count(), 1);
        let transcript = h.controller.transcript();
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript[0].text, RESET_GREETING);
        assert_eq!(h.controller.state(), SessionState::Idle);
    }

    // -------------------------------------------------------------------------
    // speak_last_bot_message
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_speak_on_empty_transcript_is_noop() {
        let h = harness();
        assert_eq!(
            h.controller.speak_last_bot_message().await,
            SpeakOutcome::NothingToSpeak
        );
        assert!(h.synthesizer.spoken().is_empty());
        assert!(h.status.events().is_empty());
    }

    #[tokio::test]
    async fn test_speak_last_bot_message() {
        let h = harness();
        h.backend.push_reply("First reply.", Severity::Moderate);
        h.backend.push_reply("URGENT: Call emergency services.", Severity::Urgent);
        h.controller.submit_text("a").await;
        h.controller.submit_text("b").await;

        assert_eq!(h.controller.speak_last_bot_message().await, SpeakOutcome::Spoken);
        assert_eq!(h.synthesizer.spoken(), vec!["Call emergency services."]);
        assert_eq!(h.controller.state(), SessionState::Idle);
    }

    #[tokio::test]
    async fn test_speak_skips_trailing_user_message() {
        let h = harness();
        h.controller.open();
        h.backend
            .push_error(BackendError::Transport("down".to_string()));
        h.controller.submit_text("fever").await;
        h.controller.speak_last_bot_message().await;
        assert_eq!(h.synthesizer.spoken(), vec![APOLOGY_MESSAGE]);
    }

    #[tokio::test]
    async fn test_speak_unavailable_notifies() {
        let h = harness_with(
            MockBackend::new(),
            ScriptedRecognizer::new(),
            RecordingSynthesizer::unavailable(),
        );
        h.controller.open();
        assert_eq!(
            h.controller.speak_last_bot_message().await,
            SpeakOutcome::Unavailable
        );
        assert_eq!(h.status.notices(), vec![SPEECH_OUTPUT_UNAVAILABLE]);
    }

    #[tokio::test]
    async fn test_speak_failure_is_contained() {
        let h = harness_with(
            MockBackend::new(),
            ScriptedRecognizer::new(),
            RecordingSynthesizer::failing(),
        );
        h.controller.open();
        assert_eq!(h.controller.speak_last_bot_message().await, SpeakOutcome::Failed);
        assert_eq!(h.controller.transcript().len(), 1);
    }

    // -------------------------------------------------------------------------
    // start_voice_input
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_voice_unavailable_stays_idle() {
        let h = harness_with(
            MockBackend::new(),
            ScriptedRecognizer::unavailable(),
            RecordingSynthesizer::new(),
        );
        assert_eq!(
            h.controller.start_voice_input().await,
            VoiceOutcome::Unavailable
        );
        assert_eq!(h.controller.state(), SessionState::Idle);
        assert!(h.backend.received().is_empty());
        assert_eq!(h.recognizer.listen_count(), 0);
        assert_eq!(h.status.notices(), vec![SPEECH_INPUT_UNAVAILABLE]);
        assert!(h.controller.transcript().is_empty());
    }

    #[tokio::test]
    async fn test_voice_submits_utterance() {
        let h = harness();
        h.recognizer.push_utterance("Fever and headache since yesterday.");
        h.backend.push_reply("Rest and hydrate.", Severity::Moderate);

        let outcome = h.controller.start_voice_input().await;
        assert_eq!(
            outcome,
            VoiceOutcome::Submitted(SubmitOutcome::Answered(Severity::Moderate))
        );
        assert_eq!(
            h.backend.received(),
            vec!["Fever and headache since yesterday."]
        );
        assert_eq!(h.controller.transcript().len(), 2);
        assert_eq!(
            h.status.events(),
            vec![
                StatusEvent::Set(Status::Listening),
                StatusEvent::Cleared,
                StatusEvent::Set(Status::Analyzing),
                StatusEvent::Cleared,
            ]
        );
        assert_eq!(h.controller.state(), SessionState::Idle);
        assert_eq!(h.tones.resume_count(), 1);
    }

    #[tokio::test]
    async fn test_voice_listening_state_observed() {
        let h = harness();
        let reply = h.recognizer.push_deferred();

        let controller = h.controller.clone();
        let task = tokio::spawn(async move { controller.start_voice_input().await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(h.controller.state(), SessionState::Listening);
        assert_eq!(h.status.current(), Some(Status::Listening));
        assert_eq!(h.controller.submit_text("typed").await, SubmitOutcome::Busy);

        reply.send(Ok("cough".to_string())).unwrap();
        assert_eq!(
            task.await.unwrap(),
            VoiceOutcome::Submitted(SubmitOutcome::Answered(Severity::Low))
        );
        assert_eq!(h.backend.received(), vec!["cough"]);
    }

    #[tokio::test]
    async fn test_voice_error_shows_mic_error() {
        let h = harness();
        h.recognizer.push_error(SpeechError::NoSpeech);

        assert_eq!(
            h.controller.start_voice_input().await,
            VoiceOutcome::RecognitionFailed
        );
        assert_eq!(h.status.current(), Some(Status::MicError));
        assert_eq!(h.controller.state(), SessionState::Idle);
        assert!(h.controller.transcript().is_empty());
        assert!(h.backend.received().is_empty());

        // A new session after the error proceeds independently.
        h.recognizer.push_utterance("cough");
        assert!(matches!(
            h.controller.start_voice_input().await,
            VoiceOutcome::Submitted(_)
        ));
    }

    #[tokio::test]
    async fn test_voice_empty_utterance() {
        let h = harness();
        h.recognizer.push_utterance("   ");
        assert_eq!(
            h.controller.start_voice_input().await,
            VoiceOutcome::NothingHeard
        );
        assert_eq!(h.controller.state(), SessionState::Idle);
        assert_eq!(h.status.current(), None);
        assert!(h.backend.received().is_empty());
    }

    #[tokio::test]
    async fn test_dropped_listen_returns_to_idle() {
        let h = harness();
        let _reply = h.recognizer.push_deferred();

        let result =
            tokio::time::timeout(Duration::from_millis(50), h.controller.start_voice_input())
                .await;
        assert!(result.is_err());
        assert_eq!(h.controller.state(), SessionState::Idle);
        assert_eq!(h.status.current(), None);
    }
}
