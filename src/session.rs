//! # Interview Session State Machine
//!
//! One `InterviewSession` exists per WebSocket connection and is the sole
//! writer of that connection's state: the audio accumulator, the running
//! transcript, the persisted-session id, and the two critical sections
//! (transcription, generation).
//!
//! ## Concurrency Contract:
//! - At most one transcription call is ever in flight per session. The
//!   transcription mutex is authoritative: `try_lock` on the regular path
//!   drops a redundant trigger (the buffer keeps growing and the next chunk
//!   retriggers), while the end-of-session flush *waits* for the lock so
//!   trailing speech is never lost.
//! - Answer generation is serialized by its own mutex so two detected
//!   questions cannot interleave their `ai_response` events.
//! - All outbound events go through one ordered queue drained by the
//!   protocol adapter, which preserves production order.
//! - Every lock is released on every exit path via RAII guards, including
//!   when a collaborator call fails.

use crate::answer::{AnswerGenerator, GeneratedAnswer};
use crate::audio::{normalize_chunk, AudioAccumulator};
use crate::config::AudioConfig;
use crate::cv::CvContextStore;
use crate::detector::QuestionBoundaryDetector;
use crate::error::AnswerError;
use crate::store::InterviewStore;
use crate::transcription::Transcriber;
use crate::websocket::ServerEvent;

use base64::prelude::*;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Collaborator handles shared by all sessions.
#[derive(Clone)]
pub struct SessionServices {
    pub transcriber: Arc<dyn Transcriber>,
    pub generator: Arc<dyn AnswerGenerator>,
    pub detector: Arc<dyn QuestionBoundaryDetector>,
    pub store: Arc<InterviewStore>,
    pub cv_contexts: Arc<CvContextStore>,
}

/// Per-connection session state machine.
pub struct InterviewSession {
    services: SessionServices,
    audio_config: AudioConfig,

    /// Owner key into the CV context store.
    cv_owner: String,

    /// Ordered outbound event queue; the protocol adapter drains it.
    events: mpsc::UnboundedSender<ServerEvent>,

    /// Persisted session id; `None` while Idle.
    persisted_id: parking_lot::Mutex<Option<i64>>,

    /// Buffered audio since the last drain.
    audio: parking_lot::Mutex<AudioAccumulator>,

    /// Accumulated transcript since the last question boundary.
    transcript: parking_lot::Mutex<String>,

    /// Transcription critical section (drain + external call).
    transcribe_lock: tokio::sync::Mutex<()>,

    /// Serializes answer generation per session.
    generate_lock: tokio::sync::Mutex<()>,
}

impl InterviewSession {
    pub fn new(
        services: SessionServices,
        audio_config: AudioConfig,
        cv_owner: String,
        events: mpsc::UnboundedSender<ServerEvent>,
    ) -> Self {
        let accumulator = AudioAccumulator::new(audio_config.chunk_threshold_bytes);
        Self {
            services,
            audio_config,
            cv_owner,
            events,
            persisted_id: parking_lot::Mutex::new(None),
            audio: parking_lot::Mutex::new(accumulator),
            transcript: parking_lot::Mutex::new(String::new()),
            transcribe_lock: tokio::sync::Mutex::new(()),
            generate_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Queue an outbound event. A send failure means the connection is gone;
    /// the event is dropped, never retried.
    fn emit(&self, event: ServerEvent) {
        let _ = self.events.send(event);
    }

    fn emit_status(&self, status: &str, message: impl Into<Option<String>>) {
        self.emit(ServerEvent::Status {
            status: status.to_string(),
            message: message.into(),
        });
    }

    fn emit_error(&self, message: String) {
        self.emit(ServerEvent::Error { message });
    }

    /// Surface a protocol violation to the client through the ordered queue.
    pub fn emit_protocol_error(&self, message: String) {
        self.emit_error(message);
    }

    /// Connection warm-up announcement. The HTTP transcriber has no model to
    /// load, but clients still get the `loading` then `ready` statuses
    /// before the first audio chunk.
    pub fn announce_ready(&self) {
        self.emit_status(
            "loading",
            Some("Loading transcription model...".to_string()),
        );
        self.emit_status("ready", Some("Ready for audio".to_string()));
    }

    /// Open a new persisted session.
    ///
    /// Re-entry while already active creates a fresh record and silently
    /// orphans the previous id without ending it.
    pub fn handle_start_session(&self) {
        let cv = self.services.cv_contexts.get(&self.cv_owner);
        let id = match self.services.store.create_session(
            Some("Interview Session".to_string()),
            cv.as_ref().map(|c| c.filename.clone()),
            cv.map(|c| c.full_text),
        ) {
            Ok(id) => id,
            Err(err) => {
                error!("Failed to create session record: {}", err);
                self.emit_error("Failed to start session".to_string());
                return;
            }
        };

        *self.persisted_id.lock() = Some(id);
        self.audio.lock().clear();
        self.transcript.lock().clear();

        self.emit_status("session_started", Some(format!("Session {} started", id)));
        info!(session_id = id, "Started interview session");
    }

    /// Decode one base64 audio chunk and append it to the buffer. Returns
    /// whether the buffer has reached the drain threshold.
    ///
    /// This is the synchronous half of chunk handling: the protocol adapter
    /// calls it on the message-reading path so bytes land in the buffer in
    /// arrival order, before any later inbound message (another chunk,
    /// `end_session`) is dispatched. Only the transcription pass itself runs
    /// off-path. Valid in any state; audio received without a persisted
    /// session is still transcribed and answered.
    pub fn buffer_audio_chunk(&self, data_b64: &str) -> bool {
        if data_b64.is_empty() {
            return false;
        }

        let decoded = match BASE64_STANDARD.decode(data_b64) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!("Dropping audio chunk with invalid base64: {}", err);
                self.emit_error("Invalid audio chunk encoding".to_string());
                return false;
            }
        };

        let pcm = normalize_chunk(&decoded);

        let mut audio = self.audio.lock();
        audio.append(&pcm);
        audio.should_drain()
    }

    /// Append one chunk and, when the buffer is ready, run a transcription
    /// pass inline.
    pub async fn handle_audio_chunk(&self, data_b64: &str) {
        if self.buffer_audio_chunk(data_b64) {
            self.process_audio_buffer().await;
        }
    }

    /// One transcription pass: drain the buffer, transcribe, extend the
    /// transcript, and fire the answer pipeline on a question boundary.
    ///
    /// If another pass holds the lock this request is dropped, not queued;
    /// the buffer keeps accumulating and the next eligible chunk retriggers.
    pub async fn process_audio_buffer(&self) {
        let guard = match self.transcribe_lock.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                debug!("Transcription already in flight; dropping trigger");
                return;
            }
        };
        self.run_transcription_pass().await;
        drop(guard);
    }

    /// End-of-session flush: waits for any in-flight pass, then transcribes
    /// whatever audio remains so trailing speech is not lost.
    async fn flush_pending_audio(&self) {
        let guard = self.transcribe_lock.lock().await;
        self.run_transcription_pass().await;
        drop(guard);
    }

    /// Body of a transcription pass. Caller must hold `transcribe_lock`.
    async fn run_transcription_pass(&self) {
        let block = self.audio.lock().drain();
        if block.is_empty() {
            return;
        }

        let result = self
            .services
            .transcriber
            .transcribe(&block, self.audio_config.sample_rate)
            .await;

        let transcription = match result {
            Ok(t) => t,
            Err(err) => {
                // The drained block is lost; accepted degraded behavior.
                error!("Transcription failed, dropping audio block: {}", err);
                return;
            }
        };

        if transcription.text.trim().is_empty() {
            return;
        }

        let full_text = {
            let mut transcript = self.transcript.lock();
            transcript.push(' ');
            transcript.push_str(&transcription.text);
            let trimmed = transcript.trim().to_string();
            *transcript = trimmed.clone();
            trimmed
        };

        self.emit(ServerEvent::Transcription {
            text: transcription.text.clone(),
            full_text: Some(full_text.clone()),
            is_final: false,
            confidence: Some(transcription.confidence),
        });

        if self.services.detector.is_complete_question(&full_text) {
            // Capture-and-clear: the final transcription event carries
            // exactly what the buffer held the instant the boundary fired.
            let question = std::mem::take(&mut *self.transcript.lock());

            self.emit(ServerEvent::Transcription {
                text: question.clone(),
                full_text: None,
                is_final: true,
                confidence: None,
            });

            self.generate_and_send(question).await;
        }
    }

    /// Answer pipeline: status, CV resolution, generation, emission, and
    /// persistence. Serialized per session by the generation mutex.
    pub async fn generate_and_send(&self, question: String) {
        let _guard = self.generate_lock.lock().await;

        self.emit_status("generating", Some("Generating answer...".to_string()));

        let cv_summary = self
            .services
            .cv_contexts
            .get(&self.cv_owner)
            .map(|c| c.summary);

        let answer = match self
            .services
            .generator
            .generate(&question, cv_summary.as_deref())
            .await
        {
            Ok(answer) => answer,
            Err(AnswerError::Transport(err)) => {
                // The call itself never completed: surface it, persist nothing.
                error!("Answer generation transport failure: {}", err);
                self.emit_error(format!("Failed to generate answer: {}", err));
                return;
            }
            Err(err) => {
                // LLM-side failure degrades to an apology answer so the user
                // experience degrades gracefully instead of stalling silently.
                warn!("Answer generation degraded: {}", err);
                GeneratedAnswer::apology(&err.to_string())
            }
        };

        self.emit(ServerEvent::AiResponse {
            question: Some(question.clone()),
            text: answer.text.clone(),
            key_points: answer.key_points.clone(),
            is_complete: true,
        });

        // Persist only under an open session; generation without one is
        // legitimate and simply isn't saved.
        let persisted_id = *self.persisted_id.lock();
        if let Some(id) = persisted_id {
            if let Err(err) =
                self.services
                    .store
                    .add_qa(id, question, answer.text, answer.key_points)
            {
                warn!(session_id = id, "Failed to persist Q&A: {}", err);
            }
        }
    }

    /// Manual answer trigger. Bypasses boundary detection. The transcript
    /// buffer is used only when no question field was sent at all; an
    /// explicit empty question is a no-op rather than a fallback.
    pub async fn handle_generate_answer(&self, question: Option<String>) {
        let question = match question {
            Some(q) => {
                if q.trim().is_empty() {
                    return;
                }
                q
            }
            None => {
                let transcript = self.transcript.lock().clone();
                if transcript.trim().is_empty() {
                    return;
                }
                transcript
            }
        };

        self.generate_and_send(question).await;
    }

    /// Close the session: flush non-trivial pending audio through one final
    /// awaited transcription pass, then mark the persisted record ended.
    /// `ended_at` is only set after the flush completes.
    pub async fn handle_end_session(&self) {
        let pending = self.audio.lock().len();
        if pending > self.audio_config.noise_floor_bytes {
            self.flush_pending_audio().await;
        }

        let persisted_id = self.persisted_id.lock().take();
        if let Some(id) = persisted_id {
            match self.services.store.end_session(id) {
                Ok(()) => {
                    self.emit_status("session_ended", Some(format!("Session {} ended", id)));
                    info!(session_id = id, "Ended interview session");
                }
                Err(err) => warn!(session_id = id, "Failed to end session: {}", err),
            }
        }
    }

    /// Best-effort cleanup on connection teardown. No events are sent; the
    /// channel is already gone or about to be.
    pub fn handle_disconnect(&self) {
        let persisted_id = self.persisted_id.lock().take();
        if let Some(id) = persisted_id {
            if let Err(err) = self.services.store.end_session(id) {
                warn!(session_id = id, "Failed to end session on disconnect: {}", err);
            } else {
                info!(session_id = id, "Session ended on disconnect");
            }
        }
    }

    /// Current persisted session id, if any. Exposed for tests and logging.
    pub fn persisted_session_id(&self) -> Option<i64> {
        *self.persisted_id.lock()
    }

    /// Bytes currently buffered. Exposed for tests and logging.
    pub fn buffered_audio_bytes(&self) -> usize {
        self.audio.lock().len()
    }

    /// Current transcript buffer contents. Exposed for tests.
    pub fn transcript_snapshot(&self) -> String {
        self.transcript.lock().clone()
    }
}
