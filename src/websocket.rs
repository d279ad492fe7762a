//! # WebSocket Protocol Adapter
//!
//! Handles the persistent duplex connection at `/ws/interview`. Each
//! connection is one Actix actor owning one [`InterviewSession`].
//!
//! ## Protocol:
//! - **Client → Server** (JSON text frames): `start_session`,
//!   `audio_chunk {data: base64}`, `end_session`,
//!   `generate_answer {question?}`.
//! - **Server → Client** (JSON text frames): `status`, `transcription`,
//!   `ai_response`, `error`.
//!
//! The session logic never writes to the socket directly: it queues
//! [`ServerEvent`]s on an ordered channel and a pump task forwards them to
//! the actor, so outbound events are serialized in production order even
//! when transcription and generation tasks finish concurrently.

use crate::cv::DEFAULT_OWNER;
use crate::session::InterviewSession;
use crate::state::AppState;

use actix::prelude::*;
use actix_web::{web, HttpRequest, HttpResponse, Result as ActixResult};
use actix_web_actors::ws;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// How often the server pings an idle client.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// How long without any client traffic before the connection is dropped.
const CLIENT_TIMEOUT: Duration = Duration::from_secs(60);

/// Message types the client may send; used to distinguish an unknown type
/// from a malformed payload of a known type.
const KNOWN_CLIENT_TYPES: [&str; 4] = [
    "start_session",
    "audio_chunk",
    "end_session",
    "generate_answer",
];

/// Inbound protocol messages.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    StartSession,

    AudioChunk {
        /// Base64-encoded PCM/WebM audio.
        data: String,
    },

    EndSession,

    GenerateAnswer {
        /// Explicit question; the current transcript buffer is used when
        /// absent.
        #[serde(default)]
        question: Option<String>,
    },
}

/// Outbound protocol events.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Lifecycle/progress updates.
    Status {
        status: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },

    /// Incremental or final transcription results.
    Transcription {
        text: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        full_text: Option<String>,
        is_final: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        confidence: Option<f32>,
    },

    /// A generated answer with its key points.
    AiResponse {
        #[serde(skip_serializing_if = "Option::is_none")]
        question: Option<String>,
        text: String,
        key_points: Vec<String>,
        is_complete: bool,
    },

    /// Client-visible failure; the connection stays open.
    Error { message: String },
}

/// Internal actor message carrying one outbound event from the pump task.
#[derive(Message)]
#[rtype(result = "()")]
struct ForwardEvent(ServerEvent);

/// WebSocket actor for one interview connection.
pub struct InterviewWebSocket {
    session: Arc<InterviewSession>,

    /// Receiver end of the session's event queue; handed off to the pump
    /// task when the actor starts.
    events_rx: Option<mpsc::UnboundedReceiver<ServerEvent>>,

    last_heartbeat: Instant,
}

impl InterviewWebSocket {
    pub fn new(session: Arc<InterviewSession>, events_rx: mpsc::UnboundedReceiver<ServerEvent>) -> Self {
        Self {
            session,
            events_rx: Some(events_rx),
            last_heartbeat: Instant::now(),
        }
    }

    /// Parse and dispatch one inbound text frame. Protocol violations yield
    /// an `error` event; the connection always stays open.
    fn dispatch_text(&self, text: &str) {
        let value: serde_json::Value = match serde_json::from_str(text) {
            Ok(value) => value,
            Err(_) => {
                self.send_protocol_error("Invalid JSON message".to_string());
                return;
            }
        };

        match serde_json::from_value::<ClientMessage>(value.clone()) {
            Ok(message) => self.dispatch(message),
            Err(err) => {
                let msg_type = value
                    .get("type")
                    .and_then(|t| t.as_str())
                    .unwrap_or("<missing>");
                if KNOWN_CLIENT_TYPES.contains(&msg_type) {
                    self.send_protocol_error(format!(
                        "Malformed {} payload: {}",
                        msg_type, err
                    ));
                } else {
                    self.send_protocol_error(format!("Unknown message type: {}", msg_type));
                }
            }
        }
    }

    /// Hand a parsed message to the state machine. Audio bytes are buffered
    /// synchronously here so chunks land in arrival order and a later
    /// `end_session` always sees them; only the long-running transitions
    /// (transcription passes, the end flush, generation) run in spawned
    /// tasks so the actor keeps reading inbound frames while they are in
    /// flight.
    fn dispatch(&self, message: ClientMessage) {
        let session = self.session.clone();
        match message {
            ClientMessage::StartSession => session.handle_start_session(),
            ClientMessage::AudioChunk { data } => {
                if session.buffer_audio_chunk(&data) {
                    tokio::spawn(async move {
                        session.process_audio_buffer().await;
                    });
                }
            }
            ClientMessage::EndSession => {
                tokio::spawn(async move {
                    session.handle_end_session().await;
                });
            }
            ClientMessage::GenerateAnswer { question } => {
                tokio::spawn(async move {
                    session.handle_generate_answer(question).await;
                });
            }
        }
    }

    /// Protocol errors go through the same ordered queue as everything else.
    fn send_protocol_error(&self, message: String) {
        warn!("WebSocket protocol error: {}", message);
        self.session.emit_protocol_error(message);
    }
}

impl Actor for InterviewWebSocket {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        info!("WebSocket connection started");

        // Pump: forward session events to this actor in queue order.
        if let Some(mut rx) = self.events_rx.take() {
            let addr = ctx.address();
            tokio::spawn(async move {
                while let Some(event) = rx.recv().await {
                    addr.do_send(ForwardEvent(event));
                }
            });
        }

        self.session.announce_ready();

        ctx.run_interval(HEARTBEAT_INTERVAL, |act, ctx| {
            if Instant::now().duration_since(act.last_heartbeat) > CLIENT_TIMEOUT {
                warn!("WebSocket heartbeat timeout, closing connection");
                ctx.stop();
            } else {
                ctx.ping(b"");
            }
        });
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        info!("WebSocket connection stopped");
        self.session.handle_disconnect();
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for InterviewWebSocket {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Text(text)) => {
                self.last_heartbeat = Instant::now();
                self.dispatch_text(&text);
            }
            Ok(ws::Message::Binary(_)) => {
                // The protocol is JSON-only; audio travels base64-encoded
                // inside audio_chunk messages.
                self.send_protocol_error("Binary frames are not supported".to_string());
            }
            Ok(ws::Message::Ping(data)) => {
                self.last_heartbeat = Instant::now();
                ctx.pong(&data);
            }
            Ok(ws::Message::Pong(_)) => {
                self.last_heartbeat = Instant::now();
            }
            Ok(ws::Message::Close(reason)) => {
                info!("WebSocket closed: {:?}", reason);
                ctx.stop();
            }
            Ok(ws::Message::Continuation(_)) => {
                warn!("Received unexpected continuation frame");
            }
            Ok(ws::Message::Nop) => {}
            Err(err) => {
                error!("WebSocket transport error: {}", err);
                ctx.stop();
            }
        }
    }
}

impl Handler<ForwardEvent> for InterviewWebSocket {
    type Result = ();

    fn handle(&mut self, msg: ForwardEvent, ctx: &mut Self::Context) {
        match serde_json::to_string(&msg.0) {
            Ok(json) => ctx.text(json),
            Err(err) => error!("Failed to serialize server event: {}", err),
        }
    }
}

/// HTTP → WebSocket upgrade handler for `/ws/interview`.
pub async fn interview_websocket(
    req: HttpRequest,
    stream: web::Payload,
    app_state: web::Data<AppState>,
) -> ActixResult<HttpResponse> {
    debug!(
        "New WebSocket connection request from: {:?}",
        req.connection_info().peer_addr()
    );

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let session = Arc::new(InterviewSession::new(
        app_state.session_services(),
        app_state.config.audio.clone(),
        DEFAULT_OWNER.to_string(),
        events_tx,
    ));

    ws::start(InterviewWebSocket::new(session, events_rx), &req, stream)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_message_deserialization() {
        let msg: ClientMessage = serde_json::from_str(r#"{"type":"start_session"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::StartSession));

        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"audio_chunk","data":"AAAA"}"#).unwrap();
        match msg {
            ClientMessage::AudioChunk { data } => assert_eq!(data, "AAAA"),
            _ => panic!("Wrong message type"),
        }

        // question is optional on generate_answer
        let msg: ClientMessage = serde_json::from_str(r#"{"type":"generate_answer"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::GenerateAnswer { question: None }));

        let msg: ClientMessage = serde_json::from_str(
            r#"{"type":"generate_answer","question":"Why should we hire you?"}"#,
        )
        .unwrap();
        match msg {
            ClientMessage::GenerateAnswer { question } => {
                assert_eq!(question.as_deref(), Some("Why should we hire you?"));
            }
            _ => panic!("Wrong message type"),
        }
    }

    #[test]
    fn test_unknown_type_fails_enum_parse() {
        let raw = r#"{"type":"dance"}"#;
        assert!(serde_json::from_str::<ClientMessage>(raw).is_err());
    }

    #[test]
    fn test_server_event_wire_shape() {
        let event = ServerEvent::Transcription {
            text: "what is".to_string(),
            full_text: Some("what is".to_string()),
            is_final: false,
            confidence: Some(0.9),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"transcription""#));
        assert!(json.contains(r#""is_final":false"#));
        assert!(json.contains(r#""full_text":"what is""#));

        // Optional fields are omitted, not null.
        let event = ServerEvent::Transcription {
            text: "q".to_string(),
            full_text: None,
            is_final: true,
            confidence: None,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(!json.contains("full_text"));
        assert!(!json.contains("confidence"));
    }

    #[test]
    fn test_ai_response_wire_shape() {
        let event = ServerEvent::AiResponse {
            question: Some("Why?".to_string()),
            text: "Because.".to_string(),
            key_points: vec!["short".to_string()],
            is_complete: true,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"ai_response""#));
        assert!(json.contains(r#""key_points":["short"]"#));
        assert!(json.contains(r#""is_complete":true"#));
    }
}
