//! # Transcription
//!
//! Speech-to-text seam for the streaming session. The session state machine
//! only sees the [`Transcriber`] trait; the concrete implementation posts
//! WAV-wrapped PCM to an OpenAI-compatible Whisper endpoint.

pub mod whisper_api;

use crate::error::TranscribeError;
use async_trait::async_trait;

pub use whisper_api::WhisperApiTranscriber;

/// One transcription result for a drained audio block.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Transcription {
    /// Transcribed text; empty when the block contained no usable speech.
    pub text: String,

    /// Confidence score (0.0 to 1.0).
    pub confidence: f32,
}

impl Transcription {
    pub fn empty() -> Self {
        Self {
            text: String::new(),
            confidence: 0.0,
        }
    }
}

/// External speech-to-text collaborator.
///
/// The call may block for seconds and is not interruptible; callers must
/// dispatch it off the message-reading path and bound it with a timeout.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe a block of raw PCM audio (16-bit signed, mono).
    async fn transcribe(
        &self,
        pcm: &[u8],
        sample_rate: u32,
    ) -> Result<Transcription, TranscribeError>;
}
