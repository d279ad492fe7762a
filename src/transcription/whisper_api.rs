//! HTTP Whisper transcription client.
//!
//! Wraps raw PCM blocks in a minimal WAV container and posts them as
//! multipart form data to an OpenAI-compatible `audio/transcriptions`
//! endpoint (Groq in the default configuration). The request carries the
//! client-level timeout so a hung upstream can never stall a session.

use crate::config::TranscriptionConfig;
use crate::error::TranscribeError;
use crate::transcription::{Transcriber, Transcription};
use async_trait::async_trait;
use byteorder::{LittleEndian, WriteBytesExt};
use serde::Deserialize;
use tracing::{debug, warn};

/// Blocks shorter than this are treated as silence and skipped without an
/// API round trip.
const MIN_AUDIO_BYTES: usize = 1_000;

/// Fixed confidence reported for non-empty results; the API does not return
/// a usable per-segment score.
const API_CONFIDENCE: f32 = 0.9;

pub struct WhisperApiTranscriber {
    client: reqwest::Client,
    config: TranscriptionConfig,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

impl WhisperApiTranscriber {
    pub fn new(client: reqwest::Client, config: TranscriptionConfig, api_key: String) -> Self {
        if api_key.is_empty() {
            warn!("No transcription API key configured; transcription calls will fail");
        }
        Self {
            client,
            config,
            api_key,
        }
    }

    /// Wrap raw 16-bit mono PCM in a WAV container for the API.
    fn pcm_to_wav(pcm: &[u8], sample_rate: u32) -> Vec<u8> {
        let mut wav = Vec::with_capacity(44 + pcm.len());
        let byte_rate = sample_rate * 2; // mono, 16-bit

        // Writes into a Vec cannot fail.
        wav.extend_from_slice(b"RIFF");
        let _ = wav.write_u32::<LittleEndian>(36 + pcm.len() as u32);
        wav.extend_from_slice(b"WAVE");
        wav.extend_from_slice(b"fmt ");
        let _ = wav.write_u32::<LittleEndian>(16);
        let _ = wav.write_u16::<LittleEndian>(1); // PCM format
        let _ = wav.write_u16::<LittleEndian>(1); // mono
        let _ = wav.write_u32::<LittleEndian>(sample_rate);
        let _ = wav.write_u32::<LittleEndian>(byte_rate);
        let _ = wav.write_u16::<LittleEndian>(2); // block align
        let _ = wav.write_u16::<LittleEndian>(16); // bits per sample
        wav.extend_from_slice(b"data");
        let _ = wav.write_u32::<LittleEndian>(pcm.len() as u32);
        wav.extend_from_slice(pcm);

        wav
    }
}

#[async_trait]
impl Transcriber for WhisperApiTranscriber {
    async fn transcribe(
        &self,
        pcm: &[u8],
        sample_rate: u32,
    ) -> Result<Transcription, TranscribeError> {
        if pcm.len() < MIN_AUDIO_BYTES {
            return Ok(Transcription::empty());
        }

        let wav = Self::pcm_to_wav(pcm, sample_rate);

        let part = reqwest::multipart::Part::bytes(wav)
            .file_name("audio.wav")
            .mime_str("audio/wav")
            .map_err(|e| TranscribeError::Malformed(e.to_string()))?;

        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("model", self.config.model.clone())
            .text("language", self.config.language.clone())
            .text("response_format", "json");

        let response = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(&self.api_key)
            .timeout(std::time::Duration::from_secs(self.config.timeout_secs))
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TranscribeError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: TranscriptionResponse = response
            .json()
            .await
            .map_err(|e| TranscribeError::Malformed(e.to_string()))?;

        let text = parsed.text.trim().to_string();
        let confidence = if text.is_empty() { 0.0 } else { API_CONFIDENCE };

        debug!(chars = text.len(), "Transcription completed");

        Ok(Transcription { text, confidence })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::{ByteOrder, LittleEndian};

    #[test]
    fn test_wav_header_layout() {
        let pcm = vec![0u8; 320];
        let wav = WhisperApiTranscriber::pcm_to_wav(&pcm, 16_000);

        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(LittleEndian::read_u32(&wav[24..28]), 16_000);
        assert_eq!(&wav[36..40], b"data");
        assert_eq!(LittleEndian::read_u32(&wav[40..44]), 320);
        assert_eq!(wav.len(), 44 + 320);
    }

    #[tokio::test]
    async fn test_short_blocks_skip_the_api() {
        let transcriber = WhisperApiTranscriber::new(
            reqwest::Client::new(),
            crate::config::AppConfig::default().transcription,
            String::new(),
        );

        // Below the noise floor: resolves without any network access.
        let result = transcriber.transcribe(&[0u8; 500], 16_000).await.unwrap();
        assert!(result.text.is_empty());
        assert_eq!(result.confidence, 0.0);
    }
}
