//! # Speech Synthesis
//!
//! Text-to-speech seam. The HTTP surface exposes both a buffered and a
//! chunked variant; the session core never calls TTS directly.

use crate::config::TtsConfig;
use crate::error::TtsError;
use async_trait::async_trait;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use serde_json::json;
use tracing::warn;

/// Per-request voice parameters; `None` falls back to configured defaults.
#[derive(Debug, Clone, Default)]
pub struct VoiceParams {
    pub voice: Option<String>,
    pub rate: Option<String>,
    pub volume: Option<String>,
}

/// External speech-synthesis collaborator.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Synthesize the whole utterance into one audio buffer (MP3).
    async fn synthesize(&self, text: &str, params: &VoiceParams) -> Result<Vec<u8>, TtsError>;

    /// Synthesize as a stream of audio chunks.
    async fn synthesize_stream(
        &self,
        text: &str,
        params: &VoiceParams,
    ) -> Result<BoxStream<'static, Result<Vec<u8>, TtsError>>, TtsError>;
}

/// HTTP synthesizer posting to an OpenAI-compatible `audio/speech` endpoint.
pub struct HttpSynthesizer {
    client: reqwest::Client,
    config: TtsConfig,
    api_key: String,
}

impl HttpSynthesizer {
    pub fn new(client: reqwest::Client, config: TtsConfig, api_key: String) -> Self {
        if api_key.is_empty() {
            warn!("No TTS API key configured; synthesis calls will fail");
        }
        Self {
            client,
            config,
            api_key,
        }
    }

    async fn request(&self, text: &str, params: &VoiceParams) -> Result<reqwest::Response, TtsError> {
        let voice = params.voice.as_deref().unwrap_or(&self.config.voice);
        let rate = params.rate.as_deref().unwrap_or(&self.config.rate);
        let volume = params.volume.as_deref().unwrap_or(&self.config.volume);

        let response = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(&self.api_key)
            .timeout(std::time::Duration::from_secs(self.config.timeout_secs))
            .json(&json!({
                "input": text,
                "voice": voice,
                "rate": rate,
                "volume": volume,
                "response_format": "mp3",
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TtsError::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl Synthesizer for HttpSynthesizer {
    async fn synthesize(&self, text: &str, params: &VoiceParams) -> Result<Vec<u8>, TtsError> {
        let response = self.request(text, params).await?;
        let audio = response.bytes().await?;
        Ok(audio.to_vec())
    }

    async fn synthesize_stream(
        &self,
        text: &str,
        params: &VoiceParams,
    ) -> Result<BoxStream<'static, Result<Vec<u8>, TtsError>>, TtsError> {
        let response = self.request(text, params).await?;
        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map(|b| b.to_vec()).map_err(TtsError::Transport));
        Ok(stream.boxed())
    }
}
