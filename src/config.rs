//! # Configuration Management
//!
//! Loads application configuration from three sources, highest priority last
//! to first:
//!
//! 1. Environment variables with the `APP_` prefix (e.g. `APP_SERVER_PORT`)
//! 2. A `config.toml` file next to the binary (optional)
//! 3. Built-in defaults
//!
//! `HOST` and `PORT` are honored without the prefix because deployment
//! platforms commonly inject them that way.
//!
//! API keys are deliberately not part of this struct; the HTTP collaborators
//! read `GROQ_API_KEY` / `OPENAI_API_KEY` from the environment at startup.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub audio: AudioConfig,
    pub transcription: TranscriptionConfig,
    pub llm: LlmConfig,
    pub tts: TtsConfig,
    pub limits: LimitsConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Audio accumulation settings for the streaming session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Sample rate of inbound PCM (16kHz mono 16-bit is the wire contract).
    pub sample_rate: u32,

    /// Bytes of buffered audio that trigger a transcription pass.
    /// 64,000 bytes is about 2 seconds at 16kHz 16-bit mono.
    pub chunk_threshold_bytes: usize,

    /// Buffers at or below this size on end_session are discarded as noise
    /// rather than flushed through a final transcription pass.
    pub noise_floor_bytes: usize,
}

/// Settings for the external speech-to-text API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionConfig {
    pub api_url: String,
    pub model: String,
    pub language: String,
    /// Upper bound on a single transcription call; a hung call must never
    /// stall the session reader indefinitely.
    pub timeout_secs: u64,
}

/// Settings for the answer-generation LLM API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub api_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

/// Settings for the text-to-speech API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtsConfig {
    pub api_url: String,
    pub voice: String,
    pub rate: String,
    pub volume: String,
    pub timeout_secs: u64,
}

/// Where interview history is persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path of the SQLite database file, created on first start.
    pub database_path: String,
}

/// Request validation limits for the HTTP surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Maximum CV upload size in bytes.
    pub max_cv_bytes: usize,

    /// Maximum text length accepted by the TTS endpoints.
    pub max_tts_chars: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8000,
            },
            audio: AudioConfig {
                sample_rate: 16_000,
                chunk_threshold_bytes: 64_000,
                noise_floor_bytes: 1_000,
            },
            transcription: TranscriptionConfig {
                api_url: "https://api.groq.com/openai/v1/audio/transcriptions".to_string(),
                model: "whisper-large-v3".to_string(),
                language: "en".to_string(),
                timeout_secs: 30,
            },
            llm: LlmConfig {
                api_url: "https://api.groq.com/openai/v1/chat/completions".to_string(),
                model: "llama-3.1-70b-versatile".to_string(),
                temperature: 0.7,
                max_tokens: 1000,
                timeout_secs: 60,
            },
            tts: TtsConfig {
                api_url: "https://api.openai.com/v1/audio/speech".to_string(),
                voice: "en-US-AriaNeural".to_string(),
                rate: "+0%".to_string(),
                volume: "+0%".to_string(),
                timeout_secs: 30,
            },
            limits: LimitsConfig {
                max_cv_bytes: 10 * 1024 * 1024,
                max_tts_chars: 5_000,
            },
            storage: StorageConfig {
                database_path: "interview_copilot.db".to_string(),
            },
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, `config.toml`, and environment.
    pub fn load() -> Result<Self> {
        let mut settings = config::Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default())?)
            .add_source(config::File::with_name("config").required(false))
            .add_source(config::Environment::with_prefix("APP").separator("_"));

        // Deployment platforms commonly set bare HOST/PORT.
        if let Ok(host) = env::var("HOST") {
            settings = settings.set_override("server.host", host)?;
        }
        if let Ok(port) = env::var("PORT") {
            settings = settings.set_override("server.port", port)?;
        }

        let config = settings.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Validate that the loaded values make sense before the server starts.
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(anyhow::anyhow!("Server port cannot be 0"));
        }

        if self.audio.chunk_threshold_bytes == 0 {
            return Err(anyhow::anyhow!("Audio chunk threshold must be greater than 0"));
        }

        if self.audio.noise_floor_bytes >= self.audio.chunk_threshold_bytes {
            return Err(anyhow::anyhow!(
                "Noise floor ({}) must be below the chunk threshold ({})",
                self.audio.noise_floor_bytes,
                self.audio.chunk_threshold_bytes
            ));
        }

        if self.limits.max_cv_bytes == 0 || self.limits.max_tts_chars == 0 {
            return Err(anyhow::anyhow!("Request limits must be greater than 0"));
        }

        if self.storage.database_path.trim().is_empty() {
            return Err(anyhow::anyhow!("Database path cannot be empty"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.audio.chunk_threshold_bytes, 64_000);
        assert_eq!(config.audio.noise_floor_bytes, 1_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = AppConfig::default();
        config.server.port = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.audio.noise_floor_bytes = config.audio.chunk_threshold_bytes;
        assert!(config.validate().is_err());
    }
}
