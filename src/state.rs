//! # Application State
//!
//! Shared services handed to every request handler and WebSocket connection
//! via `web::Data`. Everything here is built once in `main` and cloned
//! cheaply (the struct is a bundle of `Arc`s).

use crate::answer::{AnswerGenerator, LlmAnswerGenerator};
use crate::config::AppConfig;
use crate::cv::{CvContextStore, DocumentTextExtractor, TextExtractor};
use crate::detector::{HeuristicDetector, QuestionBoundaryDetector};
use crate::session::SessionServices;
use crate::store::InterviewStore;
use crate::transcription::{Transcriber, WhisperApiTranscriber};
use crate::tts::{HttpSynthesizer, Synthesizer};

use std::env;
use std::sync::Arc;
use std::time::Instant;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,

    pub cv_contexts: Arc<CvContextStore>,
    pub store: Arc<InterviewStore>,
    pub extractor: Arc<dyn TextExtractor>,
    pub transcriber: Arc<dyn Transcriber>,
    pub generator: Arc<dyn AnswerGenerator>,
    pub detector: Arc<dyn QuestionBoundaryDetector>,
    pub synthesizer: Arc<dyn Synthesizer>,

    pub start_time: Instant,
}

impl AppState {
    /// Wire up the production collaborators. The session database is opened
    /// (and its schema created) at the configured path. API keys come from
    /// the environment: `GROQ_API_KEY` serves both transcription and answer
    /// generation (with `OPENAI_API_KEY` as the LLM fallback), and TTS uses
    /// `OPENAI_API_KEY`.
    pub fn new(config: AppConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::new();

        let groq_key = env::var("GROQ_API_KEY").unwrap_or_default();
        let openai_key = env::var("OPENAI_API_KEY").unwrap_or_default();
        let llm_key = if groq_key.is_empty() {
            openai_key.clone()
        } else {
            groq_key.clone()
        };

        Ok(Self {
            cv_contexts: Arc::new(CvContextStore::new()),
            store: Arc::new(InterviewStore::open(&config.storage.database_path)?),
            extractor: Arc::new(DocumentTextExtractor),
            transcriber: Arc::new(WhisperApiTranscriber::new(
                client.clone(),
                config.transcription.clone(),
                groq_key,
            )),
            generator: Arc::new(LlmAnswerGenerator::new(
                client.clone(),
                config.llm.clone(),
                llm_key,
            )),
            detector: Arc::new(HeuristicDetector),
            synthesizer: Arc::new(HttpSynthesizer::new(client, config.tts.clone(), openai_key)),
            config,
            start_time: Instant::now(),
        })
    }

    /// Collaborator bundle for a new WebSocket session.
    pub fn session_services(&self) -> SessionServices {
        SessionServices {
            transcriber: self.transcriber.clone(),
            generator: self.generator.clone(),
            detector: self.detector.clone(),
            store: self.store.clone(),
            cv_contexts: self.cv_contexts.clone(),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
