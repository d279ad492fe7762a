//! # Answer Generation
//!
//! CV-conditioned answer generation behind the [`AnswerGenerator`] seam.
//! Failures are typed (`AnswerError`) rather than folded into apology text
//! by the collaborator itself, so the session state machine decides
//! explicitly which failures degrade gracefully and which surface as errors.

pub mod llm;

use crate::error::AnswerError;
use async_trait::async_trait;

pub use llm::LlmAnswerGenerator;

/// A generated interview answer with its highlight bullets.
#[derive(Debug, Clone)]
pub struct GeneratedAnswer {
    pub text: String,
    pub key_points: Vec<String>,
}

impl GeneratedAnswer {
    /// The degraded answer emitted when the LLM side fails but the session
    /// should keep flowing rather than stall.
    pub fn apology(reason: &str) -> Self {
        Self {
            text: format!(
                "I apologize, but I couldn't generate an answer at this moment. Error: {}",
                reason
            ),
            key_points: Vec::new(),
        }
    }
}

/// External answer-generation collaborator.
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    /// Generate a complete answer for an interview question, optionally
    /// conditioned on the candidate's CV summary.
    async fn generate(
        &self,
        question: &str,
        cv_context: Option<&str>,
    ) -> Result<GeneratedAnswer, AnswerError>;
}
