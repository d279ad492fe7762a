//! Chat-completions answer client.
//!
//! Posts the coaching prompt to an OpenAI-compatible `chat/completions`
//! endpoint and parses the structured `ANSWER:` / `KEY POINTS:` reply into a
//! [`GeneratedAnswer`]. A streaming variant yields text deltas for callers
//! that want incremental output.

use crate::answer::{AnswerGenerator, GeneratedAnswer};
use crate::config::LlmConfig;
use crate::error::AnswerError;
use async_trait::async_trait;
use futures_util::{Stream, StreamExt};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

const SYSTEM_PROMPT: &str = "You are an expert interview coach helping a candidate answer interview questions in real-time.

Your role is to:
1. Analyze the interview question
2. Use the candidate's CV/resume context to craft a personalized, authentic answer
3. Provide a natural, conversational response that the candidate can use or adapt
4. Highlight key points the candidate should emphasize

Guidelines:
- Keep answers concise but comprehensive (2-3 paragraphs max)
- Use first person (\"I have experience...\", \"In my previous role...\")
- Be specific - reference actual experience from the CV when possible
- Sound natural and confident, not robotic
- For technical questions, demonstrate understanding while being accessible
- If the question is unclear, provide the best interpretation

Format your response as:
ANSWER: [The suggested answer]

KEY POINTS:
- [Point 1]
- [Point 2]
- [Point 3]";

pub struct LlmAnswerGenerator {
    client: reqwest::Client,
    config: LlmConfig,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

/// One decoded line of a streaming completions body.
#[derive(Debug, PartialEq)]
enum SseItem {
    Delta(String),
    Done,
    Skip,
}

impl LlmAnswerGenerator {
    pub fn new(client: reqwest::Client, config: LlmConfig, api_key: String) -> Self {
        if api_key.is_empty() {
            warn!("No LLM API key configured; answer generation will fail");
        }
        Self {
            client,
            config,
            api_key,
        }
    }

    /// Assemble the user prompt: CV context first, question last.
    fn build_user_prompt(question: &str, cv_context: Option<&str>) -> String {
        let mut parts = Vec::new();

        if let Some(cv) = cv_context {
            parts.push(format!("CANDIDATE'S CV/RESUME:\n{}\n", cv));
        }

        parts.push(format!("INTERVIEW QUESTION:\n{}", question));
        parts.join("\n---\n")
    }

    /// Split the structured reply into answer text and key-point bullets.
    ///
    /// Replies without the `ANSWER:` marker are used whole; missing key
    /// points fall back to the answer's first substantial sentences.
    fn parse_response(response_text: &str) -> (String, Vec<String>) {
        let mut answer = response_text.trim().to_string();
        let mut key_points = Vec::new();

        if response_text.contains("ANSWER:") {
            let (answer_part, points_part) = match response_text.split_once("KEY POINTS:") {
                Some((a, p)) => (a, Some(p)),
                None => (response_text, None),
            };

            answer = answer_part.replace("ANSWER:", "").trim().to_string();

            if let Some(points) = points_part {
                for line in points.lines() {
                    let line = line.trim();
                    if let Some(point) = line.strip_prefix('-').or_else(|| line.strip_prefix('•'))
                    {
                        let point = point.trim();
                        if !point.is_empty() {
                            key_points.push(point.to_string());
                        }
                    }
                }
            }
        }

        if key_points.is_empty() && !answer.is_empty() {
            key_points = answer
                .split('.')
                .map(str::trim)
                .filter(|s| s.len() > 20)
                .take(3)
                .map(|s| format!("{}.", s))
                .collect();
        }

        (answer, key_points)
    }

    /// Decode one server-sent-events line from the streaming completions
    /// body into a text delta, the end marker, or nothing.
    fn parse_sse_line(line: &str) -> SseItem {
        let Some(payload) = line.strip_prefix("data: ") else {
            return SseItem::Skip;
        };
        if payload == "[DONE]" {
            return SseItem::Done;
        }

        match serde_json::from_str::<serde_json::Value>(payload) {
            Ok(value) => value
                .pointer("/choices/0/delta/content")
                .and_then(|v| v.as_str())
                .filter(|delta| !delta.is_empty())
                .map(|delta| SseItem::Delta(delta.to_string()))
                .unwrap_or(SseItem::Skip),
            Err(_) => SseItem::Skip,
        }
    }

    fn request_body(&self, question: &str, cv_context: Option<&str>, stream: bool) -> serde_json::Value {
        json!({
            "model": self.config.model,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": Self::build_user_prompt(question, cv_context)}
            ],
            "temperature": self.config.temperature,
            "max_tokens": self.config.max_tokens,
            "stream": stream,
        })
    }

    /// Streaming variant: yields `(text_delta, is_complete)` pairs. The last
    /// item is always `("", true)` on success; upstream hiccups end the
    /// stream with an error-text final item rather than panicking a task.
    pub async fn generate_stream(
        &self,
        question: &str,
        cv_context: Option<&str>,
    ) -> Result<impl Stream<Item = (String, bool)>, AnswerError> {
        let response = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(&self.api_key)
            .timeout(std::time::Duration::from_secs(self.config.timeout_secs))
            .json(&self.request_body(question, cv_context, true))
            .send()
            .await
            .map_err(AnswerError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AnswerError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        // Decode the SSE body (`data: {json}` lines, `data: [DONE]` last) in
        // a spawned task and hand deltas over a channel, so the caller gets
        // a plain Stream without hand-written poll code.
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel::<(String, bool)>();

        tokio::spawn(async move {
            let mut byte_stream = response.bytes_stream();
            let mut pending = String::new();

            while let Some(chunk) = byte_stream.next().await {
                let chunk = match chunk {
                    Ok(c) => c,
                    Err(e) => {
                        let _ = tx.send((format!("Error generating answer: {}", e), true));
                        return;
                    }
                };
                pending.push_str(&String::from_utf8_lossy(&chunk));

                while let Some(newline) = pending.find('\n') {
                    let line = pending[..newline].trim().to_string();
                    pending.drain(..=newline);

                    match Self::parse_sse_line(&line) {
                        SseItem::Delta(delta) => {
                            if tx.send((delta, false)).is_err() {
                                return;
                            }
                        }
                        SseItem::Done => {
                            let _ = tx.send((String::new(), true));
                            return;
                        }
                        SseItem::Skip => {}
                    }
                }
            }

            let _ = tx.send((String::new(), true));
        });

        Ok(tokio_stream::wrappers::UnboundedReceiverStream::new(rx))
    }
}

#[async_trait]
impl AnswerGenerator for LlmAnswerGenerator {
    async fn generate(
        &self,
        question: &str,
        cv_context: Option<&str>,
    ) -> Result<GeneratedAnswer, AnswerError> {
        let response = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(&self.api_key)
            .timeout(std::time::Duration::from_secs(self.config.timeout_secs))
            .json(&self.request_body(question, cv_context, false))
            .send()
            .await
            .map_err(AnswerError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AnswerError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| AnswerError::Malformed(e.to_string()))?;

        let content = parsed
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .ok_or_else(|| AnswerError::Malformed("response carried no choices".to_string()))?;

        let (text, key_points) = Self::parse_response(content);
        debug!(answer_chars = text.len(), points = key_points.len(), "Answer generated");

        Ok(GeneratedAnswer { text, key_points })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_structured_response() {
        let raw = "ANSWER: My biggest weakness used to be delegation.\n\n\
                   KEY POINTS:\n- Owns the weakness honestly\n- Shows growth\n• Ends positive\n";
        let (answer, points) = LlmAnswerGenerator::parse_response(raw);

        assert_eq!(answer, "My biggest weakness used to be delegation.");
        assert_eq!(
            points,
            vec![
                "Owns the weakness honestly".to_string(),
                "Shows growth".to_string(),
                "Ends positive".to_string(),
            ]
        );
    }

    #[test]
    fn test_parse_unstructured_response_falls_back_to_sentences() {
        let raw = "I led the migration of a monolith to services over two years. \
                   The team shipped incrementally without downtime. Short one.";
        let (answer, points) = LlmAnswerGenerator::parse_response(raw);

        assert_eq!(answer, raw);
        assert_eq!(points.len(), 2);
        assert!(points[0].starts_with("I led the migration"));
        assert!(points.iter().all(|p| p.ends_with('.')));
    }

    #[test]
    fn test_parse_answer_without_key_points_section() {
        let raw = "ANSWER: Because I ship and I mentor and I stay curious about systems.";
        let (answer, points) = LlmAnswerGenerator::parse_response(raw);

        assert!(answer.starts_with("Because I ship"));
        // Fallback extraction kicks in when the section is missing.
        assert!(!points.is_empty());
    }

    #[test]
    fn test_user_prompt_orders_cv_before_question() {
        let prompt = LlmAnswerGenerator::build_user_prompt(
            "Why us?",
            Some("Ten years of backend work."),
        );
        let cv_idx = prompt.find("CANDIDATE'S CV/RESUME:").unwrap();
        let q_idx = prompt.find("INTERVIEW QUESTION:").unwrap();
        assert!(cv_idx < q_idx);
        assert!(prompt.contains("Why us?"));
    }

    #[test]
    fn test_user_prompt_without_cv() {
        let prompt = LlmAnswerGenerator::build_user_prompt("Why us?", None);
        assert!(!prompt.contains("CANDIDATE'S CV/RESUME:"));
        assert!(prompt.starts_with("INTERVIEW QUESTION:"));
    }

    #[test]
    fn test_sse_line_decoding() {
        assert_eq!(
            LlmAnswerGenerator::parse_sse_line(
                r#"data: {"choices":[{"delta":{"content":"Hel"}}]}"#
            ),
            SseItem::Delta("Hel".to_string())
        );
        assert_eq!(
            LlmAnswerGenerator::parse_sse_line("data: [DONE]"),
            SseItem::Done
        );
        // Role-only deltas, comments, and blank keep-alives carry no text.
        assert_eq!(
            LlmAnswerGenerator::parse_sse_line(
                r#"data: {"choices":[{"delta":{"role":"assistant"}}]}"#
            ),
            SseItem::Skip
        );
        assert_eq!(LlmAnswerGenerator::parse_sse_line(""), SseItem::Skip);
        assert_eq!(
            LlmAnswerGenerator::parse_sse_line("data: not json"),
            SseItem::Skip
        );
    }

    #[test]
    fn test_apology_answer_has_no_key_points() {
        let degraded = GeneratedAnswer::apology("status 500");
        assert!(degraded.text.contains("I apologize"));
        assert!(degraded.key_points.is_empty());
    }
}
