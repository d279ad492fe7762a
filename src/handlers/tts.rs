//! Text-to-speech endpoints: buffered and streaming synthesis.

use crate::error::{AppError, AppResult};
use crate::state::AppState;
use crate::tts::VoiceParams;

use actix_web::{web, HttpResponse};
use futures_util::StreamExt;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct TtsRequest {
    pub text: String,
    #[serde(default)]
    pub voice: Option<String>,
    #[serde(default)]
    pub rate: Option<String>,
    #[serde(default)]
    pub volume: Option<String>,
}

impl TtsRequest {
    fn validate(&self, max_chars: usize) -> Result<(), AppError> {
        if self.text.trim().is_empty() {
            return Err(AppError::BadRequest("Text cannot be empty".to_string()));
        }
        if self.text.len() > max_chars {
            return Err(AppError::BadRequest(format!(
                "Text too long. Maximum {} characters.",
                max_chars
            )));
        }
        Ok(())
    }

    fn voice_params(&self) -> VoiceParams {
        VoiceParams {
            voice: self.voice.clone(),
            rate: self.rate.clone(),
            volume: self.volume.clone(),
        }
    }
}

pub async fn speak(
    request: web::Json<TtsRequest>,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    request.validate(state.config.limits.max_tts_chars)?;

    let audio = state
        .synthesizer
        .synthesize(&request.text, &request.voice_params())
        .await?;

    Ok(HttpResponse::Ok()
        .content_type("audio/mpeg")
        .insert_header(("Content-Disposition", "inline; filename=speech.mp3"))
        .body(audio))
}

pub async fn speak_stream(
    request: web::Json<TtsRequest>,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    request.validate(state.config.limits.max_tts_chars)?;

    let stream = state
        .synthesizer
        .synthesize_stream(&request.text, &request.voice_params())
        .await?;

    let body = stream.map(|chunk| {
        chunk
            .map(web::Bytes::from)
            .map_err(|err| actix_web::error::ErrorInternalServerError(err.to_string()))
    });

    Ok(HttpResponse::Ok().content_type("audio/mpeg").streaming(body))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(text: &str) -> TtsRequest {
        TtsRequest {
            text: text.to_string(),
            voice: None,
            rate: None,
            volume: None,
        }
    }

    #[test]
    fn test_empty_text_rejected() {
        assert!(request("   ").validate(5_000).is_err());
    }

    #[test]
    fn test_long_text_rejected() {
        let long = "x".repeat(5_001);
        assert!(request(&long).validate(5_000).is_err());
        assert!(request("fine").validate(5_000).is_ok());
    }
}
