//! HTTP request handlers for the REST surface around the streaming core.

pub mod cv;
pub mod history;
pub mod tts;
