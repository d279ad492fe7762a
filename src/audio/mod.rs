//! # Audio Processing
//!
//! Buffering and normalization for inbound streaming audio. The session
//! state machine owns one [`accumulator::AudioAccumulator`] per connection
//! and drains it into the transcription pipeline when enough audio has been
//! collected.

pub mod accumulator;

pub use accumulator::{normalize_chunk, AudioAccumulator};
