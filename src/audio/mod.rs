//! Audio container handling
//!
//! - In-memory WAV encoding for `/voice` responses
//! - WAV decoding for inference worker replies

mod output;

pub use output::{AudioOutput, SynthesizedAudio};
