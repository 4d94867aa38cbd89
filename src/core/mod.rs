//! Core abstractions shared by every layer of the server
//!
//! - `error`: structured error handling, split into client-input and
//!   server-fault kinds

pub mod error;

pub use error::{InferenceStage, ResolveError, Result, TrainingStage, TtsError};
