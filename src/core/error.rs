//! Structured error handling for the voice server
//!
//! Client-input failures (request resolution) are kept apart from
//! server-side faults so the HTTP layer can answer 422 for the former
//! and 500 for everything else.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias with TtsError
pub type Result<T> = std::result::Result<T, TtsError>;

/// Main error type for the voice server
#[derive(Error, Debug, Clone)]
pub enum TtsError {
    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        path: Option<PathBuf>,
    },

    /// Model directory scanning errors
    #[error("Registry error: {message}")]
    Registry {
        message: String,
        path: Option<PathBuf>,
    },

    /// Model loading errors
    #[error("Model loading error in {model}: {message}")]
    ModelLoad {
        message: String,
        model: String,
        path: Option<PathBuf>,
    },

    /// Inference errors
    #[error("Inference error in {stage}: {message}")]
    Inference {
        stage: InferenceStage,
        message: String,
    },

    /// Request resolution errors (client input)
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// Training submission errors
    #[error("Training error ({stage}): {message}")]
    Training {
        stage: TrainingStage,
        message: String,
    },

    /// I/O errors
    #[error("I/O error: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
    },

    /// Internal/bug errors
    #[error("Internal error: {message}")]
    Internal {
        message: String,
        location: Option<String>,
    },
}

impl TtsError {
    /// True when the error was caused by the caller's input
    pub fn is_client_error(&self) -> bool {
        matches!(self, TtsError::Resolve(_))
    }

    pub(crate) fn io_at(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        TtsError::Io {
            message: format!("{}: {}", path.display(), err),
            path: Some(path),
        }
    }

    pub(crate) fn training(stage: TrainingStage, message: impl Into<String>) -> Self {
        TtsError::Training {
            stage,
            message: message.into(),
        }
    }

    pub(crate) fn inference(stage: InferenceStage, message: impl Into<String>) -> Self {
        TtsError::Inference {
            stage,
            message: message.into(),
        }
    }
}

/// A client-supplied identifier that does not resolve against the
/// current model generation. Each variant names one query parameter.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("model_id={0} not found")]
    ModelIdNotFound(i64),

    #[error("model_name={0} not found")]
    ModelNameNotFound(String),

    #[error("model_name={0} is ambiguous")]
    ModelNameAmbiguous(String),

    #[error("speaker_id={0} not found")]
    SpeakerIdNotFound(i64),

    #[error("speaker_name={0} not found")]
    SpeakerNameNotFound(String),

    #[error("style={0} not found")]
    StyleNotFound(String),
}

impl ResolveError {
    /// Query parameter blamed for the failure
    pub fn param(&self) -> &'static str {
        match self {
            ResolveError::ModelIdNotFound(_) => "model_id",
            ResolveError::ModelNameNotFound(_) | ResolveError::ModelNameAmbiguous(_) => {
                "model_name"
            }
            ResolveError::SpeakerIdNotFound(_) => "speaker_id",
            ResolveError::SpeakerNameNotFound(_) => "speaker_name",
            ResolveError::StyleNotFound(_) => "style",
        }
    }
}

/// Stages of a synthesis call that can fail on the server side
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InferenceStage {
    ModelLoad,
    WorkerRequest,
    AudioDecode,
}

impl fmt::Display for InferenceStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InferenceStage::ModelLoad => write!(f, "model load"),
            InferenceStage::WorkerRequest => write!(f, "worker request"),
            InferenceStage::AudioDecode => write!(f, "audio decode"),
        }
    }
}

/// Stages of a training submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainingStage {
    DatasetWrite,
    Preprocessing,
    ConfigUpdate,
    Launch,
}

impl TrainingStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrainingStage::DatasetWrite => "dataset_write",
            TrainingStage::Preprocessing => "preprocessing",
            TrainingStage::ConfigUpdate => "config_update",
            TrainingStage::Launch => "launch",
        }
    }
}

impl fmt::Display for TrainingStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrainingStage::DatasetWrite => write!(f, "dataset write"),
            TrainingStage::Preprocessing => write!(f, "preprocessing"),
            TrainingStage::ConfigUpdate => write!(f, "config update"),
            TrainingStage::Launch => write!(f, "launch"),
        }
    }
}

/// Convert from std::io::Error
impl From<std::io::Error> for TtsError {
    fn from(err: std::io::Error) -> Self {
        TtsError::Io {
            message: err.to_string(),
            path: None,
        }
    }
}

impl From<serde_json::Error> for TtsError {
    fn from(err: serde_json::Error) -> Self {
        TtsError::Config {
            message: format!("Invalid JSON: {}", err),
            path: None,
        }
    }
}

impl From<serde_yaml::Error> for TtsError {
    fn from(err: serde_yaml::Error) -> Self {
        TtsError::Config {
            message: format!("Invalid YAML: {}", err),
            path: None,
        }
    }
}

impl From<reqwest::Error> for TtsError {
    fn from(err: reqwest::Error) -> Self {
        TtsError::Inference {
            stage: InferenceStage::WorkerRequest,
            message: err.to_string(),
        }
    }
}
