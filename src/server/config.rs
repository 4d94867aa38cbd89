//! Server Configuration
//!
//! Read from YAML. Every field has a default, so an empty or partial file
//! is valid; unknown keys (such as the training section of a shared
//! `config.yml`) are ignored.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::core::error::{Result, TtsError};
use crate::engine::WorkerConfig;
use crate::model::Device;
use crate::synthesis::Language;
use crate::training::TrainingConfig;

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server host
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory scanned for model bundles
    #[serde(default = "default_assets_root")]
    pub assets_root: PathBuf,

    /// Maximum text length; below 1 means unlimited
    #[serde(default = "default_limit")]
    pub limit: i64,

    /// Default text language
    #[serde(default)]
    pub language: Language,

    /// Allowed CORS origins; empty disables the CORS layer
    #[serde(default)]
    pub origins: Vec<String>,

    /// Inference device
    #[serde(default = "default_device")]
    pub device: Device,

    /// Concurrent inference calls per device
    #[serde(default = "default_max_concurrent_inference")]
    pub max_concurrent_inference: usize,

    /// Inference worker connection
    #[serde(default)]
    pub worker: WorkerConfig,

    /// Training submission
    #[serde(default)]
    pub training: TrainingConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Enable access log
    #[serde(default = "default_true")]
    pub access_log: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            access_log: true,
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_assets_root() -> PathBuf {
    PathBuf::from("model_assets")
}

fn default_limit() -> i64 {
    100
}

fn default_device() -> Device {
    Device::Cuda(0)
}

fn default_max_concurrent_inference() -> usize {
    1
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            assets_root: default_assets_root(),
            limit: default_limit(),
            language: Language::default(),
            origins: Vec::new(),
            device: default_device(),
            max_concurrent_inference: default_max_concurrent_inference(),
            worker: WorkerConfig::default(),
            training: TrainingConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load from file. A missing file yields the defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        match Self::try_load(path)? {
            Some(config) => Ok(config),
            None => {
                warn!("Config file {:?} not found, using defaults", path);
                Ok(Self::default())
            }
        }
    }

    /// Load from file, `None` when the file does not exist.
    /// Nothing is logged, so this is safe to call before logging is set up.
    pub fn try_load<P: AsRef<Path>>(path: P) -> Result<Option<Self>> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path).map_err(|e| TtsError::io_at(e, path))?;
        Self::from_yaml(&content)
            .map(Some)
            .map_err(|e| match e {
                TtsError::Config { message, .. } => TtsError::Config {
                    message,
                    path: Some(path.to_path_buf()),
                },
                other => other,
            })
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Save to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path.as_ref(), content).map_err(|e| TtsError::io_at(e, path.as_ref()))?;
        Ok(())
    }

    /// Text length limit, `None` when unlimited
    pub fn text_limit(&self) -> Option<usize> {
        if self.limit < 1 {
            None
        } else {
            Some(self.limit as usize)
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
