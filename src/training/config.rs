//! Training submission settings

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::synthesis::Language;

/// Fixed training configuration applied to every submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Root of per-job dataset directories
    #[serde(default = "default_data_root")]
    pub data_root: PathBuf,

    /// Where trained bundles are written
    #[serde(default = "default_assets_root")]
    pub assets_root: PathBuf,

    /// Interpreter used for the preprocessing and training scripts
    #[serde(default = "default_python")]
    pub python: String,

    #[serde(default = "default_preprocess_script")]
    pub preprocess_script: String,

    #[serde(default = "default_train_script")]
    pub train_script: String,

    /// Template for the active config
    #[serde(default = "default_default_config_path")]
    pub default_config_path: PathBuf,

    /// Config rewritten to point at the new model
    #[serde(default = "default_active_config_path")]
    pub active_config_path: PathBuf,

    /// Working directory for spawned scripts (current dir if unset)
    #[serde(default)]
    pub working_dir: Option<PathBuf>,

    #[serde(default = "default_batch_size")]
    pub batch_size: u32,

    #[serde(default = "default_epochs")]
    pub epochs: u32,

    #[serde(default = "default_save_every_steps")]
    pub save_every_steps: u32,

    #[serde(default = "default_num_processes")]
    pub num_processes: u32,

    #[serde(default = "default_log_interval")]
    pub log_interval: u32,

    /// JP-Extra variant: better Japanese, no EN/ZH
    #[serde(default = "default_true")]
    pub use_jp_extra: bool,

    /// Loudness-normalize the raw audio
    #[serde(default)]
    pub normalize: bool,

    /// Trim leading/trailing silence
    #[serde(default)]
    pub trim: bool,

    /// Language label written to the transcript record
    #[serde(default)]
    pub language: Language,

    /// Finished jobs kept for `GET /train/{id}`; older ones are evicted
    #[serde(default = "default_retained_jobs")]
    pub retained_jobs: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            data_root: default_data_root(),
            assets_root: default_assets_root(),
            python: default_python(),
            preprocess_script: default_preprocess_script(),
            train_script: default_train_script(),
            default_config_path: default_default_config_path(),
            active_config_path: default_active_config_path(),
            working_dir: None,
            batch_size: default_batch_size(),
            epochs: default_epochs(),
            save_every_steps: default_save_every_steps(),
            num_processes: default_num_processes(),
            log_interval: default_log_interval(),
            use_jp_extra: true,
            normalize: false,
            trim: false,
            language: Language::JP,
            retained_jobs: default_retained_jobs(),
        }
    }
}

fn default_data_root() -> PathBuf {
    PathBuf::from("Data")
}

fn default_assets_root() -> PathBuf {
    PathBuf::from("model_assets")
}

fn default_python() -> String {
    "python".to_string()
}

fn default_preprocess_script() -> String {
    "preprocess_all.py".to_string()
}

fn default_train_script() -> String {
    "train_ms_jp_extra.py".to_string()
}

fn default_default_config_path() -> PathBuf {
    PathBuf::from("default_config.yml")
}

fn default_active_config_path() -> PathBuf {
    PathBuf::from("config.yml")
}

fn default_batch_size() -> u32 {
    6
}

fn default_epochs() -> u32 {
    15
}

fn default_save_every_steps() -> u32 {
    3
}

fn default_num_processes() -> u32 {
    2
}

fn default_log_interval() -> u32 {
    200
}

fn default_retained_jobs() -> usize {
    256
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let config: TrainingConfig = serde_yaml::from_str("epochs: 30\n").unwrap();
        assert_eq!(config.epochs, 30);
        assert_eq!(config.batch_size, 6);
        assert_eq!(config.data_root, PathBuf::from("Data"));
        assert!(config.use_jp_extra);
        assert_eq!(config.language, Language::JP);
    }
}
