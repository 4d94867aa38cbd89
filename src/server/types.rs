//! Server Types
//!
//! Query strings and JSON bodies of the HTTP surface

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::model::{Device, ModelBundle};
use crate::synthesis::{
    DEFAULT_ASSIST_TEXT_WEIGHT, DEFAULT_LENGTH, DEFAULT_LINE_SPLIT, DEFAULT_NOISE,
    DEFAULT_NOISEW, DEFAULT_SDP_RATIO, DEFAULT_SPLIT_INTERVAL, DEFAULT_STYLE_WEIGHT,
};
use crate::engine::GpuInfo;
use crate::server::middleware::MetricsSummary;

/// `/voice` query string
#[derive(Debug, Clone, Deserialize)]
pub struct VoiceQuery {
    /// Text to speak; checked by the handler so a missing value is a 422
    #[serde(default)]
    pub text: Option<String>,

    /// Percent-decode `text` with this encoding
    #[serde(default)]
    pub encoding: Option<String>,

    /// Model name, wins over `model_id`
    #[serde(default)]
    pub model_name: Option<String>,

    #[serde(default)]
    pub model_id: i64,

    /// Speaker name, wins over `speaker_id`
    #[serde(default)]
    pub speaker_name: Option<String>,

    #[serde(default)]
    pub speaker_id: i64,

    #[serde(default = "default_sdp_ratio")]
    pub sdp_ratio: f32,

    #[serde(default = "default_noise")]
    pub noise: f32,

    #[serde(default = "default_noisew")]
    pub noisew: f32,

    #[serde(default = "default_length")]
    pub length: f32,

    /// Falls back to the server's configured language
    #[serde(default)]
    pub language: Option<String>,

    #[serde(default = "default_auto_split")]
    pub auto_split: bool,

    #[serde(default = "default_split_interval")]
    pub split_interval: f32,

    #[serde(default)]
    pub assist_text: Option<String>,

    #[serde(default = "default_assist_text_weight")]
    pub assist_text_weight: f32,

    #[serde(default)]
    pub style: Option<String>,

    #[serde(default = "default_style_weight")]
    pub style_weight: f32,

    #[serde(default)]
    pub reference_audio_path: Option<String>,
}

fn default_sdp_ratio() -> f32 {
    DEFAULT_SDP_RATIO
}

fn default_noise() -> f32 {
    DEFAULT_NOISE
}

fn default_noisew() -> f32 {
    DEFAULT_NOISEW
}

fn default_length() -> f32 {
    DEFAULT_LENGTH
}

fn default_auto_split() -> bool {
    DEFAULT_LINE_SPLIT
}

fn default_split_interval() -> f32 {
    DEFAULT_SPLIT_INTERVAL
}

fn default_assist_text_weight() -> f32 {
    DEFAULT_ASSIST_TEXT_WEIGHT
}

fn default_style_weight() -> f32 {
    DEFAULT_STYLE_WEIGHT
}

/// One entry of `/models/info`
#[derive(Debug, Clone, Serialize)]
pub struct ModelInfoEntry {
    pub config_path: PathBuf,
    pub model_path: PathBuf,
    pub device: Device,
    /// Refresh generation the entry belongs to
    pub generation: u64,
    pub sampling_rate: u32,
    pub spk2id: BTreeMap<String, i64>,
    pub id2spk: BTreeMap<String, String>,
    pub style2id: BTreeMap<String, i64>,
}

impl From<&ModelBundle> for ModelInfoEntry {
    fn from(bundle: &ModelBundle) -> Self {
        Self {
            config_path: bundle.paths().config.clone(),
            model_path: bundle.paths().weights.clone(),
            device: bundle.device(),
            generation: bundle.generation(),
            sampling_rate: bundle.sampling_rate(),
            spk2id: bundle.spk2id().clone(),
            // JSON object keys are strings
            id2spk: bundle
                .id2spk()
                .iter()
                .map(|(id, name)| (id.to_string(), name.clone()))
                .collect(),
            style2id: bundle.style2id().clone(),
        }
    }
}

/// `/models/info` body, keyed by model id
pub type ModelsInfo = BTreeMap<String, ModelInfoEntry>;

/// `/status` body
#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub devices: Vec<String>,
    pub cpu_percent: f32,
    pub memory_total: u64,
    pub memory_available: u64,
    pub memory_used: u64,
    pub memory_percent: f64,
    pub gpu: Vec<GpuInfo>,
}

/// `/health` body
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// Uptime (seconds)
    pub uptime: u64,
    pub model_count: usize,
    pub loaded_models: usize,
    pub generation: u64,
    pub training_jobs: usize,
    pub requests: RequestStats,
}

/// Request metrics as reported by `/health`
#[derive(Debug, Clone, Serialize)]
pub struct RequestStats {
    pub total: u64,
    pub successful: u64,
    pub client_errors: u64,
    pub server_errors: u64,
    pub avg_processing_time_ms: f64,
    pub success_rate: f64,
}

impl From<MetricsSummary> for RequestStats {
    fn from(summary: MetricsSummary) -> Self {
        Self {
            total: summary.total_requests,
            successful: summary.successful_requests,
            client_errors: summary.client_errors,
            server_errors: summary.server_errors,
            avg_processing_time_ms: summary.avg_processing_time_ms,
            success_rate: summary.success_rate,
        }
    }
}

/// `/train` success body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainResponse {
    pub id: String,
}

/// `/tools/get_audio` query string
#[derive(Debug, Clone, Deserialize)]
pub struct AudioPathQuery {
    #[serde(default)]
    pub path: Option<String>,
}

/// One entry of a 422 `detail` list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationDetail {
    #[serde(rename = "type")]
    pub kind: String,
    pub msg: String,
    pub loc: Vec<String>,
}

/// 422 body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationErrorBody {
    pub detail: Vec<ValidationDetail>,
}
