//! Inference worker client
//!
//! Runs the acoustic model in an external worker process reached over
//! HTTP. Loading a bundle asks the worker to put its weights on the
//! device and returns a handle; every synthesis call then goes to that
//! handle and comes back as a WAV body.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::audio::{AudioOutput, SynthesizedAudio};
use crate::core::error::{InferenceStage, Result, TtsError};
use crate::model::BundleSpec;
use super::traits::{DeviceInventory, InferenceRequest, ModelLoader, VoiceModel};

/// Worker connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Base URL of the inference worker
    #[serde(default = "default_worker_url")]
    pub url: String,

    /// Request timeout (seconds)
    #[serde(default = "default_worker_timeout")]
    pub timeout_secs: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            url: default_worker_url(),
            timeout_secs: default_worker_timeout(),
        }
    }
}

fn default_worker_url() -> String {
    "http://127.0.0.1:5050".to_string()
}

fn default_worker_timeout() -> u64 {
    300
}

#[derive(Debug, Deserialize)]
struct LoadResponse {
    handle: String,
}

#[derive(Debug, Serialize)]
struct InferBody<'a> {
    handle: &'a str,
    #[serde(flatten)]
    request: &'a InferenceRequest,
}

#[derive(Debug, Deserialize)]
struct WorkerErrorResponse {
    #[serde(alias = "detail", alias = "message")]
    error: String,
}

/// Loader backed by the inference worker
pub struct WorkerLoader {
    client: Client,
    base_url: String,
}

impl WorkerLoader {
    pub fn new(config: &WorkerConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|e| TtsError::Config {
                message: format!("Failed to create HTTP client: {}", e),
                path: None,
            })?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl ModelLoader for WorkerLoader {
    async fn load(&self, spec: &BundleSpec) -> Result<Arc<dyn VoiceModel>> {
        let response = self
            .client
            .post(self.endpoint("/models/load"))
            .json(spec)
            .send()
            .await?;
        let response = check_status(response, InferenceStage::ModelLoad).await?;

        let loaded: LoadResponse = response.json().await.map_err(|e| {
            TtsError::inference(InferenceStage::ModelLoad, format!("Invalid load response: {}", e))
        })?;
        debug!("Worker loaded {} as handle {}", spec.name, loaded.handle);

        Ok(Arc::new(WorkerModel {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            handle: loaded.handle,
        }))
    }

    async fn devices(&self) -> Result<DeviceInventory> {
        let response = self.client.get(self.endpoint("/devices")).send().await?;
        let response = check_status(response, InferenceStage::WorkerRequest).await?;
        Ok(response.json().await?)
    }
}

/// A model resident in the worker
pub struct WorkerModel {
    client: Client,
    base_url: String,
    handle: String,
}

#[async_trait]
impl VoiceModel for WorkerModel {
    async fn infer(&self, request: &InferenceRequest) -> Result<SynthesizedAudio> {
        let body = InferBody {
            handle: &self.handle,
            request,
        };

        let response = self
            .client
            .post(format!("{}/infer", self.base_url))
            .json(&body)
            .send()
            .await?;
        let response = check_status(response, InferenceStage::WorkerRequest).await?;

        let bytes = response.bytes().await?;
        AudioOutput::decode_wav(&bytes)
    }
}

async fn check_status(
    response: reqwest::Response,
    stage: InferenceStage,
) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    let message = serde_json::from_str::<WorkerErrorResponse>(&text)
        .map(|e| e.error)
        .unwrap_or(text);

    Err(TtsError::inference(
        stage,
        format!("worker returned {}: {}", status, message),
    ))
}
