//! Training job launcher
//!
//! A submission runs four stages in order: dataset write, preprocessing,
//! active-config update and launch. Each stage reports its own error
//! kind. The dataset directory is left in place when a later stage fails.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::core::error::{Result, TrainingStage, TtsError};
use super::config::TrainingConfig;
use super::dataset::DatasetLayout;
use super::jobs::{JobStatus, TrainingJob, TrainingJobs};
use super::process::{PreprocessJob, ProcessLauncher, TrainJob};

/// One uploaded sample with its transcript
#[derive(Debug, Clone)]
pub struct TrainingUpload {
    /// Speaker label written to the transcript record
    pub name: String,
    pub transcript: String,
    /// Original file name, used for the audio extension
    pub file_name: Option<String>,
    pub audio: Vec<u8>,
}

/// Accepts uploads and starts detached training runs
pub struct TrainingJobLauncher {
    config: TrainingConfig,
    launcher: Arc<dyn ProcessLauncher>,
    jobs: Arc<TrainingJobs>,
}

impl TrainingJobLauncher {
    pub fn new(config: TrainingConfig, launcher: Arc<dyn ProcessLauncher>) -> Self {
        Self {
            jobs: Arc::new(TrainingJobs::with_retention(config.retained_jobs)),
            config,
            launcher,
        }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    pub fn jobs(&self) -> &Arc<TrainingJobs> {
        &self.jobs
    }

    /// Submit an upload. Returns once the training process has been
    /// started; it does not wait for training to finish.
    pub async fn submit(&self, upload: TrainingUpload) -> Result<TrainingJob> {
        let id = Uuid::new_v4().to_string();
        let layout = DatasetLayout::new(&self.config.data_root, &id, upload.file_name.as_deref());

        let now = Utc::now();
        self.jobs.insert(TrainingJob {
            id: id.clone(),
            name: upload.name.clone(),
            raw_audio_path: layout.audio_path.clone(),
            transcript_path: layout.transcript_path.clone(),
            dataset_dir: layout.dataset_dir.clone(),
            status: JobStatus::Submitted,
            pid: None,
            error: None,
            created_at: now,
            updated_at: now,
        });
        info!("Training job {} submitted for speaker {}", id, upload.name);

        match self.run_stages(&id, &layout, &upload).await {
            Ok(()) => self.jobs.get(&id).ok_or_else(|| TtsError::Internal {
                message: format!("training job {} vanished", id),
                location: Some("TrainingJobLauncher::submit".to_string()),
            }),
            Err(e) => {
                error!("Training job {} failed: {}", id, e);
                self.jobs.fail(&id, e.to_string());
                Err(e)
            }
        }
    }

    async fn run_stages(&self, id: &str, layout: &DatasetLayout, upload: &TrainingUpload) -> Result<()> {
        layout
            .write(&upload.audio, &upload.name, self.config.language, &upload.transcript)
            .await?;
        info!("Training job {}: dataset written to {:?}", id, layout.dataset_dir);

        self.preprocess(id).await?;
        info!("Training job {}: preprocessing finished", id);

        update_active_config(
            &self.config.default_config_path,
            &self.config.active_config_path,
            id,
        )
        .await?;
        info!(
            "Training job {}: {:?} now points at model {}",
            id, self.config.active_config_path, id
        );

        self.launch(id)
    }

    async fn preprocess(&self, id: &str) -> Result<()> {
        let spec = PreprocessJob::new(id, &self.config).to_spec(&self.config);
        let outcome = self.launcher.run(&spec).await.map_err(|e| {
            TtsError::training(
                TrainingStage::Preprocessing,
                format!("failed to run {}: {}", spec.program, e),
            )
        })?;

        if !outcome.success {
            let code = outcome
                .code
                .map(|c| c.to_string())
                .unwrap_or_else(|| "signal".to_string());
            return Err(TtsError::training(
                TrainingStage::Preprocessing,
                format!("preprocessing exited with {}", code),
            ));
        }
        Ok(())
    }

    fn launch(&self, id: &str) -> Result<()> {
        let spec = TrainJob::new(id, &self.config).to_spec(&self.config);
        let process = self.launcher.spawn_detached(&spec).map_err(|e| {
            TtsError::training(
                TrainingStage::Launch,
                format!("failed to spawn {}: {}", spec.program, e),
            )
        })?;

        self.jobs.update(id, |job| {
            job.status = JobStatus::Running;
            job.pid = process.pid;
        });
        info!("Training job {}: training started (pid {:?})", id, process.pid);

        let jobs = Arc::clone(&self.jobs);
        let id = id.to_string();
        let completion = process.completion;
        tokio::spawn(async move {
            match completion.await {
                Ok(true) => {
                    info!("Training job {} finished", id);
                    jobs.set_status(&id, JobStatus::Done);
                }
                Ok(false) => {
                    warn!("Training job {} exited unsuccessfully", id);
                    jobs.fail(&id, "training process exited unsuccessfully");
                }
                Err(e) => {
                    warn!("Training job {} could not be awaited: {}", id, e);
                    jobs.fail(&id, e.to_string());
                }
            }
        });

        Ok(())
    }
}

/// Copy the default YAML config to the active path with `model_name` set
pub async fn update_active_config(template: &Path, active: &Path, model_name: &str) -> Result<()> {
    let content = tokio::fs::read_to_string(template)
        .await
        .map_err(|e| config_error(template, e))?;

    let mut value: serde_yaml::Value = serde_yaml::from_str(&content)
        .map_err(|e| config_error(template, e))?;
    let mapping = value.as_mapping_mut().ok_or_else(|| {
        TtsError::training(
            TrainingStage::ConfigUpdate,
            format!("{} is not a YAML mapping", template.display()),
        )
    })?;
    mapping.insert(
        serde_yaml::Value::from("model_name"),
        serde_yaml::Value::from(model_name),
    );

    let rendered = serde_yaml::to_string(&value).map_err(|e| config_error(active, e))?;
    tokio::fs::write(active, rendered)
        .await
        .map_err(|e| config_error(active, e))
}

fn config_error(path: &Path, err: impl std::fmt::Display) -> TtsError {
    TtsError::training(
        TrainingStage::ConfigUpdate,
        format!("{}: {}", path.display(), err),
    )
}
