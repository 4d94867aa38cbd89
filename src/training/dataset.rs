//! Single-speaker dataset materialization
//!
//! ```text
//! <data_root>/<job_id>/
//! ├── raw/voice.<ext>
//! └── esd.list          voice.<ext>|<name>|<LANG>|<transcript>
//! ```

use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::core::error::{Result, TrainingStage, TtsError};
use crate::synthesis::Language;

const DEFAULT_AUDIO_EXTENSION: &str = "wav";
const TRANSCRIPT_FILE: &str = "esd.list";

/// Paths of one job's dataset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetLayout {
    pub dataset_dir: PathBuf,
    pub raw_dir: PathBuf,
    pub audio_file_name: String,
    pub audio_path: PathBuf,
    pub transcript_path: PathBuf,
}

impl DatasetLayout {
    /// Layout for `job_id`; the audio extension comes from the uploaded
    /// file name and falls back to `wav`.
    pub fn new(data_root: &Path, job_id: &str, uploaded_name: Option<&str>) -> Self {
        let extension = uploaded_name
            .and_then(|name| Path::new(name).extension())
            .and_then(|ext| ext.to_str())
            .filter(|ext| !ext.is_empty())
            .map(|ext| ext.to_lowercase())
            .unwrap_or_else(|| DEFAULT_AUDIO_EXTENSION.to_string());

        let dataset_dir = data_root.join(job_id);
        let raw_dir = dataset_dir.join("raw");
        let audio_file_name = format!("voice.{}", extension);

        Self {
            audio_path: raw_dir.join(&audio_file_name),
            transcript_path: dataset_dir.join(TRANSCRIPT_FILE),
            dataset_dir,
            raw_dir,
            audio_file_name,
        }
    }

    /// The single transcript record, without a trailing newline
    pub fn transcript_line(&self, speaker: &str, language: Language, transcript: &str) -> String {
        format!(
            "{}|{}|{}|{}",
            self.audio_file_name,
            speaker,
            language.as_str(),
            transcript
        )
    }

    /// Write the audio verbatim and the transcript record. Neither file
    /// may already exist.
    pub async fn write(
        &self,
        audio: &[u8],
        speaker: &str,
        language: Language,
        transcript: &str,
    ) -> Result<()> {
        fs::create_dir_all(&self.raw_dir)
            .await
            .map_err(|e| dataset_error(&self.raw_dir, e))?;

        write_new(&self.audio_path, audio).await?;
        let line = self.transcript_line(speaker, language, transcript);
        write_new(&self.transcript_path, line.as_bytes()).await?;
        Ok(())
    }
}

async fn write_new(path: &Path, content: &[u8]) -> Result<()> {
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await
        .map_err(|e| dataset_error(path, e))?;
    file.write_all(content)
        .await
        .map_err(|e| dataset_error(path, e))?;
    file.flush().await.map_err(|e| dataset_error(path, e))
}

fn dataset_error(path: &Path, err: std::io::Error) -> TtsError {
    TtsError::training(
        TrainingStage::DatasetWrite,
        format!("{}: {}", path.display(), err),
    )
}
