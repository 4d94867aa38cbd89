//! Training job bookkeeping
//!
//! Jobs live in memory for the life of the process. Submitted and running
//! jobs are always kept; finished ones beyond the retention limit are
//! evicted oldest first.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;

/// Lifecycle of a training submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Submitted,
    Running,
    Done,
    Failed,
}

impl JobStatus {
    pub fn is_finished(&self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Failed)
    }
}

/// One submission and its on-disk artifacts
#[derive(Debug, Clone, Serialize)]
pub struct TrainingJob {
    pub id: String,
    pub name: String,
    pub raw_audio_path: PathBuf,
    pub transcript_path: PathBuf,
    pub dataset_dir: PathBuf,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Finished jobs kept by [`TrainingJobs::new`]
pub const DEFAULT_RETAINED_JOBS: usize = 256;

/// Jobs submitted since the process started
#[derive(Debug)]
pub struct TrainingJobs {
    jobs: DashMap<String, TrainingJob>,
    retain_finished: usize,
}

impl Default for TrainingJobs {
    fn default() -> Self {
        Self::new()
    }
}

impl TrainingJobs {
    pub fn new() -> Self {
        Self::with_retention(DEFAULT_RETAINED_JOBS)
    }

    pub fn with_retention(retain_finished: usize) -> Self {
        Self {
            jobs: DashMap::new(),
            retain_finished,
        }
    }

    pub fn insert(&self, job: TrainingJob) {
        let finished = job.status.is_finished();
        self.jobs.insert(job.id.clone(), job);
        if finished {
            self.prune();
        }
    }

    pub fn get(&self, id: &str) -> Option<TrainingJob> {
        self.jobs.get(id).map(|job| job.value().clone())
    }

    /// Returns false when `id` is unknown
    pub fn update(&self, id: &str, f: impl FnOnce(&mut TrainingJob)) -> bool {
        let finished = match self.jobs.get_mut(id) {
            Some(mut job) => {
                f(job.value_mut());
                job.updated_at = Utc::now();
                job.status.is_finished()
            }
            None => return false,
        };
        // the shard guard is released before pruning
        if finished {
            self.prune();
        }
        true
    }

    /// Evict the oldest finished jobs beyond the retention limit
    fn prune(&self) {
        let mut finished: Vec<(DateTime<Utc>, String)> = self
            .jobs
            .iter()
            .filter(|e| e.status.is_finished())
            .map(|e| (e.updated_at, e.key().clone()))
            .collect();
        if finished.len() <= self.retain_finished {
            return;
        }

        finished.sort();
        let excess = finished.len() - self.retain_finished;
        for (_, id) in finished.into_iter().take(excess) {
            self.jobs.remove(&id);
        }
    }

    pub fn set_status(&self, id: &str, status: JobStatus) -> bool {
        self.update(id, |job| job.status = status)
    }

    pub fn fail(&self, id: &str, message: impl Into<String>) -> bool {
        let message = message.into();
        self.update(id, |job| {
            job.status = JobStatus::Failed;
            job.error = Some(message);
        })
    }

    /// Newest first
    pub fn list(&self) -> Vec<TrainingJob> {
        let mut jobs: Vec<_> = self.jobs.iter().map(|e| e.value().clone()).collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        jobs
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}
