//! Training submission: dataset materialization and detached training runs

pub mod config;
pub mod dataset;
pub mod jobs;
pub mod launcher;
pub mod process;

pub use config::TrainingConfig;
pub use dataset::DatasetLayout;
pub use jobs::{JobStatus, TrainingJob, TrainingJobs};
pub use launcher::{update_active_config, TrainingJobLauncher, TrainingUpload};
pub use process::{
    Completion, DetachedProcess, PreprocessJob, ProcessLauncher, ProcessOutcome, ProcessSpec,
    SystemLauncher, TrainJob,
};
