//! External process launching
//!
//! Preprocessing and training are separate programs. Jobs are described
//! as structured values and rendered to a [`ProcessSpec`] in one place;
//! the [`ProcessLauncher`] trait decides how a spec actually runs.

use std::future::Future;
use std::io;
use std::path::PathBuf;
use std::pin::Pin;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use super::config::TrainingConfig;

/// A program invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessSpec {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
}

impl ProcessSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append `--name value`
    pub fn opt(self, name: &str, value: impl ToString) -> Self {
        self.arg(format!("--{}", name)).arg(value.to_string())
    }

    /// Append `--name` only when `enabled`
    pub fn flag(self, name: &str, enabled: bool) -> Self {
        if enabled {
            self.arg(format!("--{}", name))
        } else {
            self
        }
    }

    pub fn current_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.working_dir = dir;
        self
    }
}

/// Exit of a process run to completion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessOutcome {
    pub success: bool,
    pub code: Option<i32>,
}

/// Resolves to whether the process exited successfully
pub type Completion = Pin<Box<dyn Future<Output = io::Result<bool>> + Send>>;

/// A process running on its own
pub struct DetachedProcess {
    pub pid: Option<u32>,
    pub completion: Completion,
}

/// Runs process specs
#[async_trait]
pub trait ProcessLauncher: Send + Sync {
    /// Run to completion
    async fn run(&self, spec: &ProcessSpec) -> io::Result<ProcessOutcome>;

    /// Start and return immediately
    fn spawn_detached(&self, spec: &ProcessSpec) -> io::Result<DetachedProcess>;
}

/// Launcher backed by the operating system
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemLauncher;

impl SystemLauncher {
    fn command(spec: &ProcessSpec) -> Command {
        let mut command = Command::new(&spec.program);
        command.args(&spec.args);
        if let Some(dir) = &spec.working_dir {
            command.current_dir(dir);
        }
        command
    }
}

#[async_trait]
impl ProcessLauncher for SystemLauncher {
    async fn run(&self, spec: &ProcessSpec) -> io::Result<ProcessOutcome> {
        let status = Self::command(spec).stdin(Stdio::null()).status().await?;
        Ok(ProcessOutcome {
            success: status.success(),
            code: status.code(),
        })
    }

    fn spawn_detached(&self, spec: &ProcessSpec) -> io::Result<DetachedProcess> {
        let mut child = Self::command(spec)
            .stdin(Stdio::null())
            .kill_on_drop(false)
            .spawn()?;
        let pid = child.id();

        Ok(DetachedProcess {
            pid,
            completion: Box::pin(async move { child.wait().await.map(|s| s.success()) }),
        })
    }
}

/// Dataset preprocessing run for one job
#[derive(Debug, Clone, PartialEq)]
pub struct PreprocessJob {
    pub model_name: String,
    pub batch_size: u32,
    pub epochs: u32,
    pub save_every_steps: u32,
    pub num_processes: u32,
    pub normalize: bool,
    pub trim: bool,
    pub freeze_en_bert: bool,
    pub freeze_jp_bert: bool,
    pub freeze_zh_bert: bool,
    pub freeze_style: bool,
    pub freeze_decoder: bool,
    pub use_jp_extra: bool,
    pub val_per_lang: u32,
    pub log_interval: u32,
    /// Policy for lines whose reading cannot be derived
    pub yomi_error: String,
}

impl PreprocessJob {
    pub fn new(model_name: impl Into<String>, config: &TrainingConfig) -> Self {
        Self {
            model_name: model_name.into(),
            batch_size: config.batch_size,
            epochs: config.epochs,
            save_every_steps: config.save_every_steps,
            num_processes: config.num_processes,
            normalize: config.normalize,
            trim: config.trim,
            freeze_en_bert: false,
            freeze_jp_bert: false,
            freeze_zh_bert: false,
            freeze_style: false,
            freeze_decoder: false,
            use_jp_extra: config.use_jp_extra,
            val_per_lang: 0,
            log_interval: config.log_interval,
            yomi_error: "skip".to_string(),
        }
    }

    pub fn to_spec(&self, config: &TrainingConfig) -> ProcessSpec {
        ProcessSpec::new(&config.python)
            .arg(&config.preprocess_script)
            .opt("model_name", &self.model_name)
            .opt("batch_size", self.batch_size)
            .opt("epochs", self.epochs)
            .opt("save_every_steps", self.save_every_steps)
            .opt("num_processes", self.num_processes)
            .opt("val_per_lang", self.val_per_lang)
            .opt("log_interval", self.log_interval)
            .opt("yomi_error", &self.yomi_error)
            .flag("normalize", self.normalize)
            .flag("trim", self.trim)
            .flag("freeze_EN_bert", self.freeze_en_bert)
            .flag("freeze_JP_bert", self.freeze_jp_bert)
            .flag("freeze_ZH_bert", self.freeze_zh_bert)
            .flag("freeze_style", self.freeze_style)
            .flag("freeze_decoder", self.freeze_decoder)
            .flag("use_jp_extra", self.use_jp_extra)
            .current_dir(config.working_dir.clone())
    }
}

/// The training run itself
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainJob {
    pub config_path: PathBuf,
    pub model_dir: PathBuf,
    pub assets_root: PathBuf,
}

impl TrainJob {
    pub fn new(model_name: &str, config: &TrainingConfig) -> Self {
        let model_dir = config.data_root.join(model_name);
        Self {
            config_path: model_dir.join("config.json"),
            model_dir,
            assets_root: config.assets_root.clone(),
        }
    }

    pub fn to_spec(&self, config: &TrainingConfig) -> ProcessSpec {
        ProcessSpec::new(&config.python)
            .arg(&config.train_script)
            .opt("config", self.config_path.display())
            .opt("model", self.model_dir.display())
            .opt("assets_root", self.assets_root.display())
            .current_dir(config.working_dir.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preprocess_spec_flags() {
        let config = TrainingConfig::default();
        let spec = PreprocessJob::new("job1", &config).to_spec(&config);

        assert_eq!(spec.program, "python");
        assert_eq!(spec.args[0], "preprocess_all.py");
        let joined = spec.args.join(" ");
        assert!(joined.contains("--model_name job1"));
        assert!(joined.contains("--batch_size 6"));
        assert!(joined.contains("--epochs 15"));
        assert!(joined.contains("--val_per_lang 0"));
        assert!(joined.contains("--yomi_error skip"));
        assert!(joined.contains("--use_jp_extra"));
        assert!(!joined.contains("freeze"));
        assert!(!joined.contains("--normalize"));
    }

    #[test]
    fn test_train_spec_args() {
        let config = TrainingConfig::default();
        let spec = TrainJob::new("job1", &config).to_spec(&config);

        assert_eq!(
            spec.args,
            vec![
                "train_ms_jp_extra.py",
                "--config",
                "Data/job1/config.json",
                "--model",
                "Data/job1",
                "--assets_root",
                "model_assets",
            ]
        );
    }
}
