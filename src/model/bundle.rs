//! Model bundles
//!
//! A bundle is one on-disk trained voice model: a weights file, a
//! `config.json` with the speaker/style tables, and a style-vector file.
//! The tables are read at discovery; the weights are only materialized on
//! the first synthesis request that touches the bundle.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tokio::sync::OnceCell;

use crate::core::error::{Result, TtsError};
use crate::engine::VoiceModel;

/// Default output sample rate when a config omits it
pub const DEFAULT_SAMPLING_RATE: u32 = 44100;

/// Inference target, fixed at process start
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Device {
    #[default]
    Cpu,
    Cuda(usize),
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cpu => write!(f, "cpu"),
            Device::Cuda(0) => write!(f, "cuda"),
            Device::Cuda(index) => write!(f, "cuda:{}", index),
        }
    }
}

impl FromStr for Device {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        match s.as_str() {
            "cpu" => Ok(Device::Cpu),
            "cuda" | "gpu" => Ok(Device::Cuda(0)),
            _ => s
                .strip_prefix("cuda:")
                .and_then(|n| n.parse().ok())
                .map(Device::Cuda)
                .ok_or_else(|| format!("unknown device: {}", s)),
        }
    }
}

impl Serialize for Device {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Device {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Files making up a bundle. Immutable once discovered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BundlePaths {
    pub weights: PathBuf,
    pub config: PathBuf,
    pub style_vectors: PathBuf,
}

/// Speaker and style tables from a bundle's `config.json`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HyperParameters {
    pub sampling_rate: u32,
    pub spk2id: BTreeMap<String, i64>,
    pub id2spk: BTreeMap<i64, String>,
    pub style2id: BTreeMap<String, i64>,
}

#[derive(Deserialize)]
struct RawConfig {
    data: RawData,
}

#[derive(Deserialize)]
struct RawData {
    #[serde(default)]
    sampling_rate: Option<u32>,
    #[serde(default)]
    spk2id: HashMap<String, i64>,
    #[serde(default)]
    style2id: Option<HashMap<String, i64>>,
    #[serde(default)]
    num_styles: Option<usize>,
}

impl HyperParameters {
    pub fn from_json(content: &str) -> serde_json::Result<Self> {
        let raw: RawConfig = serde_json::from_str(content)?;
        let data = raw.data;

        let spk2id: BTreeMap<String, i64> = data.spk2id.into_iter().collect();
        let id2spk = spk2id.iter().map(|(name, id)| (*id, name.clone())).collect();

        // Older configs only carry a style count; styles are then named by index.
        let style2id = match data.style2id {
            Some(map) => map.into_iter().collect(),
            None => (0..data.num_styles.unwrap_or(0))
                .map(|i| (i.to_string(), i as i64))
                .collect(),
        };

        Ok(Self {
            sampling_rate: data.sampling_rate.unwrap_or(DEFAULT_SAMPLING_RATE),
            spk2id,
            id2spk,
            style2id,
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| TtsError::io_at(e, path))?;
        Self::from_json(&content).map_err(|e| TtsError::Config {
            message: format!("Invalid model config {}: {}", path.display(), e),
            path: Some(path.to_path_buf()),
        })
    }
}

/// A bundle found by a registry scan, not yet placed in a generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredBundle {
    pub name: String,
    pub paths: BundlePaths,
    pub hparams: HyperParameters,
}

/// What a loader needs to materialize a bundle
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BundleSpec {
    pub name: String,
    pub model_path: PathBuf,
    pub config_path: PathBuf,
    pub style_vec_path: PathBuf,
    pub device: Device,
}

/// Lifecycle of a bundle's weights
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadState {
    Unloaded,
    Loaded,
}

/// A servable model within one cache generation
pub struct ModelBundle {
    index: usize,
    generation: u64,
    name: String,
    paths: BundlePaths,
    device: Device,
    hparams: HyperParameters,
    model: OnceCell<Arc<dyn VoiceModel>>,
}

impl ModelBundle {
    pub(crate) fn new(
        index: usize,
        generation: u64,
        discovered: DiscoveredBundle,
        device: Device,
    ) -> Self {
        Self {
            index,
            generation,
            name: discovered.name,
            paths: discovered.paths,
            device,
            hparams: discovered.hparams,
            model: OnceCell::new(),
        }
    }

    /// Position in the generation; only meaningful within that generation
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn paths(&self) -> &BundlePaths {
        &self.paths
    }

    pub fn device(&self) -> Device {
        self.device
    }

    pub fn sampling_rate(&self) -> u32 {
        self.hparams.sampling_rate
    }

    pub fn spk2id(&self) -> &BTreeMap<String, i64> {
        &self.hparams.spk2id
    }

    pub fn id2spk(&self) -> &BTreeMap<i64, String> {
        &self.hparams.id2spk
    }

    pub fn style2id(&self) -> &BTreeMap<String, i64> {
        &self.hparams.style2id
    }

    pub fn speaker_id(&self, speaker_name: &str) -> Option<i64> {
        self.hparams.spk2id.get(speaker_name).copied()
    }

    pub fn has_speaker_id(&self, speaker_id: i64) -> bool {
        self.hparams.id2spk.contains_key(&speaker_id)
    }

    pub fn has_style(&self, style: &str) -> bool {
        self.hparams.style2id.contains_key(style)
    }

    pub fn load_state(&self) -> LoadState {
        if self.model.initialized() {
            LoadState::Loaded
        } else {
            LoadState::Unloaded
        }
    }

    pub fn spec(&self) -> BundleSpec {
        BundleSpec {
            name: self.name.clone(),
            model_path: self.paths.weights.clone(),
            config_path: self.paths.config.clone(),
            style_vec_path: self.paths.style_vectors.clone(),
            device: self.device,
        }
    }

    pub(crate) fn model_cell(&self) -> &OnceCell<Arc<dyn VoiceModel>> {
        &self.model
    }
}

impl fmt::Debug for ModelBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelBundle")
            .field("index", &self.index)
            .field("generation", &self.generation)
            .field("name", &self.name)
            .field("paths", &self.paths)
            .field("device", &self.device)
            .field("load_state", &self.load_state())
            .finish()
    }
}
