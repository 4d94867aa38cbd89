//! Model Registry
//!
//! Discovers model bundles under an assets root. Each immediate
//! subdirectory holding a weights file, `config.json` and
//! `style_vectors.npy` is one bundle; the directory name is its model name.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::core::error::{Result, TtsError};
use super::bundle::{BundlePaths, DiscoveredBundle, HyperParameters};

/// Recognized weights file extensions
pub const WEIGHTS_EXTENSIONS: &[&str] = &["safetensors", "pth", "pt"];
/// Bundle config file name
pub const CONFIG_FILE: &str = "config.json";
/// Bundle style-vector file name
pub const STYLE_VECTORS_FILE: &str = "style_vectors.npy";

/// Registry over one assets root
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    root: PathBuf,
}

impl ModelRegistry {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Re-run the scan. Loads no weights.
    pub fn refresh(&self) -> Result<Vec<DiscoveredBundle>> {
        Self::scan(&self.root)
    }

    /// Scan `root` for bundles in directory-listing order.
    ///
    /// A missing root yields an empty list. An unreadable root or a
    /// malformed `config.json` fails the whole scan.
    pub fn scan(root: &Path) -> Result<Vec<DiscoveredBundle>> {
        if !root.exists() {
            warn!("Model directory {:?} does not exist", root);
            return Ok(Vec::new());
        }

        let entries = std::fs::read_dir(root).map_err(|e| TtsError::Registry {
            message: format!("Failed to read model directory {}: {}", root.display(), e),
            path: Some(root.to_path_buf()),
        })?;

        let mut bundles = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| TtsError::io_at(e, root))?;
            let dir = entry.path();
            if !dir.is_dir() {
                continue;
            }

            let name = entry.file_name().to_string_lossy().into_owned();
            let Some(paths) = Self::bundle_paths(&dir)? else {
                continue;
            };

            let hparams = HyperParameters::load(&paths.config).map_err(|e| TtsError::ModelLoad {
                message: e.to_string(),
                model: name.clone(),
                path: Some(paths.config.clone()),
            })?;

            debug!("Discovered model {} ({:?})", name, paths.weights);
            bundles.push(DiscoveredBundle {
                name,
                paths,
                hparams,
            });
        }

        Ok(bundles)
    }

    /// Paths of a qualifying bundle directory, or None if something is missing
    fn bundle_paths(dir: &Path) -> Result<Option<BundlePaths>> {
        let mut weights = None;
        for entry in std::fs::read_dir(dir).map_err(|e| TtsError::io_at(e, dir))? {
            let path = entry.map_err(|e| TtsError::io_at(e, dir))?.path();
            let is_weights = path.is_file()
                && path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| WEIGHTS_EXTENSIONS.contains(&ext));
            if is_weights {
                weights = Some(path);
                break;
            }
        }

        let Some(weights) = weights else {
            warn!("No model files found in {:?}, so skip it", dir);
            return Ok(None);
        };

        let config = dir.join(CONFIG_FILE);
        if !config.is_file() {
            warn!("Config file {:?} not found, so skip {:?}", CONFIG_FILE, dir);
            return Ok(None);
        }

        let style_vectors = dir.join(STYLE_VECTORS_FILE);
        if !style_vectors.is_file() {
            warn!("Style vectors {:?} not found, so skip {:?}", STYLE_VECTORS_FILE, dir);
            return Ok(None);
        }

        Ok(Some(BundlePaths {
            weights,
            config,
            style_vectors,
        }))
    }
}
