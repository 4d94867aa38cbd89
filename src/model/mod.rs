//! Model bundles, on-disk discovery and the servable generation cache

pub mod bundle;
pub mod cache;
pub mod registry;

pub use bundle::{
    BundlePaths, BundleSpec, Device, DiscoveredBundle, HyperParameters, LoadState, ModelBundle,
};
pub use cache::{CacheStats, Generation, ModelCache};
pub use registry::{ModelRegistry, CONFIG_FILE, STYLE_VECTORS_FILE, WEIGHTS_EXTENSIONS};
