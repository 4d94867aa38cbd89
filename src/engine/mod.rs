//! Inference Engine Abstraction
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │              SynthesisPipeline                │
//! ├───────────────────────────────────────────────┤
//! │  ModelLoader::load()  ->  VoiceModel::infer() │
//! ├───────────────────────────────────────────────┤
//! │        WorkerLoader / WorkerModel (HTTP)      │
//! └───────────────────────────────────────────────┘
//! ```

pub mod traits;
pub mod worker;

pub use traits::{
    DeviceInventory, GpuInfo, GpuMemory, InferenceRequest, ModelLoader, VoiceModel,
};
pub use worker::{WorkerConfig, WorkerLoader, WorkerModel};
