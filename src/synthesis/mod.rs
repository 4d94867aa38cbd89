//! Request resolution and synthesis orchestration

pub mod params;
pub mod pipeline;
pub mod resolver;

pub use params::{
    Language, SynthesisParams, DEFAULT_ASSIST_TEXT_WEIGHT, DEFAULT_LENGTH, DEFAULT_LINE_SPLIT,
    DEFAULT_NOISE, DEFAULT_NOISEW, DEFAULT_SDP_RATIO, DEFAULT_SPLIT_INTERVAL, DEFAULT_STYLE,
    DEFAULT_STYLE_WEIGHT,
};
pub use pipeline::SynthesisPipeline;
pub use resolver::{ModelQuery, RequestResolver, ResolvedRequest};
