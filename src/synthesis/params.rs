//! Synthesis parameters forwarded verbatim to the inference capability

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default style name every bundle is expected to provide
pub const DEFAULT_STYLE: &str = "Neutral";
/// Default style conditioning strength
pub const DEFAULT_STYLE_WEIGHT: f32 = 1.0;
/// Stochastic/deterministic duration predictor mix ratio
pub const DEFAULT_SDP_RATIO: f32 = 0.2;
/// Sample noise scale
pub const DEFAULT_NOISE: f32 = 0.6;
/// Duration predictor noise scale
pub const DEFAULT_NOISEW: f32 = 0.8;
/// Speech-rate scale (1.0 is normal, larger is slower)
pub const DEFAULT_LENGTH: f32 = 1.0;
/// Split long text on newlines
pub const DEFAULT_LINE_SPLIT: bool = true;
/// Silence inserted between split lines (seconds)
pub const DEFAULT_SPLIT_INTERVAL: f32 = 0.5;
/// Strength of the prosody assist text
pub const DEFAULT_ASSIST_TEXT_WEIGHT: f32 = 0.7;

/// Text language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Language {
    #[default]
    JP,
    EN,
    ZH,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::JP => "JP",
            Language::EN => "EN",
            Language::ZH => "ZH",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "JP" | "JA" => Ok(Language::JP),
            "EN" => Ok(Language::EN),
            "ZH" => Ok(Language::ZH),
            other => Err(format!("unsupported language: {}", other)),
        }
    }
}

/// Full parameter set of one synthesis call.
///
/// Ranges are enforced by the transport layer; nothing here is re-validated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisParams {
    pub text: String,
    pub language: Language,
    pub sdp_ratio: f32,
    pub noise: f32,
    pub noise_w: f32,
    pub length: f32,
    pub line_split: bool,
    pub split_interval: f32,
    pub assist_text: Option<String>,
    pub assist_text_weight: f32,
    pub use_assist_text: bool,
    pub style_weight: f32,
    pub reference_audio_path: Option<String>,
}

impl SynthesisParams {
    /// Parameters with every knob at its default
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            language: Language::default(),
            sdp_ratio: DEFAULT_SDP_RATIO,
            noise: DEFAULT_NOISE,
            noise_w: DEFAULT_NOISEW,
            length: DEFAULT_LENGTH,
            line_split: DEFAULT_LINE_SPLIT,
            split_interval: DEFAULT_SPLIT_INTERVAL,
            assist_text: None,
            assist_text_weight: DEFAULT_ASSIST_TEXT_WEIGHT,
            use_assist_text: false,
            style_weight: DEFAULT_STYLE_WEIGHT,
            reference_audio_path: None,
        }
    }

    pub fn with_language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    /// Set the assist text; an empty string disables it
    pub fn with_assist_text(mut self, assist_text: Option<String>, weight: f32) -> Self {
        self.use_assist_text = assist_text.as_deref().is_some_and(|t| !t.is_empty());
        self.assist_text = assist_text;
        self.assist_text_weight = weight;
        self
    }
}
