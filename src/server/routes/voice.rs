//! Synthesis Route

use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::{header, Method},
    response::{IntoResponse, Response},
};
use tracing::warn;

use crate::audio::AudioOutput;
use crate::server::error::ApiError;
use crate::server::server_core::ServerState;
use crate::server::types::VoiceQuery;
use crate::synthesis::{Language, ModelQuery, SynthesisParams};

/// `GET|POST /voice`: text to WAV
pub async fn voice(
    State(state): State<Arc<ServerState>>,
    method: Method,
    query: Result<Query<VoiceQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(query) = query?;
    if method == Method::GET {
        warn!("The GET method is not recommended for /voice; use POST");
    }

    let text = query
        .text
        .as_deref()
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::validation("text", "text must not be empty"))?;
    if let Some(limit) = state.config.text_limit() {
        let length = text.chars().count();
        if length > limit {
            return Err(ApiError::validation(
                "text",
                format!("text is {} characters, the limit is {}", length, limit),
            ));
        }
    }

    let language = match query.language.as_deref() {
        Some(raw) => raw
            .parse::<Language>()
            .map_err(|e| ApiError::validation("language", e))?,
        None => state.config.language,
    };

    let model_query = ModelQuery {
        model_name: query.model_name.clone(),
        model_id: query.model_id,
        speaker_name: query.speaker_name.clone(),
        speaker_id: query.speaker_id,
        style: query.style.clone(),
    };
    let resolved = state.pipeline.resolve(&model_query)?;

    let text = match query.encoding.as_deref() {
        Some(encoding) => decode_text(text, encoding)?,
        None => text.to_string(),
    };

    let params = SynthesisParams {
        text,
        language,
        sdp_ratio: query.sdp_ratio,
        noise: query.noise,
        noise_w: query.noisew,
        length: query.length,
        line_split: query.auto_split,
        split_interval: query.split_interval,
        assist_text: None,
        assist_text_weight: query.assist_text_weight,
        use_assist_text: false,
        style_weight: query.style_weight,
        reference_audio_path: query.reference_audio_path.clone(),
    }
    .with_assist_text(query.assist_text.clone(), query.assist_text_weight);

    let audio = state.pipeline.synthesize(&resolved, &params).await?;
    let wav = AudioOutput::encode_wav(&audio.samples, audio.sample_rate)?;

    Ok(([(header::CONTENT_TYPE, "audio/wav")], wav).into_response())
}

/// Percent-decode `text`. Only UTF-8 is supported.
fn decode_text(text: &str, encoding: &str) -> Result<String, ApiError> {
    let normalized = encoding.trim().to_lowercase().replace('_', "-");
    if normalized != "utf-8" && normalized != "utf8" {
        return Err(ApiError::validation(
            "encoding",
            format!("encoding={} is not supported", encoding),
        ));
    }

    urlencoding::decode(text)
        .map(|decoded| decoded.into_owned())
        .map_err(|e| ApiError::validation("text", format!("text is not valid {}: {}", encoding, e)))
}
