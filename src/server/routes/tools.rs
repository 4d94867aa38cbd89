//! Tool Routes

use std::path::Path;

use axum::{
    extract::{rejection::QueryRejection, Query},
    http::header,
    response::{IntoResponse, Response},
};

use crate::core::error::TtsError;
use crate::server::error::ApiError;
use crate::server::types::AudioPathQuery;

/// `GET /tools/get_audio?path=`: serve a local WAV file
pub async fn get_audio(
    query: Result<Query<AudioPathQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(query) = query?;
    let path = query
        .path
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ApiError::validation("path", "path must not be empty"))?;

    if !Path::new(&path).is_file() {
        return Err(ApiError::validation("path", format!("path={} not found", path)));
    }
    if !path.to_lowercase().ends_with(".wav") {
        return Err(ApiError::validation("path", format!("wav file not found in {}", path)));
    }

    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| TtsError::io_at(e, &path))?;

    Ok(([(header::CONTENT_TYPE, "audio/wav")], bytes).into_response())
}
