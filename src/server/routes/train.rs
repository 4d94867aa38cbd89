//! Training Routes

use std::sync::Arc;

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        Multipart, Path, State,
    },
    Json,
};

use crate::server::error::ApiError;
use crate::server::server_core::ServerState;
use crate::server::types::TrainResponse;
use crate::training::{TrainingJob, TrainingUpload};

/// `POST /train`: multipart `name`, `transcript`, `file`
pub async fn submit(
    State(state): State<Arc<ServerState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<TrainResponse>, ApiError> {
    let mut multipart = multipart?;

    let mut name = None;
    let mut transcript = None;
    let mut file = None;

    while let Some(field) = multipart.next_field().await.map_err(form_error)? {
        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "name" => name = Some(field.text().await.map_err(form_error)?),
            "transcript" => transcript = Some(field.text().await.map_err(form_error)?),
            "file" => {
                let file_name = field.file_name().map(str::to_string);
                let bytes = field.bytes().await.map_err(form_error)?;
                file = Some((file_name, bytes.to_vec()));
            }
            _ => {}
        }
    }

    let name = name.ok_or_else(|| ApiError::body_field("name", "field required"))?;
    let transcript =
        transcript.ok_or_else(|| ApiError::body_field("transcript", "field required"))?;
    let (file_name, audio) = file.ok_or_else(|| ApiError::body_field("file", "field required"))?;

    let job = state
        .trainer
        .submit(TrainingUpload {
            name,
            transcript,
            file_name,
            audio,
        })
        .await?;

    Ok(Json(TrainResponse { id: job.id }))
}

/// `GET /train/:id`
pub async fn get_job(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
) -> Result<Json<TrainingJob>, ApiError> {
    state
        .trainer
        .jobs()
        .get(&id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("training job {} not found", id)))
}

fn form_error(err: MultipartError) -> ApiError {
    ApiError::Validation {
        loc: vec!["body".to_string()],
        message: err.body_text(),
    }
}
