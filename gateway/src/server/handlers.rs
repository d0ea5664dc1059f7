//! HTTP request handlers

use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::Serialize;

use crate::errors::PipelineError;
use crate::pipeline::UploadRequest;
use crate::server::state::ServerState;
use crate::utils::version_info;

/// Successful upload response: the merged archive, base64-encoded.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub terraform_files: String,
}

/// Error body for failed requests.
///
/// Upload validation failures carry only `error`; pipeline failures also
/// name the stage that failed and the failure category.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<&'static str>,
}

impl ErrorResponse {
    fn bare(error: String) -> Self {
        Self {
            error,
            stage: None,
            cause: None,
        }
    }
}

/// Upload handler: multipart upload in, merged archive out.
pub async fn upload_handler(
    State(state): State<Arc<ServerState>>,
    multipart: Multipart,
) -> Response {
    let request = match read_upload(multipart).await {
        Ok(request) => request,
        Err((status, message)) => {
            return (status, Json(ErrorResponse::bare(message))).into_response()
        }
    };

    match state.pipeline.execute(request).await {
        Ok(merged) => (
            StatusCode::OK,
            Json(UploadResponse {
                terraform_files: BASE64.encode(&merged),
            }),
        )
            .into_response(),
        Err(error) => error_response(&error),
    }
}

/// Pull the archive and the optional instruction out of the multipart body.
async fn read_upload(mut multipart: Multipart) -> Result<UploadRequest, (StatusCode, String)> {
    let mut archive = None;
    let mut filename = None;
    let mut instruction = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return Err((e.status(), format!("unreadable multipart body: {}", e))),
        };

        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("repo_zip") => {
                filename = field.file_name().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| (e.status(), format!("failed to read repo_zip: {}", e)))?;
                archive = Some(bytes);
            }
            Some("instruction") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| (e.status(), format!("failed to read instruction: {}", e)))?;
                instruction = Some(text);
            }
            // Unknown fields are dropped unread.
            _ => {}
        }
    }

    let archive =
        archive.ok_or_else(|| (StatusCode::BAD_REQUEST, "No file uploaded.".to_string()))?;

    Ok(UploadRequest {
        archive,
        filename: filename.unwrap_or_else(|| "upload.zip".to_string()),
        instruction,
    })
}

fn error_response(error: &PipelineError) -> Response {
    let status = match error {
        PipelineError::Validation(_) => StatusCode::BAD_REQUEST,
        PipelineError::Stage(_) => StatusCode::BAD_GATEWAY,
        PipelineError::Merge(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
            stage: Some(error.stage()),
            cause: Some(error.cause()),
        }),
    )
        .into_response()
}

/// Gateway liveness handler
pub async fn root_handler() -> impl IntoResponse {
    "terragate is running"
}

/// Aggregated backend health handler
///
/// Always 200; the per-backend verdicts are the payload.
pub async fn health_handler(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    let report = state.prober.probe(&state.probe_targets).await;
    Json(report)
}

/// Version response
#[derive(Debug, Serialize)]
pub struct VersionResponse {
    pub version: String,
    pub git_hash: String,
    pub build_time: String,
}

/// Version handler
pub async fn version_handler() -> impl IntoResponse {
    let version = version_info();
    Json(VersionResponse {
        version: version.version,
        git_hash: version.git_hash,
        build_time: version.build_time,
    })
}
