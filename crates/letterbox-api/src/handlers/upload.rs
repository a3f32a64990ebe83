use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use letterbox_core::{AppError, UploadedFile};
use letterbox_services::{UploadOutcome, UploadRejection};
use serde::Serialize;
use uuid::Uuid;

use crate::error::HttpAppError;
use crate::state::AppState;

/// The upload form, re-rendered with the reason a file was turned away.
#[derive(Debug, Serialize)]
pub struct UploadFormView {
    pub error_code: &'static str,
    pub error_title: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
    pub form_action: String,
}

impl UploadFormView {
    fn new(service_id: Uuid, rejection: UploadRejection) -> Self {
        Self {
            error_code: rejection.code(),
            error_title: rejection.title(),
            error_detail: rejection.detail(),
            form_action: format!("/services/{}/upload-letter", service_id),
        }
    }
}

/// Read the single `file` field. An empty part with no filename means no
/// file was chosen.
async fn extract_letter_file(mut multipart: Multipart) -> Result<Option<UploadedFile>, AppError> {
    let mut file: Option<UploadedFile> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidInput(format!("Failed to read multipart: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }
        if file.is_some() {
            return Err(AppError::InvalidInput(
                "Multiple file fields are not allowed; send exactly one field named 'file'"
                    .to_string(),
            ));
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::InvalidInput(format!("Failed to read file data: {}", e)))?;

        if filename.is_empty() && data.is_empty() {
            continue;
        }
        file = Some(UploadedFile::new(filename, data));
    }

    Ok(file)
}

#[tracing::instrument(skip(state, multipart), fields(service_id = %service_id))]
pub async fn upload_letter(
    State(state): State<Arc<AppState>>,
    Path(service_id): Path<Uuid>,
    multipart: Multipart,
) -> Result<Response, HttpAppError> {
    let ctx = state.service_context(service_id).await?;
    let file = extract_letter_file(multipart).await?;

    match state.uploads.submit_upload(&ctx, file).await? {
        UploadOutcome::Stored { redirect, .. } => Ok(Redirect::to(&redirect).into_response()),
        UploadOutcome::Rejected(rejection) => {
            let status = StatusCode::from_u16(rejection.status_code())
                .unwrap_or(StatusCode::BAD_REQUEST);
            Ok((status, Json(UploadFormView::new(service_id, rejection))).into_response())
        }
    }
}
