use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use letterbox_core::FileId;
use letterbox_services::LetterPreview;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::HttpAppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    /// Kept as text so that a non-integer page is reported by the pipeline.
    #[serde(default)]
    page: String,
}

#[tracing::instrument(skip(state), fields(service_id = %service_id, file_id = %file_id))]
pub async fn preview_letter(
    State(state): State<Arc<AppState>>,
    Path((service_id, file_id)): Path<(Uuid, FileId)>,
) -> Result<Json<LetterPreview>, HttpAppError> {
    let ctx = state.service_context(service_id).await?;
    let preview = state.uploads.preview(&ctx, file_id).await?;
    Ok(Json(preview))
}

pub async fn preview_letter_image(
    State(state): State<Arc<AppState>>,
    Path((service_id, file_id)): Path<(Uuid, FileId)>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, HttpAppError> {
    let ctx = state.service_context(service_id).await?;
    let image = state
        .uploads
        .fetch_preview_page(&ctx, file_id, &query.page)
        .await?;
    Ok(([(header::CONTENT_TYPE, image.content_type)], image.content))
}
