use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::Redirect,
    Form,
};
use letterbox_services::SubmittedSendForm;
use uuid::Uuid;

use crate::error::HttpAppError;
use crate::state::AppState;

/// Fields are taken as text and interpreted only after the service is
/// allowed to send.
#[tracing::instrument(skip(state, form), fields(service_id = %service_id))]
pub async fn send_letter(
    State(state): State<Arc<AppState>>,
    Path(service_id): Path<Uuid>,
    Form(form): Form<SubmittedSendForm>,
) -> Result<Redirect, HttpAppError> {
    let ctx = state.service_context(service_id).await?;
    let sent = state.uploads.send_submitted(&ctx, form).await?;
    Ok(Redirect::to(&sent.redirect))
}
