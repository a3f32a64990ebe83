//! Upload, preview and send of precompiled letters.

use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use letterbox_core::{
    normalize_address, AppError, FileId, LetterMetadata, PostageOption, SendPermit, SendRequest,
    ServiceContext, UploadedFile, ValidationOutcome,
};
use letterbox_processing::{count_pages, LetterValidator, PdfCheckError};
use letterbox_storage::{letter_key, Storage};

use crate::traits::{
    AntivirusGateway, NotificationDispatcher, PreviewImage, PreviewRenderer, SanitizationGateway,
    SanitizeOutcome, ServiceDirectory,
};
use crate::upload::types::{
    notification_path, preview_image_path, preview_path, upload_form_path, LetterPreview,
    PostageSelector, SendControl, SendForm, SentLetter, SubmittedSendForm, UploadOutcome,
    UploadRejection, CANNOT_SEND_HEADLINE, SEND_BUTTON_LABEL,
};

const BYTES_PER_MB: usize = 1024 * 1024;

/// The external capabilities the upload pipeline is built from.
#[derive(Clone)]
pub struct UploadGateways {
    pub storage: Arc<dyn Storage>,
    pub antivirus: Arc<dyn AntivirusGateway>,
    pub sanitizer: Arc<dyn SanitizationGateway>,
    pub renderer: Arc<dyn PreviewRenderer>,
    pub dispatcher: Arc<dyn NotificationDispatcher>,
    pub directory: Arc<dyn ServiceDirectory>,
}

/// Drives a letter from submission through preview to send.
///
/// Holds no per-request state. Every gateway call within a request is
/// awaited in turn, and any gateway error that is not a modelled rejection
/// is returned unchanged.
#[derive(Clone)]
pub struct LetterUploadService {
    gateways: UploadGateways,
    validator: LetterValidator,
}

impl LetterUploadService {
    pub fn new(gateways: UploadGateways, validator: LetterValidator) -> Self {
        Self {
            gateways,
            validator,
        }
    }

    pub fn gateways(&self) -> &UploadGateways {
        &self.gateways
    }

    /// Validate, scan, sanitise and persist a submitted letter.
    #[tracing::instrument(skip(self, ctx, file), fields(service_id = %ctx.service_id))]
    pub async fn submit_upload(
        &self,
        ctx: &ServiceContext,
        file: Option<UploadedFile>,
    ) -> Result<UploadOutcome, AppError> {
        let start = Instant::now();
        let Some(file) = file else {
            return Ok(UploadOutcome::Rejected(UploadRejection::NoFileChosen));
        };

        if let Err(e) = self.validator.validate(&file.content, file.declared_size) {
            tracing::debug!(error = %e, filename = %file.filename, "Upload failed structural checks");
            return Ok(UploadOutcome::Rejected(self.structural_rejection(&e)));
        }

        tracing::debug!(size_bytes = file.content.len(), "Scanning upload");
        if !self.gateways.antivirus.scan(&file.content).await? {
            tracing::warn!(filename = %file.filename, "Upload rejected: virus found");
            return Ok(UploadOutcome::Rejected(UploadRejection::VirusFound));
        }

        let file_id = FileId::new();
        tracing::debug!(file_id = %file_id, "Sanitising upload");
        let sanitised = self.gateways.sanitizer.sanitise(&file.content).await?;
        let (metadata, content) = match sanitised {
            SanitizeOutcome::Sanitized(letter) => {
                let Some(page_count) = letter
                    .page_count
                    .filter(|&n| n > 0)
                    .or_else(|| count_pages(&letter.content))
                else {
                    tracing::warn!(file_id = %file_id, "No page count for sanitised letter");
                    return Ok(UploadOutcome::Rejected(UploadRejection::Malformed));
                };
                let metadata = LetterMetadata::valid(
                    file_id,
                    file.filename,
                    page_count,
                    letter.recipient_address,
                );
                (metadata, letter.content)
            }
            SanitizeOutcome::Rejected(rejection) => {
                let Some(page_count) = rejection
                    .page_count
                    .filter(|&n| n > 0)
                    .or_else(|| count_pages(&file.content))
                else {
                    tracing::warn!(file_id = %file_id, "No page count for rejected letter");
                    return Ok(UploadOutcome::Rejected(UploadRejection::Malformed));
                };
                let (outcome, dropped) = ValidationOutcome::invalid(
                    rejection.message,
                    rejection.invalid_pages,
                    page_count,
                );
                if !dropped.is_empty() {
                    tracing::warn!(
                        file_id = %file_id,
                        page_count,
                        dropped = ?dropped,
                        "Ignoring invalid pages outside the document"
                    );
                }
                tracing::warn!(
                    file_id = %file_id,
                    message = ?outcome.message,
                    "Letter content rejected"
                );
                (
                    LetterMetadata::invalid(file_id, file.filename, outcome),
                    file.content,
                )
            }
        };

        self.gateways
            .storage
            .put(
                &letter_key(ctx.service_id, file_id),
                content,
                &metadata.to_tags(),
            )
            .await?;

        tracing::info!(
            file_id = %file_id,
            status = metadata.status().as_str(),
            page_count = metadata.outcome.page_count,
            duration_ms = start.elapsed().as_millis(),
            "Letter stored"
        );

        Ok(UploadOutcome::Stored {
            file_id,
            redirect: preview_path(ctx.service_id, file_id),
            metadata,
        })
    }

    /// Build the preview page for a stored letter.
    pub async fn preview(
        &self,
        ctx: &ServiceContext,
        file_id: FileId,
    ) -> Result<LetterPreview, AppError> {
        let (metadata, _) = self.load(ctx, file_id).await?;
        let is_valid = metadata.is_valid();

        let postage = if is_valid {
            let selected = self
                .gateways
                .directory
                .get_precompiled_template(ctx.service_id)
                .await?
                .and_then(|template| template.postage)
                .unwrap_or_default();
            Some(PostageSelector {
                options: PostageOption::ALL.to_vec(),
                selected,
            })
        } else {
            None
        };

        let send_control = (is_valid && ctx.can_upload_letters() && !ctx.restricted).then(|| {
            SendControl {
                file_id,
                filename: metadata.filename.clone(),
                label: SEND_BUTTON_LABEL,
            }
        });

        let headline = if ctx.restricted {
            CANNOT_SEND_HEADLINE.to_string()
        } else {
            metadata.filename.clone()
        };

        Ok(LetterPreview {
            headline,
            file_id,
            page_images: (1..=metadata.outcome.page_count)
                .map(|page| preview_image_path(ctx.service_id, file_id, page))
                .collect(),
            recipient: if is_valid {
                metadata.recipient.as_deref().map(normalize_address)
            } else {
                None
            },
            back_link: (!is_valid).then(|| upload_form_path(ctx.service_id)),
            status: metadata.status(),
            message: metadata.outcome.message.clone(),
            invalid_pages: metadata.outcome.invalid_pages.iter().copied().collect(),
            page_count: metadata.outcome.page_count,
            filename: metadata.filename,
            postage,
            send_control,
        })
    }

    /// Render one page of a stored letter.
    ///
    /// `raw_page` is parsed before anything is looked up.
    pub async fn fetch_preview_page(
        &self,
        ctx: &ServiceContext,
        file_id: FileId,
        raw_page: &str,
    ) -> Result<PreviewImage, AppError> {
        let page = match raw_page.trim().parse::<u32>() {
            Ok(page) if page > 0 => page,
            _ => {
                return Err(AppError::BadRequest(format!(
                    "Page must be a positive integer, got {:?}",
                    raw_page
                )))
            }
        };

        let (metadata, data) = self.load(ctx, file_id).await?;
        if page > metadata.outcome.page_count {
            return Err(AppError::NotFound(format!(
                "Letter {} has {} pages, no page {}",
                file_id, metadata.outcome.page_count, page
            )));
        }

        if metadata.outcome.needs_overlay(page) {
            tracing::debug!(file_id = %file_id, page, "Rendering page with overlay");
            self.gateways.renderer.render_with_overlay(&data, page).await
        } else {
            tracing::debug!(file_id = %file_id, page, "Rendering page");
            self.gateways.renderer.render_plain(&data, page).await
        }
    }

    /// Dispatch a stored letter.
    ///
    /// The service's capabilities and trial mode are checked before the
    /// letter's status is read.
    #[tracing::instrument(skip(self, ctx, form), fields(service_id = %ctx.service_id, file_id = %form.file_id))]
    pub async fn send_upload(
        &self,
        ctx: &ServiceContext,
        form: SendForm,
    ) -> Result<SentLetter, AppError> {
        let permit = ctx.send_permit()?;
        self.dispatch(ctx, permit, form).await
    }

    /// Dispatch a letter from the raw send form.
    ///
    /// The permission checks run before any field is interpreted, so a
    /// service that may not send is denied whatever it posted.
    #[tracing::instrument(skip(self, ctx, form), fields(service_id = %ctx.service_id))]
    pub async fn send_submitted(
        &self,
        ctx: &ServiceContext,
        form: SubmittedSendForm,
    ) -> Result<SentLetter, AppError> {
        let permit = ctx.send_permit()?;
        let form = form.parse()?;
        self.dispatch(ctx, permit, form).await
    }

    async fn dispatch(
        &self,
        ctx: &ServiceContext,
        permit: SendPermit,
        form: SendForm,
    ) -> Result<SentLetter, AppError> {
        let (metadata, _) = self.load(ctx, form.file_id).await?;
        if !metadata.is_valid() {
            return Err(AppError::Forbidden(format!(
                "letter {} is {}",
                form.file_id,
                metadata.status().as_str()
            )));
        }

        let request = SendRequest {
            service_id: permit.service_id(),
            filename: form.filename,
            file_id: form.file_id,
            postage: form.postage.unwrap_or_default(),
            recipient: normalize_address(metadata.recipient.as_deref().unwrap_or_default()),
        };

        let notification_id = self
            .gateways
            .dispatcher
            .send_precompiled_letter(&permit, &request)
            .await?;

        let expected = form.file_id.notification_id();
        if notification_id != expected {
            tracing::warn!(
                notification_id = %notification_id,
                "Dispatcher returned a notification id that differs from the file id"
            );
        }

        tracing::info!(file_id = %form.file_id, postage = %request.postage, "Letter sent");
        Ok(SentLetter {
            notification_id: expected,
            redirect: notification_path(ctx.service_id, expected),
        })
    }

    async fn load(
        &self,
        ctx: &ServiceContext,
        file_id: FileId,
    ) -> Result<(LetterMetadata, Bytes), AppError> {
        let object = self
            .gateways
            .storage
            .get(&letter_key(ctx.service_id, file_id))
            .await?;
        let metadata = LetterMetadata::from_tags(file_id, &object.tags)?;
        Ok((metadata, object.data))
    }

    fn structural_rejection(&self, error: &PdfCheckError) -> UploadRejection {
        match error {
            PdfCheckError::TooBig { max, .. } => UploadRejection::TooBig {
                max_size_mb: max / BYTES_PER_MB,
            },
            PdfCheckError::WrongType => UploadRejection::WrongType,
            PdfCheckError::Malformed => UploadRejection::Malformed,
        }
    }
}
