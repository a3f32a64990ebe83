//! Builds the upload service and its gateways from configuration.

use std::sync::Arc;

use anyhow::{Context, Result};
use letterbox_core::{AntivirusBackend, Config};
use letterbox_services::{
    create_storage, AntivirusApiGateway, AntivirusGateway, ClamAvGateway, LetterUploadService,
    LetterValidator, NotifyApiClient, TemplatePreviewClient, UploadGateways,
};

fn antivirus_gateway(config: &Config) -> Result<Arc<dyn AntivirusGateway>> {
    match config.antivirus_backend {
        AntivirusBackend::ClamAv => {
            let host = config
                .clamav_host
                .clone()
                .context("CLAMAV_HOST not configured")?;
            tracing::info!(host = %host, port = config.clamav_port, "Using ClamAV antivirus");
            Ok(Arc::new(ClamAvGateway::new(
                host,
                config.clamav_port,
                config.clamav_timeout_secs,
            )))
        }
        AntivirusBackend::Http => {
            let host = config
                .antivirus_api_host
                .clone()
                .context("ANTIVIRUS_API_HOST not configured")?;
            tracing::info!(host = %host, "Using antivirus API");
            Ok(Arc::new(AntivirusApiGateway::new(
                host,
                config.antivirus_api_key.clone(),
                config.http_timeout_secs,
            )?))
        }
    }
}

pub async fn initialize_services(config: &Config) -> Result<LetterUploadService> {
    let storage = create_storage(config)
        .await
        .context("Failed to initialize storage")?;
    tracing::info!(backend = %storage.backend_type(), "Storage initialized");

    let template_preview = Arc::new(TemplatePreviewClient::new(
        config
            .template_preview_api_host
            .clone()
            .context("TEMPLATE_PREVIEW_API_HOST not configured")?,
        config.template_preview_api_key.clone(),
        config.http_timeout_secs,
    )?);
    let notify_api = Arc::new(NotifyApiClient::new(
        config
            .notify_api_host
            .clone()
            .context("NOTIFY_API_HOST not configured")?,
        config.notify_api_key.clone(),
        config.http_timeout_secs,
    )?);

    let gateways = UploadGateways {
        storage,
        antivirus: antivirus_gateway(config)?,
        sanitizer: template_preview.clone(),
        renderer: template_preview,
        dispatcher: notify_api.clone(),
        directory: notify_api,
    };

    Ok(LetterUploadService::new(
        gateways,
        LetterValidator::new(config.max_letter_size_bytes),
    ))
}
