//! Application state shared by all handlers. Built once at startup and never
//! mutated.

use std::sync::Arc;

use letterbox_core::{AppError, Config, ServiceContext};
use letterbox_services::LetterUploadService;
use uuid::Uuid;

pub struct AppState {
    pub config: Arc<Config>,
    pub uploads: LetterUploadService,
}

impl AppState {
    pub fn new(config: Config, uploads: LetterUploadService) -> Self {
        Self {
            config: Arc::new(config),
            uploads,
        }
    }

    /// Resolve the service a request is made on behalf of.
    pub async fn service_context(&self, service_id: Uuid) -> Result<ServiceContext, AppError> {
        self.uploads
            .gateways()
            .directory
            .get_service(service_id)
            .await
    }
}
