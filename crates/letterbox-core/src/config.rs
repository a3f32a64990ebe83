//! Configuration module
//!
//! Settings for the HTTP server, letter storage and the external services the
//! upload pipeline talks to (antivirus, template preview, notification API).

use std::env;

use crate::storage_types::{AntivirusBackend, StorageBackend};

const SERVER_PORT: u16 = 6012;
const MAX_LETTER_SIZE_MB: usize = 2;
const CLAMAV_PORT: u16 = 3310;
const CLAMAV_TIMEOUT_SECS: u64 = 30;
const HTTP_TIMEOUT_SECS: u64 = 30;

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub server_port: u16,
    pub environment: String,
    /// Upper bound on an uploaded letter, in bytes.
    pub max_letter_size_bytes: usize,
    // Storage configuration
    pub storage_backend: StorageBackend,
    pub local_storage_path: Option<String>,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>, // Custom endpoint for S3-compatible providers (MinIO etc.)
    // Antivirus configuration
    pub antivirus_backend: AntivirusBackend,
    pub antivirus_api_host: Option<String>,
    pub antivirus_api_key: String,
    pub clamav_host: Option<String>,
    pub clamav_port: u16,
    pub clamav_timeout_secs: u64,
    // Downstream APIs
    pub template_preview_api_host: Option<String>,
    pub template_preview_api_key: String,
    pub notify_api_host: Option<String>,
    pub notify_api_key: String,
    pub http_timeout_secs: u64,
    // Logging and build info
    pub log_format: String,
    pub app_build: Option<String>,
    pub app_built_at: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: SERVER_PORT,
            environment: "development".to_string(),
            max_letter_size_bytes: MAX_LETTER_SIZE_MB * 1024 * 1024,
            storage_backend: StorageBackend::Local,
            local_storage_path: None,
            s3_bucket: None,
            s3_region: None,
            s3_endpoint: None,
            antivirus_backend: AntivirusBackend::Http,
            antivirus_api_host: None,
            antivirus_api_key: String::new(),
            clamav_host: None,
            clamav_port: CLAMAV_PORT,
            clamav_timeout_secs: CLAMAV_TIMEOUT_SECS,
            template_preview_api_host: None,
            template_preview_api_key: String::new(),
            notify_api_host: None,
            notify_api_key: String::new(),
            http_timeout_secs: HTTP_TIMEOUT_SECS,
            log_format: "text".to_string(),
            app_build: None,
            app_built_at: None,
        }
    }
}

fn non_empty(var: &str) -> Option<String> {
    env::var(var).ok().filter(|s| !s.trim().is_empty())
}

impl Config {
    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn json_logs(&self) -> bool {
        self.log_format.eq_ignore_ascii_case("json")
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let max_letter_size_mb = env::var("MAX_LETTER_SIZE_MB")
            .unwrap_or_else(|_| MAX_LETTER_SIZE_MB.to_string())
            .parse::<usize>()
            .unwrap_or(MAX_LETTER_SIZE_MB);

        let storage_backend = match non_empty("STORAGE_BACKEND") {
            Some(s) => s.parse::<StorageBackend>()?,
            None => StorageBackend::Local,
        };

        let antivirus_backend = match non_empty("ANTIVIRUS_BACKEND") {
            Some(s) => s.parse::<AntivirusBackend>()?,
            None => AntivirusBackend::Http,
        };

        let config = Config {
            server_port: env::var("PORT")
                .unwrap_or_else(|_| SERVER_PORT.to_string())
                .parse()
                .unwrap_or(SERVER_PORT),
            environment: env::var("ENVIRONMENT")
                .or_else(|_| env::var("APP_ENV"))
                .unwrap_or_else(|_| "development".to_string()),
            max_letter_size_bytes: max_letter_size_mb * 1024 * 1024,
            storage_backend,
            local_storage_path: non_empty("LOCAL_STORAGE_PATH"),
            s3_bucket: non_empty("S3_BUCKET"),
            s3_region: non_empty("S3_REGION").or_else(|| non_empty("AWS_REGION")),
            s3_endpoint: non_empty("S3_ENDPOINT"),
            antivirus_backend,
            antivirus_api_host: non_empty("ANTIVIRUS_API_HOST"),
            antivirus_api_key: env::var("ANTIVIRUS_API_KEY").unwrap_or_default(),
            clamav_host: non_empty("CLAMAV_HOST"),
            clamav_port: env::var("CLAMAV_PORT")
                .unwrap_or_else(|_| CLAMAV_PORT.to_string())
                .parse()
                .unwrap_or(CLAMAV_PORT),
            clamav_timeout_secs: env::var("CLAMAV_TIMEOUT_SECS")
                .unwrap_or_else(|_| CLAMAV_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(CLAMAV_TIMEOUT_SECS),
            template_preview_api_host: non_empty("TEMPLATE_PREVIEW_API_HOST"),
            template_preview_api_key: env::var("TEMPLATE_PREVIEW_API_KEY").unwrap_or_default(),
            notify_api_host: non_empty("NOTIFY_API_HOST"),
            notify_api_key: env::var("NOTIFY_API_KEY").unwrap_or_default(),
            http_timeout_secs: env::var("HTTP_TIMEOUT_SECS")
                .unwrap_or_else(|_| HTTP_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(HTTP_TIMEOUT_SECS),
            log_format: env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string()),
            app_build: non_empty("APP_BUILD"),
            app_built_at: non_empty("APP_BUILT_AT"),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.max_letter_size_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_LETTER_SIZE_MB must be greater than 0"));
        }

        match self.storage_backend {
            StorageBackend::S3 => {
                if self.s3_bucket.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_BUCKET must be set when using S3 storage backend"
                    ));
                }
                if self.s3_region.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_REGION or AWS_REGION must be set when using S3 storage backend"
                    ));
                }
            }
            StorageBackend::Local => {
                if self.local_storage_path.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_PATH must be set when using local storage backend"
                    ));
                }
            }
        }

        match self.antivirus_backend {
            AntivirusBackend::ClamAv if self.clamav_host.is_none() => {
                return Err(anyhow::anyhow!(
                    "CLAMAV_HOST must be set when ANTIVIRUS_BACKEND=clamav"
                ));
            }
            AntivirusBackend::Http if self.antivirus_api_host.is_none() => {
                return Err(anyhow::anyhow!(
                    "ANTIVIRUS_API_HOST must be set when ANTIVIRUS_BACKEND=http"
                ));
            }
            _ => {}
        }

        if self.template_preview_api_host.is_none() {
            return Err(anyhow::anyhow!("TEMPLATE_PREVIEW_API_HOST must be set"));
        }
        if self.notify_api_host.is_none() {
            return Err(anyhow::anyhow!("NOTIFY_API_HOST must be set"));
        }

        if self.is_production() {
            let mut keys = vec![
                ("TEMPLATE_PREVIEW_API_KEY", &self.template_preview_api_key),
                ("NOTIFY_API_KEY", &self.notify_api_key),
            ];
            if self.antivirus_backend == AntivirusBackend::Http {
                keys.push(("ANTIVIRUS_API_KEY", &self.antivirus_api_key));
            }
            if let Some((name, _)) = keys.iter().find(|(_, key)| key.trim().is_empty()) {
                return Err(anyhow::anyhow!("{} must not be empty in production", name));
            }
        }

        Ok(())
    }
}
