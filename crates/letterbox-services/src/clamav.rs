use async_trait::async_trait;
use bytes::Bytes;
use clamav_client::{clean, Tcp};
use letterbox_core::AppError;
use std::str;
use std::time::{Duration, Instant};

use crate::traits::AntivirusGateway;

const GATEWAY: &str = "clamav";

/// Antivirus gateway backed by a clamd daemon over TCP.
///
/// Daemon errors and timeouts are returned as errors. A scan that could not
/// complete never counts as clean.
#[derive(Clone, Debug)]
pub struct ClamAvGateway {
    host: String,
    port: u16,
    /// Timeout in seconds for each scan operation
    timeout_secs: u64,
}

impl ClamAvGateway {
    /// # Arguments
    /// * `host` - ClamAV daemon hostname
    /// * `port` - ClamAV daemon port (typically 3310)
    /// * `timeout_secs` - Upper bound on one scan
    pub fn new(host: String, port: u16, timeout_secs: u64) -> Self {
        Self {
            host,
            port,
            timeout_secs,
        }
    }

    fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Pull the signature name out of a `stream: Eicar-Signature FOUND` reply.
    fn virus_name(response: &[u8]) -> String {
        let response_str = str::from_utf8(response)
            .map(|s| s.trim_end_matches('\0').trim())
            .unwrap_or("unknown");
        response_str
            .split(':')
            .nth(1)
            .and_then(|s| s.split_whitespace().next())
            .unwrap_or("unknown")
            .to_string()
    }

    /// Run a blocking clamd call on the blocking pool under the scan timeout.
    async fn run_blocking<T, F>(&self, what: &'static str, f: F) -> Result<T, AppError>
    where
        T: Send + 'static,
        F: FnOnce(String) -> std::io::Result<T> + Send + 'static,
    {
        let address = self.address();
        let timeout_secs = self.timeout_secs;
        let result = tokio::time::timeout(
            Duration::from_secs(timeout_secs),
            tokio::task::spawn_blocking(move || f(address)),
        )
        .await;

        match result {
            Ok(Ok(Ok(value))) => Ok(value),
            Ok(Ok(Err(e))) => Err(AppError::gateway(
                GATEWAY,
                format!("ClamAV {} error: {}", what, e),
            )),
            Ok(Err(e)) => Err(AppError::gateway(
                GATEWAY,
                format!("ClamAV {} task join error: {}", what, e),
            )),
            Err(_) => Err(AppError::gateway(
                GATEWAY,
                format!("ClamAV {} timeout (exceeded {} seconds)", what, timeout_secs),
            )),
        }
    }
}

#[async_trait]
impl AntivirusGateway for ClamAvGateway {
    /// Uses the sync client inside spawn_blocking to avoid !Send futures.
    async fn scan(&self, data: &Bytes) -> Result<bool, AppError> {
        let start = Instant::now();
        tracing::debug!(host = %self.host, port = %self.port, "Starting ClamAV scan");
        let data = data.clone();

        let response = self
            .run_blocking("scan", move |address| {
                let connection = Tcp {
                    host_address: address.as_str(),
                };
                clamav_client::scan_buffer(&data, connection, None)
            })
            .await
            .inspect_err(|e| tracing::error!(error = %e, "ClamAV scan failed"))?;

        let is_clean = clean(&response).map_err(|e| {
            AppError::gateway(GATEWAY, format!("Failed to parse ClamAV response: {}", e))
        })?;

        if is_clean {
            tracing::info!(
                duration_ms = start.elapsed().as_millis(),
                "File scan completed: clean"
            );
        } else {
            tracing::warn!(
                duration_ms = start.elapsed().as_millis(),
                virus = %Self::virus_name(&response),
                "File scan detected virus"
            );
        }
        Ok(is_clean)
    }

    async fn health_check(&self) -> Result<(), AppError> {
        let response = self
            .run_blocking("ping", move |address| {
                clamav_client::ping(Tcp {
                    host_address: address.as_str(),
                })
            })
            .await?;

        if response == clamav_client::PONG {
            Ok(())
        } else {
            Err(AppError::gateway(
                GATEWAY,
                format!(
                    "Unexpected ping response: {}",
                    String::from_utf8_lossy(&response)
                ),
            ))
        }
    }
}
