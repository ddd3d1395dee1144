use std::time::Duration;

use anyhow::{Context, Result};

use super::{ServerResponse, SubmissionSink, SyncError};
use crate::{log_error, log_info, models::SubmissionInput, settings::SyncSettings};

const ENABLE_LOGS: bool = true;

pub const CONTACT_PATH: &str = "/api/contact";
const USER_AGENT: &str = concat!("contact-ledger/", env!("CARGO_PKG_VERSION"));

/// Posts submissions as JSON to `{base_url}/api/contact`.
pub struct HttpSubmissionSink {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpSubmissionSink {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            client,
            endpoint: endpoint_url(base_url),
        })
    }

    pub fn from_settings(settings: &SyncSettings) -> Result<Self> {
        Self::new(&settings.base_url, Duration::from_secs(settings.timeout_secs))
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn post(&self, input: &SubmissionInput) -> Result<ServerResponse, SyncError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(input)
            .send()
            .await
            .map_err(SyncError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SyncError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response.json().await.map_err(SyncError::Decode)
    }
}

impl SubmissionSink for HttpSubmissionSink {
    async fn send_to_server(&self, input: &SubmissionInput) -> Result<ServerResponse, SyncError> {
        match self.post(input).await {
            Ok(body) => {
                log_info!("Forwarded submission from {} to {}", input.email, self.endpoint);
                Ok(body)
            }
            Err(err) => {
                log_error!("Failed to forward submission to {}: {err}", self.endpoint);
                Err(err)
            }
        }
    }
}

fn endpoint_url(base_url: &str) -> String {
    format!("{}{CONTACT_PATH}", base_url.trim_end_matches('/'))
}
