use std::time::Duration;

use async_trait::async_trait;
use galley_core::{LocalOnlyReason, PublishOutcome, ScanEvent};
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use tokio::time::timeout;
use tracing::{debug, instrument, warn};

use crate::error::PublishError;
use crate::publisher::EventPublisher;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Posts scan events to `{base_url}/scanner`.
pub struct HttpPublisher {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpPublisher {
    /// Creates a publisher with the default 5 second budget.
    pub fn new(base_url: impl Into<String>) -> Result<Self, PublishError> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(
        base_url: impl Into<String>,
        budget: Duration,
    ) -> Result<Self, PublishError> {
        let base_url = base_url.into();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(PublishError::InvalidBaseUrl(base_url));
        }
        let http = reqwest::Client::builder().timeout(budget).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: budget,
        })
    }

    pub fn endpoint(&self) -> String {
        format!("{}/scanner", self.base_url)
    }

    async fn send(
        &self,
        event: &ScanEvent,
        auth_token: Option<&str>,
    ) -> Result<PublishOutcome, reqwest::Error> {
        let mut request = self
            .http
            .post(self.endpoint())
            .header(CONTENT_TYPE, "application/json")
            .json(event);
        if let Some(token) = auth_token {
            request = request.header(AUTHORIZATION, format!("Bearer {token}"));
        }

        let response = request.send().await?;
        let status = response.status();
        if status == StatusCode::OK || status == StatusCode::CREATED {
            let body = response.text().await?;
            debug!(status = status.as_u16(), "scan event accepted");
            Ok(PublishOutcome::Sent(body))
        } else {
            warn!(status = status.as_u16(), "scan event rejected by server");
            Ok(PublishOutcome::SentWithServerError(status.as_u16()))
        }
    }
}

fn classify(error: &reqwest::Error) -> LocalOnlyReason {
    if error.is_timeout() {
        LocalOnlyReason::Timeout
    } else if error.is_connect() {
        LocalOnlyReason::Offline
    } else {
        LocalOnlyReason::Exception
    }
}

#[async_trait]
impl EventPublisher for HttpPublisher {
    #[instrument(skip(self, event, auth_token), fields(qr_code = %event.qr_code))]
    async fn publish(&self, event: &ScanEvent, auth_token: Option<&str>) -> PublishOutcome {
        match timeout(self.timeout, self.send(event, auth_token)).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                let reason = classify(&e);
                warn!(error = %e, %reason, "scan event kept local");
                PublishOutcome::LocalOnly(reason)
            }
            Err(_) => {
                warn!(budget_ms = self.timeout.as_millis() as u64, "scan event timed out");
                PublishOutcome::LocalOnly(LocalOnlyReason::Timeout)
            }
        }
    }
}
