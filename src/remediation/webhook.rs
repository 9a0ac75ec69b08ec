//! Alert-only remediation: POST the incident to an external endpoint.

use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use url::Url;

use crate::config::WebhookConfig;
use crate::remediation::{RemediationError, RemediationTarget, Remediator};

/// Alert body sent to the webhook.
#[derive(Debug, Serialize)]
struct Alert<'a> {
    source: &'static str,
    action: &'static str,
    target: &'a RemediationTarget,
    /// Seconds since the Unix epoch.
    detected_at: u64,
}

pub struct WebhookRemediator {
    client: Client,
    url: Url,
}

impl WebhookRemediator {
    pub fn new(config: &WebhookConfig) -> Result<Self, RemediationError> {
        let url = Url::parse(&config.url).map_err(|e| RemediationError::InvalidEndpoint {
            url: config.url.clone(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            client: Client::new(),
            url,
        })
    }
}

#[async_trait]
impl Remediator for WebhookRemediator {
    fn name(&self) -> &'static str {
        "webhook"
    }

    async fn remediate(&self, target: &RemediationTarget) -> Result<(), RemediationError> {
        let alert = Alert {
            source: "loop-breaker",
            action: "runaway_event_loop",
            target,
            detected_at: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
        };

        let response = self.client.post(self.url.clone()).json(&alert).send().await?;
        let status = response.status();
        if status.is_success() {
            tracing::info!(namespace = %target, url = %self.url, "Runaway loop alert delivered");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(RemediationError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}
