//! Webhook authorizer
//!
//! Every gated event is POSTed as JSON to a configured URL. A 2xx response
//! allows the action. Any other status, a transport error or a timeout
//! denies it.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::authorizer::{Action, Authorizer, Event};
use crate::utils::{GatewayError, Result};

pub struct WebhookAuthorizer {
    client: reqwest::Client,
    url: String,
    actions: HashSet<Action>,
}

impl WebhookAuthorizer {
    /// `actions` lists the events forwarded to the webhook; the rest are
    /// allowed without a callout.
    ///
    /// Fails when the HTTP client cannot be built; the timeout is never
    /// silently dropped.
    pub fn new(
        url: impl Into<String>,
        timeout: Duration,
        actions: HashSet<Action>,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("subgate/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| GatewayError::Transport(format!("cannot build webhook client: {e}")))?;

        Ok(Self {
            client,
            url: url.into(),
            actions,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Authorizer for WebhookAuthorizer {
    async fn decide(&self, event: &Event) -> bool {
        if !self.actions.contains(&event.action) {
            return true;
        }

        match self.client.post(&self.url).json(event).send().await {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                debug!(
                    action = %event.action,
                    key = %event.key,
                    status = response.status().as_u16(),
                    "webhook denied event"
                );
                false
            }
            Err(e) => {
                warn!(
                    action = %event.action,
                    key = %event.key,
                    error = %e,
                    "webhook callout failed, denying"
                );
                false
            }
        }
    }
}

impl std::fmt::Debug for WebhookAuthorizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookAuthorizer")
            .field("url", &self.url)
            .field("actions", &self.actions)
            .finish()
    }
}
