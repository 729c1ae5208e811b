//! The `authorizer` module decides whether a client may connect, disconnect,
//! subscribe or unsubscribe.
//!
//! Sessions only ever see the boolean contract of [`Authorizer::decide`].
//! Whatever transport sits behind it must resolve to `true` or `false`, and
//! failures resolve to `false`.

pub mod event;
pub mod webhook;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

pub use event::{Action, Event};
pub use webhook::WebhookAuthorizer;

use crate::config::AuthorizerSettings;
use crate::utils::Result;

#[async_trait]
pub trait Authorizer: Send + Sync {
    /// Returns `true` when the action described by `event` may proceed.
    async fn decide(&self, event: &Event) -> bool;
}

/// Allows everything. Used when no webhook is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct AllowAll;

#[async_trait]
impl Authorizer for AllowAll {
    async fn decide(&self, _event: &Event) -> bool {
        true
    }
}

/// Build the authorizer described by the configuration.
pub fn from_settings(settings: &AuthorizerSettings) -> Result<Arc<dyn Authorizer>> {
    match settings.webhook_url.as_deref().map(str::trim) {
        Some(url) if !url.is_empty() => {
            let webhook = WebhookAuthorizer::new(url, settings.timeout(), settings.actions())?;
            info!(url = webhook.url(), "authorizing through webhook");
            Ok(Arc::new(webhook))
        }
        _ => {
            info!("no webhook configured, allowing every action");
            Ok(Arc::new(AllowAll))
        }
    }
}
