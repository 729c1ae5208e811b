use std::future::Future;
use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tracing::info;

use crate::authorizer::{self, Authorizer};
use crate::broker::Broker;
use crate::config::{ServerSettings, Settings};
use crate::session::SessionContext;
use crate::transport::{publish, websocket};
use crate::utils::Result;

/// Shared application state passed to axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub broker: Arc<Broker>,
    pub authorizer: Arc<dyn Authorizer>,
    pub settings: Arc<ServerSettings>,
}

impl AppState {
    pub fn new(
        broker: Arc<Broker>,
        authorizer: Arc<dyn Authorizer>,
        settings: ServerSettings,
    ) -> Self {
        Self {
            broker,
            authorizer,
            settings: Arc::new(settings),
        }
    }

    /// Wire up the broker and authorizer described by `settings`.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Ok(Self::new(
            Arc::new(Broker::from_settings(&settings.broker)),
            authorizer::from_settings(&settings.authorizer)?,
            settings.server.clone(),
        ))
    }

    pub fn session_context(&self) -> SessionContext {
        SessionContext::new(self.broker.clone(), self.authorizer.clone())
    }
}

/// Build the axum router with the subscribe and publish routes.
pub fn router(state: AppState) -> Router {
    let publish_endpoint = state.settings.publish_endpoint.clone();
    Router::new()
        .route("/subscribe", get(websocket::subscribe_handler))
        .route(&publish_endpoint, post(publish::publish_handler))
        .with_state(state)
}

/// Serve on an already bound listener until `shutdown` resolves.
///
/// Open sessions are left to finish on their own; the listener stops
/// accepting as soon as shutdown begins.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    info!(
        %addr,
        publish_endpoint = %state.settings.publish_endpoint,
        "gateway listening"
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}
