//! Subscribe endpoint: authorizes the connection, upgrades it and runs a
//! [`Session`] over the socket.

use std::future;

use axum::Json;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::session::{Session, anonymous_key};
use crate::transport::server::AppState;
use crate::utils::{GatewayError, Result};

pub const CONNECT_DENIED: &str = "you aren't allowed to access this resource";

#[derive(Debug, Default, Deserialize)]
pub struct SubscribeParams {
    pub key: Option<String>,
}

/// `GET /subscribe?key=<k>`.
pub async fn subscribe_handler(
    State(state): State<AppState>,
    Query(params): Query<SubscribeParams>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    let origin = headers
        .get(header::ORIGIN)
        .and_then(|value| value.to_str().ok());
    if !origin_allowed(&state.settings.origins(), origin) {
        info!(origin = origin.unwrap_or_default(), "rejecting cross-origin upgrade");
        return (StatusCode::FORBIDDEN, Json(CONNECT_DENIED)).into_response();
    }

    let key = params
        .key
        .filter(|key| !key.is_empty())
        .unwrap_or_else(anonymous_key);

    let session = match Session::connect(key, state.session_context()).await {
        Ok(session) => session,
        Err(e) => {
            debug!(error = %e, "upgrade refused");
            return (StatusCode::FORBIDDEN, Json(CONNECT_DENIED)).into_response();
        }
    };

    ws.on_upgrade(move |socket| run_session(session, socket))
}

async fn run_session(session: Session, socket: WebSocket) {
    let key = session.key().to_string();
    let (sink, stream) = socket.split();

    let writer = sink
        .sink_map_err(|e| GatewayError::Transport(e.to_string()))
        .with(|text: String| future::ready(Ok::<_, GatewayError>(Message::Text(text.into()))));
    let reader = stream.filter_map(|frame| future::ready(client_text(frame)));

    match session.serve(writer, reader).await {
        Ok(()) => debug!(%key, "connection finished"),
        Err(GatewayError::ResourceExhausted(e)) => warn!(%key, error = %e, "connection dropped"),
        Err(e) => debug!(%key, error = %e, "connection ended with error"),
    }
}

/// Text carried by a client frame. Control frames carry none.
fn client_text(frame: std::result::Result<Message, axum::Error>) -> Option<Result<String>> {
    match frame {
        Ok(Message::Text(text)) => Some(Ok(text.to_string())),
        Ok(Message::Binary(bytes)) => Some(Ok(String::from_utf8_lossy(&bytes).into_owned())),
        Ok(Message::Ping(_) | Message::Pong(_) | Message::Close(_)) => None,
        Err(e) => Some(Err(GatewayError::Transport(e.to_string()))),
    }
}

/// Requests without an `Origin` header are not browser cross-origin requests
/// and are always allowed.
pub fn origin_allowed(allowed: &[String], origin: Option<&str>) -> bool {
    let Some(origin) = origin else {
        return true;
    };
    allowed
        .iter()
        .any(|candidate| candidate == "*" || candidate.eq_ignore_ascii_case(origin))
}
