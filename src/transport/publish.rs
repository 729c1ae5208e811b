use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use tracing::debug;

use crate::broker::Message;
use crate::transport::message::PublishResponse;
use crate::transport::server::AppState;

/// `POST <publish_endpoint>` with a JSON [`Message`] body.
///
/// Replies with the message as the broker stamped it, regardless of how many
/// subscribers were reached.
pub async fn publish_handler(
    State(state): State<AppState>,
    body: Result<Json<Message>, JsonRejection>,
) -> impl IntoResponse {
    let message = match body {
        Ok(Json(message)) => message,
        Err(rejection) => {
            debug!(error = %rejection.body_text(), "rejecting publish");
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(PublishResponse::rejected(rejection.body_text())),
            );
        }
    };

    if message.topic.trim().is_empty() {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(PublishResponse::rejected("topic must not be empty")),
        );
    }

    let topic = message.topic.clone();
    let fan_out = state.broker.broadcast(message, &topic);
    debug!(
        %topic,
        delivered = fan_out.delivered,
        dropped = fan_out.dropped,
        "published message"
    );

    (
        StatusCode::OK,
        Json(PublishResponse::accepted((*fan_out.message).clone())),
    )
}
