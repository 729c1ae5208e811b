//! Wire frames exchanged with WebSocket clients and publishers.

use serde::{Deserialize, Serialize};

use crate::broker::Message;
use crate::utils::Result;

/// A command sent by a client over its open connection.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum ClientCommand {
    Subscribe { value: String },
    Unsubscribe { value: String },
}

impl ClientCommand {
    pub fn topic(&self) -> &str {
        match self {
            ClientCommand::Subscribe { value } | ClientCommand::Unsubscribe { value } => value,
        }
    }
}

/// `{"error": "..."}`, sent without closing the connection.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ErrorFrame {
    pub error: String,
}

impl ErrorFrame {
    pub const DENIED: &'static str = "you aren't allowed to access the requested resource";
    pub const EXHAUSTED: &'static str = "couldn't allocate resources for this connection";

    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }

    pub fn denied() -> Self {
        Self::new(Self::DENIED)
    }

    pub fn exhausted() -> Self {
        Self::new(Self::EXHAUSTED)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Body returned by the publish endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PublishResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PublishResponse {
    pub fn accepted(message: Message) -> Self {
        Self {
            success: true,
            data: Some(message),
            error: None,
        }
    }

    pub fn rejected(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }
}
