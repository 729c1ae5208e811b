use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A state-changing client action that must be authorized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Connect,
    Disconnect,
    Subscribe,
    Unsubscribe,
}

impl Action {
    pub const ALL: [Action; 4] = [
        Action::Connect,
        Action::Disconnect,
        Action::Subscribe,
        Action::Unsubscribe,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Action::Connect => "connect",
            Action::Disconnect => "disconnect",
            Action::Subscribe => "subscribe",
            Action::Unsubscribe => "unsubscribe",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "connect" => Ok(Action::Connect),
            "disconnect" => Ok(Action::Disconnect),
            "subscribe" => Ok(Action::Subscribe),
            "unsubscribe" => Ok(Action::Unsubscribe),
            other => Err(format!("unknown action '{other}'")),
        }
    }
}

/// What the authorizer is asked about. Never persisted.
///
/// `value` carries the topic for subscribe/unsubscribe and is absent
/// otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub action: Action,
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl Event {
    pub fn connect(key: impl Into<String>) -> Self {
        Self {
            action: Action::Connect,
            key: key.into(),
            value: None,
        }
    }

    pub fn disconnect(key: impl Into<String>) -> Self {
        Self {
            action: Action::Disconnect,
            key: key.into(),
            value: None,
        }
    }

    pub fn subscribe(key: impl Into<String>, topic: impl Into<String>) -> Self {
        Self {
            action: Action::Subscribe,
            key: key.into(),
            value: Some(topic.into()),
        }
    }

    pub fn unsubscribe(key: impl Into<String>, topic: impl Into<String>) -> Self {
        Self {
            action: Action::Unsubscribe,
            key: key.into(),
            value: Some(topic.into()),
        }
    }
}
