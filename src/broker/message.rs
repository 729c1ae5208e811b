//! Message definitions for the broker
//!
//! `Message` is both the publish body and the item queued in every
//! subscriber's inbox.
//!
//! Notes on fields:
//! - `topic`: topic name used for routing; overwritten by the broker with the
//!   topic the message was actually broadcast to
//! - `payload`: arbitrary JSON supplied by the publisher
//! - `recipients` (`"to"` on the wire): identity keys allowed to see the
//!   message; empty means public. Never written to a subscriber connection.
//! - `time`: set by the broker at broadcast time; never read from input

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub payload: serde_json::Value,
    #[serde(
        default,
        rename = "to",
        deserialize_with = "null_as_empty",
        skip_serializing_if = "BTreeSet::is_empty"
    )]
    pub recipients: BTreeSet<String>,
    #[serde(default, skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub time: Option<DateTime<Utc>>,
}

/// `"to": null` reads as no recipients, the same as omitting the field.
fn null_as_empty<'de, D>(deserializer: D) -> Result<BTreeSet<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<BTreeSet<String>>::deserialize(deserializer)?.unwrap_or_default())
}

impl Message {
    pub fn new(topic: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            topic: topic.into(),
            payload,
            ..Self::default()
        }
    }

    /// Restrict the message to the given identity keys.
    pub fn to<I, K>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        self.recipients = keys.into_iter().map(Into::into).collect();
        self
    }

    pub fn is_public(&self) -> bool {
        self.recipients.is_empty()
    }
}
