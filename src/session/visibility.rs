//! Per-message visibility, evaluated at delivery time.
//!
//! The broker fans out by topic alone, so an inbox may hold messages
//! addressed to someone else. They are consumed here and never written.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::broker::Message;
use crate::utils::Result;

/// A message is visible to `key` when it is public or `key` is a recipient.
pub fn is_visible(message: &Message, key: &str) -> bool {
    message.is_public() || message.recipients.contains(key)
}

/// What a subscriber receives: never the recipients.
#[derive(Debug, Serialize)]
struct Delivery<'a> {
    topic: &'a str,
    payload: &'a serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    time: Option<DateTime<Utc>>,
}

/// Serialize `message` for a client connection.
pub fn render(message: &Message) -> Result<String> {
    let delivery = Delivery {
        topic: &message.topic,
        payload: &message.payload,
        time: message.time,
    };
    Ok(serde_json::to_string(&delivery)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    #[test]
    fn test_public_messages_are_visible_to_everyone() {
        let msg = Message::new("chat", json!("hi"));
        assert!(is_visible(&msg, "alice"));
        assert!(is_visible(&msg, "Anonymous#123"));
    }

    #[test]
    fn test_addressed_messages_are_visible_to_recipients_only() {
        let msg = Message::new("chat", json!("secret")).to(["bob", "carol"]);
        assert!(is_visible(&msg, "bob"));
        assert!(is_visible(&msg, "carol"));
        assert!(!is_visible(&msg, "alice"));
        assert!(!is_visible(&msg, "Bob"));
    }

    #[test]
    fn test_render_strips_recipients() {
        let mut msg = Message::new("chat", json!({"text": "secret"})).to(["bob"]);
        msg.time = Some(Utc::now());

        let value: Value = serde_json::from_str(&render(&msg).unwrap()).unwrap();
        let fields = value.as_object().unwrap();
        assert_eq!(fields.len(), 3);
        assert_eq!(value["topic"], "chat");
        assert_eq!(value["payload"], json!({"text": "secret"}));
        assert!(value["time"].is_string());
        assert!(!fields.contains_key("to"));
        assert!(!fields.contains_key("recipients"));
    }
}
