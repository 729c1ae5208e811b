//! Subscriber handle
//!
//! A `Subscriber` is the receiving half of one connection's mailbox. The
//! broker keeps the sending half (and the subscriber's topic set) in its
//! registry; the session that called `Broker::attach` owns this half for the
//! whole life of the connection.

use std::sync::Arc;

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::broker::message::Message;
use crate::broker::topic::SubscriberId;

#[derive(Debug)]
pub struct Subscriber {
    id: SubscriberId,
    inbox: mpsc::Receiver<Arc<Message>>,
}

impl Subscriber {
    pub(crate) fn new(inbox: mpsc::Receiver<Arc<Message>>) -> Self {
        Self {
            id: format!("sub-{}", Uuid::new_v4()),
            inbox,
        }
    }

    pub fn id(&self) -> &SubscriberId {
        &self.id
    }

    /// Wait for the next queued message.
    ///
    /// Returns `None` once the subscriber has been detached and everything
    /// queued before that has been drained.
    pub async fn recv(&mut self) -> Option<Arc<Message>> {
        self.inbox.recv().await
    }

    /// Take a queued message without waiting.
    pub fn try_recv(&mut self) -> Option<Arc<Message>> {
        self.inbox.try_recv().ok()
    }
}
