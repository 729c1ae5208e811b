//! Broker engine
//!
//! This module contains the in-memory broker responsible for:
//! - allocating subscribers and their bounded inboxes
//! - maintaining the topic -> subscribers and subscriber -> topics relation
//! - fanning broadcast messages out to every subscriber of a topic
//!
//! Concurrency and usage notes:
//! - The broker is shared by reference (`Arc<Broker>`) between every session
//!   and the publish endpoint. All registry state lives behind one lock, so
//!   attach/detach/subscribe/unsubscribe are serialized against broadcast.
//! - Broadcast only performs `try_send` while holding the lock. It never
//!   waits on a slow consumer: when an inbox is full the message is dropped
//!   for that subscriber alone. Network writes happen later, in each
//!   session's own outbound loop.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

use crate::broker::message::Message;
use crate::broker::subscriber::Subscriber;
use crate::broker::topic::{SubscriberId, Topic};
use crate::config::BrokerSettings;
use crate::utils::{GatewayError, Result};

#[derive(Debug)]
struct Mailbox {
    sender: mpsc::Sender<Arc<Message>>,
    topics: HashSet<String>,
}

#[derive(Debug, Default)]
struct Registry {
    topics: HashMap<String, Topic>,
    subscribers: HashMap<SubscriberId, Mailbox>,
}

/// Outcome of a single broadcast.
#[derive(Debug, Clone)]
pub struct FanOut {
    /// The message as queued, stamped with its topic and time.
    pub message: Arc<Message>,
    /// Subscribers whose inbox accepted the message.
    pub delivered: usize,
    /// Subscribers whose inbox was full.
    pub dropped: usize,
}

#[derive(Debug)]
pub struct Broker {
    registry: Mutex<Registry>,
    max_subscribers: usize,
    inbox_capacity: usize,
}

impl Broker {
    pub const DEFAULT_MAX_SUBSCRIBERS: usize = 1000;
    pub const DEFAULT_INBOX_CAPACITY: usize = 256;

    pub fn new(max_subscribers: usize, inbox_capacity: usize) -> Self {
        Self {
            registry: Mutex::new(Registry::default()),
            max_subscribers,
            // tokio channels reject a zero capacity
            inbox_capacity: inbox_capacity.max(1),
        }
    }

    pub fn from_settings(settings: &BrokerSettings) -> Self {
        Self::new(settings.max_connections, settings.inbox_capacity)
    }

    /// Allocate a subscriber with no topics and an empty inbox.
    pub fn attach(&self) -> Result<Subscriber> {
        let mut registry = self.registry.lock();
        if registry.subscribers.len() >= self.max_subscribers {
            warn!(
                limit = self.max_subscribers,
                "refusing to attach subscriber: limit reached"
            );
            return Err(GatewayError::ResourceExhausted(format!(
                "subscriber limit of {} reached",
                self.max_subscribers
            )));
        }

        let (sender, inbox) = mpsc::channel(self.inbox_capacity);
        let subscriber = Subscriber::new(inbox);
        registry.subscribers.insert(
            subscriber.id().clone(),
            Mailbox {
                sender,
                topics: HashSet::new(),
            },
        );
        debug!(subscriber = %subscriber.id(), "attached subscriber");
        Ok(subscriber)
    }

    /// Add `topic` to the subscriber's interest set.
    ///
    /// Subscribing twice is a no-op. Returns `false` when the subscriber is
    /// not attached, in which case nothing changes.
    pub fn subscribe(&self, subscriber: &SubscriberId, topic: &str) -> bool {
        let mut registry = self.registry.lock();
        let Registry {
            topics,
            subscribers,
        } = &mut *registry;

        let Some(mailbox) = subscribers.get_mut(subscriber) else {
            debug!(%subscriber, topic, "ignoring subscribe for detached subscriber");
            return false;
        };

        mailbox.topics.insert(topic.to_string());
        topics
            .entry(topic.to_string())
            .or_insert_with(|| Topic::new(topic))
            .subscribe(subscriber.clone());
        true
    }

    /// Remove `topic` from the subscriber's interest set.
    ///
    /// Unsubscribing from a topic that is not held is a no-op. Returns
    /// `false` when the subscriber is not attached.
    pub fn unsubscribe(&self, subscriber: &SubscriberId, topic: &str) -> bool {
        let mut registry = self.registry.lock();
        let Registry {
            topics,
            subscribers,
        } = &mut *registry;

        let Some(mailbox) = subscribers.get_mut(subscriber) else {
            debug!(%subscriber, topic, "ignoring unsubscribe for detached subscriber");
            return false;
        };

        mailbox.topics.remove(topic);
        remove_from_topic(topics, topic, subscriber);
        true
    }

    /// Remove the subscriber from every topic it held and drop its inbox
    /// sender, so no later broadcast can reach it. Safe to call repeatedly.
    pub fn detach(&self, subscriber: &SubscriberId) {
        let mut registry = self.registry.lock();
        let Some(mailbox) = registry.subscribers.remove(subscriber) else {
            return;
        };

        for topic in &mailbox.topics {
            remove_from_topic(&mut registry.topics, topic, subscriber);
        }
        debug!(%subscriber, topics = mailbox.topics.len(), "detached subscriber");
    }

    /// Queue `message` for every subscriber of `topic` at the time of the call.
    ///
    /// The message is stamped with `topic` and the current time first,
    /// overriding whatever the publisher supplied.
    pub fn broadcast(&self, mut message: Message, topic: &str) -> FanOut {
        message.topic = topic.to_string();
        message.time = Some(Utc::now());
        let message = Arc::new(message);

        let mut delivered = 0;
        let mut dropped = 0;

        // The lock is held across the fan-out so that broadcasts to one topic
        // reach every inbox in the order they were accepted.
        let registry = self.registry.lock();
        if let Some(members) = registry.topics.get(topic) {
            for id in &members.subscribers {
                let Some(mailbox) = registry.subscribers.get(id) else {
                    continue;
                };
                match mailbox.sender.try_send(message.clone()) {
                    Ok(()) => delivered += 1,
                    Err(TrySendError::Full(_)) => {
                        dropped += 1;
                        warn!(subscriber = %id, topic, "inbox full, dropping message");
                    }
                    Err(TrySendError::Closed(_)) => {
                        dropped += 1;
                        debug!(subscriber = %id, topic, "inbox closed, dropping message");
                    }
                }
            }
        }
        drop(registry);

        debug!(topic, delivered, dropped, "broadcast message");
        FanOut {
            message,
            delivered,
            dropped,
        }
    }

    /// Per-subscriber queue bound.
    pub fn inbox_capacity(&self) -> usize {
        self.inbox_capacity
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry.lock().subscribers.len()
    }

    pub fn topic_count(&self) -> usize {
        self.registry.lock().topics.len()
    }

    /// Topics held by the subscriber, or `None` if it is not attached.
    pub fn topics_of(&self, subscriber: &SubscriberId) -> Option<HashSet<String>> {
        self.registry
            .lock()
            .subscribers
            .get(subscriber)
            .map(|mailbox| mailbox.topics.clone())
    }

    pub fn subscribers_of(&self, topic: &str) -> usize {
        self.registry
            .lock()
            .topics
            .get(topic)
            .map_or(0, |t| t.subscribers.len())
    }
}

impl Default for Broker {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_SUBSCRIBERS, Self::DEFAULT_INBOX_CAPACITY)
    }
}

fn remove_from_topic(topics: &mut HashMap<String, Topic>, topic: &str, subscriber: &SubscriberId) {
    if let Some(members) = topics.get_mut(topic) {
        members.unsubscribe(subscriber);
        if members.is_empty() {
            topics.remove(topic);
        }
    }
}
