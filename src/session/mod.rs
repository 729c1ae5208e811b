//! Per-connection session lifecycle.
//!
//! A `Session` is created for every upgrade request. `connect` asks the
//! authorizer whether the key may connect at all; `serve` then attaches a
//! subscriber and runs two loops side by side until either one stops:
//!
//! - the inbound loop reads client commands and, when the authorizer allows
//!   them, turns them into broker subscribe/unsubscribe calls
//! - the outbound loop drains the subscriber inbox, filters by visibility and
//!   writes to the connection, along with any error frames for the client
//!
//! Whichever loop stops first fires the shared [`CloseSignal`], which stops
//! the other. Teardown (detach, disconnect notification) runs once after
//! both have returned.

pub mod close;
pub mod state;
pub mod visibility;

use std::pin::{Pin, pin};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::authorizer::{Authorizer, Event};
use crate::broker::{Broker, Subscriber, SubscriberId};
use crate::transport::message::{ClientCommand, ErrorFrame};
use crate::utils::{GatewayError, Result};

pub use close::CloseSignal;
pub use state::SessionState;

/// Shared collaborators handed to every session.
#[derive(Clone)]
pub struct SessionContext {
    pub broker: Arc<Broker>,
    pub authorizer: Arc<dyn Authorizer>,
}

impl SessionContext {
    pub fn new(broker: Arc<Broker>, authorizer: Arc<dyn Authorizer>) -> Self {
        Self { broker, authorizer }
    }
}

/// Identity given to clients that connect without a key.
pub fn anonymous_key() -> String {
    format!("Anonymous#{}", Uuid::new_v4().simple())
}

pub struct Session {
    key: String,
    ctx: SessionContext,
    state: watch::Sender<SessionState>,
    close: CloseSignal,
    torn_down: AtomicBool,
}

impl Session {
    /// Authorize a new connection for `key`.
    ///
    /// Nothing is allocated in the broker here; a denied connect leaves no
    /// trace besides the authorizer call.
    pub async fn connect(key: impl Into<String>, ctx: SessionContext) -> Result<Session> {
        let session = Session {
            key: key.into(),
            ctx,
            state: watch::Sender::new(SessionState::Connecting),
            close: CloseSignal::new(),
            torn_down: AtomicBool::new(false),
        };

        session.transition(SessionState::Authorizing);
        if !session
            .ctx
            .authorizer
            .decide(&Event::connect(&session.key))
            .await
        {
            session.transition(SessionState::Rejected);
            info!(key = %session.key, "connection rejected");
            return Err(GatewayError::AuthorizationDenied(format!(
                "connect denied for '{}'",
                session.key
            )));
        }

        Ok(session)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Follow state transitions, including after `serve` has consumed the
    /// session.
    pub fn watch_state(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// A handle that closes the session from outside.
    pub fn close_signal(&self) -> CloseSignal {
        self.close.clone()
    }

    /// Attach a subscriber and run the session until the connection ends.
    ///
    /// `writer` receives serialized frames; `reader` yields raw client text.
    /// Returns the error that ended the session, if any, after teardown has
    /// completed.
    pub async fn serve<W, R>(self, writer: W, reader: R) -> Result<()>
    where
        W: Sink<String, Error = GatewayError> + Send,
        R: Stream<Item = Result<String>> + Send,
    {
        let mut writer = pin!(writer);
        let reader = pin!(reader);

        let mut subscriber = match self.ctx.broker.attach() {
            Ok(subscriber) => subscriber,
            Err(e) => {
                warn!(key = %self.key, error = %e, "cannot attach subscriber");
                if let Ok(frame) = ErrorFrame::exhausted().to_json() {
                    let _ = writer.send(frame).await;
                }
                let _ = writer.close().await;
                self.transition(SessionState::Closed);
                return Err(e);
            }
        };
        let id = subscriber.id().clone();

        self.transition(SessionState::Open);
        info!(key = %self.key, subscriber = %id, "session open");

        // error frames share the inbox bound; extras are dropped while the
        // writer is stalled
        let (replies_tx, replies_rx) = mpsc::channel(self.ctx.broker.inbox_capacity());
        let (read, write) = tokio::join!(
            self.read_loop(reader, &id, replies_tx),
            self.write_loop(writer, &mut subscriber, replies_rx),
        );

        self.teardown(&id).await;
        read.and(write)
    }

    async fn read_loop<R>(
        &self,
        mut reader: Pin<&mut R>,
        subscriber: &SubscriberId,
        replies: mpsc::Sender<ErrorFrame>,
    ) -> Result<()>
    where
        R: Stream<Item = Result<String>>,
    {
        let outcome = loop {
            let frame = tokio::select! {
                biased;
                _ = self.close.cancelled() => break Ok(()),
                frame = reader.next() => frame,
            };

            match frame {
                Some(Ok(text)) => self.handle_command(&text, subscriber, &replies).await,
                Some(Err(e)) => {
                    debug!(key = %self.key, error = %e, "cannot read from connection, closing");
                    break Err(e);
                }
                None => {
                    debug!(key = %self.key, "connection closed by client");
                    break Ok(());
                }
            }
        };

        self.begin_close();
        outcome
    }

    async fn handle_command(
        &self,
        text: &str,
        subscriber: &SubscriberId,
        replies: &mpsc::Sender<ErrorFrame>,
    ) {
        let command = match serde_json::from_str::<ClientCommand>(text) {
            Ok(command) => command,
            Err(e) => {
                debug!(
                    key = %self.key,
                    error = %e,
                    frame = %text.chars().take(100).collect::<String>(),
                    "dropping malformed command"
                );
                return;
            }
        };

        let event = match &command {
            ClientCommand::Subscribe { value } => Event::subscribe(&self.key, value),
            ClientCommand::Unsubscribe { value } => Event::unsubscribe(&self.key, value),
        };
        let allowed = tokio::select! {
            biased;
            _ = self.close.cancelled() => {
                debug!(key = %self.key, action = %event.action, "session closing, abandoning decision");
                return;
            }
            allowed = self.ctx.authorizer.decide(&event) => allowed,
        };
        if !allowed {
            debug!(key = %self.key, action = %event.action, topic = command.topic(), "command denied");
            if let Err(TrySendError::Full(_)) = replies.try_send(ErrorFrame::denied()) {
                warn!(key = %self.key, "reply queue full, dropping error frame");
            }
            return;
        }

        match &command {
            ClientCommand::Subscribe { value } => {
                self.ctx.broker.subscribe(subscriber, value);
                debug!(key = %self.key, topic = %value, "subscribed");
            }
            ClientCommand::Unsubscribe { value } => {
                self.ctx.broker.unsubscribe(subscriber, value);
                debug!(key = %self.key, topic = %value, "unsubscribed");
            }
        }
    }

    async fn write_loop<W>(
        &self,
        mut writer: Pin<&mut W>,
        subscriber: &mut Subscriber,
        mut replies: mpsc::Receiver<ErrorFrame>,
    ) -> Result<()>
    where
        W: Sink<String, Error = GatewayError>,
    {
        let outcome = loop {
            let text = tokio::select! {
                biased;
                _ = self.close.cancelled() => break Ok(()),
                Some(frame) = replies.recv() => match frame.to_json() {
                    Ok(text) => text,
                    Err(e) => {
                        warn!(key = %self.key, error = %e, "cannot serialize error frame");
                        continue;
                    }
                },
                delivery = subscriber.recv() => {
                    let Some(message) = delivery else {
                        break Ok(());
                    };
                    if !visibility::is_visible(&message, &self.key) {
                        debug!(key = %self.key, topic = %message.topic, "message not addressed to client");
                        continue;
                    }
                    match visibility::render(&message) {
                        Ok(text) => text,
                        Err(e) => {
                            warn!(key = %self.key, error = %e, "cannot serialize message");
                            continue;
                        }
                    }
                }
            };

            if let Err(e) = writer.send(text).await {
                debug!(key = %self.key, error = %e, "cannot write to connection, closing");
                break Err(e);
            }
        };

        self.begin_close();
        let _ = writer.close().await;
        outcome
    }

    fn begin_close(&self) {
        if self.close.trigger() {
            self.transition(SessionState::Closing);
        }
    }

    async fn teardown(&self, subscriber: &SubscriberId) {
        if self.torn_down.swap(true, Ordering::SeqCst) {
            return;
        }

        self.begin_close();
        self.ctx.broker.detach(subscriber);
        // best effort, the decision is ignored
        let _ = self
            .ctx
            .authorizer
            .decide(&Event::disconnect(&self.key))
            .await;
        self.transition(SessionState::Closed);
        info!(key = %self.key, "session closed");
    }

    fn transition(&self, next: SessionState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            debug!(key = %self.key, from = %previous, to = %next, "session state");
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("key", &self.key)
            .field("state", &self.state())
            .finish()
    }
}
