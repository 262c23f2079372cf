// SPDX-License-Identifier: Apache-2.0

//! Per-room fan-out for the WebSocket relay.
//!
//! Each room with at least one joined socket owns a `broadcast` topic. A
//! message is persisted through [`ChatManager`] before it is published, so a
//! subscriber never sees a message the transcript does not hold.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use hope_api::wire::ReceivedMessageData;
use hope_core::{Error, Result, RoomId};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::services::{AlertService, ChatManager};
use crate::session::Session;

const TOPIC_CAPACITY: usize = 64;

type Topics = HashMap<RoomId, broadcast::Sender<ReceivedMessageData>>;

/// A joined room. Hand it back to [`Relay::leave`] when the socket goes away.
pub struct Subscription {
    room_id: RoomId,
    receiver: broadcast::Receiver<ReceivedMessageData>,
}

impl Subscription {
    #[must_use]
    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    /// Next message for this room. Lagged receivers skip what they missed;
    /// `None` once the topic is gone.
    pub async fn recv(&mut self) -> Option<ReceivedMessageData> {
        loop {
            match self.receiver.recv().await {
                Ok(message) => return Some(message),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(room_id = %self.room_id, skipped, "relay subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

pub struct Relay {
    chat: Arc<ChatManager>,
    alerts: Arc<AlertService>,
    topics: Mutex<Topics>,
}

fn parse_room(raw: &str) -> Result<RoomId> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(Error::validation("room is required"));
    }
    RoomId::new(raw).map_err(|_| Error::not_found("Chat room"))
}

impl Relay {
    #[must_use]
    pub fn new(chat: Arc<ChatManager>, alerts: Arc<AlertService>) -> Self {
        Self {
            chat,
            alerts,
            topics: Mutex::new(HashMap::new()),
        }
    }

    fn topics(&self) -> MutexGuard<'_, Topics> {
        self.topics.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn ensure_participant(&self, session: &Session, room_id: &RoomId) -> Result<()> {
        if self
            .chat
            .is_participant(room_id, &session.account_id, session.role)
            .await?
        {
            Ok(())
        } else {
            Err(Error::forbidden("Access denied"))
        }
    }

    pub async fn join(&self, session: &Session, room: &str) -> Result<Subscription> {
        let room_id = parse_room(room)?;
        self.ensure_participant(session, &room_id).await?;
        let receiver = self
            .topics()
            .entry(room_id.clone())
            .or_insert_with(|| broadcast::channel(TOPIC_CAPACITY).0)
            .subscribe();
        debug!(room_id = %room_id, account_id = %session.account_id, "relay join");
        Ok(Subscription { room_id, receiver })
    }

    /// Persists, alerts when flagged, then publishes to every subscriber of
    /// the room including the sender. The sender is always the session.
    pub async fn send(
        &self,
        session: &Session,
        room: &str,
        content: &str,
    ) -> Result<ReceivedMessageData> {
        let room_id = parse_room(room)?;
        self.ensure_participant(session, &room_id).await?;
        let message = self
            .chat
            .append_message(&room_id, &session.account_id, session.role, content)
            .await?;

        if message.is_sensitive {
            let alerts = Arc::clone(&self.alerts);
            let alert_room = room_id.clone();
            let flagged = message.clone();
            tokio::spawn(async move {
                alerts.notify_admin(&alert_room, &flagged).await;
            });
        }

        let outbound = ReceivedMessageData {
            room: room_id.to_string(),
            message: message.content,
            sender_id: message.sender_id.to_string(),
            sender_type: message.sender_role,
            timestamp: message.timestamp,
            is_sensitive: message.is_sensitive,
        };
        if let Some(topic) = self.topics().get(&room_id) {
            // No receivers left is not an error; the message is already stored.
            let _ = topic.send(outbound.clone());
        }
        Ok(outbound)
    }

    /// Drops the subscription and prunes the topic once nobody listens.
    pub fn leave(&self, subscription: Subscription) {
        let Subscription { room_id, receiver } = subscription;
        drop(receiver);
        let mut topics = self.topics();
        if topics
            .get(&room_id)
            .is_some_and(|topic| topic.receiver_count() == 0)
        {
            topics.remove(&room_id);
            debug!(room_id = %room_id, "relay topic pruned");
        }
    }

    #[must_use]
    pub fn topic_count(&self) -> usize {
        self.topics().len()
    }
}
