// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use hope_core::{matched_keywords, ChatMessage, RoomId};
use tracing::{info, warn};

use super::AUDIT_TARGET;
use crate::gateway::Notifier;

const EXCERPT_CHARS: usize = 120;

/// Best-effort SMS to the admin alert contact when a message is flagged.
pub struct AlertService {
    notifier: Arc<dyn Notifier>,
    contact: Option<String>,
}

impl AlertService {
    #[must_use]
    pub fn new(notifier: Arc<dyn Notifier>, contact: Option<String>) -> Self {
        Self { notifier, contact }
    }

    fn body(origin: &str, message: &ChatMessage) -> String {
        let mut excerpt: String = message.content.chars().take(EXCERPT_CHARS).collect();
        if message.content.chars().count() > EXCERPT_CHARS {
            excerpt.push_str("...");
        }
        format!(
            "Hope-AI alert: sensitive message from {} ({}) in {} [{}]: \"{}\"",
            message.sender_id,
            message.sender_role,
            origin,
            matched_keywords(&message.content).join(", "),
            excerpt
        )
    }

    /// Never fails; delivery problems are logged.
    pub async fn notify_admin(&self, room_id: &RoomId, message: &ChatMessage) {
        self.deliver(room_id.as_str(), message).await;
    }

    /// Same alert for a flagged prompt sent to the AI assistant.
    pub async fn notify_admin_for_prompt(&self, message: &ChatMessage) {
        self.deliver("ai-assistant", message).await;
    }

    async fn deliver(&self, origin: &str, message: &ChatMessage) {
        info!(
            target: AUDIT_TARGET,
            event = "sensitive_message",
            origin,
            sender_id = %message.sender_id,
            sender_role = %message.sender_role,
        );
        let Some(contact) = &self.contact else {
            warn!(origin, "no admin alert contact configured, alert not sent");
            return;
        };
        if let Err(e) = self
            .notifier
            .send_sms(contact, &Self::body(origin, message))
            .await
        {
            warn!(origin, "admin alert delivery failed: {e}");
        }
    }
}
