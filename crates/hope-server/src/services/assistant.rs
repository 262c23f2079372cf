// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use hope_core::{classify, ChatMessage, Error, Result};
use tracing::debug;

use super::AlertService;
use crate::effect_adapters::clock_adapters::Clock;
use crate::gateway::CompletionProvider;
use crate::session::Session;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssistantReply {
    pub response: String,
    pub is_sensitive: bool,
}

/// Single-turn AI replies. Prompts are screened with the same keyword check
/// as room messages.
pub struct AssistantService {
    completion: Arc<dyn CompletionProvider>,
    alerts: Arc<AlertService>,
    clock: Arc<dyn Clock>,
}

impl AssistantService {
    #[must_use]
    pub fn new(
        completion: Arc<dyn CompletionProvider>,
        alerts: Arc<AlertService>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            completion,
            alerts,
            clock,
        }
    }

    pub async fn reply(&self, session: &Session, prompt: &str) -> Result<AssistantReply> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(Error::validation("message is required"));
        }
        let is_sensitive = classify(prompt);
        if is_sensitive {
            let alerts = Arc::clone(&self.alerts);
            let flagged = ChatMessage {
                sender_id: session.account_id.clone(),
                sender_role: session.role,
                content: prompt.to_string(),
                timestamp: self.clock.now(),
                is_sensitive,
            };
            tokio::spawn(async move {
                alerts.notify_admin_for_prompt(&flagged).await;
            });
        }
        let response = self.completion.complete(prompt).await?;
        debug!(account_id = %session.account_id, is_sensitive, "assistant replied");
        Ok(AssistantReply {
            response,
            is_sensitive,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect_adapters::clock_adapters::SystemClock;
    use crate::gateway::{DisabledCompletion, FakeCompletion, RecordingNotifier};
    use chrono::Utc;
    use hope_core::{AccountId, Role};
    use std::time::Duration;

    fn session() -> Session {
        Session {
            account_id: AccountId::from_parts(Role::User, 300_001),
            role: Role::User,
            expires_at: Utc::now(),
        }
    }

    fn assistant(
        completion: Arc<dyn CompletionProvider>,
        notifier: Arc<RecordingNotifier>,
    ) -> AssistantService {
        AssistantService::new(
            completion,
            Arc::new(AlertService::new(notifier, Some("+919999999999".to_string()))),
            Arc::new(SystemClock),
        )
    }

    #[tokio::test]
    async fn flagged_prompt_still_gets_a_reply_and_alerts() {
        let notifier = Arc::new(RecordingNotifier::new());
        let svc = assistant(Arc::new(FakeCompletion("I hear you".to_string())), notifier.clone());
        let reply = svc.reply(&session(), "I want to harm myself").await.expect("reply");
        assert_eq!(reply.response, "I hear you");
        assert!(reply.is_sensitive);
        for _ in 0..100 {
            if notifier.attempts() > 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(notifier.attempts(), 1);
    }

    #[tokio::test]
    async fn plain_prompt_is_not_flagged() {
        let notifier = Arc::new(RecordingNotifier::new());
        let svc = assistant(Arc::new(FakeCompletion("hi".to_string())), notifier.clone());
        let reply = svc.reply(&session(), "good morning").await.expect("reply");
        assert!(!reply.is_sensitive);
        assert_eq!(notifier.attempts(), 0);
    }

    #[tokio::test]
    async fn empty_prompt_and_disabled_provider_fail() {
        let notifier = Arc::new(RecordingNotifier::new());
        let svc = assistant(Arc::new(DisabledCompletion), notifier);
        assert!(matches!(
            svc.reply(&session(), "  ").await,
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            svc.reply(&session(), "hello").await,
            Err(Error::Gateway(_))
        ));
    }
}
