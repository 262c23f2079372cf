// SPDX-License-Identifier: Apache-2.0

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use hope_core::{Error, Result};
use tokio::sync::Mutex;
use tracing::{info, warn};

use super::{http_client, provider_message, redact_phone};

/// Outbound text delivery. Callers treat every send as best-effort.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_sms(&self, to: &str, body: &str) -> Result<()>;
}

pub struct TwilioSmsNotifier {
    messages_url: String,
    account_sid: String,
    auth_token: String,
    from: String,
    client: reqwest::Client,
}

impl TwilioSmsNotifier {
    #[must_use]
    pub fn new(
        base_url: &str,
        account_sid: impl Into<String>,
        auth_token: impl Into<String>,
        from: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        let account_sid = account_sid.into();
        Self {
            messages_url: format!(
                "{}/Accounts/{account_sid}/Messages.json",
                base_url.trim_end_matches('/')
            ),
            account_sid,
            auth_token: auth_token.into(),
            from: from.into(),
            client: http_client(timeout),
        }
    }
}

#[async_trait]
impl Notifier for TwilioSmsNotifier {
    async fn send_sms(&self, to: &str, body: &str) -> Result<()> {
        let resp = self
            .client
            .post(&self.messages_url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[("To", to), ("From", self.from.as_str()), ("Body", body)])
            .send()
            .await
            .map_err(|e| Error::gateway(format!("messaging provider unreachable: {e}")))?;
        if !resp.status().is_success() {
            return Err(Error::gateway(provider_message(resp).await));
        }
        info!(to = %redact_phone(to), "sms sent");
        Ok(())
    }
}

/// Used when no sender number is configured: the message is only logged.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_sms(&self, to: &str, body: &str) -> Result<()> {
        warn!(
            to = %redact_phone(to),
            body_len = body.len(),
            "sms delivery not configured, message dropped"
        );
        Ok(())
    }
}

/// Test notifier that records every send and can be told to fail.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(String, String)>>,
    attempts: AtomicU64,
    fail: bool,
}

impl RecordingNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub async fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().await.clone()
    }

    #[must_use]
    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_sms(&self, to: &str, body: &str) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::Relaxed);
        if self.fail {
            return Err(Error::gateway("messaging provider unavailable"));
        }
        self.sent
            .lock()
            .await
            .push((to.to_string(), body.to_string()));
        Ok(())
    }
}
