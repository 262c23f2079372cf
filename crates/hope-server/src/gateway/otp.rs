// SPDX-License-Identifier: Apache-2.0

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use hope_core::{Error, Result};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use super::{http_client, provider_message, redact_phone};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpSend {
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpCheck {
    pub approved: bool,
    pub status: String,
}

/// Sends and checks one-time codes. The provider owns the challenge; numbers
/// are full international form (`+<country><national>`).
#[async_trait]
pub trait OtpGateway: Send + Sync {
    async fn send(&self, e164: &str) -> Result<OtpSend>;
    async fn check(&self, e164: &str, code: &str) -> Result<OtpCheck>;
}

#[derive(Debug, Deserialize)]
struct VerificationBody {
    status: String,
}

pub struct TwilioVerifyGateway {
    base_url: String,
    service_sid: String,
    account_sid: String,
    auth_token: String,
    client: reqwest::Client,
}

impl TwilioVerifyGateway {
    #[must_use]
    pub fn new(
        base_url: &str,
        service_sid: impl Into<String>,
        account_sid: impl Into<String>,
        auth_token: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            service_sid: service_sid.into(),
            account_sid: account_sid.into(),
            auth_token: auth_token.into(),
            client: http_client(timeout),
        }
    }

    fn url(&self, leaf: &str) -> String {
        format!("{}/Services/{}/{leaf}", self.base_url, self.service_sid)
    }

    async fn post(&self, leaf: &str, form: &[(&str, &str)]) -> Result<reqwest::Response> {
        self.client
            .post(self.url(leaf))
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(form)
            .send()
            .await
            .map_err(|e| {
                warn!("verification provider unreachable: {e}");
                Error::gateway("Verification service unavailable")
            })
    }
}

#[async_trait]
impl OtpGateway for TwilioVerifyGateway {
    #[instrument(name = "otp_send", skip_all, fields(phone = %redact_phone(e164)))]
    async fn send(&self, e164: &str) -> Result<OtpSend> {
        let resp = self
            .post("Verifications", &[("To", e164), ("Channel", "sms")])
            .await?;
        if !resp.status().is_success() {
            let message = provider_message(resp).await;
            warn!(%message, "otp send rejected");
            return Err(Error::gateway(message));
        }
        let body: VerificationBody = resp
            .json()
            .await
            .map_err(|_| Error::gateway("Unexpected verification service response"))?;
        info!(status = %body.status, "otp sent");
        Ok(OtpSend {
            status: body.status,
        })
    }

    #[instrument(name = "otp_check", skip_all, fields(phone = %redact_phone(e164)))]
    async fn check(&self, e164: &str, code: &str) -> Result<OtpCheck> {
        let resp = self
            .post("VerificationCheck", &[("To", e164), ("Code", code)])
            .await?;
        // No pending verification (expired, already used, never sent).
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(OtpCheck {
                approved: false,
                status: "not_found".to_string(),
            });
        }
        if !resp.status().is_success() {
            let message = provider_message(resp).await;
            warn!(%message, "otp check rejected");
            return Err(Error::gateway(message));
        }
        let body: VerificationBody = resp
            .json()
            .await
            .map_err(|_| Error::gateway("Unexpected verification service response"))?;
        Ok(OtpCheck {
            approved: body.status == "approved",
            status: body.status,
        })
    }
}

/// In-process gateway: every sent number accepts one fixed code.
#[derive(Default)]
pub struct FakeOtpGateway {
    code: String,
    pending: Mutex<HashMap<String, u32>>,
    fail_send_with: Option<String>,
}

impl FakeOtpGateway {
    #[must_use]
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            ..Self::default()
        }
    }

    /// A gateway whose sends all fail with `message`.
    #[must_use]
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            fail_send_with: Some(message.into()),
            ..Self::default()
        }
    }

    pub async fn sends_to(&self, e164: &str) -> u32 {
        self.pending.lock().await.get(e164).copied().unwrap_or(0)
    }
}

#[async_trait]
impl OtpGateway for FakeOtpGateway {
    async fn send(&self, e164: &str) -> Result<OtpSend> {
        if let Some(message) = &self.fail_send_with {
            return Err(Error::gateway(message.clone()));
        }
        *self.pending.lock().await.entry(e164.to_string()).or_insert(0) += 1;
        Ok(OtpSend {
            status: "pending".to_string(),
        })
    }

    async fn check(&self, e164: &str, code: &str) -> Result<OtpCheck> {
        let sent = self.pending.lock().await.contains_key(e164);
        let approved = sent && code == self.code;
        Ok(OtpCheck {
            approved,
            status: if approved { "approved" } else { "pending" }.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fake_gateway_approves_only_sent_numbers_with_the_right_code() {
        let gateway = FakeOtpGateway::new("123456");
        assert!(!gateway.check("+911", "123456").await.expect("check").approved);
        gateway.send("+911").await.expect("send");
        assert!(!gateway.check("+911", "000000").await.expect("check").approved);
        assert!(gateway.check("+911", "123456").await.expect("check").approved);
        assert_eq!(gateway.sends_to("+911").await, 1);
    }
}
