// SPDX-License-Identifier: Apache-2.0

//! Outbound seams: phone verification, SMS delivery, text completion.

use std::sync::OnceLock;
use std::time::Duration;

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

mod completion;
mod notify;
mod otp;

pub use completion::{CompletionProvider, DisabledCompletion, FakeCompletion, OpenAiCompletion};
pub use notify::{LogNotifier, Notifier, RecordingNotifier, TwilioSmsNotifier};
pub use otp::{FakeOtpGateway, OtpCheck, OtpGateway, OtpSend, TwilioVerifyGateway};

pub(crate) fn http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

/// Provider error body. Only `message` is ever surfaced.
#[derive(Debug, Deserialize)]
struct ProviderError {
    #[serde(default)]
    message: Option<String>,
}

/// Human-readable message from a provider error response, without codes.
pub(crate) async fn provider_message(resp: reqwest::Response) -> String {
    let status = resp.status();
    resp.json::<ProviderError>()
        .await
        .ok()
        .and_then(|body| body.message)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| {
            format!(
                "provider request failed: {}",
                status.canonical_reason().unwrap_or("error")
            )
        })
}

fn log_key() -> &'static [u8; 32] {
    static KEY: OnceLock<[u8; 32]> = OnceLock::new();
    KEY.get_or_init(rand::random)
}

/// Log key for a phone number: HMAC-SHA256 under a key drawn once per
/// process. Values correlate within one run and cannot be recomputed from the
/// number alone.
#[must_use]
pub fn redact_phone(phone: &str) -> String {
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(log_key()) else {
        return "ph-unavailable".to_string();
    };
    mac.update(phone.as_bytes());
    format!("ph-{}", &hex::encode(mac.finalize().into_bytes())[..12])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacted_phone_is_stable_and_hides_digits() {
        let a = redact_phone("+919876543210");
        assert_eq!(a, redact_phone("+919876543210"));
        assert_ne!(a, redact_phone("+919876543211"));
        assert!(!a.contains("9876"));
        assert_eq!(a.len(), 15);
    }

    #[test]
    fn redacted_phone_is_not_a_bare_digest() {
        use sha2::Digest;
        let bare = hex::encode(Sha256::digest(b"+919876543210"));
        assert_ne!(redact_phone("+919876543210"), format!("ph-{}", &bare[..12]));
    }
}
