// SPDX-License-Identifier: Apache-2.0

//! HS256 bearer tokens: `base64url(header).base64url(claims).base64url(mac)`.

use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use hope_core::{AccountId, Error, Result, Role};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::effect_adapters::clock_adapters::{to_chrono, Clock};

type HmacSha256 = Hmac<Sha256>;

const HEADER: &str = r#"{"alg":"HS256","typ":"JWT"}"#;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Claims {
    sub: String,
    role: Role,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct Header {
    alg: String,
}

/// A validated caller identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub account_id: AccountId,
    pub role: Role,
    pub expires_at: DateTime<Utc>,
}

pub struct SessionIssuer {
    secret: Vec<u8>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl SessionIssuer {
    #[must_use]
    pub fn new(secret: impl AsRef<[u8]>, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
            ttl,
            clock,
        }
    }

    fn mac(&self) -> Result<HmacSha256> {
        HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| Error::validation(format!("invalid signing key: {e}")))
    }

    /// Issues a token with the configured lifetime.
    pub fn issue(&self, account_id: &AccountId, role: Role) -> Result<String> {
        self.issue_with_ttl(account_id, role, self.ttl)
    }

    pub fn issue_with_ttl(&self, account_id: &AccountId, role: Role, ttl: Duration) -> Result<String> {
        let now = self.clock.now();
        let claims = Claims {
            sub: account_id.to_string(),
            role,
            iat: now.timestamp(),
            exp: (now + to_chrono(ttl)).timestamp(),
        };
        let claims = serde_json::to_vec(&claims)
            .map_err(|e| Error::validation(format!("claims encoding failed: {e}")))?;
        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(HEADER),
            URL_SAFE_NO_PAD.encode(claims)
        );
        let mut mac = self.mac()?;
        mac.update(signing_input.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
        Ok(format!("{signing_input}.{signature}"))
    }

    /// Every failure is the same `Auth` error so callers cannot tell a bad
    /// signature from an expired token.
    pub fn validate(&self, token: &str) -> Result<Session> {
        let mut parts = token.trim().split('.');
        let (Some(header), Some(claims), Some(signature), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(Error::Auth);
        };

        let signature = URL_SAFE_NO_PAD.decode(signature).map_err(|_| Error::Auth)?;
        let mut mac = self.mac().map_err(|_| Error::Auth)?;
        mac.update(header.as_bytes());
        mac.update(b".");
        mac.update(claims.as_bytes());
        mac.verify_slice(&signature).map_err(|_| Error::Auth)?;

        let header: Header = URL_SAFE_NO_PAD
            .decode(header)
            .ok()
            .and_then(|raw| serde_json::from_slice(&raw).ok())
            .ok_or(Error::Auth)?;
        if header.alg != "HS256" {
            return Err(Error::Auth);
        }
        let claims: Claims = URL_SAFE_NO_PAD
            .decode(claims)
            .ok()
            .and_then(|raw| serde_json::from_slice(&raw).ok())
            .ok_or(Error::Auth)?;

        let expires_at = DateTime::from_timestamp(claims.exp, 0).ok_or(Error::Auth)?;
        if expires_at <= self.clock.now() {
            return Err(Error::Auth);
        }
        Ok(Session {
            account_id: AccountId::new(claims.sub).map_err(|_| Error::Auth)?,
            role: claims.role,
            expires_at,
        })
    }
}

pub fn require_role(session: &Session, allowed: &[Role]) -> Result<()> {
    if allowed.contains(&session.role) {
        Ok(())
    } else {
        Err(Error::forbidden("Access denied"))
    }
}
