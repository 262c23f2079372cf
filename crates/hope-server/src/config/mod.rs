// SPDX-License-Identifier: Apache-2.0

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use hope_core::DEFAULT_COUNTRY_CODE;

use crate::store::RetryPolicy;

#[derive(Debug, Clone, PartialEq)]
pub struct RateLimitConfig {
    pub capacity: f64,
    pub refill_per_sec: f64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            capacity: 3.0,
            refill_per_sec: 1.0 / 60.0,
        }
    }
}

/// Credentials and endpoints for the verification/messaging provider.
#[derive(Debug, Clone, Default)]
pub struct GatewayConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub verify_service_sid: String,
    pub verify_base_url: String,
    pub messaging_base_url: String,
    pub sms_from_number: Option<String>,
    pub admin_alert_contact: Option<String>,
    pub timeout: Duration,
}

#[derive(Debug, Clone, Default)]
pub struct CompletionConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
}

#[derive(Debug, Clone)]
pub struct BootstrapAdmin {
    pub name: String,
    pub phone_number: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub jwt_secret: String,
    pub token_ttl: Duration,
    pub gateway: GatewayConfig,
    pub completion: CompletionConfig,
    pub store_path: PathBuf,
    pub store_retry: RetryPolicy,
    pub default_country_code: String,
    pub room_duration: Duration,
    pub login_max_failures: u32,
    pub login_lock: Duration,
    pub otp_rate_limit: RateLimitConfig,
    pub max_body_bytes: usize,
    pub log_json: bool,
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:5002".to_string(),
            jwt_secret: String::new(),
            token_ttl: Duration::from_secs(86_400),
            gateway: GatewayConfig {
                verify_base_url: "https://verify.twilio.com/v2".to_string(),
                messaging_base_url: "https://api.twilio.com/2010-04-01".to_string(),
                timeout: Duration::from_secs(15),
                ..GatewayConfig::default()
            },
            completion: CompletionConfig {
                api_key: None,
                base_url: "https://api.openai.com/v1".to_string(),
                model: "gpt-3.5-turbo".to_string(),
            },
            store_path: PathBuf::from("hope-ai.sqlite"),
            store_retry: RetryPolicy::default(),
            default_country_code: DEFAULT_COUNTRY_CODE.to_string(),
            room_duration: Duration::from_secs(300),
            login_max_failures: 5,
            login_lock: Duration::from_secs(900),
            otp_rate_limit: RateLimitConfig::default(),
            max_body_bytes: 16 * 1024,
            log_json: true,
            bootstrap_admin: None,
        }
    }
}

pub fn env_bool(name: &str, default: bool) -> bool {
    env::var(name)
        .ok()
        .and_then(|v| match v.as_str() {
            "1" | "true" | "TRUE" | "yes" | "YES" => Some(true),
            "0" | "false" | "FALSE" | "no" | "NO" => Some(false),
            _ => None,
        })
        .unwrap_or(default)
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default)
}

fn env_usize(name: &str, default: usize) -> usize {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(default)
}

fn env_string(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_string_or(name: &str, default: &str) -> String {
    env_string(name).unwrap_or_else(|| default.to_string())
}

impl ServerConfig {
    /// Reads `HOPE_*` variables. Missing secrets are left empty here and
    /// rejected by [`validate_startup_config_contract`].
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let bootstrap_admin = match (
            env_string("HOPE_BOOTSTRAP_ADMIN_PHONE"),
            env_string("HOPE_BOOTSTRAP_ADMIN_EMAIL"),
            env_string("HOPE_BOOTSTRAP_ADMIN_PASSWORD"),
        ) {
            (Some(phone_number), Some(email), Some(password)) => Some(BootstrapAdmin {
                name: env_string_or("HOPE_BOOTSTRAP_ADMIN_NAME", "Administrator"),
                phone_number,
                email,
                password,
            }),
            _ => None,
        };
        let refill_secs = env_u64("HOPE_OTP_RATE_REFILL_SECS", 60).max(1);
        Self {
            bind_addr: env_string_or("HOPE_BIND", &defaults.bind_addr),
            jwt_secret: env_string("HOPE_JWT_SECRET").unwrap_or_default(),
            token_ttl: Duration::from_secs(env_u64("HOPE_TOKEN_TTL_SECS", 86_400)),
            gateway: GatewayConfig {
                account_sid: env_string("HOPE_VERIFY_ACCOUNT_SID").unwrap_or_default(),
                auth_token: env_string("HOPE_VERIFY_AUTH_TOKEN").unwrap_or_default(),
                verify_service_sid: env_string("HOPE_VERIFY_SERVICE_SID").unwrap_or_default(),
                verify_base_url: env_string_or(
                    "HOPE_VERIFY_BASE_URL",
                    &defaults.gateway.verify_base_url,
                ),
                messaging_base_url: env_string_or(
                    "HOPE_MESSAGING_BASE_URL",
                    &defaults.gateway.messaging_base_url,
                ),
                sms_from_number: env_string("HOPE_SMS_FROM_NUMBER"),
                admin_alert_contact: env_string("HOPE_ADMIN_ALERT_CONTACT"),
                timeout: defaults.gateway.timeout,
            },
            completion: CompletionConfig {
                api_key: env_string("HOPE_COMPLETION_API_KEY"),
                base_url: env_string_or("HOPE_COMPLETION_BASE_URL", &defaults.completion.base_url),
                model: env_string_or("HOPE_COMPLETION_MODEL", &defaults.completion.model),
            },
            store_path: PathBuf::from(env_string_or("HOPE_STORE_PATH", "hope-ai.sqlite")),
            store_retry: RetryPolicy {
                max_attempts: env_usize("HOPE_STORE_CONNECT_ATTEMPTS", 10),
                base_backoff_ms: env_u64("HOPE_STORE_BACKOFF_MS", 2_000),
            },
            default_country_code: env_string_or(
                "HOPE_DEFAULT_COUNTRY_CODE",
                &defaults.default_country_code,
            ),
            room_duration: Duration::from_secs(env_u64("HOPE_ROOM_DURATION_SECS", 300)),
            login_max_failures: u32::try_from(env_u64("HOPE_LOGIN_MAX_FAILURES", 5))
                .unwrap_or(u32::MAX),
            login_lock: Duration::from_secs(env_u64("HOPE_LOGIN_LOCK_SECS", 900)),
            otp_rate_limit: RateLimitConfig {
                capacity: env_u64("HOPE_OTP_RATE_CAPACITY", 3) as f64,
                refill_per_sec: 1.0 / refill_secs as f64,
            },
            max_body_bytes: env_usize("HOPE_MAX_BODY_BYTES", 16 * 1024),
            log_json: env_bool("HOPE_LOG_JSON", true),
            bootstrap_admin,
        }
    }
}

pub fn validate_startup_config_contract(cfg: &ServerConfig) -> Result<(), String> {
    if cfg.jwt_secret.is_empty() {
        return Err("HOPE_JWT_SECRET is required".to_string());
    }
    if cfg.jwt_secret.len() < 16 {
        return Err("HOPE_JWT_SECRET must be at least 16 bytes".to_string());
    }
    for (name, value) in [
        ("HOPE_VERIFY_ACCOUNT_SID", &cfg.gateway.account_sid),
        ("HOPE_VERIFY_AUTH_TOKEN", &cfg.gateway.auth_token),
        ("HOPE_VERIFY_SERVICE_SID", &cfg.gateway.verify_service_sid),
    ] {
        if value.is_empty() {
            return Err(format!("{name} is required"));
        }
    }
    if cfg.token_ttl.is_zero() || cfg.room_duration.is_zero() || cfg.login_lock.is_zero() {
        return Err("token ttl, room duration and login lock must be > 0".to_string());
    }
    if cfg.max_body_bytes == 0 {
        return Err("max body bytes must be > 0".to_string());
    }
    if cfg.login_max_failures == 0 {
        return Err("login max failures must be > 0".to_string());
    }
    if cfg.otp_rate_limit.capacity < 1.0 {
        return Err("otp rate capacity must be >= 1".to_string());
    }
    if cfg.store_retry.max_attempts == 0 {
        return Err("store connect attempts must be > 0".to_string());
    }
    let code = &cfg.default_country_code;
    if code.is_empty() || code.len() > 3 || !code.bytes().all(|b| b.is_ascii_digit()) {
        return Err(format!("invalid default country code: {code}"));
    }
    Ok(())
}
