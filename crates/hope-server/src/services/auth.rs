// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;
use std::time::Duration;

use hope_core::{
    normalize_email, Account, Error, NewAccount, NotificationChannel, NotificationPreference,
    PhoneNumber, Result, Role, SignupEvent, SignupState,
};
use tracing::{debug, info, warn};

use super::{insert_with_fresh_id, non_blank, parse_phone, AUDIT_TARGET};
use crate::config::RateLimitConfig;
use crate::effect_adapters::clock_adapters::{to_chrono, Clock};
use crate::gateway::{redact_phone, Notifier, OtpCheck, OtpGateway, OtpSend};
use crate::password::{hash_password, verify_against_decoy, verify_password};
use crate::rate_limiter::RateLimiter;
use crate::session::SessionIssuer;
use crate::store::{AccountStore, Store};

#[derive(Debug, Clone)]
pub struct AuthPolicy {
    pub default_country_code: String,
    pub login_max_failures: u32,
    pub login_lock: Duration,
    pub otp_rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Default)]
pub struct RegistrationInput {
    pub phone_number: String,
    pub name: String,
    pub email: String,
    pub password: String,
    pub otp: String,
    pub country_code: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Registration {
    pub account: Account,
    pub token: String,
}

#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub account: Account,
    pub token: String,
}

/// Phone-OTP signup and password login.
pub struct AuthService {
    store: Arc<dyn Store>,
    otp: Arc<dyn OtpGateway>,
    notifier: Arc<dyn Notifier>,
    sessions: Arc<SessionIssuer>,
    clock: Arc<dyn Clock>,
    otp_limiter: RateLimiter,
    policy: AuthPolicy,
}

fn trace_signup(phone: &PhoneNumber, state: SignupState, event: SignupEvent) -> Result<SignupState> {
    let next = state.advance(event)?;
    debug!(phone = %redact_phone(&phone.e164()), from = %state, to = %next, "signup transition");
    Ok(next)
}

impl AuthService {
    #[must_use]
    pub fn new(
        store: Arc<dyn Store>,
        otp: Arc<dyn OtpGateway>,
        notifier: Arc<dyn Notifier>,
        sessions: Arc<SessionIssuer>,
        clock: Arc<dyn Clock>,
        policy: AuthPolicy,
    ) -> Self {
        Self {
            store,
            otp,
            notifier,
            sessions,
            clock,
            otp_limiter: RateLimiter::new(policy.otp_rate_limit.clone()),
            policy,
        }
    }

    pub async fn request_otp(&self, phone_number: &str, country_code: &str) -> Result<OtpSend> {
        let phone = PhoneNumber::parse(
            non_blank(phone_number, "phoneNumber")?,
            non_blank(country_code, "countryCode")?,
        )?;
        let e164 = phone.e164();
        if !self.otp_limiter.allow(&e164).await {
            warn!(phone = %redact_phone(&e164), "otp request throttled");
            return Err(Error::RateLimited);
        }
        let sent = self.otp.send(&e164).await?;
        trace_signup(&phone, SignupState::Start, SignupEvent::OtpSent)?;
        Ok(sent)
    }

    /// A wrong or expired code is `approved: false`, not an error.
    pub async fn verify_otp(
        &self,
        phone_number: &str,
        country_code: &str,
        code: &str,
    ) -> Result<OtpCheck> {
        let phone = PhoneNumber::parse(
            non_blank(phone_number, "phoneNumber")?,
            non_blank(country_code, "countryCode")?,
        )?;
        let code = non_blank(code, "otp")?;
        self.otp.check(&phone.e164(), code).await
    }

    pub async fn register(&self, input: RegistrationInput) -> Result<Registration> {
        let name = non_blank(&input.name, "name")?.to_string();
        let raw_phone = non_blank(&input.phone_number, "phoneNumber")?;
        non_blank(&input.email, "email")?;
        if input.password.is_empty() {
            return Err(Error::validation("password is required"));
        }
        let code = non_blank(&input.otp, "otp")?;
        let email = normalize_email(&input.email)?;
        let phone = parse_phone(
            raw_phone,
            input.country_code.as_deref(),
            &self.policy.default_country_code,
        )?;
        let canonical = phone.canonical();

        let mut state = SignupState::OtpRequested;
        let check = self.otp.check(&phone.e164(), code).await?;
        if !check.approved {
            return Err(Error::OtpInvalid);
        }
        state = trace_signup(&phone, state, SignupEvent::OtpApproved)?;

        if self.store.account_by_phone(&canonical).await?.is_some()
            || self.store.account_by_email(&email).await?.is_some()
        {
            return Err(Error::DuplicateAccount(
                "User with this phone number or email already exists".to_string(),
            ));
        }

        let password_hash = hash_password(input.password).await?;
        let now = self.clock.now();
        let notifications = vec![
            NotificationPreference {
                channel: NotificationChannel::Sms,
                contact: canonical.clone(),
                created_at: now,
            },
            NotificationPreference {
                channel: NotificationChannel::Email,
                contact: email.clone(),
                created_at: now,
            },
        ];
        let account = insert_with_fresh_id(self.store.as_ref(), Role::User, |account_id| {
            NewAccount {
                account_id,
                name: name.clone(),
                phone_number: canonical.clone(),
                country_code: phone.country_code().to_string(),
                email: Some(email.clone()),
                password_hash: password_hash.clone(),
                role: Role::User,
                admin_phone: None,
                notifications: notifications.clone(),
                created_at: now,
            }
        })
        .await?;
        state = trace_signup(&phone, state, SignupEvent::AccountStored)?;

        let token = self.sessions.issue(&account.account_id, account.role)?;
        trace_signup(&phone, state, SignupEvent::TokenIssued)?;
        info!(
            target: AUDIT_TARGET,
            event = "account_registered",
            account_id = %account.account_id,
            role = %account.role,
        );

        let notifier = Arc::clone(&self.notifier);
        let to = phone.e164();
        let body = format!("Welcome to Hope-AI, {}! Your account is ready.", account.name);
        tokio::spawn(async move {
            if let Err(e) = notifier.send_sms(&to, &body).await {
                warn!(to = %redact_phone(&to), "welcome sms failed: {e}");
            }
        });

        Ok(Registration { account, token })
    }

    /// Every failure is the same `InvalidCredentials`, whether the account is
    /// missing, inactive, locked or the password is wrong.
    pub async fn login(
        &self,
        identifier: &str,
        password: &str,
        country_code: Option<&str>,
    ) -> Result<LoginOutcome> {
        let identifier = non_blank(identifier, "email or phoneNumber")?;
        if password.is_empty() {
            return Err(Error::validation("password is required"));
        }
        let account = if identifier.contains('@') {
            self.store
                .account_by_email(&identifier.to_ascii_lowercase())
                .await?
        } else {
            match parse_phone(identifier, country_code, &self.policy.default_country_code) {
                Ok(phone) => self.store.account_by_phone(&phone.canonical()).await?,
                Err(_) => None,
            }
        };
        let Some(account) = account else {
            verify_against_decoy(password.to_string()).await?;
            info!(target: AUDIT_TARGET, event = "login_failed", reason = "unknown_identifier");
            return Err(Error::InvalidCredentials);
        };

        let now = self.clock.now();
        if !account.is_active || account.is_locked_at(now) {
            verify_against_decoy(password.to_string()).await?;
            info!(
                target: AUDIT_TARGET,
                event = "login_failed",
                account_id = %account.account_id,
                reason = if account.is_active { "locked" } else { "inactive" },
            );
            return Err(Error::InvalidCredentials);
        }

        let matched = verify_password(password.to_string(), account.password_hash.clone()).await?;
        if !matched {
            let lock_until = now + to_chrono(self.policy.login_lock);
            let failures = self
                .store
                .record_login_failure(
                    &account.account_id,
                    self.policy.login_max_failures,
                    now,
                    lock_until,
                )
                .await?;
            if failures >= self.policy.login_max_failures {
                warn!(
                    target: AUDIT_TARGET,
                    event = "account_locked",
                    account_id = %account.account_id,
                    failures,
                    until = %lock_until,
                );
            } else {
                info!(
                    target: AUDIT_TARGET,
                    event = "login_failed",
                    account_id = %account.account_id,
                    reason = "bad_password",
                    failures,
                );
            }
            return Err(Error::InvalidCredentials);
        }

        self.store
            .record_login_success(&account.account_id, now)
            .await?;
        let token = self.sessions.issue(&account.account_id, account.role)?;
        info!(
            target: AUDIT_TARGET,
            event = "login_succeeded",
            account_id = %account.account_id,
            role = %account.role,
        );
        Ok(LoginOutcome {
            account: Account {
                last_login: Some(now),
                failed_login_attempts: 0,
                is_locked: false,
                locked_until: None,
                ..account
            },
            token,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect_adapters::clock_adapters::ManualClock;
    use crate::gateway::{FakeOtpGateway, RecordingNotifier};
    use crate::store::MemoryStore;
    use chrono::Utc;

    struct Fixture {
        auth: AuthService,
        store: Arc<MemoryStore>,
        otp: Arc<FakeOtpGateway>,
        notifier: Arc<RecordingNotifier>,
        clock: Arc<ManualClock>,
        sessions: Arc<SessionIssuer>,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let otp = Arc::new(FakeOtpGateway::new("123456"));
        let notifier = Arc::new(RecordingNotifier::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let sessions = Arc::new(SessionIssuer::new(
            "unit-test-secret-1234",
            Duration::from_secs(3_600),
            clock.clone(),
        ));
        let auth = AuthService::new(
            store.clone(),
            otp.clone(),
            notifier.clone(),
            sessions.clone(),
            clock.clone(),
            AuthPolicy {
                default_country_code: "91".to_string(),
                login_max_failures: 3,
                login_lock: Duration::from_secs(900),
                otp_rate_limit: RateLimitConfig::default(),
            },
        );
        Fixture {
            auth,
            store,
            otp,
            notifier,
            clock,
            sessions,
        }
    }

    fn registration(phone: &str, email: &str) -> RegistrationInput {
        RegistrationInput {
            phone_number: phone.to_string(),
            name: "Asha".to_string(),
            email: email.to_string(),
            password: "correct horse".to_string(),
            otp: "123456".to_string(),
            country_code: None,
        }
    }

    async fn registered(fx: &Fixture, phone: &str, email: &str) -> Registration {
        fx.auth.request_otp(phone, "91").await.expect("request otp");
        fx.auth
            .register(registration(phone, email))
            .await
            .expect("register")
    }

    #[tokio::test]
    async fn register_creates_user_with_canonical_contacts() {
        let fx = fixture();
        let reg = registered(&fx, "98765 43210", " Asha@Example.COM ").await;
        assert_eq!(reg.account.role, Role::User);
        assert_eq!(reg.account.phone_number, "919876543210");
        assert_eq!(reg.account.email.as_deref(), Some("asha@example.com"));
        assert!(reg.account.account_id.as_str().starts_with("user_"));
        assert!(reg.account.password_hash.starts_with("$argon2id$"));
        let session = fx.sessions.validate(&reg.token).expect("token valid");
        assert_eq!(session.account_id, reg.account.account_id);
    }

    #[tokio::test]
    async fn register_with_wrong_code_creates_nothing() {
        let fx = fixture();
        fx.auth.request_otp("9876543210", "91").await.expect("otp");
        let mut input = registration("9876543210", "a@x.com");
        input.otp = "000000".to_string();
        assert_eq!(fx.auth.register(input).await.err(), Some(Error::OtpInvalid));
        assert!(fx
            .store
            .account_by_phone("919876543210")
            .await
            .expect("lookup")
            .is_none());
    }

    #[tokio::test]
    async fn register_rejects_missing_fields_before_calling_gateway() {
        let fx = fixture();
        let mut input = registration("9876543210", "a@x.com");
        input.name = "  ".to_string();
        let err = fx.auth.register(input).await.expect_err("blank name");
        assert!(matches!(err, Error::Validation(_)));

        let bad_email = registration("9876543210", "not-an-email");
        let err = fx.auth.register(bad_email).await.expect_err("bad email");
        assert_eq!(err.to_string(), "Valid email is required");
    }

    #[tokio::test]
    async fn duplicate_phone_leaves_original_account_untouched() {
        let fx = fixture();
        let first = registered(&fx, "9876543210", "a@x.com").await;
        let err = fx
            .auth
            .register(registration("9876543210", "b@x.com"))
            .await
            .expect_err("duplicate");
        assert!(matches!(err, Error::DuplicateAccount(_)));
        let stored = fx
            .store
            .account_by_phone("919876543210")
            .await
            .expect("lookup")
            .expect("present");
        assert_eq!(stored, first.account);
    }

    #[tokio::test]
    async fn login_accepts_email_or_phone() {
        let fx = fixture();
        let reg = registered(&fx, "9876543210", "a@x.com").await;
        let by_email = fx
            .auth
            .login("A@X.com", "correct horse", None)
            .await
            .expect("email login");
        assert_eq!(by_email.account.account_id, reg.account.account_id);
        let by_phone = fx
            .auth
            .login("+919876543210", "correct horse", None)
            .await
            .expect("phone login");
        assert_eq!(by_phone.account.account_id, reg.account.account_id);
    }

    #[tokio::test]
    async fn login_failures_are_uniform() {
        let fx = fixture();
        registered(&fx, "9876543210", "a@x.com").await;
        let unknown = fx
            .auth
            .login("nobody@x.com", "whatever", None)
            .await
            .expect_err("unknown");
        let wrong = fx
            .auth
            .login("a@x.com", "wrong", None)
            .await
            .expect_err("wrong password");
        assert_eq!(unknown, Error::InvalidCredentials);
        assert_eq!(unknown.to_string(), wrong.to_string());
    }

    #[tokio::test]
    async fn unknown_and_locked_logins_pay_the_hash_cost() {
        let fx = fixture();
        registered(&fx, "9876543210", "a@x.com").await;
        let _ = fx.auth.login("warmup@x.com", "whatever", None).await;

        let started = std::time::Instant::now();
        let _ = fx.auth.login("a@x.com", "wrong", None).await;
        let wrong_password = started.elapsed();

        let started = std::time::Instant::now();
        let _ = fx.auth.login("nobody@x.com", "whatever", None).await;
        let unknown = started.elapsed();

        for _ in 0..2 {
            let _ = fx.auth.login("a@x.com", "wrong", None).await;
        }
        let started = std::time::Instant::now();
        let _ = fx.auth.login("a@x.com", "correct horse", None).await;
        let locked = started.elapsed();

        assert!(unknown * 4 >= wrong_password, "{unknown:?} vs {wrong_password:?}");
        assert!(locked * 4 >= wrong_password, "{locked:?} vs {wrong_password:?}");
    }

    #[tokio::test]
    async fn repeated_failures_lock_until_window_passes() {
        let fx = fixture();
        registered(&fx, "9876543210", "a@x.com").await;
        for _ in 0..3 {
            let _ = fx.auth.login("a@x.com", "wrong", None).await;
        }
        assert_eq!(
            fx.auth.login("a@x.com", "correct horse", None).await.err(),
            Some(Error::InvalidCredentials)
        );
        fx.clock.advance(chrono::Duration::minutes(16));
        let outcome = fx
            .auth
            .login("a@x.com", "correct horse", None)
            .await
            .expect("lock expired");
        assert_eq!(outcome.account.failed_login_attempts, 0);
    }

    #[tokio::test]
    async fn otp_requests_are_throttled_per_number() {
        let fx = fixture();
        for _ in 0..3 {
            fx.auth.request_otp("9876543210", "91").await.expect("allowed");
        }
        assert_eq!(
            fx.auth.request_otp("9876543210", "91").await.err(),
            Some(Error::RateLimited)
        );
        assert_eq!(fx.otp.sends_to("+919876543210").await, 3);
    }

    #[tokio::test]
    async fn welcome_sms_failure_does_not_fail_registration() {
        let store = Arc::new(MemoryStore::new());
        let otp = Arc::new(FakeOtpGateway::new("123456"));
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let sessions = Arc::new(SessionIssuer::new(
            "unit-test-secret-1234",
            Duration::from_secs(60),
            clock.clone(),
        ));
        let auth = AuthService::new(
            store,
            otp.clone(),
            Arc::new(RecordingNotifier::failing()),
            sessions,
            clock,
            AuthPolicy {
                default_country_code: "91".to_string(),
                login_max_failures: 5,
                login_lock: Duration::from_secs(900),
                otp_rate_limit: RateLimitConfig::default(),
            },
        );
        otp.send("+919876543210").await.expect("send");
        assert!(auth
            .register(registration("9876543210", "a@x.com"))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn welcome_sms_goes_to_the_new_number() {
        let fx = fixture();
        registered(&fx, "9876543210", "a@x.com").await;
        for _ in 0..50 {
            if !fx.notifier.sent().await.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        let sent = fx.notifier.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "+919876543210");
    }
}
