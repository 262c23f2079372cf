// SPDX-License-Identifier: Apache-2.0

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hope_core::{
    Account, AccountId, ChatMessage, ChatRoom, Error, NewAccount, ProfileUpdate, Result, Role,
    RoomId,
};
use tracing::{error, warn};

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub base_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            base_backoff_ms: 2_000,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based): base, 2*base, 4*base...
    #[must_use]
    pub fn backoff(&self, attempt: usize) -> Duration {
        let shift = u32::try_from(attempt.saturating_sub(1)).unwrap_or(u32::MAX).min(16);
        Duration::from_millis(self.base_backoff_ms.saturating_mul(1_u64 << shift))
    }
}

/// Outcome of an insert whose generated id may collide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inserted<T> {
    Stored(T),
    IdTaken,
}

/// Account persistence. Uniqueness of phone number, email and admin phone is
/// enforced by the implementation at write time, so concurrent registrations
/// of the same number cannot both succeed.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn insert_account(&self, account: NewAccount) -> Result<Inserted<Account>>;
    async fn account_by_id(&self, id: &AccountId) -> Result<Option<Account>>;
    async fn account_by_phone(&self, phone_number: &str) -> Result<Option<Account>>;
    async fn account_by_email(&self, email: &str) -> Result<Option<Account>>;
    async fn list_accounts(&self, roles: &[Role]) -> Result<Vec<Account>>;
    async fn count_accounts(&self, role: Role) -> Result<u64>;

    /// Bumps the failure counter in one write and locks the account once it
    /// reaches `max_failures`. An expired lock restarts the count. Returns the
    /// new counter value.
    async fn record_login_failure(
        &self,
        id: &AccountId,
        max_failures: u32,
        now: DateTime<Utc>,
        lock_until: DateTime<Utc>,
    ) -> Result<u32>;
    async fn record_login_success(&self, id: &AccountId, now: DateTime<Utc>) -> Result<()>;

    /// `None` when no account has this id.
    async fn update_profile(
        &self,
        id: &AccountId,
        update: &ProfileUpdate,
        now: DateTime<Utc>,
    ) -> Result<Option<Account>>;
    /// Only touches accounts holding `role`; false when none matched.
    async fn set_active(
        &self,
        id: &AccountId,
        role: Role,
        is_active: bool,
        now: DateTime<Utc>,
    ) -> Result<bool>;
    /// Admin accounts are never deleted through this path.
    async fn delete_account(&self, id: &AccountId) -> Result<bool>;
}

#[async_trait]
pub trait ChatStore: Send + Sync {
    async fn insert_room(&self, room: ChatRoom) -> Result<Inserted<ChatRoom>>;
    async fn room(&self, id: &RoomId) -> Result<Option<ChatRoom>>;
    /// Appends in one transaction; `NotFound` when the room is absent.
    async fn append_message(&self, id: &RoomId, message: &ChatMessage) -> Result<()>;
    async fn close_room(&self, id: &RoomId) -> Result<()>;
    async fn list_rooms(&self) -> Result<Vec<ChatRoom>>;
    async fn list_sensitive_rooms(&self) -> Result<Vec<ChatRoom>>;
}

/// Unique account columns; a collision on any of them is a duplicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UniqueField {
    PhoneNumber,
    Email,
    AdminPhone,
}

impl UniqueField {
    pub(crate) fn duplicate(self) -> Error {
        Error::DuplicateAccount(
            match self {
                Self::PhoneNumber => "An account with this phone number already exists",
                Self::Email => "An account with this email already exists",
                Self::AdminPhone => "An admin with this admin phone already exists",
            }
            .to_string(),
        )
    }
}

pub trait Store: AccountStore + ChatStore {}

impl<T: AccountStore + ChatStore> Store for T {}

/// Runs `connect` until it succeeds or the policy is exhausted, sleeping
/// with doubling backoff between attempts.
pub async fn connect_with_retry<T, E, F, Fut>(
    policy: &RetryPolicy,
    mut connect: F,
) -> std::result::Result<T, String>
where
    E: std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match connect().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt >= policy.max_attempts => {
                error!(attempt, "store connection failed, giving up: {e}");
                return Err(format!(
                    "store unavailable after {attempt} attempts: {e}"
                ));
            }
            Err(e) => {
                let delay = policy.backoff(attempt);
                warn!(
                    attempt,
                    max_attempts = policy.max_attempts,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    "store connection failed, retrying: {e}"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
