// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hope_core::{
    Account, AccountId, ChatMessage, ChatRoom, Error, NewAccount, ProfileUpdate, Result, Role,
    RoomId,
};
use tokio::sync::Mutex;

use super::{AccountStore, ChatStore, Inserted, UniqueField};

/// In-process store for tests and local runs. Each operation holds the lock
/// for its whole check-and-write, which gives the same atomicity as the
/// SQLite unique indexes.
#[derive(Default)]
pub struct MemoryStore {
    accounts: Mutex<BTreeMap<AccountId, Account>>,
    rooms: Mutex<BTreeMap<RoomId, ChatRoom>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn collision(existing: &Account, candidate: &Account) -> Option<UniqueField> {
    if existing.account_id == candidate.account_id {
        return None;
    }
    if existing.phone_number == candidate.phone_number {
        return Some(UniqueField::PhoneNumber);
    }
    if existing.email.is_some() && existing.email == candidate.email {
        return Some(UniqueField::Email);
    }
    if existing.admin_phone.is_some() && existing.admin_phone == candidate.admin_phone {
        return Some(UniqueField::AdminPhone);
    }
    None
}

fn check_unique<'a>(
    mut others: impl Iterator<Item = &'a Account>,
    candidate: &Account,
) -> Result<()> {
    match others.find_map(|existing| collision(existing, candidate)) {
        Some(field) => Err(field.duplicate()),
        None => Ok(()),
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn insert_account(&self, account: NewAccount) -> Result<Inserted<Account>> {
        let mut accounts = self.accounts.lock().await;
        if accounts.contains_key(&account.account_id) {
            return Ok(Inserted::IdTaken);
        }
        let account = account.into_account();
        check_unique(accounts.values(), &account)?;
        accounts.insert(account.account_id.clone(), account.clone());
        Ok(Inserted::Stored(account))
    }

    async fn account_by_id(&self, id: &AccountId) -> Result<Option<Account>> {
        Ok(self.accounts.lock().await.get(id).cloned())
    }

    async fn account_by_phone(&self, phone_number: &str) -> Result<Option<Account>> {
        Ok(self
            .accounts
            .lock()
            .await
            .values()
            .find(|a| a.phone_number == phone_number)
            .cloned())
    }

    async fn account_by_email(&self, email: &str) -> Result<Option<Account>> {
        Ok(self
            .accounts
            .lock()
            .await
            .values()
            .find(|a| a.email.as_deref() == Some(email))
            .cloned())
    }

    async fn list_accounts(&self, roles: &[Role]) -> Result<Vec<Account>> {
        let mut out: Vec<Account> = self
            .accounts
            .lock()
            .await
            .values()
            .filter(|a| roles.contains(&a.role))
            .cloned()
            .collect();
        out.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(out)
    }

    async fn count_accounts(&self, role: Role) -> Result<u64> {
        let count = self
            .accounts
            .lock()
            .await
            .values()
            .filter(|a| a.role == role)
            .count();
        Ok(count as u64)
    }

    async fn record_login_failure(
        &self,
        id: &AccountId,
        max_failures: u32,
        now: DateTime<Utc>,
        lock_until: DateTime<Utc>,
    ) -> Result<u32> {
        let mut accounts = self.accounts.lock().await;
        let account = accounts
            .get_mut(id)
            .ok_or_else(|| Error::not_found("account"))?;
        let lock_expired = account.is_locked && account.locked_until.is_some_and(|t| t <= now);
        account.failed_login_attempts = if lock_expired {
            1
        } else {
            account.failed_login_attempts.saturating_add(1)
        };
        if account.failed_login_attempts >= max_failures {
            account.is_locked = true;
            account.locked_until = Some(lock_until);
        } else {
            account.is_locked = false;
            account.locked_until = None;
        }
        account.updated_at = now;
        Ok(account.failed_login_attempts)
    }

    async fn record_login_success(&self, id: &AccountId, now: DateTime<Utc>) -> Result<()> {
        let mut accounts = self.accounts.lock().await;
        if let Some(account) = accounts.get_mut(id) {
            account.failed_login_attempts = 0;
            account.is_locked = false;
            account.locked_until = None;
            account.last_login = Some(now);
            account.updated_at = now;
        }
        Ok(())
    }

    async fn update_profile(
        &self,
        id: &AccountId,
        update: &ProfileUpdate,
        now: DateTime<Utc>,
    ) -> Result<Option<Account>> {
        let mut accounts = self.accounts.lock().await;
        let Some(current) = accounts.get(id) else {
            return Ok(None);
        };
        let mut next = current.clone();
        if let Some(phone) = &update.phone_number {
            next.phone_number.clone_from(phone);
        }
        if let Some(name) = &update.name {
            next.name.clone_from(name);
        }
        if let Some(email) = &update.email {
            next.email = Some(email.clone());
        }
        if let Some(admin_phone) = &update.admin_phone {
            next.admin_phone = Some(admin_phone.clone());
        }
        next.updated_at = now;
        check_unique(accounts.values(), &next)?;
        accounts.insert(id.clone(), next.clone());
        Ok(Some(next))
    }

    async fn set_active(
        &self,
        id: &AccountId,
        role: Role,
        is_active: bool,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let mut accounts = self.accounts.lock().await;
        match accounts.get_mut(id) {
            Some(account) if account.role == role => {
                account.is_active = is_active;
                account.updated_at = now;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_account(&self, id: &AccountId) -> Result<bool> {
        let mut accounts = self.accounts.lock().await;
        if accounts.get(id).is_some_and(|a| a.role != Role::Admin) {
            accounts.remove(id);
            return Ok(true);
        }
        Ok(false)
    }
}

#[async_trait]
impl ChatStore for MemoryStore {
    async fn insert_room(&self, room: ChatRoom) -> Result<Inserted<ChatRoom>> {
        let mut rooms = self.rooms.lock().await;
        if rooms.contains_key(&room.room_id) {
            return Ok(Inserted::IdTaken);
        }
        rooms.insert(room.room_id.clone(), room.clone());
        Ok(Inserted::Stored(room))
    }

    async fn room(&self, id: &RoomId) -> Result<Option<ChatRoom>> {
        Ok(self.rooms.lock().await.get(id).cloned())
    }

    async fn append_message(&self, id: &RoomId, message: &ChatMessage) -> Result<()> {
        let mut rooms = self.rooms.lock().await;
        let room = rooms
            .get_mut(id)
            .ok_or_else(|| Error::not_found("Chat room"))?;
        room.messages.push(message.clone());
        Ok(())
    }

    async fn close_room(&self, id: &RoomId) -> Result<()> {
        if let Some(room) = self.rooms.lock().await.get_mut(id) {
            room.is_active = false;
        }
        Ok(())
    }

    async fn list_rooms(&self) -> Result<Vec<ChatRoom>> {
        let mut out: Vec<ChatRoom> = self.rooms.lock().await.values().cloned().collect();
        out.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(out)
    }

    async fn list_sensitive_rooms(&self) -> Result<Vec<ChatRoom>> {
        let mut out: Vec<ChatRoom> = self
            .rooms
            .lock()
            .await
            .values()
            .filter(|room| room.has_sensitive_message())
            .cloned()
            .collect();
        out.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(out)
    }
}
