// SPDX-License-Identifier: Apache-2.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{AccountId, Role, RoomId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationChannel {
    Sms,
    Email,
}

impl NotificationChannel {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sms => "sms",
            Self::Email => "email",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPreference {
    pub channel: NotificationChannel,
    pub contact: String,
    pub created_at: DateTime<Utc>,
}

/// A stored account. `password_hash` is an argon2 PHC string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub account_id: AccountId,
    pub name: String,
    pub phone_number: String,
    pub country_code: String,
    pub email: Option<String>,
    pub password_hash: String,
    pub role: Role,
    pub admin_phone: Option<String>,
    pub failed_login_attempts: u32,
    pub is_locked: bool,
    pub locked_until: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub notifications: Vec<NotificationPreference>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// A lock whose expiry has passed no longer applies.
    #[must_use]
    pub fn is_locked_at(&self, now: DateTime<Utc>) -> bool {
        self.is_locked && self.locked_until.is_none_or(|until| until > now)
    }
}

/// Everything needed to insert an account; counters start at zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    pub account_id: AccountId,
    pub name: String,
    pub phone_number: String,
    pub country_code: String,
    pub email: Option<String>,
    pub password_hash: String,
    pub role: Role,
    pub admin_phone: Option<String>,
    pub notifications: Vec<NotificationPreference>,
    pub created_at: DateTime<Utc>,
}

impl NewAccount {
    #[must_use]
    pub fn into_account(self) -> Account {
        Account {
            account_id: self.account_id,
            name: self.name,
            phone_number: self.phone_number,
            country_code: self.country_code,
            email: self.email,
            password_hash: self.password_hash,
            role: self.role,
            admin_phone: self.admin_phone,
            failed_login_attempts: 0,
            is_locked: false,
            locked_until: None,
            is_active: true,
            last_login: None,
            notifications: self.notifications,
            created_at: self.created_at,
            updated_at: self.created_at,
        }
    }
}

/// Partial admin profile update; `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub phone_number: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub admin_phone: Option<String>,
}

impl ProfileUpdate {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.phone_number.is_none()
            && self.name.is_none()
            && self.email.is_none()
            && self.admin_phone.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Participant {
    pub account_id: AccountId,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub sender_id: AccountId,
    pub sender_role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub is_sensitive: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRoom {
    pub room_id: RoomId,
    pub participants: Vec<Participant>,
    pub messages: Vec<ChatMessage>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl ChatRoom {
    /// Membership is an exact match on both id and role.
    #[must_use]
    pub fn is_participant(&self, account_id: &AccountId, role: Role) -> bool {
        self.participants
            .iter()
            .any(|p| &p.account_id == account_id && p.role == role)
    }

    #[must_use]
    pub fn has_sensitive_message(&self) -> bool {
        self.messages.iter().any(|m| m.is_sensitive)
    }

    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        !self.is_active || self.end_time.is_some_and(|end| end <= now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn room(now: DateTime<Utc>) -> ChatRoom {
        ChatRoom {
            room_id: RoomId::from_suffix(123_456),
            participants: vec![
                Participant {
                    account_id: AccountId::from_parts(Role::User, 111_111),
                    role: Role::User,
                },
                Participant {
                    account_id: AccountId::from_parts(Role::Doctor, 222_222),
                    role: Role::Doctor,
                },
            ],
            messages: Vec::new(),
            start_time: now,
            end_time: Some(now + Duration::minutes(5)),
            is_active: true,
            created_at: now,
        }
    }

    #[test]
    fn membership_requires_matching_role() {
        let now = Utc::now();
        let room = room(now);
        let user = AccountId::from_parts(Role::User, 111_111);
        assert!(room.is_participant(&user, Role::User));
        assert!(!room.is_participant(&user, Role::Doctor));
    }

    #[test]
    fn room_expires_at_end_time() {
        let now = Utc::now();
        let room = room(now);
        assert!(!room.is_expired_at(now));
        assert!(room.is_expired_at(now + Duration::minutes(5)));
    }

    #[test]
    fn elapsed_lock_no_longer_applies() {
        let now = Utc::now();
        let mut account = NewAccount {
            account_id: AccountId::from_parts(Role::User, 333_333),
            name: "Asha".to_string(),
            phone_number: "919876543210".to_string(),
            country_code: "91".to_string(),
            email: Some("asha@x.com".to_string()),
            password_hash: "hash".to_string(),
            role: Role::User,
            admin_phone: None,
            notifications: Vec::new(),
            created_at: now,
        }
        .into_account();
        account.is_locked = true;
        account.locked_until = Some(now + Duration::minutes(1));
        assert!(account.is_locked_at(now));
        assert!(!account.is_locked_at(now + Duration::minutes(2)));
    }
}
