// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;
use std::time::Duration;

use hope_core::{
    classify, AccountId, ChatMessage, ChatRoom, Error, Participant, Result, Role, RoomId,
};
use tracing::info;

use crate::effect_adapters::clock_adapters::{to_chrono, Clock};
use crate::effect_adapters::random_adapters::id_suffix;
use crate::session::{require_role, Session};
use crate::store::{AccountStore, ChatStore, Inserted, Store};

const ROOM_ID_ATTEMPTS: usize = 8;

/// Two-party rooms and their transcripts.
pub struct ChatManager {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    room_duration: Duration,
}

fn parse_room_id(raw: &str) -> Result<RoomId> {
    RoomId::new(raw.trim()).map_err(|_| Error::not_found("Chat room"))
}

impl ChatManager {
    #[must_use]
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>, room_duration: Duration) -> Self {
        Self {
            store,
            clock,
            room_duration,
        }
    }

    /// Opens a room between the calling user and an active doctor.
    pub async fn create_room(&self, session: &Session, doctor_id: &str) -> Result<ChatRoom> {
        require_role(session, &[Role::User])
            .map_err(|_| Error::forbidden("Only users can create chat rooms"))?;
        let doctor_id = doctor_id.trim();
        if doctor_id.is_empty() {
            return Err(Error::validation("doctorId is required"));
        }
        let doctor_id = AccountId::new(doctor_id).map_err(|_| Error::not_found("Doctor"))?;
        let doctor = self
            .store
            .account_by_id(&doctor_id)
            .await?
            .filter(|a| a.role == Role::Doctor && a.is_active)
            .ok_or_else(|| Error::not_found("Doctor"))?;

        let now = self.clock.now();
        for _ in 0..ROOM_ID_ATTEMPTS {
            let room = ChatRoom {
                room_id: RoomId::from_suffix(id_suffix()),
                participants: vec![
                    Participant {
                        account_id: session.account_id.clone(),
                        role: session.role,
                    },
                    Participant {
                        account_id: doctor.account_id.clone(),
                        role: Role::Doctor,
                    },
                ],
                messages: Vec::new(),
                start_time: now,
                end_time: Some(now + to_chrono(self.room_duration)),
                is_active: true,
                created_at: now,
            };
            if let Inserted::Stored(room) = self.store.insert_room(room).await? {
                info!(
                    room_id = %room.room_id,
                    user_id = %session.account_id,
                    doctor_id = %doctor.account_id,
                    "chat room created"
                );
                return Ok(room);
            }
        }
        Err(Error::store("could not allocate a unique room id"))
    }

    /// Transcript for a participant. Anyone else gets `Forbidden`.
    pub async fn get_history(&self, room_id: &str, session: &Session) -> Result<ChatRoom> {
        let room_id = parse_room_id(room_id)?;
        let room = self
            .store
            .room(&room_id)
            .await?
            .ok_or_else(|| Error::not_found("Chat room"))?;
        if !room.is_participant(&session.account_id, session.role) {
            return Err(Error::forbidden("Access denied"));
        }
        Ok(room)
    }

    pub async fn is_participant(&self, room_id: &RoomId, id: &AccountId, role: Role) -> Result<bool> {
        let room = self
            .store
            .room(room_id)
            .await?
            .ok_or_else(|| Error::not_found("Chat room"))?;
        Ok(room.is_participant(id, role))
    }

    /// Classifies and stores one message with the server timestamp. Does not
    /// check membership; callers do.
    pub async fn append_message(
        &self,
        room_id: &RoomId,
        sender_id: &AccountId,
        sender_role: Role,
        content: &str,
    ) -> Result<ChatMessage> {
        if content.trim().is_empty() {
            return Err(Error::validation("message is required"));
        }
        let room = self
            .store
            .room(room_id)
            .await?
            .ok_or_else(|| Error::not_found("Chat room"))?;
        let now = self.clock.now();
        if room.is_expired_at(now) {
            if room.is_active {
                self.close_room(room_id).await?;
            }
            return Err(Error::RoomClosed(room_id.to_string()));
        }
        let message = ChatMessage {
            sender_id: sender_id.clone(),
            sender_role,
            content: content.to_string(),
            timestamp: now,
            is_sensitive: classify(content),
        };
        self.store.append_message(room_id, &message).await?;
        Ok(message)
    }

    pub async fn close_room(&self, room_id: &RoomId) -> Result<()> {
        self.store.close_room(room_id).await?;
        info!(room_id = %room_id, "chat room closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect_adapters::clock_adapters::ManualClock;
    use crate::store::{AccountStore, ChatStore, MemoryStore};
    use chrono::Utc;
    use hope_core::NewAccount;

    async fn seed(store: &MemoryStore, role: Role, suffix: u32, active: bool) -> AccountId {
        let id = AccountId::from_parts(role, suffix);
        store
            .insert_account(NewAccount {
                account_id: id.clone(),
                name: format!("{role} {suffix}"),
                phone_number: format!("91900000{suffix}"),
                country_code: "91".to_string(),
                email: None,
                password_hash: "x".to_string(),
                role,
                admin_phone: None,
                notifications: Vec::new(),
                created_at: Utc::now(),
            })
            .await
            .expect("seed");
        if !active {
            store
                .set_active(&id, role, false, Utc::now())
                .await
                .expect("deactivate");
        }
        id
    }

    fn session(id: &AccountId, role: Role) -> Session {
        Session {
            account_id: id.clone(),
            role,
            expires_at: Utc::now(),
        }
    }

    fn manager(store: Arc<MemoryStore>, clock: Arc<ManualClock>) -> ChatManager {
        ChatManager::new(store, clock, Duration::from_secs(300))
    }

    #[tokio::test]
    async fn user_opens_room_with_active_doctor() {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let user = seed(&store, Role::User, 100_001, true).await;
        let doctor = seed(&store, Role::Doctor, 100_002, true).await;
        let chats = manager(store, clock.clone());

        let room = chats
            .create_room(&session(&user, Role::User), doctor.as_str())
            .await
            .expect("room");
        assert!(room.room_id.as_str().starts_with("room_"));
        assert_eq!(room.participants[0].account_id, user);
        assert_eq!(room.participants[1].account_id, doctor);
        assert_eq!(room.end_time, Some(clock.now() + chrono::Duration::minutes(5)));
    }

    #[tokio::test]
    async fn only_users_open_rooms_and_only_with_active_doctors() {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let user = seed(&store, Role::User, 100_001, true).await;
        let doctor = seed(&store, Role::Doctor, 100_002, true).await;
        let retired = seed(&store, Role::Doctor, 100_003, false).await;
        let chats = manager(store, clock);

        let err = chats
            .create_room(&session(&doctor, Role::Doctor), doctor.as_str())
            .await
            .expect_err("doctor cannot open");
        assert!(matches!(err, Error::Forbidden(_)));
        for target in [retired.as_str(), user.as_str(), "doctor_999999", "not valid"] {
            let err = chats
                .create_room(&session(&user, Role::User), target)
                .await
                .expect_err("no such doctor");
            assert!(matches!(err, Error::NotFound(_)), "{target}");
        }
    }

    #[tokio::test]
    async fn history_is_participant_only() {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let user = seed(&store, Role::User, 100_001, true).await;
        let doctor = seed(&store, Role::Doctor, 100_002, true).await;
        let stranger = seed(&store, Role::User, 100_004, true).await;
        let chats = manager(store, clock);
        let room = chats
            .create_room(&session(&user, Role::User), doctor.as_str())
            .await
            .expect("room");

        assert!(chats
            .get_history(room.room_id.as_str(), &session(&doctor, Role::Doctor))
            .await
            .is_ok());
        let err = chats
            .get_history(room.room_id.as_str(), &session(&stranger, Role::User))
            .await
            .expect_err("stranger");
        assert!(matches!(err, Error::Forbidden(_)));
        // Right id, wrong role.
        let err = chats
            .get_history(room.room_id.as_str(), &session(&user, Role::Doctor))
            .await
            .expect_err("role mismatch");
        assert!(matches!(err, Error::Forbidden(_)));
        let err = chats
            .get_history("room_000000", &session(&user, Role::User))
            .await
            .expect_err("absent");
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn appends_are_classified_and_stop_after_end_time() {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let user = seed(&store, Role::User, 100_001, true).await;
        let doctor = seed(&store, Role::Doctor, 100_002, true).await;
        let chats = manager(store.clone(), clock.clone());
        let room = chats
            .create_room(&session(&user, Role::User), doctor.as_str())
            .await
            .expect("room");

        let calm = chats
            .append_message(&room.room_id, &user, Role::User, "hello doctor")
            .await
            .expect("append");
        assert!(!calm.is_sensitive);
        let flagged = chats
            .append_message(&room.room_id, &user, Role::User, "I want to KILL myself")
            .await
            .expect("append");
        assert!(flagged.is_sensitive);

        clock.advance(chrono::Duration::minutes(5));
        let err = chats
            .append_message(&room.room_id, &doctor, Role::Doctor, "still there?")
            .await
            .expect_err("closed");
        assert!(matches!(err, Error::RoomClosed(_)));
        let stored = store.room(&room.room_id).await.expect("load").expect("present");
        assert!(!stored.is_active);
        assert_eq!(stored.messages.len(), 2);
    }
}
