// SPDX-License-Identifier: Apache-2.0

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use hope_core::{
    Account, AccountId, ChatMessage, ChatRoom, Error, NewAccount, NotificationPreference,
    Participant, ProfileUpdate, Result, Role, RoomId,
};
use rusqlite::types::Type;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use tokio::sync::Mutex;

use super::{AccountStore, ChatStore, Inserted, UniqueField};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS accounts (
    account_id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    phone_number TEXT NOT NULL,
    country_code TEXT NOT NULL,
    email TEXT,
    password_hash TEXT NOT NULL,
    role TEXT NOT NULL,
    admin_phone TEXT,
    failed_login_attempts INTEGER NOT NULL DEFAULT 0,
    is_locked INTEGER NOT NULL DEFAULT 0,
    locked_until TEXT,
    is_active INTEGER NOT NULL DEFAULT 1,
    last_login TEXT,
    notifications TEXT NOT NULL DEFAULT '[]',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE UNIQUE INDEX IF NOT EXISTS ux_accounts_phone_number ON accounts(phone_number);
CREATE UNIQUE INDEX IF NOT EXISTS ux_accounts_email ON accounts(email);
CREATE UNIQUE INDEX IF NOT EXISTS ux_accounts_admin_phone ON accounts(admin_phone);
CREATE INDEX IF NOT EXISTS ix_accounts_role ON accounts(role);

CREATE TABLE IF NOT EXISTS rooms (
    room_id TEXT PRIMARY KEY,
    start_time TEXT NOT NULL,
    end_time TEXT,
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS participants (
    room_id TEXT NOT NULL REFERENCES rooms(room_id) ON DELETE CASCADE,
    position INTEGER NOT NULL,
    account_id TEXT NOT NULL,
    role TEXT NOT NULL,
    PRIMARY KEY (room_id, position)
);
CREATE TABLE IF NOT EXISTS messages (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    room_id TEXT NOT NULL REFERENCES rooms(room_id) ON DELETE CASCADE,
    sender_id TEXT NOT NULL,
    sender_role TEXT NOT NULL,
    content TEXT NOT NULL,
    timestamp TEXT NOT NULL,
    is_sensitive INTEGER NOT NULL DEFAULT 0
);
CREATE INDEX IF NOT EXISTS ix_messages_room ON messages(room_id, seq);
CREATE INDEX IF NOT EXISTS ix_messages_sensitive ON messages(room_id) WHERE is_sensitive = 1;
";

const ACCOUNT_COLUMNS: &str = "account_id, name, phone_number, country_code, email, \
     password_hash, role, admin_phone, failed_login_attempts, is_locked, locked_until, \
     is_active, last_login, notifications, created_at, updated_at";

/// Counter value after one more failure; an expired lock restarts at 1.
const NEXT_FAILURE_COUNT: &str = "(CASE WHEN is_locked = 1 AND locked_until IS NOT NULL \
     AND locked_until <= ?2 THEN 1 ELSE failed_login_attempts + 1 END)";

/// SQLite-backed store. One connection behind a mutex; every call runs on the
/// blocking pool.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

fn store_err(err: rusqlite::Error) -> Error {
    Error::store(err.to_string())
}

/// Timestamps are fixed-width RFC 3339 in UTC so text comparison orders them.
fn ts(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_ts(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn opt_ts(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    row.get::<_, Option<String>>(idx)?
        .map(|raw| parse_ts(idx, &raw))
        .transpose()
}

fn req_ts(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    parse_ts(idx, &row.get::<_, String>(idx)?)
}

fn conversion<E>(idx: usize) -> impl FnOnce(E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    move |e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
}

fn role_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Role> {
    Role::parse(&row.get::<_, String>(idx)?).map_err(conversion(idx))
}

fn account_from_row(row: &Row<'_>) -> rusqlite::Result<Account> {
    let notifications: String = row.get(13)?;
    let notifications: Vec<NotificationPreference> =
        serde_json::from_str(&notifications).map_err(conversion(13))?;
    Ok(Account {
        account_id: AccountId::new(row.get::<_, String>(0)?).map_err(conversion(0))?,
        name: row.get(1)?,
        phone_number: row.get(2)?,
        country_code: row.get(3)?,
        email: row.get(4)?,
        password_hash: row.get(5)?,
        role: role_at(row, 6)?,
        admin_phone: row.get(7)?,
        failed_login_attempts: row.get(8)?,
        is_locked: row.get(9)?,
        locked_until: opt_ts(row, 10)?,
        is_active: row.get(11)?,
        last_login: opt_ts(row, 12)?,
        notifications,
        created_at: req_ts(row, 14)?,
        updated_at: req_ts(row, 15)?,
    })
}

fn message_from_row(row: &Row<'_>) -> rusqlite::Result<ChatMessage> {
    Ok(ChatMessage {
        sender_id: AccountId::new(row.get::<_, String>(0)?).map_err(conversion(0))?,
        sender_role: role_at(row, 1)?,
        content: row.get(2)?,
        timestamp: req_ts(row, 3)?,
        is_sensitive: row.get(4)?,
    })
}

/// Maps a unique-index violation to the duplicate it represents.
fn unique_violation(err: &rusqlite::Error) -> Option<Option<UniqueField>> {
    let rusqlite::Error::SqliteFailure(inner, Some(message)) = err else {
        return None;
    };
    if inner.code != ErrorCode::ConstraintViolation {
        return None;
    }
    if message.contains("accounts.phone_number") {
        Some(Some(UniqueField::PhoneNumber))
    } else if message.contains("accounts.email") {
        Some(Some(UniqueField::Email))
    } else if message.contains("accounts.admin_phone") {
        Some(Some(UniqueField::AdminPhone))
    } else if message.contains(".account_id") || message.contains(".room_id") {
        Some(None)
    } else {
        None
    }
}

fn load_room(conn: &Connection, id: &RoomId) -> rusqlite::Result<Option<ChatRoom>> {
    let header = conn
        .query_row(
            "SELECT start_time, end_time, is_active, created_at FROM rooms WHERE room_id = ?1",
            [id.as_str()],
            |row| {
                Ok((
                    req_ts(row, 0)?,
                    opt_ts(row, 1)?,
                    row.get::<_, bool>(2)?,
                    req_ts(row, 3)?,
                ))
            },
        )
        .optional()?;
    let Some((start_time, end_time, is_active, created_at)) = header else {
        return Ok(None);
    };

    let mut stmt = conn.prepare_cached(
        "SELECT account_id, role FROM participants WHERE room_id = ?1 ORDER BY position",
    )?;
    let participants = stmt
        .query_map([id.as_str()], |row| {
            Ok(Participant {
                account_id: AccountId::new(row.get::<_, String>(0)?).map_err(conversion(0))?,
                role: role_at(row, 1)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut stmt = conn.prepare_cached(
        "SELECT sender_id, sender_role, content, timestamp, is_sensitive \
         FROM messages WHERE room_id = ?1 ORDER BY seq",
    )?;
    let messages = stmt
        .query_map([id.as_str()], message_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(Some(ChatRoom {
        room_id: id.clone(),
        participants,
        messages,
        start_time,
        end_time,
        is_active,
        created_at,
    }))
}

fn load_rooms(conn: &Connection, sql: &str) -> rusqlite::Result<Vec<ChatRoom>> {
    let mut stmt = conn.prepare(sql)?;
    let ids = stmt
        .query_map([], |row| {
            RoomId::new(row.get::<_, String>(0)?).map_err(conversion(0))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    let mut rooms = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(room) = load_room(conn, &id)? {
            rooms.push(room);
        }
    }
    Ok(rooms)
}

impl SqliteStore {
    /// Opens (creating if needed) the database file and applies the schema.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(store_err)?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(store_err)?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL; PRAGMA foreign_keys=ON; \
             PRAGMA busy_timeout=5000;",
        )
        .map_err(store_err)?;
        conn.execute_batch(SCHEMA).map_err(store_err)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn.blocking_lock();
            f(&mut guard)
        })
        .await
        .map_err(|e| Error::store(format!("store task failed: {e}")))?
    }

    async fn account_where(&self, column: &'static str, value: String) -> Result<Option<Account>> {
        self.with_conn(move |conn| {
            conn.query_row(
                &format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE {column} = ?1"),
                [value],
                account_from_row,
            )
            .optional()
            .map_err(store_err)
        })
        .await
    }
}

#[async_trait]
impl AccountStore for SqliteStore {
    async fn insert_account(&self, account: NewAccount) -> Result<Inserted<Account>> {
        let account = account.into_account();
        self.with_conn(move |conn| {
            let notifications = serde_json::to_string(&account.notifications)
                .map_err(|e| Error::store(e.to_string()))?;
            let result = conn.execute(
                &format!(
                    "INSERT INTO accounts ({ACCOUNT_COLUMNS}) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)"
                ),
                params![
                    account.account_id.as_str(),
                    account.name,
                    account.phone_number,
                    account.country_code,
                    account.email,
                    account.password_hash,
                    account.role.as_str(),
                    account.admin_phone,
                    account.failed_login_attempts,
                    account.is_locked,
                    account.locked_until.map(ts),
                    account.is_active,
                    account.last_login.map(ts),
                    notifications,
                    ts(account.created_at),
                    ts(account.updated_at),
                ],
            );
            match result {
                Ok(_) => Ok(Inserted::Stored(account)),
                Err(e) => match unique_violation(&e) {
                    Some(Some(field)) => Err(field.duplicate()),
                    Some(None) => Ok(Inserted::IdTaken),
                    None => Err(store_err(e)),
                },
            }
        })
        .await
    }

    async fn account_by_id(&self, id: &AccountId) -> Result<Option<Account>> {
        self.account_where("account_id", id.to_string()).await
    }

    async fn account_by_phone(&self, phone_number: &str) -> Result<Option<Account>> {
        self.account_where("phone_number", phone_number.to_string())
            .await
    }

    async fn account_by_email(&self, email: &str) -> Result<Option<Account>> {
        self.account_where("email", email.to_string()).await
    }

    async fn list_accounts(&self, roles: &[Role]) -> Result<Vec<Account>> {
        let roles: Vec<&'static str> = roles.iter().map(|r| r.as_str()).collect();
        self.with_conn(move |conn| {
            let placeholders = vec!["?"; roles.len()].join(", ");
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE role IN ({placeholders}) \
                     ORDER BY created_at, account_id"
                ))
                .map_err(store_err)?;
            let rows = stmt
                .query_map(rusqlite::params_from_iter(roles.iter()), account_from_row)
                .map_err(store_err)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
                .map_err(store_err)
        })
        .await
    }

    async fn count_accounts(&self, role: Role) -> Result<u64> {
        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM accounts WHERE role = ?1",
                [role.as_str()],
                |row| row.get::<_, i64>(0),
            )
            .map(|n| u64::try_from(n).unwrap_or(0))
            .map_err(store_err)
        })
        .await
    }

    async fn record_login_failure(
        &self,
        id: &AccountId,
        max_failures: u32,
        now: DateTime<Utc>,
        lock_until: DateTime<Utc>,
    ) -> Result<u32> {
        let id = id.clone();
        self.with_conn(move |conn| {
            conn.query_row(
                &format!(
                    "UPDATE accounts SET \
                     is_locked = CASE WHEN {NEXT_FAILURE_COUNT} >= ?3 THEN 1 ELSE 0 END, \
                     locked_until = CASE WHEN {NEXT_FAILURE_COUNT} >= ?3 THEN ?4 ELSE NULL END, \
                     failed_login_attempts = {NEXT_FAILURE_COUNT}, \
                     updated_at = ?2 \
                     WHERE account_id = ?1 RETURNING failed_login_attempts"
                ),
                params![id.as_str(), ts(now), max_failures, ts(lock_until)],
                |row| row.get::<_, u32>(0),
            )
            .optional()
            .map_err(store_err)?
            .ok_or_else(|| Error::not_found("account"))
        })
        .await
    }

    async fn record_login_success(&self, id: &AccountId, now: DateTime<Utc>) -> Result<()> {
        let id = id.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "UPDATE accounts SET failed_login_attempts = 0, is_locked = 0, \
                 locked_until = NULL, last_login = ?2, updated_at = ?2 WHERE account_id = ?1",
                params![id.as_str(), ts(now)],
            )
            .map(|_| ())
            .map_err(store_err)
        })
        .await
    }

    async fn update_profile(
        &self,
        id: &AccountId,
        update: &ProfileUpdate,
        now: DateTime<Utc>,
    ) -> Result<Option<Account>> {
        let id = id.clone();
        let update = update.clone();
        self.with_conn(move |conn| {
            let result = conn
                .query_row(
                    &format!(
                        "UPDATE accounts SET \
                         phone_number = COALESCE(?2, phone_number), \
                         name = COALESCE(?3, name), \
                         email = COALESCE(?4, email), \
                         admin_phone = COALESCE(?5, admin_phone), \
                         updated_at = ?6 \
                         WHERE account_id = ?1 RETURNING {ACCOUNT_COLUMNS}"
                    ),
                    params![
                        id.as_str(),
                        update.phone_number,
                        update.name,
                        update.email,
                        update.admin_phone,
                        ts(now),
                    ],
                    account_from_row,
                )
                .optional();
            match result {
                Ok(account) => Ok(account),
                Err(e) => match unique_violation(&e) {
                    Some(Some(field)) => Err(field.duplicate()),
                    _ => Err(store_err(e)),
                },
            }
        })
        .await
    }

    async fn set_active(
        &self,
        id: &AccountId,
        role: Role,
        is_active: bool,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let id = id.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "UPDATE accounts SET is_active = ?3, updated_at = ?4 \
                 WHERE account_id = ?1 AND role = ?2",
                params![id.as_str(), role.as_str(), is_active, ts(now)],
            )
            .map(|changed| changed > 0)
            .map_err(store_err)
        })
        .await
    }

    async fn delete_account(&self, id: &AccountId) -> Result<bool> {
        let id = id.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "DELETE FROM accounts WHERE account_id = ?1 AND role != 'admin'",
                [id.as_str()],
            )
            .map(|changed| changed > 0)
            .map_err(store_err)
        })
        .await
    }
}

#[async_trait]
impl ChatStore for SqliteStore {
    async fn insert_room(&self, room: ChatRoom) -> Result<Inserted<ChatRoom>> {
        self.with_conn(move |conn| {
            let tx = conn.transaction().map_err(store_err)?;
            let inserted = tx.execute(
                "INSERT INTO rooms (room_id, start_time, end_time, is_active, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    room.room_id.as_str(),
                    ts(room.start_time),
                    room.end_time.map(ts),
                    room.is_active,
                    ts(room.created_at),
                ],
            );
            if let Err(e) = inserted {
                return match unique_violation(&e) {
                    Some(None) => Ok(Inserted::IdTaken),
                    _ => Err(store_err(e)),
                };
            }
            for (position, participant) in room.participants.iter().enumerate() {
                tx.execute(
                    "INSERT INTO participants (room_id, position, account_id, role) \
                     VALUES (?1, ?2, ?3, ?4)",
                    params![
                        room.room_id.as_str(),
                        position as i64,
                        participant.account_id.as_str(),
                        participant.role.as_str(),
                    ],
                )
                .map_err(store_err)?;
            }
            tx.commit().map_err(store_err)?;
            Ok(Inserted::Stored(room))
        })
        .await
    }

    async fn room(&self, id: &RoomId) -> Result<Option<ChatRoom>> {
        let id = id.clone();
        self.with_conn(move |conn| load_room(conn, &id).map_err(store_err))
            .await
    }

    async fn append_message(&self, id: &RoomId, message: &ChatMessage) -> Result<()> {
        let id = id.clone();
        let message = message.clone();
        self.with_conn(move |conn| {
            let tx = conn.transaction().map_err(store_err)?;
            let exists = tx
                .query_row("SELECT 1 FROM rooms WHERE room_id = ?1", [id.as_str()], |_| {
                    Ok(())
                })
                .optional()
                .map_err(store_err)?
                .is_some();
            if !exists {
                return Err(Error::not_found("Chat room"));
            }
            tx.execute(
                "INSERT INTO messages (room_id, sender_id, sender_role, content, timestamp, is_sensitive) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    id.as_str(),
                    message.sender_id.as_str(),
                    message.sender_role.as_str(),
                    message.content,
                    ts(message.timestamp),
                    message.is_sensitive,
                ],
            )
            .map_err(store_err)?;
            tx.commit().map_err(store_err)
        })
        .await
    }

    async fn close_room(&self, id: &RoomId) -> Result<()> {
        let id = id.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "UPDATE rooms SET is_active = 0 WHERE room_id = ?1",
                [id.as_str()],
            )
            .map(|_| ())
            .map_err(store_err)
        })
        .await
    }

    async fn list_rooms(&self) -> Result<Vec<ChatRoom>> {
        self.with_conn(|conn| {
            load_rooms(conn, "SELECT room_id FROM rooms ORDER BY created_at, room_id")
                .map_err(store_err)
        })
        .await
    }

    async fn list_sensitive_rooms(&self) -> Result<Vec<ChatRoom>> {
        self.with_conn(|conn| {
            load_rooms(
                conn,
                "SELECT r.room_id FROM rooms r WHERE EXISTS \
                 (SELECT 1 FROM messages m WHERE m.room_id = r.room_id AND m.is_sensitive = 1) \
                 ORDER BY r.created_at, r.room_id",
            )
            .map_err(store_err)
        })
        .await
    }
}
