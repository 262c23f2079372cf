// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use hope_core::{
    normalize_email, Account, AccountId, ChatRoom, Error, NewAccount, NotificationChannel,
    NotificationPreference, PhoneNumber, ProfileUpdate, Result, Role,
};
use tracing::info;

use super::{insert_with_fresh_id, non_blank, parse_phone, AUDIT_TARGET};
use crate::effect_adapters::clock_adapters::Clock;
use crate::password::hash_password;
use crate::session::{require_role, Session};
use crate::store::{AccountStore, ChatStore, Store};

#[derive(Debug, Clone, Default)]
pub struct NewDoctorInput {
    pub phone_number: String,
    pub name: String,
    pub password: String,
    pub email: Option<String>,
    pub country_code: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct NewAdminInput {
    pub phone_number: String,
    pub name: String,
    pub password: String,
    pub email: String,
    pub admin_phone: String,
    pub country_code: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ProfileInput {
    pub phone_number: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub admin_phone: Option<String>,
}

/// Admin-only account and transcript management.
pub struct AdminService {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    default_country_code: String,
}

fn admin_only(session: &Session) -> Result<()> {
    require_role(session, &[Role::Admin])
}

fn parse_target(raw: &str, what: &str) -> Result<AccountId> {
    AccountId::new(raw.trim()).map_err(|_| Error::not_found(what))
}

impl AdminService {
    #[must_use]
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>, default_country_code: String) -> Self {
        Self {
            store,
            clock,
            default_country_code,
        }
    }

    fn phone(&self, raw: &str, country_code: Option<&str>) -> Result<PhoneNumber> {
        parse_phone(raw, country_code, &self.default_country_code)
    }

    /// Every account that is not an admin.
    pub async fn list_users(&self, session: &Session) -> Result<Vec<Account>> {
        admin_only(session)?;
        self.store.list_accounts(&[Role::User, Role::Doctor]).await
    }

    pub async fn list_doctors(&self, session: &Session) -> Result<Vec<Account>> {
        admin_only(session)?;
        self.store.list_accounts(&[Role::Doctor]).await
    }

    pub async fn create_doctor(&self, session: &Session, input: NewDoctorInput) -> Result<Account> {
        admin_only(session)?;
        let name = non_blank(&input.name, "name")?.to_string();
        let phone = self.phone(
            non_blank(&input.phone_number, "phoneNumber")?,
            input.country_code.as_deref(),
        )?;
        if input.password.is_empty() {
            return Err(Error::validation("password is required"));
        }
        let email = match input.email.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => Some(normalize_email(raw)?),
            _ => None,
        };
        let password_hash = hash_password(input.password).await?;
        let now = self.clock.now();
        let canonical = phone.canonical();
        let account = insert_with_fresh_id(self.store.as_ref(), Role::Doctor, |account_id| {
            NewAccount {
                account_id,
                name: name.clone(),
                phone_number: canonical.clone(),
                country_code: phone.country_code().to_string(),
                email: email.clone(),
                password_hash: password_hash.clone(),
                role: Role::Doctor,
                admin_phone: None,
                notifications: vec![NotificationPreference {
                    channel: NotificationChannel::Sms,
                    contact: canonical.clone(),
                    created_at: now,
                }],
                created_at: now,
            }
        })
        .await?;
        info!(
            target: AUDIT_TARGET,
            event = "doctor_created",
            admin_id = %session.account_id,
            account_id = %account.account_id,
        );
        Ok(account)
    }

    pub async fn create_admin(&self, session: &Session, input: NewAdminInput) -> Result<Account> {
        admin_only(session)?;
        let name = non_blank(&input.name, "name")?.to_string();
        let raw_phone = non_blank(&input.phone_number, "phoneNumber")?.to_string();
        let raw_email = non_blank(&input.email, "email")?.to_string();
        let raw_admin_phone = non_blank(&input.admin_phone, "adminPhone")?.to_string();
        if input.password.is_empty() {
            return Err(Error::validation("password is required"));
        }
        let country_code = input.country_code.as_deref();
        let phone = self.phone(&raw_phone, country_code)?;
        let admin_phone = self.phone(&raw_admin_phone, country_code)?.canonical();
        let email = normalize_email(&raw_email)?;
        let password_hash = hash_password(input.password).await?;
        let now = self.clock.now();
        let canonical = phone.canonical();
        let account = insert_with_fresh_id(self.store.as_ref(), Role::Admin, |account_id| {
            NewAccount {
                account_id,
                name: name.clone(),
                phone_number: canonical.clone(),
                country_code: phone.country_code().to_string(),
                email: Some(email.clone()),
                password_hash: password_hash.clone(),
                role: Role::Admin,
                admin_phone: Some(admin_phone.clone()),
                notifications: vec![NotificationPreference {
                    channel: NotificationChannel::Sms,
                    contact: admin_phone.clone(),
                    created_at: now,
                }],
                created_at: now,
            }
        })
        .await?;
        info!(
            target: AUDIT_TARGET,
            event = "admin_created",
            admin_id = %session.account_id,
            account_id = %account.account_id,
        );
        Ok(account)
    }

    /// Updates the caller's own admin record in a single write.
    pub async fn update_profile(&self, session: &Session, input: ProfileInput) -> Result<Account> {
        admin_only(session)?;
        let present = |v: &Option<String>| {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        let update = ProfileUpdate {
            phone_number: present(&input.phone_number)
                .map(|raw| self.phone(&raw, None).map(|p| p.canonical()))
                .transpose()?,
            name: present(&input.name),
            email: present(&input.email)
                .map(|raw| normalize_email(&raw))
                .transpose()?,
            admin_phone: present(&input.admin_phone)
                .map(|raw| self.phone(&raw, None).map(|p| p.canonical()))
                .transpose()?,
        };
        if update.is_empty() {
            return Err(Error::validation("No profile fields to update"));
        }
        let account = self
            .store
            .update_profile(&session.account_id, &update, self.clock.now())
            .await?
            .ok_or_else(|| Error::not_found("Admin"))?;
        info!(
            target: AUDIT_TARGET,
            event = "admin_profile_updated",
            admin_id = %session.account_id,
        );
        Ok(account)
    }

    pub async fn update_doctor_status(
        &self,
        session: &Session,
        doctor_id: &str,
        is_active: bool,
    ) -> Result<()> {
        admin_only(session)?;
        let doctor_id = parse_target(doctor_id, "Doctor")?;
        let updated = self
            .store
            .set_active(&doctor_id, Role::Doctor, is_active, self.clock.now())
            .await?;
        if !updated {
            return Err(Error::not_found("Doctor"));
        }
        info!(
            target: AUDIT_TARGET,
            event = "doctor_status_changed",
            admin_id = %session.account_id,
            doctor_id = %doctor_id,
            is_active,
        );
        Ok(())
    }

    /// Removes a user or doctor account. Admin accounts are not deletable.
    pub async fn delete_user(&self, session: &Session, account_id: &str) -> Result<()> {
        admin_only(session)?;
        let account_id = parse_target(account_id, "User")?;
        if !self.store.delete_account(&account_id).await? {
            return Err(Error::not_found("User"));
        }
        info!(
            target: AUDIT_TARGET,
            event = "account_deleted",
            admin_id = %session.account_id,
            account_id = %account_id,
        );
        Ok(())
    }

    pub async fn list_chats(&self, session: &Session) -> Result<Vec<ChatRoom>> {
        admin_only(session)?;
        self.store.list_rooms().await
    }

    /// Rooms holding at least one flagged message.
    pub async fn list_sensitive_chats(&self, session: &Session) -> Result<Vec<ChatRoom>> {
        admin_only(session)?;
        self.store.list_sensitive_rooms().await
    }

    /// Creates the first admin from configuration when none exists yet.
    pub async fn seed_admin(
        &self,
        name: &str,
        phone_number: &str,
        email: &str,
        password: &str,
    ) -> Result<Option<Account>> {
        if self.store.count_accounts(Role::Admin).await? > 0 {
            return Ok(None);
        }
        let bootstrap = Session {
            account_id: AccountId::from_parts(Role::Admin, 0),
            role: Role::Admin,
            expires_at: self.clock.now(),
        };
        let account = self
            .create_admin(
                &bootstrap,
                NewAdminInput {
                    phone_number: phone_number.to_string(),
                    name: name.to_string(),
                    password: password.to_string(),
                    email: email.to_string(),
                    admin_phone: phone_number.to_string(),
                    country_code: None,
                },
            )
            .await?;
        Ok(Some(account))
    }
}
