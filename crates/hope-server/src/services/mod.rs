// SPDX-License-Identifier: Apache-2.0

use hope_core::{Account, AccountId, Error, NewAccount, PhoneNumber, Result, Role};

use crate::effect_adapters::random_adapters::id_suffix;
use crate::store::{AccountStore, Inserted};

mod admin;
mod alerts;
mod assistant;
mod auth;
mod chat;

pub use admin::{AdminService, NewAdminInput, NewDoctorInput, ProfileInput};
pub use alerts::AlertService;
pub use assistant::{AssistantReply, AssistantService};
pub use auth::{AuthPolicy, AuthService, LoginOutcome, Registration, RegistrationInput};
pub use chat::ChatManager;

/// Audit target; these lines record who changed what.
pub(crate) const AUDIT_TARGET: &str = "hope_audit";

const ID_ATTEMPTS: usize = 8;

pub(crate) fn non_blank<'a>(value: &'a str, field: &str) -> Result<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::validation(format!("{field} is required")));
    }
    Ok(trimmed)
}

/// A blank or missing country code falls back to `default`.
pub(crate) fn parse_phone(
    raw: &str,
    country_code: Option<&str>,
    default: &str,
) -> Result<PhoneNumber> {
    let cc = country_code
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or(default);
    PhoneNumber::parse(raw, cc)
}

/// Inserts an account under a freshly generated `<role>_<digits>` id,
/// drawing a new suffix whenever the previous one is taken.
pub(crate) async fn insert_with_fresh_id<S, F>(store: &S, role: Role, build: F) -> Result<Account>
where
    S: AccountStore + ?Sized,
    F: Fn(AccountId) -> NewAccount,
{
    for _ in 0..ID_ATTEMPTS {
        let id = AccountId::from_parts(role, id_suffix());
        match store.insert_account(build(id)).await? {
            Inserted::Stored(account) => return Ok(account),
            Inserted::IdTaken => continue,
        }
    }
    Err(Error::store("could not allocate a unique account id"))
}
