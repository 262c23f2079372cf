// SPDX-License-Identifier: Apache-2.0

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::role::Role;

/// Random numeric suffixes are six digits, `100000..=999999`.
pub const ID_SUFFIX_MIN: u32 = 100_000;
pub const ID_SUFFIX_MAX: u32 = 999_999;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountId(String);

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoomId(String);

impl AccountId {
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        validate_id("account id", &value)?;
        Ok(Self(value))
    }

    /// `<role>_<suffix>`, e.g. `doctor_482913`.
    #[must_use]
    pub fn from_parts(role: Role, suffix: u32) -> Self {
        Self(format!("{}_{}", role.as_str(), clamp_suffix(suffix)))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl RoomId {
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        validate_id("room id", &value)?;
        Ok(Self(value))
    }

    #[must_use]
    pub fn from_suffix(suffix: u32) -> Self {
        Self(format!("room_{}", clamp_suffix(suffix)))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn clamp_suffix(suffix: u32) -> u32 {
    suffix.clamp(ID_SUFFIX_MIN, ID_SUFFIX_MAX)
}

fn validate_id(kind: &'static str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(Error::validation(format!("{kind} must not be empty")));
    }
    if value.len() > 64 {
        return Err(Error::validation(format!(
            "{kind} must be at most 64 characters"
        )));
    }
    if !value
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
    {
        return Err(Error::validation(format!(
            "{kind} must contain only [a-z0-9_-]"
        )));
    }
    Ok(())
}

macro_rules! impl_id_traits {
    ($name:ident) => {
        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = Error;

            fn try_from(value: String) -> Result<Self> {
                Self::new(value)
            }
        }

        impl TryFrom<&str> for $name {
            type Error = Error;

            fn try_from(value: &str) -> Result<Self> {
                Self::new(value)
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                Self::new(s)
            }
        }
    };
}

impl_id_traits!(AccountId);
impl_id_traits!(RoomId);
