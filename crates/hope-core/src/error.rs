// SPDX-License-Identifier: Apache-2.0

use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

/// Failure taxonomy shared by every service in the workspace.
///
/// Variants carry only text that is safe to show a client. Store and gateway
/// internals are logged where they occur and reduced to a short message here.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    Validation(String),
    OtpInvalid,
    DuplicateAccount(String),
    InvalidCredentials,
    Auth,
    Forbidden(String),
    NotFound(String),
    RoomClosed(String),
    RateLimited,
    Gateway(String),
    Store(String),
}

impl Error {
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    #[must_use]
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    #[must_use]
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store(message.into())
    }

    #[must_use]
    pub fn gateway(message: impl Into<String>) -> Self {
        Self::Gateway(message.into())
    }

    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::OtpInvalid => "otp_invalid",
            Self::DuplicateAccount(_) => "duplicate_account",
            Self::InvalidCredentials => "invalid_credentials",
            Self::Auth => "auth",
            Self::Forbidden(_) => "forbidden",
            Self::NotFound(_) => "not_found",
            Self::RoomClosed(_) => "room_closed",
            Self::RateLimited => "rate_limited",
            Self::Gateway(_) => "gateway",
            Self::Store(_) => "store",
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation(msg) => write!(f, "{msg}"),
            Self::OtpInvalid => f.write_str("Invalid OTP"),
            Self::DuplicateAccount(msg) => write!(f, "{msg}"),
            Self::InvalidCredentials => f.write_str("Invalid credentials"),
            Self::Auth => f.write_str("Please authenticate."),
            Self::Forbidden(msg) => write!(f, "{msg}"),
            Self::NotFound(what) => write!(f, "{what} not found"),
            Self::RoomClosed(room) => write!(f, "chat room {room} has ended"),
            Self::RateLimited => f.write_str("Too many requests, please retry later"),
            Self::Gateway(msg) => write!(f, "{msg}"),
            Self::Store(msg) => write!(f, "store failure: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_failures_render_one_message() {
        assert_eq!(Error::InvalidCredentials.to_string(), "Invalid credentials");
        assert_eq!(Error::Auth.to_string(), "Please authenticate.");
    }

    #[test]
    fn not_found_names_the_missing_entity() {
        assert_eq!(Error::not_found("Doctor").to_string(), "Doctor not found");
        assert_eq!(Error::not_found("Doctor").kind(), "not_found");
    }
}
