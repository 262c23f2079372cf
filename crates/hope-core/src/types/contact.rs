// SPDX-License-Identifier: Apache-2.0

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const DEFAULT_COUNTRY_CODE: &str = "91";

const MIN_NATIONAL_DIGITS: usize = 6;
const MAX_E164_DIGITS: usize = 15;
/// Unprefixed national numbers are at most this long; anything longer that
/// already starts with the country code is taken as prefixed.
const MAX_NATIONAL_DIGITS: usize = 10;

/// A phone number split into country code and national part.
///
/// The canonical storage form is the digit string `<country><national>`
/// (`919876543210`); the gateway form is E.164 (`+919876543210`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PhoneNumber {
    country_code: String,
    national: String,
}

impl PhoneNumber {
    pub fn parse(raw: &str, country_code: &str) -> Result<Self> {
        let cc = parse_country_code(country_code)?;
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(Error::validation("phone number is required"));
        }
        let explicit_plus = trimmed.starts_with('+');
        let mut digits = String::with_capacity(trimmed.len());
        for c in trimmed.trim_start_matches('+').chars() {
            match c {
                '0'..='9' => digits.push(c),
                ' ' | '-' | '(' | ')' | '.' => {}
                _ => return Err(Error::validation("phone number may contain only digits")),
            }
        }

        let national = if explicit_plus {
            digits
                .strip_prefix(cc.as_str())
                .ok_or_else(|| {
                    Error::validation("phone number does not match the country code")
                })?
                .to_string()
        } else if digits.len() > MAX_NATIONAL_DIGITS && digits.starts_with(cc.as_str()) {
            digits[cc.len()..].to_string()
        } else {
            digits
        };

        if national.len() < MIN_NATIONAL_DIGITS || cc.len() + national.len() > MAX_E164_DIGITS {
            return Err(Error::validation("phone number has an invalid length"));
        }
        Ok(Self {
            country_code: cc,
            national,
        })
    }

    #[must_use]
    pub fn country_code(&self) -> &str {
        &self.country_code
    }

    #[must_use]
    pub fn national(&self) -> &str {
        &self.national
    }

    #[must_use]
    pub fn canonical(&self) -> String {
        format!("{}{}", self.country_code, self.national)
    }

    #[must_use]
    pub fn e164(&self) -> String {
        format!("+{}{}", self.country_code, self.national)
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "+{}{}", self.country_code, self.national)
    }
}

fn parse_country_code(raw: &str) -> Result<String> {
    let cc = raw.trim().trim_start_matches('+');
    if cc.is_empty() {
        return Err(Error::validation("country code is required"));
    }
    if cc.len() > 3 || !cc.bytes().all(|b| b.is_ascii_digit()) || cc.starts_with('0') {
        return Err(Error::validation("country code must be 1-3 digits"));
    }
    Ok(cc.to_string())
}

/// Trimmed, lowercased, shape-checked email address.
pub fn normalize_email(raw: &str) -> Result<String> {
    let email = raw.trim().to_ascii_lowercase();
    let invalid = || Error::validation("Valid email is required");
    if email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') {
        return Err(invalid());
    }
    let Some((host, tld)) = domain.rsplit_once('.') else {
        return Err(invalid());
    };
    if host.is_empty() || tld.is_empty() {
        return Err(invalid());
    }
    Ok(email)
}
