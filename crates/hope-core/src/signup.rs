// SPDX-License-Identifier: Apache-2.0

use std::fmt;

use crate::error::{Error, Result};

/// Progress of one phone number through self-registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignupState {
    #[default]
    Start,
    OtpRequested,
    OtpVerified,
    AccountCreated,
    SessionIssued,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignupEvent {
    OtpSent,
    OtpApproved,
    AccountStored,
    TokenIssued,
}

impl SignupState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::OtpRequested => "otp_requested",
            Self::OtpVerified => "otp_verified",
            Self::AccountCreated => "account_created",
            Self::SessionIssued => "session_issued",
        }
    }

    /// Forward-only transitions. A fresh OTP request restarts verification
    /// until the account exists; after that nothing moves backwards.
    pub fn advance(self, event: SignupEvent) -> Result<Self> {
        use SignupEvent as E;
        use SignupState as S;
        match (self, event) {
            (S::Start | S::OtpRequested | S::OtpVerified, E::OtpSent) => Ok(S::OtpRequested),
            (S::OtpRequested, E::OtpApproved) => Ok(S::OtpVerified),
            (S::OtpVerified, E::AccountStored) => Ok(S::AccountCreated),
            (S::AccountCreated, E::TokenIssued) => Ok(S::SessionIssued),
            (state, event) => Err(Error::validation(format!(
                "signup cannot handle {event:?} in state {state}"
            ))),
        }
    }
}

impl fmt::Display for SignupState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_reaches_session_issued() {
        let state = SignupState::Start
            .advance(SignupEvent::OtpSent)
            .and_then(|s| s.advance(SignupEvent::OtpApproved))
            .and_then(|s| s.advance(SignupEvent::AccountStored))
            .and_then(|s| s.advance(SignupEvent::TokenIssued))
            .expect("forward path");
        assert_eq!(state, SignupState::SessionIssued);
    }

    #[test]
    fn re_requesting_otp_resets_verification() {
        let verified = SignupState::OtpRequested
            .advance(SignupEvent::OtpApproved)
            .expect("verified");
        assert_eq!(
            verified.advance(SignupEvent::OtpSent).expect("reset"),
            SignupState::OtpRequested
        );
    }

    #[test]
    fn no_transition_leaves_account_created_backwards() {
        assert!(SignupState::AccountCreated
            .advance(SignupEvent::OtpSent)
            .is_err());
        assert!(SignupState::Start
            .advance(SignupEvent::AccountStored)
            .is_err());
    }
}
