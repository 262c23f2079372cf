// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

pub mod error;
pub mod model;
pub mod sensitive;
pub mod signup;
pub mod types;

pub use error::{Error, Result};
pub use model::{
    Account, ChatMessage, ChatRoom, NewAccount, NotificationChannel, NotificationPreference,
    Participant, ProfileUpdate,
};
pub use sensitive::{classify, matched_keywords, SENSITIVE_KEYWORDS};
pub use signup::{SignupEvent, SignupState};
pub use types::{
    normalize_email, AccountId, PhoneNumber, Role, RoomId, DEFAULT_COUNTRY_CODE, ID_SUFFIX_MAX,
    ID_SUFFIX_MIN,
};

pub const CRATE_NAME: &str = "hope-core";
