// SPDX-License-Identifier: Apache-2.0

mod contact;
mod ids;
mod role;

pub use contact::{normalize_email, PhoneNumber, DEFAULT_COUNTRY_CODE};
pub use ids::{AccountId, RoomId, ID_SUFFIX_MAX, ID_SUFFIX_MIN};
pub use role::Role;
