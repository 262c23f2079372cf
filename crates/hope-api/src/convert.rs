// SPDX-License-Identifier: Apache-2.0

use hope_core::{Account, ChatMessage, ChatRoom, Error};

use crate::dto::{AccountDto, MessageDto, ParticipantDto, RoomDto, UserSummaryDto};
use crate::errors::{ApiError, ApiErrorCode};

impl From<&Error> for ApiError {
    fn from(err: &Error) -> Self {
        match err {
            Error::Validation(msg) => ApiError::new(ApiErrorCode::ValidationFailed, msg.clone()),
            Error::OtpInvalid => ApiError::new(ApiErrorCode::OtpInvalid, err.to_string()),
            Error::DuplicateAccount(msg) => {
                ApiError::new(ApiErrorCode::DuplicateAccount, msg.clone())
            }
            Error::InvalidCredentials => {
                ApiError::new(ApiErrorCode::InvalidCredentials, err.to_string())
            }
            Error::Auth => ApiError::unauthenticated(),
            Error::Forbidden(msg) => ApiError::new(ApiErrorCode::Forbidden, msg.clone()),
            Error::NotFound(_) => ApiError::new(ApiErrorCode::NotFound, err.to_string()),
            Error::RoomClosed(_) => ApiError::new(ApiErrorCode::RoomClosed, err.to_string()),
            Error::RateLimited => ApiError::new(ApiErrorCode::RateLimited, err.to_string()),
            Error::Gateway(msg) => ApiError::new(ApiErrorCode::UpstreamGateway, msg.clone()),
            // Store internals never reach the client.
            _ => ApiError::internal(),
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self::from(&err)
    }
}

#[must_use]
pub fn account_dto(account: &Account) -> AccountDto {
    AccountDto {
        user_id: account.account_id.to_string(),
        name: account.name.clone(),
        role: account.role,
        phone_number: account.phone_number.clone(),
        country_code: account.country_code.clone(),
        email: account.email.clone(),
        admin_phone: account.admin_phone.clone(),
        is_active: account.is_active,
        is_locked: account.is_locked,
        last_login: account.last_login,
        created_at: account.created_at,
        updated_at: account.updated_at,
    }
}

#[must_use]
pub fn user_summary_dto(account: &Account) -> UserSummaryDto {
    UserSummaryDto {
        user_id: account.account_id.to_string(),
        name: account.name.clone(),
        role: account.role,
        phone_number: account.phone_number.clone(),
        email: account.email.clone(),
    }
}

#[must_use]
pub fn message_dto(message: &ChatMessage) -> MessageDto {
    MessageDto {
        sender_id: message.sender_id.to_string(),
        sender_type: message.sender_role,
        content: message.content.clone(),
        timestamp: message.timestamp,
        is_sensitive: message.is_sensitive,
    }
}

#[must_use]
pub fn room_dto(room: &ChatRoom) -> RoomDto {
    RoomDto {
        room_id: room.room_id.to_string(),
        participants: room
            .participants
            .iter()
            .map(|p| ParticipantDto {
                user_id: p.account_id.to_string(),
                user_type: p.role,
            })
            .collect(),
        messages: room.messages.iter().map(message_dto).collect(),
        start_time: room.start_time,
        end_time: room.end_time,
        is_active: room.is_active,
        created_at: room.created_at,
    }
}
