// SPDX-License-Identifier: Apache-2.0

use crate::ApiErrorCode;

pub const API_ERROR_SCHEMA_REF: &str = "#/components/schemas/ApiError";

#[must_use]
pub const fn api_error_status(code: ApiErrorCode) -> u16 {
    match code {
        ApiErrorCode::ValidationFailed | ApiErrorCode::OtpInvalid => 400,
        ApiErrorCode::InvalidCredentials | ApiErrorCode::Unauthenticated => 401,
        ApiErrorCode::Forbidden => 403,
        ApiErrorCode::NotFound => 404,
        ApiErrorCode::DuplicateAccount | ApiErrorCode::RoomClosed => 409,
        ApiErrorCode::PayloadTooLarge => 413,
        ApiErrorCode::RateLimited => 429,
        ApiErrorCode::UpstreamGateway | ApiErrorCode::Internal => 500,
    }
}
