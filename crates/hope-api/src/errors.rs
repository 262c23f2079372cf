// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::UNAUTHENTICATED_MESSAGE;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum ApiErrorCode {
    ValidationFailed,
    OtpInvalid,
    DuplicateAccount,
    InvalidCredentials,
    Unauthenticated,
    Forbidden,
    NotFound,
    RoomClosed,
    PayloadTooLarge,
    RateLimited,
    UpstreamGateway,
    Internal,
}

impl ApiErrorCode {
    pub const ALL: [ApiErrorCode; 12] = [
        ApiErrorCode::ValidationFailed,
        ApiErrorCode::OtpInvalid,
        ApiErrorCode::DuplicateAccount,
        ApiErrorCode::InvalidCredentials,
        ApiErrorCode::Unauthenticated,
        ApiErrorCode::Forbidden,
        ApiErrorCode::NotFound,
        ApiErrorCode::RoomClosed,
        ApiErrorCode::PayloadTooLarge,
        ApiErrorCode::RateLimited,
        ApiErrorCode::UpstreamGateway,
        ApiErrorCode::Internal,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ValidationFailed => "validation_failed",
            Self::OtpInvalid => "otp_invalid",
            Self::DuplicateAccount => "duplicate_account",
            Self::InvalidCredentials => "invalid_credentials",
            Self::Unauthenticated => "unauthenticated",
            Self::Forbidden => "forbidden",
            Self::NotFound => "not_found",
            Self::RoomClosed => "room_closed",
            Self::PayloadTooLarge => "payload_too_large",
            Self::RateLimited => "rate_limited",
            Self::UpstreamGateway => "upstream_gateway",
            Self::Internal => "internal",
        }
    }
}

/// JSON error body. `error` is the stable human-readable field clients key on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiError {
    pub success: bool,
    pub error: String,
    pub code: ApiErrorCode,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub details: Value,
}

impl ApiError {
    #[must_use]
    pub fn new(code: ApiErrorCode, error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            code,
            details: Value::Null,
        }
    }

    #[must_use]
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }

    #[must_use]
    pub fn validation_failed(field: &str, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self::new(ApiErrorCode::ValidationFailed, reason.clone())
            .with_details(json!({"field_errors": [{"field": field, "reason": reason}]}))
    }

    #[must_use]
    pub fn unauthenticated() -> Self {
        Self::new(ApiErrorCode::Unauthenticated, UNAUTHENTICATED_MESSAGE)
    }

    #[must_use]
    pub fn payload_too_large(limit_bytes: usize) -> Self {
        Self::new(ApiErrorCode::PayloadTooLarge, "Request body too large")
            .with_details(json!({"limit_bytes": limit_bytes}))
    }

    #[must_use]
    pub fn internal() -> Self {
        Self::new(ApiErrorCode::Internal, "Internal server error")
    }
}
