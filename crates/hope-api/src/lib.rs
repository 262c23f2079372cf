// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

pub mod convert;
pub mod dto;
pub mod error_mapping;
pub mod errors;
pub mod openapi;
pub mod wire;

pub use error_mapping::{api_error_status, API_ERROR_SCHEMA_REF};
pub use errors::{ApiError, ApiErrorCode};

pub const CRATE_NAME: &str = "hope-api";

/// Body returned by every endpoint that requires a session when none is valid.
pub const UNAUTHENTICATED_MESSAGE: &str = "Please authenticate.";
