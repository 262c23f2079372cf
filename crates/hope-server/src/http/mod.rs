// SPDX-License-Identifier: Apache-2.0

use axum::Json;
use hope_api::dto::HealthResponse;
use hope_api::openapi::openapi_v1_spec;
use hope_api::{ApiError, ApiErrorCode};
use serde_json::Value;

pub(crate) mod admin_endpoints;
pub(crate) mod auth_endpoints;
pub(crate) mod chat_endpoints;
pub(crate) mod extract;
pub(crate) mod request_tracing;
pub(crate) mod response_contract;
pub(crate) mod ws;

use response_contract::HttpError;

pub(crate) async fn healthz_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub(crate) async fn openapi_handler() -> Json<Value> {
    Json(openapi_v1_spec())
}

pub(crate) async fn not_found_handler() -> HttpError {
    HttpError(ApiError::new(ApiErrorCode::NotFound, "Route not found"))
}
