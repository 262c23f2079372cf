// SPDX-License-Identifier: Apache-2.0

//! Request extractors that reject with the JSON error body instead of axum's
//! plain-text defaults.

use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use hope_api::{ApiError, ApiErrorCode};
use serde::de::DeserializeOwned;
use serde_json::json;

use super::response_contract::HttpError;
use crate::session::Session;
use crate::AppState;

pub(crate) struct ApiJson<T>(pub T);

fn json_rejection(rejection: &JsonRejection, limit: usize) -> HttpError {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return HttpError(ApiError::payload_too_large(limit));
    }
    HttpError(
        ApiError::new(ApiErrorCode::ValidationFailed, "Request body must be valid JSON")
            .with_details(json!({"reason": rejection.body_text()})),
    )
}

#[axum::async_trait]
impl<T> FromRequest<AppState> for ApiJson<T>
where
    T: DeserializeOwned + Send,
{
    type Rejection = HttpError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(json_rejection(&rejection, state.max_body_bytes)),
        }
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?.trim();
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    Some(token.trim()).filter(|t| !t.is_empty())
}

fn query_token(parts: &Parts) -> Option<&str> {
    parts
        .uri
        .query()?
        .split('&')
        .find_map(|pair| pair.strip_prefix("token="))
        .filter(|t| !t.is_empty())
}

fn authenticate(token: Option<&str>, state: &AppState) -> Result<Session, HttpError> {
    let token = token.ok_or_else(|| HttpError(ApiError::unauthenticated()))?;
    state
        .sessions
        .validate(token)
        .map_err(|_| HttpError(ApiError::unauthenticated()))
}

/// A caller holding a valid `Authorization: Bearer` token.
pub(crate) struct AuthSession(pub Session);

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthSession {
    type Rejection = HttpError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        authenticate(bearer_token(&parts.headers), state).map(Self)
    }
}

/// Browsers cannot set headers on a WebSocket upgrade, so the socket also
/// accepts `?token=`.
pub(crate) struct SocketSession(pub Session);

#[axum::async_trait]
impl FromRequestParts<AppState> for SocketSession {
    type Rejection = HttpError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).or_else(|| query_token(parts));
        authenticate(token, state).map(Self)
    }
}
