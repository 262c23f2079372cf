// SPDX-License-Identifier: Apache-2.0

use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use hope_api::{api_error_status, ApiError, ApiErrorCode};
use hope_core::Error;
use tracing::error;

/// An [`ApiError`] on its way out as an HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpError(pub ApiError);

pub(crate) type HttpResult<T> = Result<T, HttpError>;

#[must_use]
pub(crate) fn status_for(code: ApiErrorCode) -> StatusCode {
    StatusCode::from_u16(api_error_status(code)).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

#[must_use]
pub(crate) fn api_error_response(err: ApiError) -> Response {
    let status = status_for(err.code);
    let mut resp = (status, Json(err)).into_response();
    if status == StatusCode::TOO_MANY_REQUESTS {
        resp.headers_mut()
            .insert("retry-after", HeaderValue::from_static("60"));
    }
    resp
}

impl From<Error> for HttpError {
    fn from(err: Error) -> Self {
        if matches!(err, Error::Store(_) | Error::Gateway(_)) {
            error!(kind = err.kind(), "request failed: {err}");
        }
        Self(ApiError::from(&err))
    }
}

impl From<ApiError> for HttpError {
    fn from(err: ApiError) -> Self {
        Self(err)
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        api_error_response(self.0)
    }
}
