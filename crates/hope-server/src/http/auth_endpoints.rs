// SPDX-License-Identifier: Apache-2.0

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use hope_api::convert::user_summary_dto;
use hope_api::dto::{
    optional, required, LoginRequest, LoginResponse, RegisterRequest, RegisterResponse,
    RequestOtpRequest, RequestOtpResponse, VerifyOtpRequest, VerifyOtpResponse,
};
use hope_core::Error;

use super::extract::ApiJson;
use super::response_contract::HttpResult;
use crate::services::RegistrationInput;
use crate::AppState;

pub(crate) async fn request_otp_handler(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<RequestOtpRequest>,
) -> HttpResult<Json<RequestOtpResponse>> {
    let phone = required(&body.phone_number, "phoneNumber")?;
    let country_code = required(&body.country_code, "countryCode")?;
    let sent = state.auth.request_otp(phone, country_code).await?;
    Ok(Json(RequestOtpResponse {
        success: true,
        status: sent.status,
    }))
}

pub(crate) async fn verify_otp_handler(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<VerifyOtpRequest>,
) -> HttpResult<Json<VerifyOtpResponse>> {
    let phone = required(&body.phone_number, "phoneNumber")?;
    let country_code = required(&body.country_code, "countryCode")?;
    let code = required(&body.otp, "otp")?;
    let check = state.auth.verify_otp(phone, country_code, code).await?;
    if !check.approved {
        return Err(Error::OtpInvalid.into());
    }
    Ok(Json(VerifyOtpResponse {
        success: true,
        message: "OTP verified successfully".to_string(),
    }))
}

pub(crate) async fn register_handler(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<RegisterRequest>,
) -> HttpResult<(StatusCode, Json<RegisterResponse>)> {
    let input = RegistrationInput {
        phone_number: required(&body.phone_number, "phoneNumber")?.to_string(),
        name: required(&body.name, "name")?.to_string(),
        email: required(&body.email, "email")?.to_string(),
        password: body.password.clone().unwrap_or_default(),
        otp: required(&body.otp, "otp")?.to_string(),
        country_code: optional(&body.country_code).map(ToString::to_string),
    };
    let registration = state.auth.register(input).await?;
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User registered successfully".to_string(),
            token: registration.token,
            user: user_summary_dto(&registration.account),
        }),
    ))
}

pub(crate) async fn login_handler(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> HttpResult<Json<LoginResponse>> {
    let identifier = body
        .identifier()
        .ok_or_else(|| Error::validation("email or phoneNumber is required"))?;
    let outcome = state
        .auth
        .login(
            identifier,
            body.password.as_deref().unwrap_or_default(),
            optional(&body.country_code),
        )
        .await?;
    Ok(Json(LoginResponse {
        token: outcome.token,
        user_id: outcome.account.account_id.to_string(),
        role: outcome.account.role,
    }))
}
