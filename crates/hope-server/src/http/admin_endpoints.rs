// SPDX-License-Identifier: Apache-2.0

//! `/admin/*`. Role checks live in [`crate::services::AdminService`]; these
//! handlers only decode and encode.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use hope_api::convert::{account_dto, room_dto};
use hope_api::dto::{
    optional, required, AccountDto, CreateAdminRequest, CreateDoctorRequest, MessageResponse,
    RoomDto, UpdateDoctorStatusRequest, UpdateProfileRequest,
};
use hope_core::Error;

use super::extract::{ApiJson, AuthSession};
use super::response_contract::HttpResult;
use crate::services::{NewAdminInput, NewDoctorInput, ProfileInput};
use crate::AppState;

fn owned(value: Option<&str>) -> Option<String> {
    value.map(ToString::to_string)
}

pub(crate) async fn list_users_handler(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
) -> HttpResult<Json<Vec<AccountDto>>> {
    let accounts = state.admin.list_users(&session).await?;
    Ok(Json(accounts.iter().map(account_dto).collect()))
}

pub(crate) async fn list_doctors_handler(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
) -> HttpResult<Json<Vec<AccountDto>>> {
    let accounts = state.admin.list_doctors(&session).await?;
    Ok(Json(accounts.iter().map(account_dto).collect()))
}

pub(crate) async fn create_doctor_handler(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    ApiJson(body): ApiJson<CreateDoctorRequest>,
) -> HttpResult<(StatusCode, Json<AccountDto>)> {
    let input = NewDoctorInput {
        phone_number: required(&body.phone_number, "phoneNumber")?.to_string(),
        name: required(&body.name, "name")?.to_string(),
        password: body.password.clone().unwrap_or_default(),
        email: owned(optional(&body.email)),
        country_code: owned(optional(&body.country_code)),
    };
    let account = state.admin.create_doctor(&session, input).await?;
    Ok((StatusCode::CREATED, Json(account_dto(&account))))
}

pub(crate) async fn create_admin_handler(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    ApiJson(body): ApiJson<CreateAdminRequest>,
) -> HttpResult<(StatusCode, Json<AccountDto>)> {
    let input = NewAdminInput {
        phone_number: required(&body.phone_number, "phoneNumber")?.to_string(),
        name: required(&body.name, "name")?.to_string(),
        password: body.password.clone().unwrap_or_default(),
        email: required(&body.email, "email")?.to_string(),
        admin_phone: required(&body.admin_phone, "adminPhone")?.to_string(),
        country_code: owned(optional(&body.country_code)),
    };
    let account = state.admin.create_admin(&session, input).await?;
    Ok((StatusCode::CREATED, Json(account_dto(&account))))
}

pub(crate) async fn update_profile_handler(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    ApiJson(body): ApiJson<UpdateProfileRequest>,
) -> HttpResult<Json<AccountDto>> {
    let input = ProfileInput {
        phone_number: body.phone_number,
        name: body.name,
        email: body.email,
        admin_phone: body.admin_phone,
    };
    let account = state.admin.update_profile(&session, input).await?;
    Ok(Json(account_dto(&account)))
}

pub(crate) async fn update_doctor_status_handler(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Path(doctor_id): Path<String>,
    ApiJson(body): ApiJson<UpdateDoctorStatusRequest>,
) -> HttpResult<Json<MessageResponse>> {
    let is_active = body
        .is_active
        .ok_or_else(|| Error::validation("isActive is required"))?;
    state
        .admin
        .update_doctor_status(&session, &doctor_id, is_active)
        .await?;
    Ok(Json(MessageResponse::new("Doctor status updated")))
}

pub(crate) async fn delete_user_handler(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Path(account_id): Path<String>,
) -> HttpResult<Json<MessageResponse>> {
    state.admin.delete_user(&session, &account_id).await?;
    Ok(Json(MessageResponse::new("User deleted")))
}

pub(crate) async fn list_chats_handler(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
) -> HttpResult<Json<Vec<RoomDto>>> {
    let rooms = state.admin.list_chats(&session).await?;
    Ok(Json(rooms.iter().map(room_dto).collect()))
}

pub(crate) async fn list_sensitive_chats_handler(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
) -> HttpResult<Json<Vec<RoomDto>>> {
    let rooms = state.admin.list_sensitive_chats(&session).await?;
    Ok(Json(rooms.iter().map(room_dto).collect()))
}
