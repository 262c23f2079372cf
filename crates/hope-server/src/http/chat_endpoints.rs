// SPDX-License-Identifier: Apache-2.0

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use hope_api::convert::room_dto;
use hope_api::dto::{
    required, CompletionRequest, CompletionResponse, CreateRoomRequest, CreateRoomResponse, RoomDto,
};

use super::extract::{ApiJson, AuthSession};
use super::response_contract::HttpResult;
use crate::AppState;

pub(crate) async fn create_room_handler(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    ApiJson(body): ApiJson<CreateRoomRequest>,
) -> HttpResult<(StatusCode, Json<CreateRoomResponse>)> {
    let doctor_id = required(&body.doctor_id, "doctorId")?;
    let room = state.chat.create_room(&session, doctor_id).await?;
    Ok((
        StatusCode::CREATED,
        Json(CreateRoomResponse {
            room_id: room.room_id.to_string(),
        }),
    ))
}

pub(crate) async fn history_handler(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Path(room_id): Path<String>,
) -> HttpResult<Json<RoomDto>> {
    let room = state.chat.get_history(&room_id, &session).await?;
    Ok(Json(room_dto(&room)))
}

pub(crate) async fn completion_handler(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    ApiJson(body): ApiJson<CompletionRequest>,
) -> HttpResult<Json<CompletionResponse>> {
    let prompt = required(&body.message, "message")?;
    let reply = state.assistant.reply(&session, prompt).await?;
    Ok(Json(CompletionResponse {
        response: reply.response,
        is_sensitive: reply.is_sensitive,
    }))
}
