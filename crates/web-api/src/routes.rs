use axum::{
    extract::{Path, State},
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;

use application::{ApplicationError, MessageDto, RoomSummary};
use domain::{DomainError, RoomId, UserId};

use crate::{error::ApiError, state::AppState, ws_connection};

#[derive(Debug, Deserialize)]
struct CreateChatPayload {
    peer: String,
}

#[derive(Debug, Deserialize)]
struct CreateGroupPayload {
    name: String,
    members: Vec<String>,
}

#[derive(Debug, Serialize)]
struct RoomCreatedBody {
    room_id: RoomId,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/chats", post(create_chat))
        .route("/groups", post(create_group))
        .route("/rooms", get(list_rooms))
        .route("/rooms/{room_id}/messages", get(room_history))
        .route("/ws", get(ws_connection::ws_handler))
}

async fn health() -> &'static str {
    "ok"
}

/// HTTP 请求的身份解析：Bearer 令牌 → 用户标识。
fn identity(state: &AppState, headers: &HeaderMap) -> Result<UserId, ApiError> {
    let token = crate::auth::bearer_token(headers)
        .ok_or_else(|| ApiError::unauthorized("missing bearer token"))?;
    state
        .identity
        .current_identity(token)
        .ok_or_else(|| ApiError::unauthorized("invalid token"))
}

/// 解析（或创建）与 peer 的私聊房间。
async fn create_chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateChatPayload>,
) -> Result<Json<RoomCreatedBody>, ApiError> {
    let user = identity(&state, &headers)?;
    let peer = UserId::parse(payload.peer).map_err(ApplicationError::Domain)?;
    let room_id = state.resolver.resolve_private(&user, &peer).await?;
    Ok(Json(RoomCreatedBody { room_id }))
}

/// 创建群聊。成员列表里任何一个无法解析的标识都会让整个创建失败。
async fn create_group(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateGroupPayload>,
) -> Result<Json<RoomCreatedBody>, ApiError> {
    let user = identity(&state, &headers)?;

    // 空白条目跳过；形状不合法的标识并入无法解析的成员列表
    let mut members = Vec::new();
    let mut invalid = Vec::new();
    for raw in payload.members {
        let raw = raw.trim().to_owned();
        if raw.is_empty() {
            continue;
        }
        match UserId::parse(raw.as_str()) {
            Ok(member) => members.push(member),
            Err(_) => invalid.push(raw),
        }
    }
    if !invalid.is_empty() {
        return Err(ApplicationError::Domain(DomainError::invalid_members(invalid)).into());
    }

    let room_id = state
        .resolver
        .resolve_group_create(&user, &payload.name, &members)
        .await?;
    Ok(Json(RoomCreatedBody { room_id }))
}

/// 当前用户的房间列表（首页视图）。
async fn list_rooms(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<RoomSummary>>, ApiError> {
    let user = identity(&state, &headers)?;
    let rooms = state.resolver.list_rooms(&user).await?;
    Ok(Json(rooms))
}

/// 进入房间时的历史回放，升序。
async fn room_history(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(room_id): Path<Uuid>,
) -> Result<Json<Vec<MessageDto>>, ApiError> {
    let user = identity(&state, &headers)?;
    let messages = state
        .dispatcher
        .history_for(&user, RoomId::from(room_id))
        .await?;
    Ok(Json(messages.iter().map(MessageDto::from).collect()))
}
