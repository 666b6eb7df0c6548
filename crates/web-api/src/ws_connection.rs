//! WebSocket 连接生命周期。
//!
//! 升级时验证身份（未认证直接拒绝，不进入核心），绑定会话后
//! 进入读循环；写路径由单独任务承担，合并控制回执与房间广播。
//! 连接断开立即撤销会话及其全部订阅。

use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    response::Response,
};
use domain::{SessionId, UserId};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;

use application::{ApplicationError, MessageBroadcast, MessageDto};

use crate::error::{error_code, ApiError};
use crate::events::{ClientEvent, ServerEvent};
use crate::state::AppState;

/// WebSocket 连接查询参数
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub token: String,
}

pub async fn ws_handler(
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> Result<Response, ApiError> {
    // 未认证的连接不升级；认证只在这里发生一次
    let Some(user) = state.identity.current_identity(&query.token) else {
        tracing::warn!("WebSocket upgrade rejected: invalid token");
        return Err(ApiError::unauthorized("invalid or missing token"));
    };

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, user)))
}

async fn handle_socket(socket: WebSocket, state: AppState, user: UserId) {
    let session_id = SessionId::generate();
    tracing::info!(session_id = %session_id, user = %user, "WebSocket 连接已建立");

    let (broadcast_tx, mut broadcast_rx) = mpsc::unbounded_channel::<MessageBroadcast>();
    let (control_tx, mut control_rx) = mpsc::unbounded_channel::<ServerEvent>();
    state.registry.bind(session_id, user, broadcast_tx).await;

    let (mut sink, mut incoming) = socket.split();

    // 写任务：两个来源合并成一条出站流
    let write_task = tokio::spawn(async move {
        loop {
            let event = tokio::select! {
                broadcast = broadcast_rx.recv() => match broadcast {
                    Some(broadcast) => ServerEvent::Delivered {
                        room_id: broadcast.room_id,
                        message: MessageDto::from(&broadcast.message),
                    },
                    None => break,
                },
                control = control_rx.recv() => match control {
                    Some(event) => event,
                    None => break,
                },
            };
            let Ok(text) = serde_json::to_string(&event) else {
                continue;
            };
            if sink.send(WsMessage::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(frame)) = incoming.next().await {
        let WsMessage::Text(text) = frame else {
            continue;
        };
        let event = match serde_json::from_str::<ClientEvent>(&text) {
            Ok(event) => event,
            Err(err) => {
                tracing::debug!(session_id = %session_id, error = %err, "丢弃无法解析的事件");
                let _ = control_tx.send(ServerEvent::Error {
                    code: "BAD_EVENT".to_owned(),
                    message: err.to_string(),
                });
                continue;
            }
        };

        match event {
            ClientEvent::Join { room_id } => {
                match state.dispatcher.join(session_id, room_id).await {
                    Ok(()) => {
                        let _ = control_tx.send(ServerEvent::Joined { room_id });
                    }
                    Err(err) => {
                        let _ = control_tx.send(error_event(&err));
                    }
                }
            }
            ClientEvent::Send { room_id, body } => {
                match state.dispatcher.send(session_id, room_id, body).await {
                    Ok(ack) => {
                        let _ = control_tx.send(ServerEvent::Ack {
                            room_id: ack.room_id,
                            sequence: ack.sequence,
                        });
                    }
                    Err(err) => {
                        let _ = control_tx.send(error_event(&err));
                    }
                }
            }
        }
    }

    // 断开是唯一的取消来源：撤销会话，之后的投递在注册表层被丢弃
    state.registry.unbind(session_id).await;
    write_task.abort();
    tracing::info!(session_id = %session_id, "WebSocket 连接已关闭");
}

/// 操作失败回给发送方；错误不关闭连接
fn error_event(error: &ApplicationError) -> ServerEvent {
    ServerEvent::Error {
        code: error_code(error).to_owned(),
        message: error.to_string(),
    }
}
