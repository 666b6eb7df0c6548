//! 消息扇出分发器。
//!
//! 接收会话的发送事件：查会话身份、授权、先落盘再投递给房间
//! 当前的全部订阅会话（含发送者本人，保证各端视图一致）。
//! 单个订阅者投递失败不影响整体操作，吞掉并记日志。

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use domain::{Message, RoomId, SessionId, UserId};
use serde::Serialize;
use tokio::sync::Mutex;

use crate::boundary::Directory;
use crate::clock::Clock;
use crate::error::ApplicationError;
use crate::registry::{MessageBroadcast, SessionRegistry};
use crate::resolver::RoomResolver;
use crate::store::{MessageStore, NewMessage};

/// 发送方同步得知的结果：消息已落盘并被分配的序列号。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Ack {
    pub room_id: RoomId,
    pub sequence: u64,
}

pub struct ChatDispatcherDependencies {
    pub message_store: Arc<dyn MessageStore>,
    pub directory: Arc<dyn Directory>,
    pub clock: Arc<dyn Clock>,
    pub resolver: Arc<RoomResolver>,
    pub registry: Arc<SessionRegistry>,
}

pub struct ChatDispatcher {
    deps: ChatDispatcherDependencies,
    /// 每房间一把锁：追加与扇出持锁进行，同一房间的并发发送
    /// 按追加被接受的顺序投递到所有订阅会话。房间之间无顺序保证。
    room_locks: StdMutex<HashMap<RoomId, Arc<Mutex<()>>>>,
}

impl ChatDispatcher {
    pub fn new(deps: ChatDispatcherDependencies) -> Self {
        Self {
            deps,
            room_locks: StdMutex::new(HashMap::new()),
        }
    }

    fn room_lock(&self, room_id: RoomId) -> Arc<Mutex<()>> {
        let mut locks = self.room_locks.lock().expect("room lock map poisoned");
        locks.entry(room_id).or_default().clone()
    }

    /// 会话加入房间：授权通过后登记为投递目标。重复加入是空操作。
    pub async fn join(
        &self,
        session_id: SessionId,
        room_id: RoomId,
    ) -> Result<(), ApplicationError> {
        let user = self
            .deps
            .registry
            .user_of(session_id)
            .await
            .ok_or(ApplicationError::Unauthenticated)?;
        self.deps.resolver.authorize(&user, room_id).await?;
        self.deps.registry.join(session_id, room_id).await
    }

    /// 发送消息：身份 → 授权 → 落盘 → 扇出。
    /// 消息在被持久化之前绝不会投递出去。
    pub async fn send(
        &self,
        session_id: SessionId,
        room_id: RoomId,
        body: String,
    ) -> Result<Ack, ApplicationError> {
        let user = self
            .deps
            .registry
            .user_of(session_id)
            .await
            .ok_or(ApplicationError::Unauthenticated)?;
        self.deps.resolver.authorize(&user, room_id).await?;
        let body = Message::validate_body(body)?;
        let sender_name = self
            .deps
            .directory
            .display_name(&user)
            .await?
            .unwrap_or_else(|| user.as_str().to_owned());

        let lock = self.room_lock(room_id);
        let _guard = lock.lock().await;

        let message = self
            .deps
            .message_store
            .append(
                NewMessage {
                    room_id,
                    sender: user,
                    sender_name,
                    body,
                },
                self.deps.clock.now(),
            )
            .await?;

        self.fan_out(room_id, &message).await;

        Ok(Ack {
            room_id,
            sequence: message.sequence,
        })
    }

    /// 授权后的历史回放，进入房间时调用。重复读取结果相同。
    pub async fn history_for(
        &self,
        user: &UserId,
        room_id: RoomId,
    ) -> Result<Vec<Message>, ApplicationError> {
        self.deps.resolver.authorize(user, room_id).await?;
        self.deps
            .message_store
            .history(room_id)
            .await
            .map_err(Into::into)
    }

    /// 会话入口的历史回放。
    pub async fn history(
        &self,
        session_id: SessionId,
        room_id: RoomId,
    ) -> Result<Vec<Message>, ApplicationError> {
        let user = self
            .deps
            .registry
            .user_of(session_id)
            .await
            .ok_or(ApplicationError::Unauthenticated)?;
        self.history_for(&user, room_id).await
    }

    /// 尽力而为的逐会话投递。发送失败说明会话在快照与投递之间
    /// 断开了，丢弃该条投递。
    async fn fan_out(&self, room_id: RoomId, message: &Message) {
        let subscribers = self.deps.registry.subscribers(room_id).await;
        for (subscriber_id, sender) in subscribers {
            let broadcast = MessageBroadcast {
                room_id,
                message: message.clone(),
            };
            if sender.send(broadcast).is_err() {
                tracing::warn!(
                    session_id = %subscriber_id,
                    room_id = %room_id,
                    "投递目标已断开，丢弃该条投递"
                );
            }
        }
    }
}
