//! 在线会话注册表。
//!
//! 把传输层会话映射到已认证的用户身份和已加入的房间集合，
//! 并为每个房间维护投递目标。会话只存在于内存，断开即销毁。

use std::collections::{HashMap, HashSet};

use domain::{Message, RoomId, SessionId, UserId};
use tokio::sync::{mpsc, RwLock};

use crate::error::ApplicationError;

/// 投递给订阅会话的广播载荷。
#[derive(Debug, Clone)]
pub struct MessageBroadcast {
    pub room_id: RoomId,
    pub message: Message,
}

/// 会话的投递句柄。发送失败意味着会话已断开，由投递方丢弃。
pub type DeliverySender = mpsc::UnboundedSender<MessageBroadcast>;

struct SessionEntry {
    user: UserId,
    sender: DeliverySender,
    joined: HashSet<RoomId>,
}

#[derive(Default)]
struct Inner {
    sessions: HashMap<SessionId, SessionEntry>,
    rooms: HashMap<RoomId, HashSet<SessionId>>,
}

#[derive(Default)]
pub struct SessionRegistry {
    inner: RwLock<Inner>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 把一个刚建立的连接绑定到其认证身份。
    pub async fn bind(&self, session_id: SessionId, user: UserId, sender: DeliverySender) {
        let mut inner = self.inner.write().await;
        inner.sessions.insert(
            session_id,
            SessionEntry {
                user,
                sender,
                joined: HashSet::new(),
            },
        );
        tracing::debug!(session_id = %session_id, "session bound");
    }

    pub async fn user_of(&self, session_id: SessionId) -> Option<UserId> {
        let inner = self.inner.read().await;
        inner.sessions.get(&session_id).map(|entry| entry.user.clone())
    }

    /// 把会话登记为房间的投递目标。重复加入是空操作。
    /// 调用方必须先通过 `RoomResolver::authorize`。
    pub async fn join(
        &self,
        session_id: SessionId,
        room_id: RoomId,
    ) -> Result<(), ApplicationError> {
        let mut guard = self.inner.write().await;
        let inner = &mut *guard;
        let entry = inner
            .sessions
            .get_mut(&session_id)
            .ok_or(ApplicationError::Unauthenticated)?;
        if !entry.joined.insert(room_id) {
            return Ok(());
        }
        inner.rooms.entry(room_id).or_default().insert(session_id);
        tracing::debug!(session_id = %session_id, room_id = %room_id, "session joined room");
        Ok(())
    }

    /// 移除会话及其全部订阅。断开时调用；与正在进行的投递并发安全，
    /// 投递到刚移除的会话只是被丢弃。
    pub async fn unbind(&self, session_id: SessionId) {
        let mut inner = self.inner.write().await;
        let Some(entry) = inner.sessions.remove(&session_id) else {
            return;
        };
        for room_id in entry.joined {
            if let Some(subscribers) = inner.rooms.get_mut(&room_id) {
                subscribers.remove(&session_id);
                if subscribers.is_empty() {
                    inner.rooms.remove(&room_id);
                }
            }
        }
        tracing::debug!(session_id = %session_id, "session unbound");
    }

    /// 房间当前订阅者的快照副本。
    /// 投递在快照上迭代，不受并发 join/unbind 影响。
    pub async fn subscribers(&self, room_id: RoomId) -> Vec<(SessionId, DeliverySender)> {
        let inner = self.inner.read().await;
        let Some(session_ids) = inner.rooms.get(&room_id) else {
            return Vec::new();
        };
        session_ids
            .iter()
            .filter_map(|id| {
                inner
                    .sessions
                    .get(id)
                    .map(|entry| (*id, entry.sender.clone()))
            })
            .collect()
    }
}
