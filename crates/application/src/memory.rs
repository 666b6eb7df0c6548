//! 端口的内存实现。
//!
//! 单元测试与集成测试用它们替换 PostgreSQL 实现；
//! 行为契约与基础设施层实现一致。

use std::collections::HashMap;

use async_trait::async_trait;
use domain::{Message, RepositoryError, Room, RoomId, RoomKind, Timestamp, UserId};
use tokio::sync::RwLock;

use crate::boundary::Directory;
use crate::store::{MessageStore, NewMessage, RoomStore};

#[derive(Default)]
pub struct MemoryRoomStore {
    rooms: RwLock<HashMap<RoomId, Room>>,
}

impl MemoryRoomStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RoomStore for MemoryRoomStore {
    async fn create(&self, room: Room) -> Result<Room, RepositoryError> {
        let mut rooms = self.rooms.write().await;
        rooms.insert(room.id, room.clone());
        Ok(room)
    }

    async fn find_by_id(&self, id: RoomId) -> Result<Option<Room>, RepositoryError> {
        let rooms = self.rooms.read().await;
        Ok(rooms.get(&id).cloned())
    }

    async fn find_private_pair(
        &self,
        a: &UserId,
        b: &UserId,
    ) -> Result<Option<Room>, RepositoryError> {
        let rooms = self.rooms.read().await;
        Ok(rooms
            .values()
            .find(|room| {
                room.kind == RoomKind::Private && room.is_member(a) && room.is_member(b)
            })
            .cloned())
    }

    async fn list_for_user(&self, user: &UserId) -> Result<Vec<Room>, RepositoryError> {
        let rooms = self.rooms.read().await;
        let mut found: Vec<Room> = rooms
            .values()
            .filter(|room| room.is_member(user))
            .cloned()
            .collect();
        found.sort_by_key(|room| room.created_at);
        Ok(found)
    }
}

#[derive(Default)]
pub struct MemoryMessageStore {
    messages: RwLock<HashMap<RoomId, Vec<Message>>>,
}

impl MemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MessageStore for MemoryMessageStore {
    async fn append(&self, message: NewMessage, at: Timestamp) -> Result<Message, RepositoryError> {
        let mut messages = self.messages.write().await;
        let entries = messages.entry(message.room_id).or_default();
        let sequence = entries.last().map(|m| m.sequence).unwrap_or(0) + 1;
        let stored = Message {
            room_id: message.room_id,
            sequence,
            sender: message.sender,
            sender_name: message.sender_name,
            body: message.body,
            created_at: at,
        };
        entries.push(stored.clone());
        Ok(stored)
    }

    async fn history(&self, room_id: RoomId) -> Result<Vec<Message>, RepositoryError> {
        let messages = self.messages.read().await;
        Ok(messages.get(&room_id).cloned().unwrap_or_default())
    }
}

/// 内存用户目录。测试直接注册用户，替代外部注册流程。
#[derive(Default)]
pub struct MemoryDirectory {
    users: RwLock<HashMap<UserId, String>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, identifier: UserId, display_name: impl Into<String>) {
        let mut users = self.users.write().await;
        users.insert(identifier, display_name.into());
    }
}

#[async_trait]
impl Directory for MemoryDirectory {
    async fn exists(&self, identifier: &UserId) -> Result<bool, RepositoryError> {
        let users = self.users.read().await;
        Ok(users.contains_key(identifier))
    }

    async fn display_name(
        &self,
        identifier: &UserId,
    ) -> Result<Option<String>, RepositoryError> {
        let users = self.users.read().await;
        Ok(users.get(identifier).cloned())
    }
}
