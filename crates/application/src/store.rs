//! 持久化端口。
//!
//! 房间与消息的存储接口由基础设施层实现（PostgreSQL），
//! 测试用 `memory` 模块里的内存实现替换。

use async_trait::async_trait;
use domain::{Message, RepositoryError, Room, RoomId, Timestamp, UserId};

#[async_trait]
pub trait RoomStore: Send + Sync {
    async fn create(&self, room: Room) -> Result<Room, RepositoryError>;
    async fn find_by_id(&self, id: RoomId) -> Result<Option<Room>, RepositoryError>;
    /// 无序成员对的私聊房间查找；对唯一性由 RoomResolver 的串行化点保证
    async fn find_private_pair(
        &self,
        a: &UserId,
        b: &UserId,
    ) -> Result<Option<Room>, RepositoryError>;
    async fn list_for_user(&self, user: &UserId) -> Result<Vec<Room>, RepositoryError>;
}

/// 追加前的消息内容，序列号与时间戳由存储和调用方补齐。
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub room_id: RoomId,
    pub sender: UserId,
    pub sender_name: String,
    pub body: String,
}

#[async_trait]
pub trait MessageStore: Send + Sync {
    /// 追加一条消息，序列号取房间当前最大值加一。
    /// 只追加，不重排也不合并。
    async fn append(&self, message: NewMessage, at: Timestamp) -> Result<Message, RepositoryError>;

    /// 房间全部消息，按创建顺序升序。
    async fn history(&self, room_id: RoomId) -> Result<Vec<Message>, RepositoryError>;
}
