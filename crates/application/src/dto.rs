//! 对外传输的数据对象。

use domain::{Message, RoomId, RoomKind, Timestamp};
use serde::{Deserialize, Serialize};

/// 下发给客户端的消息载荷。
///
/// `formatted_time` 是 时:分 的展示字段，完整时间戳另给。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageDto {
    pub room_id: RoomId,
    pub sequence: u64,
    pub sender: String,
    pub sender_name: String,
    pub body: String,
    pub timestamp: Timestamp,
    pub formatted_time: String,
}

impl From<&Message> for MessageDto {
    fn from(message: &Message) -> Self {
        Self {
            room_id: message.room_id,
            sequence: message.sequence,
            sender: message.sender.as_str().to_owned(),
            sender_name: message.sender_name.clone(),
            body: message.body.clone(),
            timestamp: message.created_at,
            formatted_time: message.formatted_time(),
        }
    }
}

impl From<Message> for MessageDto {
    fn from(message: Message) -> Self {
        Self::from(&message)
    }
}

/// 首页房间列表条目。私聊以对端显示名标注，群聊用群名。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomSummary {
    pub id: RoomId,
    pub kind: RoomKind,
    pub label: String,
}
