//! 实时连接上的事件集合。
//!
//! 封闭的带标签变体集合，字段在到达核心之前完成校验；
//! 身份隐含在连接绑定的会话里，不出现在事件字段中。

use application::MessageDto;
use domain::RoomId;
use serde::{Deserialize, Serialize};

/// 客户端到服务端的事件。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    Join { room_id: RoomId },
    Send { room_id: RoomId, body: String },
}

/// 服务端到客户端的事件。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    Joined {
        room_id: RoomId,
    },
    /// 发送方对自己这次发送的同步结果
    Ack {
        room_id: RoomId,
        sequence: u64,
    },
    Delivered {
        room_id: RoomId,
        message: MessageDto,
    },
    Error {
        code: String,
        message: String,
    },
}
