use serde::{Deserialize, Serialize};
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

use crate::errors::DomainError;
use crate::value_objects::{RoomId, Timestamp, UserId};

/// 展示用的时分格式，对应客户端消息气泡上的时间。
const CLOCK_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[hour]:[minute]");

/// 消息实体。
///
/// 创建后不可变；同一房间内由 `sequence` 全序排序，序列号由
/// MessageStore 在追加时分配（房间当前最大值加一）。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub room_id: RoomId,
    pub sequence: u64,
    pub sender: UserId,
    /// 发送者显示名的反规范化副本，群聊渲染直接使用
    pub sender_name: String,
    pub body: String,
    pub created_at: Timestamp,
}

impl Message {
    /// 校验消息正文。追加前由分发器调用，非法正文不会产生日志条目。
    pub fn validate_body(body: impl Into<String>) -> Result<String, DomainError> {
        let body = body.into();
        if body.trim().is_empty() {
            return Err(DomainError::invalid_argument("body", "cannot be empty"));
        }
        if body.len() > 4096 {
            return Err(DomainError::invalid_argument("body", "too long"));
        }
        Ok(body)
    }

    /// 时:分 展示格式，仅用于客户端显示。
    pub fn formatted_time(&self) -> String {
        self.created_at
            .format(CLOCK_FORMAT)
            .unwrap_or_else(|_| String::from("--:--"))
    }
}
