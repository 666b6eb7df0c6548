//! 聊天服务核心领域模型
//!
//! 包含房间、消息等核心实体，以及值对象和错误定义。
//! 这一层不做任何 IO，所有持久化和投递都通过上层端口完成。

pub mod errors;
pub mod message;
pub mod room;
pub mod value_objects;

// 重新导出常用类型
pub use errors::{DomainError, RepositoryError};
pub use message::Message;
pub use room::{Room, RoomKind};
pub use value_objects::{RoomId, SessionId, Timestamp, UserId};
