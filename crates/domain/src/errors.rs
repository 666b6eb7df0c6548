//! 领域错误定义
//!
//! 校验类错误同步返回给发起方；投递侧的单个订阅者失败不在这里，
//! 由分发器吞掉并记录日志。

use thiserror::Error;

/// 领域错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// 和自己建立私聊
    #[error("cannot start a chat with yourself")]
    SelfChat,

    /// 目标标识没有对应的注册用户
    #[error("unknown user: {identifier}")]
    UnknownUser { identifier: String },

    /// 群成员列表中存在无法解析的标识，整个创建被拒绝
    #[error("unresolvable members: {}", identifiers.join(", "))]
    InvalidMembers { identifiers: Vec<String> },

    /// 房间不存在
    #[error("room not found")]
    RoomNotFound,

    /// 发起方不是房间成员
    #[error("not a member of this room")]
    Forbidden,

    /// 参数校验失败
    #[error("invalid {field}: {reason}")]
    InvalidArgument { field: String, reason: String },
}

impl DomainError {
    pub fn unknown_user(identifier: impl Into<String>) -> Self {
        Self::UnknownUser {
            identifier: identifier.into(),
        }
    }

    pub fn invalid_members(identifiers: Vec<String>) -> Self {
        Self::InvalidMembers { identifiers }
    }

    pub fn invalid_argument(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// 存储层错误
///
/// 对单次操作是致命的；核心不做自动重试，连接保持打开，调用方可稍后再试。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("storage error: {message}")]
    Storage { message: String },
}

impl RepositoryError {
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }
}
