use domain::{DomainError, RepositoryError};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApplicationError {
    #[error("domain error: {0}")]
    Domain(#[from] DomainError),
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),
    /// 会话没有绑定身份；拒绝操作，不断开连接
    #[error("no identity bound to this session")]
    Unauthenticated,
}
