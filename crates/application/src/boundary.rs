//! 核心消费的两个外部协作方契约。
//!
//! 注册、OTP 验证、密码管理等流程在核心之外完成；核心只通过
//! 这两个窄接口读取它们的结果。

use async_trait::async_trait;
use domain::{RepositoryError, UserId};

/// 用户目录：判断一个邮箱样式的标识是否对应注册用户，并取其显示名。
#[async_trait]
pub trait Directory: Send + Sync {
    async fn exists(&self, identifier: &UserId) -> Result<bool, RepositoryError>;
    async fn display_name(&self, identifier: &UserId)
        -> Result<Option<String>, RepositoryError>;
}

/// 身份提供方：从请求携带的凭证得到已认证的用户标识，或认定未认证。
pub trait IdentityProvider: Send + Sync {
    fn current_identity(&self, credential: &str) -> Option<UserId>;
}
