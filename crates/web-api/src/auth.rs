//! 身份提供方的令牌实现。
//!
//! 登录/注册流程在核心之外完成并签发令牌；核心只在连接边界
//! 验证令牌并取出用户标识。

use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use config::AuthConfig;
use domain::UserId;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use application::IdentityProvider;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    exp: usize,
}

pub struct TokenService {
    config: AuthConfig,
}

impl TokenService {
    pub fn new(config: AuthConfig) -> Self {
        Self { config }
    }

    /// 为已认证的用户签发令牌。由外部登录流程调用；
    /// 集成测试也用它直接制造身份。
    pub fn issue(&self, user: &UserId) -> Result<String, jsonwebtoken::errors::Error> {
        let expires_at = time::OffsetDateTime::now_utc()
            + time::Duration::hours(self.config.expiration_hours);
        let claims = Claims {
            sub: user.as_str().to_owned(),
            exp: expires_at.unix_timestamp() as usize,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.secret.as_bytes()),
        )
    }
}

impl IdentityProvider for TokenService {
    fn current_identity(&self, credential: &str) -> Option<UserId> {
        let data = decode::<Claims>(
            credential,
            &DecodingKey::from_secret(self.config.secret.as_bytes()),
            &Validation::default(),
        )
        .ok()?;
        UserId::parse(data.claims.sub).ok()
    }
}

/// 从请求头取 Bearer 令牌。
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new(AuthConfig {
            secret: "0123456789abcdef0123456789abcdef".to_owned(),
            expiration_hours: 1,
        })
    }

    #[test]
    fn issued_token_round_trips() {
        let service = service();
        let user = UserId::parse("alice@x.com").unwrap();
        let token = service.issue(&user).unwrap();
        assert_eq!(service.current_identity(&token), Some(user));
    }

    #[test]
    fn garbage_token_yields_no_identity() {
        assert!(service().current_identity("not-a-token").is_none());
    }

    #[test]
    fn token_from_another_secret_is_rejected() {
        let other = TokenService::new(AuthConfig {
            secret: "ffffffffffffffffffffffffffffffff".to_owned(),
            expiration_hours: 1,
        });
        let token = other.issue(&UserId::parse("alice@x.com").unwrap()).unwrap();
        assert!(service().current_identity(&token).is_none());
    }
}
