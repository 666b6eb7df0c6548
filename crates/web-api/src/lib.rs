//! Web API 层。
//!
//! 提供 Axum 路由，将 HTTP / WebSocket 请求委托给应用层的用例服务。
//! 身份只在边界处解析一次：HTTP 用 Bearer 头，WebSocket 在升级时用
//! token 查询参数。

mod auth;
mod error;
mod events;
mod routes;
mod state;
mod ws_connection;

pub use auth::{bearer_token, TokenService};
pub use config::AuthConfig;
pub use error::ApiError;
pub use events::{ClientEvent, ServerEvent};
pub use routes::router;
pub use state::AppState;
