//! 基础设施层实现。
//!
//! 提供房间、消息、用户目录的 PostgreSQL 适配器，实现应用层定义的端口。

pub mod migrations;
pub mod repository;

pub use migrations::MIGRATOR;
pub use repository::{create_pg_pool, PgDirectory, PgMessageStore, PgRoomStore};
