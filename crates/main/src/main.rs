//! 主应用程序入口
//!
//! 装配依赖并启动 Axum Web API 服务。

use std::sync::Arc;

use application::{
    ChatDispatcher, ChatDispatcherDependencies, RoomResolver, RoomResolverDependencies,
    SessionRegistry, SystemClock,
};
use config::AppConfig;
use infrastructure::{create_pg_pool, PgDirectory, PgMessageStore, PgRoomStore, MIGRATOR};
use tracing_subscriber::EnvFilter;
use web_api::{router, AppState, TokenService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = AppConfig::from_env_with_defaults();
    config.validate()?;

    tracing::info!(
        "连接数据库: {}",
        config.database.url.split('@').next_back().unwrap_or("unknown")
    );
    let pool = create_pg_pool(&config.database.url, config.database.max_connections).await?;

    // 运行迁移
    MIGRATOR.run(&pool).await?;

    let directory = Arc::new(PgDirectory::new(pool.clone()));
    let clock = Arc::new(SystemClock);
    let registry = Arc::new(SessionRegistry::new());

    let resolver = Arc::new(RoomResolver::new(RoomResolverDependencies {
        room_store: Arc::new(PgRoomStore::new(pool.clone())),
        directory: directory.clone(),
        clock: clock.clone(),
    }));
    let dispatcher = Arc::new(ChatDispatcher::new(ChatDispatcherDependencies {
        message_store: Arc::new(PgMessageStore::new(pool)),
        directory,
        clock,
        resolver: resolver.clone(),
        registry: registry.clone(),
    }));
    let identity = Arc::new(TokenService::new(config.auth.clone()));

    let state = AppState::new(resolver, dispatcher, registry, identity);
    let app = router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("聊天服务器启动在 http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
