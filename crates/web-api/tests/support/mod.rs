//! 集成测试公共装配：内存端口 + 内嵌服务器。

use std::net::SocketAddr;
use std::sync::Arc;

use application::{
    ChatDispatcher, ChatDispatcherDependencies, MemoryDirectory, MemoryMessageStore,
    MemoryRoomStore, RoomResolver, RoomResolverDependencies, SessionRegistry, SystemClock,
};
use domain::UserId;
use web_api::{router, AppState, AuthConfig, TokenService};

pub struct TestApp {
    pub addr: SocketAddr,
    pub directory: Arc<MemoryDirectory>,
    pub tokens: Arc<TokenService>,
}

impl TestApp {
    pub fn http(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn ws(&self, token: &str) -> String {
        format!("ws://{}/api/v1/ws?token={}", self.addr, token)
    }

    /// 目录里登记一个用户并签发其令牌；替代核心之外的注册/登录流程。
    pub async fn register(&self, email: &str, name: &str) -> String {
        let user = UserId::parse(email).unwrap();
        self.directory.register(user.clone(), name).await;
        self.tokens.issue(&user).unwrap()
    }
}

pub async fn spawn_app() -> TestApp {
    let directory = Arc::new(MemoryDirectory::new());
    let clock = Arc::new(SystemClock);
    let registry = Arc::new(SessionRegistry::new());
    let resolver = Arc::new(RoomResolver::new(RoomResolverDependencies {
        room_store: Arc::new(MemoryRoomStore::new()),
        directory: directory.clone(),
        clock: clock.clone(),
    }));
    let dispatcher = Arc::new(ChatDispatcher::new(ChatDispatcherDependencies {
        message_store: Arc::new(MemoryMessageStore::new()),
        directory: directory.clone(),
        clock,
        resolver: resolver.clone(),
        registry: registry.clone(),
    }));
    let tokens = Arc::new(TokenService::new(AuthConfig {
        secret: "integration-test-secret-at-least-32-chars".to_owned(),
        expiration_hours: 1,
    }));
    let state = AppState::new(resolver, dispatcher, registry, tokens.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        axum::serve(listener, router(state)).await.ok();
    });

    TestApp {
        addr,
        directory,
        tokens,
    }
}
