use std::sync::Arc;

use application::{ChatDispatcher, IdentityProvider, RoomResolver, SessionRegistry};

#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<RoomResolver>,
    pub dispatcher: Arc<ChatDispatcher>,
    pub registry: Arc<SessionRegistry>,
    pub identity: Arc<dyn IdentityProvider>,
}

impl AppState {
    pub fn new(
        resolver: Arc<RoomResolver>,
        dispatcher: Arc<ChatDispatcher>,
        registry: Arc<SessionRegistry>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self {
            resolver,
            dispatcher,
            registry,
            identity,
        }
    }
}
