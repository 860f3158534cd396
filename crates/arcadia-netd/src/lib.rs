//! Real-time multiplayer session server.
//!
//! Each accepted WebSocket connection runs its own task; rooms are shared
//! between those tasks through [`room::RoomRegistry`].

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;

pub mod config;
pub mod game;
pub mod identity;
pub mod net;
pub mod proto_dispatch;
pub mod reward;
pub mod room;
pub mod session;

use config::ServerConfig;
use identity::IdentityResolver;
use reward::CredentialIssuer;
use room::RoomRegistry;
use session::SessionTable;

/// State shared by every connection task.
pub struct ServerState {
    pub config: ServerConfig,
    pub rooms: RoomRegistry,
    pub sessions: SessionTable,
    pub identity: Arc<dyn IdentityResolver>,
    pub credentials: Arc<dyn CredentialIssuer>,
}

impl ServerState {
    pub fn new(
        config: ServerConfig,
        identity: Arc<dyn IdentityResolver>,
        credentials: Arc<dyn CredentialIssuer>,
    ) -> Self {
        let config = config.normalized();
        Self {
            rooms: RoomRegistry::new(config.room_capacity),
            sessions: SessionTable::new(),
            config,
            identity,
            credentials,
        }
    }
}

/// Serve connections accepted on `listener` until it fails.
pub async fn run_server(listener: TcpListener, state: Arc<ServerState>) -> anyhow::Result<()> {
    info!(
        addr = %listener.local_addr()?,
        room_capacity = state.config.room_capacity,
        default_room = %state.config.default_room_id,
        "Session server started"
    );
    net::ws::run_ws_listener_with_listener(listener, state).await
}
