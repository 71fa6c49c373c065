//! `IncognitoServer` builder and server loop.
//!
//! This is the entry point for running an Incognito server. It ties the
//! layers together: transport → protocol → rooms.

use std::sync::Arc;
use std::time::Duration;

use incognito_protocol::JsonCodec;
use incognito_room::{RoomConfig, RoomRegistry};
use incognito_transport::{Transport, WebSocketTransport};
use tokio::sync::Mutex;

use crate::IncognitoError;
use crate::handler::handle_connection;

/// Shared server state passed to each connection handler task.
///
/// Wrapped in `Arc` so it can be cheaply cloned across tasks. The
/// registry sits behind a `Mutex`; all game state lives inside the
/// room actors, so the lock is held only for code lookups.
pub(crate) struct ServerState {
    pub(crate) rooms: Mutex<RoomRegistry>,
    pub(crate) codec: JsonCodec,
}

/// Builder for configuring and starting an Incognito server.
///
/// # Example
///
/// ```rust,ignore
/// let server = IncognitoServer::builder()
///     .bind("0.0.0.0:8080")
///     .build()
///     .await?;
/// server.run().await
/// ```
pub struct IncognitoServerBuilder {
    bind_addr: String,
    room_config: RoomConfig,
    sweep_interval: Duration,
}

impl IncognitoServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            room_config: RoomConfig::default(),
            sweep_interval: Duration::from_secs(60),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the room configuration.
    pub fn room_config(mut self, config: RoomConfig) -> Self {
        self.room_config = config;
        self
    }

    /// Sets how often idle rooms are swept.
    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Builds the server, binding the WebSocket listener.
    pub async fn build(self) -> Result<IncognitoServer, IncognitoError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;

        let state = Arc::new(ServerState {
            rooms: Mutex::new(RoomRegistry::new(self.room_config)),
            codec: JsonCodec,
        });

        Ok(IncognitoServer {
            transport,
            state,
            sweep_interval: self.sweep_interval,
        })
    }
}

impl Default for IncognitoServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running Incognito server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct IncognitoServer {
    transport: WebSocketTransport,
    state: Arc<ServerState>,
    sweep_interval: Duration,
}

impl IncognitoServer {
    /// Creates a new builder.
    pub fn builder() -> IncognitoServerBuilder {
        IncognitoServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Runs the server accept loop.
    ///
    /// Accepts incoming connections and spawns a handler task for each.
    /// A background task sweeps idle rooms on the configured interval.
    /// Runs until the process is terminated.
    pub async fn run(mut self) -> Result<(), IncognitoError> {
        tracing::info!("Incognito server running");

        let sweep_state = Arc::clone(&self.state);
        let sweep_interval = self.sweep_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(sweep_interval);
            ticker.tick().await; // first tick fires immediately
            loop {
                ticker.tick().await;
                sweep_idle_rooms(&sweep_state).await;
            }
        });

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(
                                error = %e,
                                "connection ended with error"
                            );
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}

/// One sweep pass. Room actors are queried with the registry lock
/// released, so lookups and creates are never stalled behind the per-room
/// status round-trips; the lock is re-taken briefly to remove stale rooms.
async fn sweep_idle_rooms(state: &Arc<ServerState>) {
    let (handles, idle_ttl) = {
        let rooms = state.rooms.lock().await;
        (rooms.handles(), rooms.idle_ttl())
    };

    let mut stale = Vec::new();
    for handle in handles {
        match handle.status().await {
            Ok(status) if status.idle_for >= idle_ttl => stale.push(handle),
            Ok(_) => {}
            Err(_) => stale.push(handle),
        }
    }
    if stale.is_empty() {
        return;
    }

    let removed: Vec<_> = {
        let mut rooms = state.rooms.lock().await;
        stale
            .iter()
            .filter_map(|handle| rooms.remove(handle.code()))
            .collect()
    };
    for handle in &removed {
        let _ = handle.shutdown().await;
    }
    tracing::info!(count = removed.len(), "swept idle rooms");
}
