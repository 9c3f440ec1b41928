//! `RallyServer` builder and accept loop.
//!
//! Ties the layers together: transport → protocol → lobby → rooms.

use std::future::pending;
use std::sync::Arc;

use rally_protocol::{Codec, JsonCodec};
use rally_room::RoomConfig;
use rally_transport::{Transport, WebSocketTransport};
use tokio::sync::Mutex;

use crate::handler::handle_connection;
use crate::lobby::Lobby;
use crate::{RallyError, ServerConfig};

/// Shared server state passed to each connection handler task.
pub(crate) struct ServerState<C: Codec> {
    /// Join and disconnect both take this lock. Tokio's mutex is fair, so
    /// requests are served in arrival order.
    pub(crate) lobby: Mutex<Lobby>,
    pub(crate) codec: C,
    pub(crate) outbox_capacity: usize,
}

/// Builder for configuring and starting a Rally server.
///
/// # Example
///
/// ```rust,no_run
/// use rally::prelude::*;
///
/// # async fn start() -> Result<(), RallyError> {
/// let server = RallyServer::builder()
///     .bind("127.0.0.1:3000")
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct RallyServerBuilder {
    bind_addr: String,
    room_config: RoomConfig,
    outbox_capacity: usize,
}

impl RallyServerBuilder {
    /// Creates a builder with [`ServerConfig::default`] settings.
    pub fn new() -> Self {
        Self::from_config(&ServerConfig::default())
    }

    fn from_config(config: &ServerConfig) -> Self {
        Self {
            bind_addr: config.bind_addr.to_string(),
            room_config: config.room_config(),
            outbox_capacity: config.outbox_capacity,
        }
    }

    /// Replaces every setting with those derived from `config`.
    pub fn config(self, config: &ServerConfig) -> Self {
        Self::from_config(config)
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the configuration every new room is created with.
    pub fn room_config(mut self, config: RoomConfig) -> Self {
        self.room_config = config;
        self
    }

    pub fn outbox_capacity(mut self, capacity: usize) -> Self {
        self.outbox_capacity = capacity.max(1);
        self
    }

    /// Binds the listener. Frames are JSON text.
    pub async fn build(self) -> Result<RallyServer<JsonCodec>, RallyError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;

        let state = Arc::new(ServerState {
            lobby: Mutex::new(Lobby::new(self.room_config)),
            codec: JsonCodec,
            outbox_capacity: self.outbox_capacity,
        });

        Ok(RallyServer { transport, state })
    }
}

impl Default for RallyServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Rally server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct RallyServer<C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<C>>,
}

impl RallyServer<JsonCodec> {
    pub fn builder() -> RallyServerBuilder {
        RallyServerBuilder::new()
    }
}

impl<C: Codec> RallyServer<C> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Accepts connections until the process is terminated.
    pub async fn run(self) -> Result<(), RallyError> {
        self.run_until(pending()).await
    }

    /// Accepts connections until `shutdown` completes.
    ///
    /// Each connection gets its own handler task. Handlers already running
    /// are left to finish on their own.
    pub async fn run_until(mut self, shutdown: impl Future<Output = ()>) -> Result<(), RallyError> {
        match self.local_addr() {
            Ok(addr) => tracing::info!(%addr, "rally server listening"),
            Err(e) => tracing::warn!(error = %e, "rally server listening on unknown address"),
        }
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("shutdown requested, no longer accepting");
                    return Ok(());
                }
                accepted = self.transport.accept() => match accepted {
                    Ok(conn) => {
                        let state = Arc::clone(&self.state);
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(conn, state).await {
                                tracing::debug!(error = %e, "connection ended with error");
                            }
                        });
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "accept failed");
                    }
                },
            }
        }
    }
}
