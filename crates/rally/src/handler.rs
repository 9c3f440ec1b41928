//! Per-connection handler.
//!
//! Each accepted connection gets its own Tokio task running this handler:
//!   1. Register with the lobby and get an outbox plus an input route
//!   2. Spawn a writer that drains the outbox onto the socket
//!   3. Loop: receive frames → decode → join via the lobby, or forward
//!      paddle moves and restart votes to the routed room

use std::sync::Arc;

use rally_protocol::{ClientEvent, Codec, ServerEvent};
use rally_room::RoomHandle;
use rally_transport::{Connection, ConnectionId, WebSocketConnection};
use tokio::sync::mpsc;

use crate::RallyError;
use crate::lobby::Route;
use crate::server::ServerState;

/// Drop guard that removes the connection from the lobby when the
/// handler exits, however it exits.
///
/// `Drop` is synchronous, so the async lock is taken in a spawned task.
struct DisconnectGuard<C: Codec> {
    conn_id: ConnectionId,
    state: Arc<ServerState<C>>,
}

impl<C: Codec> Drop for DisconnectGuard<C> {
    fn drop(&mut self) {
        let conn_id = self.conn_id;
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            state.lobby.lock().await.disconnect(conn_id).await;
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C: Codec>(
    conn: WebSocketConnection,
    state: Arc<ServerState<C>>,
) -> Result<(), RallyError> {
    let conn = Arc::new(conn);
    let conn_id = conn.id();
    tracing::debug!(%conn_id, "handling new connection");

    let (outbox, events) = mpsc::channel(state.outbox_capacity);
    let route = state.lobby.lock().await.connect(conn_id, outbox);
    let _guard = DisconnectGuard {
        conn_id,
        state: Arc::clone(&state),
    };

    let writer = tokio::spawn(write_events(Arc::clone(&conn), events, Arc::clone(&state)));
    let result = read_events(&conn, &state, &route).await;
    writer.abort();

    // Completes the close handshake, or fails quietly if the peer is gone.
    if let Err(e) = conn.close().await {
        tracing::debug!(%conn_id, error = %e, "close after read loop failed");
    }

    // _guard drops here → lobby disconnect fires.
    result
}

async fn read_events<C: Codec>(
    conn: &WebSocketConnection,
    state: &ServerState<C>,
    route: &Route,
) -> Result<(), RallyError> {
    let conn_id = conn.id();

    loop {
        let data = match conn.recv().await {
            Ok(Some(data)) => data,
            Ok(None) => {
                tracing::info!(%conn_id, "connection closed");
                return Ok(());
            }
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "recv error");
                return Err(e.into());
            }
        };

        let event: ClientEvent = match state.codec.decode(&data) {
            Ok(event) => event,
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "undecodable frame ignored");
                continue;
            }
        };

        match event {
            ClientEvent::JoinGame => {
                // Failures have already been reported to the player.
                if let Err(e) = state.lobby.lock().await.join_game(conn_id).await {
                    tracing::debug!(%conn_id, error = %e, "join failed");
                }
            }
            ClientEvent::PaddleMove { dir } => {
                let Some(room) = current_room(route) else {
                    tracing::debug!(%conn_id, "paddle move outside a room ignored");
                    continue;
                };
                if let Err(e) = room.paddle_move(conn_id, dir).await {
                    tracing::debug!(%conn_id, error = %e, "paddle move dropped");
                }
            }
            ClientEvent::RestartGame => {
                let Some(room) = current_room(route) else {
                    tracing::debug!(%conn_id, "restart vote outside a room ignored");
                    continue;
                };
                if let Err(e) = room.vote_restart(conn_id).await {
                    tracing::debug!(%conn_id, error = %e, "restart vote dropped");
                }
            }
        }
    }
}

/// Encodes outbox events onto the socket until the outbox closes or the
/// peer stops accepting writes.
async fn write_events<C: Codec>(
    conn: Arc<WebSocketConnection>,
    mut events: mpsc::Receiver<ServerEvent>,
    state: Arc<ServerState<C>>,
) {
    let conn_id = conn.id();

    while let Some(event) = events.recv().await {
        let bytes = match state.codec.encode(&event) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(%conn_id, event = event.name(), error = %e, "failed to encode event");
                continue;
            }
        };
        if let Err(e) = conn.send(&bytes).await {
            tracing::debug!(%conn_id, error = %e, "send failed, writer stopping");
            break;
        }
    }
}

/// Clone the routed handle out so the watch borrow is never held across
/// an await.
fn current_room(route: &Route) -> Option<RoomHandle> {
    route.borrow().clone()
}
