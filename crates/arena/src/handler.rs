//! Per-connection handler: socket events and room membership broadcasts.
//!
//! Each accepted socket gets its own Tokio task running this handler,
//! plus a writer task that drains the socket's outbound queue. The flow:
//!   1. Register the socket's outbound queue in `peers`
//!   2. Loop: receive events → `joinRoom` / `leaveRoom` / `ping`
//!   3. On close (or any exit): unbind and tell the room who is left

use std::sync::Arc;

use arena_entitlement::{OwnershipOracle, PurchaseLedger};
use arena_protocol::{Address, ClientEvent, Codec, RoomCode, ServerEvent};
use arena_session::BindOutcome;
use arena_transport::{Connection, ConnectionId, WebSocketConnection};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::server::{PeerSender, ServerState, PEER_QUEUE_CAPACITY};
use crate::ArenaError;

/// Drop guard that unbinds a socket when its handler exits.
///
/// This ensures cleanup happens even if the handler panics. Since `Drop`
/// is synchronous, we spawn a fire-and-forget task for the async work.
struct ConnectionGuard<L: PurchaseLedger, O: OwnershipOracle> {
    conn_id: ConnectionId,
    state: Arc<ServerState<L, O>>,
}

impl<L: PurchaseLedger, O: OwnershipOracle> Drop for ConnectionGuard<L, O> {
    fn drop(&mut self) {
        let conn_id = self.conn_id;
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            state.peers.lock().await.remove(&conn_id);
            if let Some(left) = state.gateway.unbind(conn_id).await {
                broadcast_members(&state, &left.room_code).await;
            }
        });
    }
}

/// Handles a single socket from accept to close.
pub(crate) async fn handle_connection<L, O>(
    conn: WebSocketConnection,
    state: Arc<ServerState<L, O>>,
) -> Result<(), ArenaError>
where
    L: PurchaseLedger,
    O: OwnershipOracle,
{
    let conn = Arc::new(conn);
    let conn_id = conn.id();
    tracing::debug!(%conn_id, "handling new connection");

    let (tx, rx) = mpsc::channel(PEER_QUEUE_CAPACITY);
    state.peers.lock().await.insert(conn_id, tx.clone());
    let _guard = ConnectionGuard {
        conn_id,
        state: Arc::clone(&state),
    };
    tokio::spawn(write_loop(Arc::clone(&conn), rx, state.codec));

    loop {
        let data = match conn.recv().await {
            Ok(Some(data)) => data,
            Ok(None) => {
                tracing::info!(%conn_id, "connection closed cleanly");
                break;
            }
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "recv error");
                break;
            }
        };

        let event: ClientEvent = match state.codec.decode(&data) {
            Ok(event) => event,
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "failed to decode event");
                send(&tx, error_event(400, &format!("invalid event: {e}")));
                continue;
            }
        };

        match event {
            ClientEvent::JoinRoom {
                room_code,
                wallet_connected,
            } => {
                let wallet = wallet_connected.as_deref().and_then(parse_wallet);
                handle_join(&state, &tx, conn_id, room_code, wallet).await;
            }
            ClientEvent::LeaveRoom => {
                if let Some(left) = state.gateway.unbind(conn_id).await {
                    broadcast_members(&state, &left.room_code).await;
                }
            }
            ClientEvent::Ping => send(&tx, ServerEvent::Pong),
        }
    }

    // _guard drops here → unbind fires.
    Ok(())
}

async fn handle_join<L, O>(
    state: &Arc<ServerState<L, O>>,
    tx: &PeerSender,
    conn_id: ConnectionId,
    room_code: RoomCode,
    wallet: Option<Address>,
) where
    L: PurchaseLedger,
    O: OwnershipOracle,
{
    match state.gateway.bind_socket(&room_code, conn_id, wallet).await {
        BindOutcome::Joined { room, left } => {
            if let Some(left) = left {
                broadcast_members(state, &left.room_code).await;
            }
            broadcast_members(state, &room.room_code).await;
        }
        BindOutcome::AlreadyBound { room } => {
            send(
                tx,
                ServerEvent::RoomMembers {
                    room_code: room.room_code,
                    members: room.members.iter().map(|m| m.into_inner()).collect(),
                },
            );
        }
        BindOutcome::RoomNotFound(code) => {
            send(tx, error_event(404, &format!("room {code} not found")));
        }
    }
}

/// Sends the room's current member list to every member.
///
/// The list is read while `peers` is held, so concurrent broadcasts for
/// the same room go out in order and the last one any member sees is
/// the latest state.
pub(crate) async fn broadcast_members<L, O>(state: &ServerState<L, O>, code: &RoomCode)
where
    L: PurchaseLedger,
    O: OwnershipOracle,
{
    let peers = state.peers.lock().await;
    let Some(room) = state.gateway.room(code).await else {
        return;
    };

    let event = ServerEvent::RoomMembers {
        room_code: room.code().clone(),
        members: room.members().iter().map(|m| m.into_inner()).collect(),
    };
    for member in room.members() {
        if let Some(peer) = peers.get(member) {
            send(peer, event.clone());
        }
    }
}

/// Tells the former members of a closed room that it is gone.
pub(crate) async fn broadcast_closed<L, O>(
    state: &ServerState<L, O>,
    code: &RoomCode,
    members: &[ConnectionId],
) where
    L: PurchaseLedger,
    O: OwnershipOracle,
{
    let peers = state.peers.lock().await;
    let event = ServerEvent::RoomClosed {
        room_code: code.clone(),
    };
    for member in members {
        if let Some(peer) = peers.get(member) {
            send(peer, event.clone());
        }
    }
}

/// Drains a socket's outbound queue. Ends when every sender is gone or
/// the socket stops accepting writes.
async fn write_loop(
    conn: Arc<WebSocketConnection>,
    mut rx: mpsc::Receiver<ServerEvent>,
    codec: impl Codec,
) {
    while let Some(event) = rx.recv().await {
        let bytes = match codec.encode(&event) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(error = %e, "failed to encode event");
                continue;
            }
        };
        if let Err(e) = conn.send(&bytes).await {
            tracing::debug!(conn_id = %conn.id(), error = %e, "send failed");
            break;
        }
    }
}

/// Queues `event` without waiting. A socket that stopped reading loses
/// the event; every `roomMembers` carries the full list, so the next one
/// it does read is current again.
fn send(tx: &PeerSender, event: ServerEvent) {
    match tx.try_send(event) {
        Ok(()) => {}
        Err(TrySendError::Full(_)) => {
            tracing::warn!("outbound queue full, event dropped");
        }
        // The receiver only goes away once the socket is closing.
        Err(TrySendError::Closed(_)) => {}
    }
}

fn error_event(code: u16, message: &str) -> ServerEvent {
    ServerEvent::Error {
        code,
        message: message.to_string(),
    }
}

fn parse_wallet(raw: &str) -> Option<Address> {
    match Address::parse(raw) {
        Ok(address) => Some(address),
        Err(e) => {
            tracing::debug!(error = %e, "ignoring unparseable wallet");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_wallet_normalizes_case() {
        let wallet = parse_wallet("0xABCDEFabcdef0000000000000000000000000000").unwrap();
        assert_eq!(wallet.as_str(), "0xabcdefabcdef0000000000000000000000000000");
    }

    #[test]
    fn test_parse_wallet_garbage_is_none() {
        assert!(parse_wallet("not-a-wallet").is_none());
        assert!(parse_wallet("").is_none());
    }

    #[test]
    fn test_send_full_queue_drops_instead_of_growing() {
        let (tx, mut rx) = mpsc::channel(2);

        for _ in 0..10 {
            send(&tx, ServerEvent::Pong);
        }

        assert_eq!(rx.try_recv(), Ok(ServerEvent::Pong));
        assert_eq!(rx.try_recv(), Ok(ServerEvent::Pong));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_send_after_socket_closed_is_silent() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);

        send(&tx, ServerEvent::Pong);
    }

    #[test]
    fn test_error_event_shape() {
        assert_eq!(
            error_event(404, "gone"),
            ServerEvent::Error {
                code: 404,
                message: "gone".into()
            }
        );
    }
}
