//! The session gateway: room creation, join validation, and socket binding.
//!
//! All room state lives behind a single `tokio::sync::Mutex`. Each public
//! method takes the lock once, does purely in-memory work, and releases
//! it. No I/O ever happens while it is held. That is what makes
//! "generate a free code, then allocate it" atomic, so two concurrent
//! `create_room` calls can never be handed the same code.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use arena_protocol::{Address, RoomCode};
use arena_room::{CodeConfig, Room, RoomCodeGenerator, RoomError, RoomRegistry};
use arena_transport::ConnectionId;
use tokio::sync::Mutex;

use crate::SessionError;

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Configuration for the gateway.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Shape of generated room codes.
    pub code: CodeConfig,

    /// How long an empty room survives before the idle sweep removes it.
    ///
    /// Default: 10 minutes. A room that was created but never bound (the
    /// client navigated away before its socket event) is reclaimed this
    /// way too.
    pub idle_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            code: CodeConfig::default(),
            idle_timeout: Duration::from_secs(600),
        }
    }
}

// ---------------------------------------------------------------------------
// Outcome types
// ---------------------------------------------------------------------------

/// A room's member list at one instant, in join order.
///
/// Returned from every membership change so the caller can broadcast it
/// without taking the lock again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Membership {
    pub room_code: RoomCode,
    pub members: Vec<ConnectionId>,
}

impl Membership {
    fn of(room: &Room) -> Self {
        Self {
            room_code: room.code().clone(),
            members: room.members().to_vec(),
        }
    }
}

/// Result of [`SessionGateway::bind_socket`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindOutcome {
    /// The socket was added to the room.
    ///
    /// `left` is the room it was moved out of, if it was bound elsewhere
    /// and that room is still live.
    Joined {
        room: Membership,
        left: Option<Membership>,
    },

    /// The socket was already bound to this room. Nothing changed
    /// (except the wallet, if a new one was supplied).
    AlreadyBound { room: Membership },

    /// No live room has this code. Not an error: the room may have
    /// expired between the REST call and the socket event.
    RoomNotFound(RoomCode),
}

/// What the gateway knows about a bound socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    /// The room the socket belongs to.
    pub room_code: RoomCode,

    /// Wallet the client reported when binding, if any.
    pub wallet: Option<Address>,

    /// When the socket was (last) bound.
    pub bound_at: Instant,
}

// ---------------------------------------------------------------------------
// SessionGateway
// ---------------------------------------------------------------------------

/// Everything guarded by the gateway's lock.
///
/// `bindings` is the connection → room index. Keeping it next to the
/// registry, under the same lock, is what enforces "a connection belongs
/// to at most one room".
#[derive(Debug, Default)]
struct GatewayState {
    registry: RoomRegistry,
    bindings: HashMap<ConnectionId, Binding>,
}

/// Request/socket-facing API over the room registry.
pub struct SessionGateway {
    state: Mutex<GatewayState>,
    generator: RoomCodeGenerator,
    config: SessionConfig,
}

impl SessionGateway {
    /// Creates a gateway with an empty registry.
    ///
    /// # Errors
    /// Returns a [`RoomError::InvalidConfig`] wrapped in
    /// [`SessionError::Room`] if `config.code` is unusable.
    pub fn new(config: SessionConfig) -> Result<Self, SessionError> {
        let generator = RoomCodeGenerator::new(&config.code)?;
        Ok(Self {
            state: Mutex::new(GatewayState::default()),
            generator,
            config,
        })
    }

    /// The configuration this gateway was built with.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Creates a room under a fresh code.
    ///
    /// # Errors
    /// [`RoomError::ExhaustedRetries`] (wrapped) if no free code was found
    /// within the generator's retry bound.
    pub async fn create_room(&self) -> Result<RoomCode, SessionError> {
        let mut state = self.state.lock().await;
        let code = self.generator.next(&state.registry)?;
        state.registry.allocate(code.clone(), Instant::now())?;
        Ok(code)
    }

    /// Checks whether `raw` names a live room.
    ///
    /// Never fails: a malformed or unknown code is an ordinary user
    /// mistake and simply answers `false`. Membership is not touched;
    /// that is [`bind_socket`](Self::bind_socket)'s job.
    pub async fn join_room_by_code(&self, raw: &str) -> bool {
        let code = match RoomCode::parse(raw) {
            Ok(code) => code,
            Err(e) => {
                tracing::debug!(error = %e, "join with malformed room code");
                return false;
            }
        };

        let state = self.state.lock().await;
        match state.registry.get(&code) {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!(error = %e, "join for unknown room");
                false
            }
        }
    }

    /// Binds a socket to a room.
    ///
    /// - Not bound anywhere → added to `code`.
    /// - Bound to another room → removed from it first, then added.
    /// - Already bound to `code` → no-op ([`BindOutcome::AlreadyBound`]).
    /// - `code` not live → [`BindOutcome::RoomNotFound`]; any existing
    ///   binding is left alone.
    ///
    /// A `Some` wallet replaces the one stored on the binding; `None`
    /// keeps whatever was there.
    pub async fn bind_socket(
        &self,
        code: &RoomCode,
        conn: ConnectionId,
        wallet: Option<Address>,
    ) -> BindOutcome {
        let now = Instant::now();
        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        if !state.registry.contains(code) {
            tracing::debug!(room_code = %code, conn_id = %conn, "bind to unknown room");
            return BindOutcome::RoomNotFound(code.clone());
        }

        let previous = state.bindings.get(&conn).map(|b| b.room_code.clone());

        if previous.as_ref() == Some(code) {
            if let (Some(binding), Some(wallet)) = (state.bindings.get_mut(&conn), wallet) {
                binding.wallet = Some(wallet);
            }
            // The registry is the source of truth; re-adding is a no-op
            // there too, but it heals a binding whose member was lost.
            return match state.registry.add_member(code, conn, now) {
                Ok(room) => BindOutcome::AlreadyBound {
                    room: Membership::of(room),
                },
                Err(_) => BindOutcome::RoomNotFound(code.clone()),
            };
        }

        let left = previous.and_then(|old| {
            match state.registry.remove_member(&old, conn, now) {
                Ok(_) => state.registry.get(&old).ok().map(Membership::of),
                // The old room was closed underneath this binding.
                Err(RoomError::NotFound(_)) => None,
                Err(e) => {
                    tracing::warn!(error = %e, "unexpected error leaving old room");
                    None
                }
            }
        });

        let membership = match state.registry.add_member(code, conn, now) {
            Ok(room) => Membership::of(room),
            Err(_) => return BindOutcome::RoomNotFound(code.clone()),
        };

        let wallet = wallet.or_else(|| {
            state.bindings.get(&conn).and_then(|b| b.wallet.clone())
        });
        state.bindings.insert(
            conn,
            Binding {
                room_code: code.clone(),
                wallet,
                bound_at: now,
            },
        );

        tracing::info!(
            room_code = %code,
            conn_id = %conn,
            members = membership.members.len(),
            moved_from = ?left.as_ref().map(|m| m.room_code.to_string()),
            "socket bound"
        );
        BindOutcome::Joined {
            room: membership,
            left,
        }
    }

    /// Removes a socket from whatever room it is bound to (leave event or
    /// disconnect). Returns the remaining membership of that room, or
    /// `None` if the socket wasn't bound or the room is already gone.
    pub async fn unbind(&self, conn: ConnectionId) -> Option<Membership> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        let binding = state.bindings.remove(&conn)?;
        match state
            .registry
            .remove_member(&binding.room_code, conn, Instant::now())
        {
            Ok(_) => {
                tracing::info!(
                    room_code = %binding.room_code,
                    conn_id = %conn,
                    "socket unbound"
                );
                state.registry.get(&binding.room_code).ok().map(Membership::of)
            }
            Err(_) => None,
        }
    }

    /// Explicitly closes a room and drops the bindings of its members.
    /// Returns the sockets that were still bound.
    ///
    /// # Errors
    /// [`RoomError::NotFound`] (wrapped) if the room is not live.
    pub async fn close_room(
        &self,
        code: &RoomCode,
    ) -> Result<Vec<ConnectionId>, SessionError> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        let room = state.registry.close(code)?;
        for member in room.members() {
            state.bindings.remove(member);
        }
        Ok(room.members().to_vec())
    }

    /// Expires rooms that have been empty for longer than the configured
    /// idle timeout. Called by the periodic sweeper, never by a request.
    pub async fn expire_idle(&self, now: Instant) -> Vec<RoomCode> {
        let mut state = self.state.lock().await;
        state.registry.expire_idle(now, self.config.idle_timeout)
    }

    /// Snapshot of a live room.
    pub async fn room(&self, code: &RoomCode) -> Option<Room> {
        let state = self.state.lock().await;
        state.registry.get(code).ok().cloned()
    }

    /// The binding of a socket, if it has one.
    pub async fn binding(&self, conn: ConnectionId) -> Option<Binding> {
        let state = self.state.lock().await;
        state.bindings.get(&conn).cloned()
    }

    /// Number of live rooms.
    pub async fn room_count(&self) -> usize {
        self.state.lock().await.registry.len()
    }
}
