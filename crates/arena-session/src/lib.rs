//! Room sessions for Arena.
//!
//! This crate is the request/socket-facing side of the room layer. It
//! answers the two REST calls (`create-room`, `join-room`) and the socket
//! `joinRoom` event, and it is the only thing that drives the
//! [`RoomRegistry`](arena_room::RoomRegistry).
//!
//! # How it fits in the stack
//!
//! ```text
//! Server (above)  ← HTTP handlers and socket tasks call the gateway
//!     ↕
//! Session Layer (this crate)  ← one lock around registry + bindings
//!     ↕
//! Room Layer (below)  ← codes, members, idle expiry
//! ```
//!
//! # REST join vs socket bind
//!
//! The browser first POSTs `/join-room` and only afterwards emits
//! `joinRoom` on its socket. Those arrive independently: the socket
//! event can come first, second, twice, or never. So the two are kept as
//! separate operations. [`SessionGateway::join_room_by_code`] only
//! validates; [`SessionGateway::bind_socket`] is the one that mutates
//! membership, and it is idempotent.

mod error;
mod gateway;

pub use error::SessionError;
pub use gateway::{BindOutcome, Binding, Membership, SessionConfig, SessionGateway};
