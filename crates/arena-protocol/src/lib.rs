//! Wire protocol for Arena.
//!
//! This crate defines the "language" that clients and the server speak:
//!
//! - **Identifiers** ([`RoomCode`], [`Address`]): canonicalized at
//!   parse time so every layer above compares them the same way.
//! - **Socket events** ([`ClientEvent`], [`ServerEvent`]): the JSON
//!   frames exchanged over the WebSocket surface.
//! - **HTTP bodies** ([`CreateRoomResponse`], [`JoinRoomRequest`], ...):
//!   the room endpoints' request/response shapes.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how events are turned
//!   into bytes and back.
//!
//! The protocol layer knows nothing about rooms or accounts; it only
//! knows how identifiers look and how messages are shaped.

mod codec;
mod error;
mod ids;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use ids::{Address, RoomCode};
pub use types::{
    ClientEvent, CreateRoomResponse, ErrorBody, JoinRoomRequest,
    JoinRoomResponse, ServerEvent,
};
