//! Message shapes for the socket and HTTP surfaces.
//!
//! Socket frames follow the `{ "event": ..., "data": ... }` convention
//! the browser client already uses, so events are adjacently tagged and
//! every name is camelCase on the wire.

use serde::{Deserialize, Serialize};

use crate::RoomCode;

// ---------------------------------------------------------------------------
// Socket events
// ---------------------------------------------------------------------------

/// Client → server socket events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ClientEvent {
    /// "Put this socket in the room." Sent after the REST call resolved.
    ///
    /// `wallet_connected` is the raw account string the client had at the
    /// time, or `null` when no wallet is connected.
    JoinRoom {
        room_code: RoomCode,
        #[serde(default)]
        wallet_connected: Option<String>,
    },

    /// "Take this socket out of its room."
    LeaveRoom,

    /// Keep-alive.
    Ping,
}

/// Server → client socket events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ServerEvent {
    /// Current member list of a room, in join order. Broadcast to every
    /// member after each membership change.
    RoomMembers {
        room_code: RoomCode,
        members: Vec<u64>,
    },

    /// The room was closed; every former member is unbound.
    RoomClosed { room_code: RoomCode },

    /// Reply to [`ClientEvent::Ping`].
    Pong,

    /// Something the client sent could not be honoured.
    /// `code` follows HTTP conventions (400, 404, ...).
    Error { code: u16, message: String },
}

// ---------------------------------------------------------------------------
// HTTP bodies
// ---------------------------------------------------------------------------

/// `POST /create-room` success body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomResponse {
    pub room_code: RoomCode,
}

/// `POST /join-room` request body.
///
/// The code is kept as a raw string: a malformed code is the same
/// expected user error as an unknown one and must answer
/// `{"success": false}`, not a 4xx.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRoomRequest {
    pub room_code: String,
}

/// `POST /join-room` response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinRoomResponse {
    pub success: bool,
}

/// Body of every non-2xx JSON response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
