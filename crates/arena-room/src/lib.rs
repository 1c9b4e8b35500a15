//! Room registry and room-code allocation for Arena.
//!
//! A room is nothing more than a live code plus the set of sockets bound
//! to it. This crate owns room existence: nothing above it can create or
//! destroy a room except through [`RoomRegistry`].
//!
//! # Key types
//!
//! - [`RoomRegistry`]: live rooms keyed by [`RoomCode`](arena_protocol::RoomCode)
//! - [`Room`]: one room's members and timestamps
//! - [`RoomCodeGenerator`]: collision-checked short codes
//! - [`CodeConfig`]: alphabet, length, and retry bound for codes
//!
//! # Concurrency note
//!
//! Like the rest of the state types in this workspace, the registry is a
//! plain single-owner structure. The session layer wraps it (together
//! with its connection bindings) in one mutex, which is what makes each
//! operation atomic with respect to the others.

mod code;
mod config;
mod error;
mod registry;
mod room;

pub use code::RoomCodeGenerator;
pub use config::CodeConfig;
pub use error::RoomError;
pub use registry::RoomRegistry;
pub use room::Room;
