//! # Arena
//!
//! Room session coordinator and skin entitlement server.
//!
//! Players create or join short-lived rooms by a short code over HTTP,
//! then attach their socket to the room; every member is told who is in
//! the room after each change. Separately, a connected wallet's skin
//! entitlements are resolved from a purchase ledger and an NFT oracle,
//! and skin selections are only accepted when entitled.
//!
//! ## Layers
//!
//! ```text
//! arena (this crate)   ← HTTP API, socket handler, idle sweeper, config
//!   ├── arena-session      ← create / join / bind
//!   │     └── arena-room   ← registry + code generator
//!   ├── arena-entitlement  ← resolver, skin store, ledger + oracle traits
//!   ├── arena-protocol     ← identifiers, events, codec
//!   └── arena-transport    ← WebSocket connections
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use arena::prelude::*;
//!
//! # async fn start() -> Result<(), ArenaError> {
//! let config = ServerConfig::from_env()?;
//! let server = ArenaServer::builder()
//!     .from_config(&config)
//!     .build(
//!         MemoryLedger::new(config.items.clone()),
//!         ConfiguredOracle::from_config(&config),
//!         config.resolver_config(),
//!     )
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
mod http;
mod oracle;
mod server;
mod sweeper;

pub use config::ServerConfig;
pub use error::{ArenaError, ConfigError};
pub use oracle::ConfiguredOracle;
pub use server::{ArenaServer, ArenaServerBuilder};

/// Everything needed to start a server.
pub mod prelude {
    pub use crate::{
        ArenaError, ArenaServer, ArenaServerBuilder, ConfigError, ConfiguredOracle, ServerConfig,
    };
    pub use arena_entitlement::{
        MemoryLedger, OwnershipOracle, PurchaseLedger, ResolverConfig, SkinCatalog, StaticOracle,
    };
    pub use arena_protocol::{Address, RoomCode};
    pub use arena_session::SessionConfig;
}
