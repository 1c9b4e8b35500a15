//! Skin entitlements for Arena.
//!
//! A connected wallet may switch a skin category away from its default
//! only if it owns the right thing: a purchased ledger item, or a token
//! from the shape-key NFT contract. This crate answers "what may this
//! account select?" and owns the one place where selections are written.
//!
//! # How it fits in the stack
//!
//! ```text
//! Server (above)  ← HTTP handlers call the resolver
//!     ↕
//! Entitlement Layer (this crate)
//!     ├── EntitlementResolver  ← merges ledger + oracle, gates selection
//!     ├── SkinSelectionStore   ← current asset per category
//!     ├── PurchaseLedger       ← item contract (trait)
//!     └── OwnershipOracle      ← NFT lookups (trait)
//! ```
//!
//! # Quick start
//!
//! ```
//! use arena_entitlement::{
//!     EntitlementResolver, MemoryLedger, ResolverConfig, SkinCatalog, StaticOracle, Wei,
//! };
//! use arena_protocol::Address;
//!
//! # async fn demo() {
//! let gating = Address::parse("0x05aA491820662b131d285757E5DA4b74BD0F0e5F").unwrap();
//! let resolver = EntitlementResolver::new(
//!     MemoryLedger::new([("k2".to_string(), Wei::new(250))]),
//!     StaticOracle::new(),
//!     SkinCatalog::default(),
//!     ResolverConfig::new(gating),
//! );
//!
//! let player = Address::parse("0x00000000000000000000000000000000000000aa").unwrap();
//! let entitlements = resolver.current_entitlements(&player).await;
//! assert!(entitlements.unlocked.is_empty());
//! # }
//! ```

mod catalog;
mod error;
mod ledger;
mod oracle;
mod resolver;
mod store;

pub use catalog::{AssetRef, SkinCatalog, SkinCategory, SkinGate, UnlockableSkin};
pub use error::{EntitlementError, LedgerError, OracleError, PurchaseError};
pub use ledger::{
    ItemId, LedgerItem, MemoryLedger, PurchaseLedger, ReceiptStatus, TransactionReceipt, TxHash,
    Wei,
};
pub use oracle::{AlchemyOracle, OwnedNft, OwnershipOracle, StaticOracle};
pub use resolver::{
    DenyReason, EntitlementResolver, Entitlements, ResolverConfig, Selection, ShapeKeyStatus,
    Source,
};
pub use store::SkinSelectionStore;
