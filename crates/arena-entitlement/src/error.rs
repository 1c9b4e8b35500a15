//! Error types for the entitlement layer.
//!
//! Infrastructure failures ([`OracleError`], [`LedgerError`]) are mostly
//! absorbed by the resolver into fail-closed state. They only reach a
//! caller through [`EntitlementResolver::purchase`](crate::EntitlementResolver::purchase)
//! and [`EntitlementResolver::items`](crate::EntitlementResolver::items),
//! where there is no safe default to fall back to.

use std::time::Duration;

use crate::{ItemId, TxHash, Wei};

/// Failures talking to the NFT ownership oracle.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OracleError {
    /// The oracle did not answer within the call timeout.
    #[error("oracle timed out after {0:?}")]
    Timeout(Duration),

    /// The request could not be sent or came back with an error status.
    #[error("oracle request failed: {0}")]
    Request(String),

    /// The oracle answered, but not with something we understand.
    #[error("oracle response could not be decoded: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for OracleError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Decode(e.to_string())
        } else {
            Self::Request(e.to_string())
        }
    }
}

/// Failures talking to the purchase ledger.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// The ledger did not answer within the call timeout.
    #[error("ledger timed out after {0:?}")]
    Timeout(Duration),

    /// The ledger can't be reached right now.
    #[error("ledger unavailable: {0}")]
    Unavailable(String),

    /// The ledger refused the call outright (nothing was submitted).
    #[error("ledger rejected the call: {0}")]
    Rejected(String),
}

/// Why a purchase did not go through.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PurchaseError {
    #[error("no item with id {0}")]
    UnknownItem(ItemId),

    #[error("item {0} is already owned")]
    AlreadyOwned(ItemId),

    /// The offered value is not exactly the listed price.
    #[error("item costs {expected} wei, {offered} wei offered")]
    PriceMismatch { expected: Wei, offered: Wei },

    /// The transaction was mined but reverted.
    #[error("transaction {0} reverted")]
    Reverted(TxHash),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Bad input at the entitlement API boundary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EntitlementError {
    #[error("invalid address: {0:?}")]
    InvalidAddress(String),

    #[error("unknown skin category: {0:?}")]
    InvalidCategory(String),

    /// A decimal wei amount that didn't parse.
    #[error("invalid wei amount: {0:?}")]
    InvalidAmount(String),
}
