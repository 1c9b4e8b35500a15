//! The purchase ledger: priced items and who bought them.
//!
//! [`PurchaseLedger`] is the read/write surface of the item contract.
//! Item ids are positions in [`items_details`](PurchaseLedger::items_details);
//! a skin is tied to an item by name, never by id.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

use arena_protocol::Address;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::{EntitlementError, LedgerError};

// ---------------------------------------------------------------------------
// Value types
// ---------------------------------------------------------------------------

/// Index of an item in the ledger's item list.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ItemId(u64);

impl ItemId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An amount of wei. Exact integer arithmetic only.
///
/// Travels as a decimal string on the wire, since JSON numbers lose
/// precision long before `u128` does.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct Wei(u128);

impl Wei {
    pub const fn new(amount: u128) -> Self {
        Self(amount)
    }

    pub fn into_inner(self) -> u128 {
        self.0
    }
}

impl fmt::Display for Wei {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Wei {
    type Err = EntitlementError;

    /// Accepts plain decimal digits only: no sign, no exponent, no
    /// fractional part.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(EntitlementError::InvalidAmount(s.to_string()));
        }
        s.parse::<u128>()
            .map(Self)
            .map_err(|_| EntitlementError::InvalidAmount(s.to_string()))
    }
}

impl TryFrom<String> for Wei {
    type Error = EntitlementError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Wei> for String {
    fn from(wei: Wei) -> Self {
        wei.0.to_string()
    }
}

/// One purchasable item as listed by the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerItem {
    pub id: ItemId,
    pub price: Wei,
    pub name: String,
}

/// Hash of a submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxHash(String);

impl TxHash {
    pub fn new(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReceiptStatus {
    Success,
    Reverted,
}

/// Outcome of a mined transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    pub tx_hash: TxHash,
    pub status: ReceiptStatus,
}

impl TransactionReceipt {
    pub fn succeeded(&self) -> bool {
        self.status == ReceiptStatus::Success
    }
}

// ---------------------------------------------------------------------------
// PurchaseLedger
// ---------------------------------------------------------------------------

/// The item contract, as seen by the resolver.
///
/// Implementations must be cheap to call concurrently; the resolver
/// issues reads for different accounts in parallel and wraps every call
/// in its own timeout.
pub trait PurchaseLedger: Send + Sync + 'static {
    /// All items, with `id` equal to their position in the list.
    fn items_details(
        &self,
    ) -> impl Future<Output = Result<Vec<LedgerItem>, LedgerError>> + Send;

    /// Ids of the items `buyer` has bought.
    fn items_bought_by(
        &self,
        buyer: &Address,
    ) -> impl Future<Output = Result<BTreeSet<ItemId>, LedgerError>> + Send;

    /// Submits a purchase paying exactly `value`. Returns once the
    /// transaction is accepted, not once it is mined.
    fn buy_item(
        &self,
        buyer: &Address,
        id: ItemId,
        value: Wei,
    ) -> impl Future<Output = Result<TxHash, LedgerError>> + Send;

    /// Waits for a submitted transaction to be mined.
    fn wait_for_receipt(
        &self,
        tx: &TxHash,
    ) -> impl Future<Output = Result<TransactionReceipt, LedgerError>> + Send;
}

// ---------------------------------------------------------------------------
// MemoryLedger
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct LedgerState {
    items: Vec<(String, Wei)>,
    bought: HashMap<Address, BTreeSet<ItemId>>,
    receipts: HashMap<TxHash, TransactionReceipt>,
    next_tx: u64,
    unavailable: bool,
    mining_delay: Option<Duration>,
}

/// In-process ledger with the item contract's rules: an unknown item is
/// rejected, a payment that isn't exactly the price reverts.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    state: Mutex<LedgerState>,
}

impl MemoryLedger {
    /// Creates a ledger listing `items` in order; ids are 0, 1, 2, ...
    pub fn new(items: impl IntoIterator<Item = (String, Wei)>) -> Self {
        Self {
            state: Mutex::new(LedgerState {
                items: items.into_iter().collect(),
                ..LedgerState::default()
            }),
        }
    }

    /// Records `id` as bought by `buyer` without a transaction.
    pub async fn grant(&self, buyer: &Address, id: ItemId) {
        let mut state = self.state.lock().await;
        state.bought.entry(buyer.clone()).or_default().insert(id);
    }

    /// Makes every call fail with [`LedgerError::Unavailable`] until
    /// switched back.
    pub async fn set_unavailable(&self, unavailable: bool) {
        self.state.lock().await.unavailable = unavailable;
    }

    /// Delays every receipt by `delay`, as a slow block would.
    pub async fn set_mining_delay(&self, delay: Option<Duration>) {
        self.state.lock().await.mining_delay = delay;
    }
}

fn check_available(state: &LedgerState) -> Result<(), LedgerError> {
    if state.unavailable {
        return Err(LedgerError::Unavailable("ledger offline".into()));
    }
    Ok(())
}

impl PurchaseLedger for MemoryLedger {
    async fn items_details(&self) -> Result<Vec<LedgerItem>, LedgerError> {
        let state = self.state.lock().await;
        check_available(&state)?;
        Ok(state
            .items
            .iter()
            .enumerate()
            .map(|(index, (name, price))| LedgerItem {
                id: ItemId::new(index as u64),
                price: *price,
                name: name.clone(),
            })
            .collect())
    }

    async fn items_bought_by(&self, buyer: &Address) -> Result<BTreeSet<ItemId>, LedgerError> {
        let state = self.state.lock().await;
        check_available(&state)?;
        Ok(state.bought.get(buyer).cloned().unwrap_or_default())
    }

    async fn buy_item(
        &self,
        buyer: &Address,
        id: ItemId,
        value: Wei,
    ) -> Result<TxHash, LedgerError> {
        let mut state = self.state.lock().await;
        check_available(&state)?;

        let price = usize::try_from(id.into_inner())
            .ok()
            .and_then(|index| state.items.get(index))
            .map(|(_, price)| *price)
            .ok_or_else(|| LedgerError::Rejected(format!("no item {id}")))?;

        state.next_tx += 1;
        let tx_hash = TxHash::new(format!("0x{:064x}", state.next_tx));
        let status = if value == price {
            state.bought.entry(buyer.clone()).or_default().insert(id);
            ReceiptStatus::Success
        } else {
            ReceiptStatus::Reverted
        };
        state.receipts.insert(
            tx_hash.clone(),
            TransactionReceipt {
                tx_hash: tx_hash.clone(),
                status,
            },
        );
        Ok(tx_hash)
    }

    async fn wait_for_receipt(&self, tx: &TxHash) -> Result<TransactionReceipt, LedgerError> {
        let delay = self.state.lock().await.mining_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let state = self.state.lock().await;
        check_available(&state)?;
        state
            .receipts
            .get(tx)
            .cloned()
            .ok_or_else(|| LedgerError::Rejected(format!("unknown transaction {tx}")))
    }
}
