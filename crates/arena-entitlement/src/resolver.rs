//! Entitlement resolution: ledger + oracle + current skins, merged into
//! one per-account view.
//!
//! # Failure model
//!
//! Every outbound call runs under `call_timeout`. A failed or slow
//! source never produces an error here; it produces *less* entitlement
//! (fail-closed) and a note in [`Entitlements::degraded`]. Only
//! [`purchase`](EntitlementResolver::purchase) and
//! [`items`](EntitlementResolver::items) surface errors, since they have
//! nothing safe to fall back to.
//!
//! # Shape-key cache
//!
//! A positive shape-key result is cached for `shape_key_ttl`. A negative
//! or failed result is not trusted: the next entitlement read asks the
//! oracle again. Each check draws a ticket from a global counter, and a
//! completion writes the cache only if no newer ticket has written it
//! and the account was not forgotten in between.
//!
//! An entry exists only while a check is in flight or a result is held.
//! A failed check that leaves nothing written removes its entry, and
//! [`prune_shape_keys`](EntitlementResolver::prune_shape_keys) drops
//! entries untouched for longer than `shape_key_ttl`.

use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use arena_protocol::Address;
use serde::Serialize;
use tokio::sync::Mutex;

use crate::{
    AssetRef, ItemId, LedgerError, LedgerItem, OracleError, OwnershipOracle, PurchaseError,
    PurchaseLedger, SkinCatalog, SkinCategory, SkinGate, SkinSelectionStore,
    TransactionReceipt, Wei,
};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Settings for [`EntitlementResolver`].
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Contract whose tokens count as the shape key.
    pub gating_contract: Address,

    /// Upper bound on any single ledger or oracle call. Default: 5s.
    pub call_timeout: Duration,

    /// How long a positive shape-key result is trusted. Default: 10 min.
    pub shape_key_ttl: Duration,

    /// How long a submitted purchase may take to be mined. Default: 2 min.
    pub receipt_timeout: Duration,
}

impl ResolverConfig {
    /// Default timeouts for the given gating contract.
    pub fn new(gating_contract: Address) -> Self {
        Self {
            gating_contract,
            call_timeout: Duration::from_secs(5),
            shape_key_ttl: Duration::from_secs(600),
            receipt_timeout: Duration::from_secs(120),
        }
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Whether an account holds the shape key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ShapeKeyStatus {
    /// Not resolved yet, or the last check failed.
    #[default]
    Unknown,
    Possessed,
    NotPossessed,
}

/// A source that could not be read for this snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Source {
    Ledger,
    Oracle,
}

/// What an account may select, as of one resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Entitlements {
    pub address: Address,
    pub shape_key: ShapeKeyStatus,
    pub purchased_item_ids: BTreeSet<ItemId>,
    /// Keys of catalog skins this account has unlocked.
    pub unlocked: BTreeSet<String>,
    /// Sources that failed; their grants are missing from this snapshot.
    pub degraded: Vec<Source>,
}

impl Entitlements {
    /// An account with nothing unlocked.
    pub fn empty(address: Address) -> Self {
        Self {
            address,
            shape_key: ShapeKeyStatus::Unknown,
            purchased_item_ids: BTreeSet::new(),
            unlocked: BTreeSet::new(),
            degraded: Vec::new(),
        }
    }

    pub fn is_unlocked(&self, key: &str) -> bool {
        self.unlocked.contains(key)
    }
}

/// Why a selection was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DenyReason {
    /// The asset isn't the default or a catalog skin for that category.
    UnknownAsset,
    /// The asset is a catalog skin the account hasn't unlocked.
    NotEntitled,
}

/// Result of a selection attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    Selected,
    Denied(DenyReason),
}

impl Selection {
    pub fn is_selected(&self) -> bool {
        matches!(self, Self::Selected)
    }
}

// ---------------------------------------------------------------------------
// Shape-key cache
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct ShapeKeyEntry {
    /// First ticket issued since the account was (re)connected. Older
    /// completions belong to a forgotten session.
    floor: u64,
    /// Ticket of the completion currently stored, 0 if none.
    written: u64,
    status: ShapeKeyStatus,
    checked_at: Option<Instant>,
    /// Last ticket issued or result written. Drives pruning.
    touched_at: Instant,
}

// ---------------------------------------------------------------------------
// EntitlementResolver
// ---------------------------------------------------------------------------

/// Merges purchase-ledger reads and NFT ownership into [`Entitlements`],
/// and gates writes to the [`SkinSelectionStore`].
pub struct EntitlementResolver<L, O> {
    ledger: L,
    oracle: O,
    catalog: SkinCatalog,
    store: SkinSelectionStore,
    config: ResolverConfig,
    shape_keys: Mutex<HashMap<Address, ShapeKeyEntry>>,
    next_ticket: AtomicU64,
}

impl<L: PurchaseLedger, O: OwnershipOracle> EntitlementResolver<L, O> {
    pub fn new(ledger: L, oracle: O, catalog: SkinCatalog, config: ResolverConfig) -> Self {
        let store = SkinSelectionStore::new(&catalog);
        Self {
            ledger,
            oracle,
            catalog,
            store,
            config,
            shape_keys: Mutex::new(HashMap::new()),
            next_ticket: AtomicU64::new(0),
        }
    }

    pub fn catalog(&self) -> &SkinCatalog {
        &self.catalog
    }

    pub fn store(&self) -> &SkinSelectionStore {
        &self.store
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    // -- Shape key ----------------------------------------------------------

    /// Asks the oracle whether `address` holds a token from the gating
    /// contract. Always goes to the oracle.
    ///
    /// Returns `false` on any oracle failure or timeout; a failure is
    /// logged and never cached.
    pub async fn resolve_shape_key(&self, address: &Address) -> bool {
        self.check_shape_key(address).await.unwrap_or(false)
    }

    /// One oracle round-trip. `None` means the oracle could not answer.
    async fn check_shape_key(&self, address: &Address) -> Option<bool> {
        let ticket = self.issue_ticket(address).await;

        let lookup = self.oracle.nfts_for_owner(address);
        let outcome = match with_timeout(self.config.call_timeout, lookup).await {
            Ok(Ok(nfts)) => Ok(nfts),
            Ok(Err(e)) => Err(e),
            Err(after) => Err(OracleError::Timeout(after)),
        };

        match outcome {
            Ok(nfts) => {
                let possessed = nfts
                    .iter()
                    .any(|nft| nft.contract_address == self.config.gating_contract);
                self.commit_shape_key(address, ticket, possessed).await;
                Some(possessed)
            }
            Err(e) => {
                tracing::warn!(address = %address, error = %e, "shape key check failed");
                self.discard_shape_key(address, ticket).await;
                None
            }
        }
    }

    /// Draws a ticket under the cache lock, so a concurrent `forget`
    /// cannot land between the draw and the floor it is compared to.
    async fn issue_ticket(&self, address: &Address) -> u64 {
        let mut cache = self.shape_keys.lock().await;
        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed) + 1;
        let now = Instant::now();
        let entry = cache.entry(address.clone()).or_insert(ShapeKeyEntry {
            floor: ticket,
            written: 0,
            status: ShapeKeyStatus::Unknown,
            checked_at: None,
            touched_at: now,
        });
        entry.touched_at = now;
        ticket
    }

    /// Drops the entry a failed check created, unless it holds a result.
    async fn discard_shape_key(&self, address: &Address, ticket: u64) {
        let mut cache = self.shape_keys.lock().await;
        let owned = cache
            .get(address)
            .is_some_and(|entry| ticket >= entry.floor && entry.written == 0);
        if owned {
            cache.remove(address);
        }
    }

    /// Stores a completed check unless it has been superseded.
    async fn commit_shape_key(&self, address: &Address, ticket: u64, possessed: bool) {
        let mut cache = self.shape_keys.lock().await;
        let Some(entry) = cache.get_mut(address) else {
            tracing::debug!(address = %address, ticket, "shape key result for forgotten account");
            return;
        };
        if ticket < entry.floor || ticket <= entry.written {
            tracing::debug!(address = %address, ticket, "stale shape key result dropped");
            return;
        }
        entry.written = ticket;
        entry.status = if possessed {
            ShapeKeyStatus::Possessed
        } else {
            ShapeKeyStatus::NotPossessed
        };
        let now = Instant::now();
        entry.checked_at = Some(now);
        entry.touched_at = now;
    }

    /// Drops cache entries untouched for longer than `shape_key_ttl`.
    /// Returns how many were removed.
    ///
    /// A check still in flight for a pruned entry completes as a no-op.
    pub async fn prune_shape_keys(&self, now: Instant) -> usize {
        let ttl = self.config.shape_key_ttl;
        let mut cache = self.shape_keys.lock().await;
        let before = cache.len();
        cache.retain(|_, entry| now.saturating_duration_since(entry.touched_at) < ttl);
        let pruned = before - cache.len();
        if pruned > 0 {
            tracing::debug!(pruned, remaining = cache.len(), "shape key cache pruned");
        }
        pruned
    }

    /// A cached positive result that is still within its TTL.
    async fn cached_possession(&self, address: &Address) -> bool {
        let cache = self.shape_keys.lock().await;
        cache.get(address).is_some_and(|entry| {
            entry.status == ShapeKeyStatus::Possessed
                && entry
                    .checked_at
                    .is_some_and(|at| at.elapsed() < self.config.shape_key_ttl)
        })
    }

    /// The cached shape-key status of `address`, without any lookup.
    pub async fn cached_shape_key(&self, address: &Address) -> ShapeKeyStatus {
        let cache = self.shape_keys.lock().await;
        cache
            .get(address)
            .map(|entry| entry.status)
            .unwrap_or_default()
    }

    /// Forgets everything cached for `address` (wallet disconnected).
    /// Checks still in flight for it will complete as no-ops.
    pub async fn forget(&self, address: &Address) {
        if self.shape_keys.lock().await.remove(address).is_some() {
            tracing::debug!(address = %address, "entitlement cache dropped");
        }
    }

    // -- Resolution ---------------------------------------------------------

    /// Resolves what `address` may select right now.
    ///
    /// Ledger reads are never cached. The shape key comes from the cache
    /// only when a positive result is still fresh; otherwise the oracle
    /// is asked again.
    pub async fn current_entitlements(&self, address: &Address) -> Entitlements {
        let shape_key = async {
            if self.cached_possession(address).await {
                return Some(true);
            }
            self.check_shape_key(address).await
        };
        let purchases = self.read_purchases(address);
        let (shape_key, purchases) = tokio::join!(shape_key, purchases);

        let mut entitlements = Entitlements::empty(address.clone());

        match shape_key {
            Some(true) => entitlements.shape_key = ShapeKeyStatus::Possessed,
            Some(false) => entitlements.shape_key = ShapeKeyStatus::NotPossessed,
            None => entitlements.degraded.push(Source::Oracle),
        }

        let owned_names: BTreeSet<String> = match purchases {
            Ok((items, bought)) => {
                let names = items
                    .into_iter()
                    .filter(|item| bought.contains(&item.id))
                    .map(|item| item.name)
                    .collect();
                entitlements.purchased_item_ids = bought;
                names
            }
            Err(e) => {
                tracing::warn!(address = %address, error = %e, "purchase ledger read failed");
                entitlements.degraded.push(Source::Ledger);
                BTreeSet::new()
            }
        };

        for skin in self.catalog.unlockables() {
            let unlocked = match &skin.gate {
                SkinGate::Purchase { item_name } => owned_names.contains(item_name),
                SkinGate::ShapeKey => entitlements.shape_key == ShapeKeyStatus::Possessed,
            };
            if unlocked {
                entitlements.unlocked.insert(skin.key.clone());
            }
        }

        entitlements
    }

    async fn read_purchases(
        &self,
        address: &Address,
    ) -> Result<(Vec<LedgerItem>, BTreeSet<ItemId>), LedgerError> {
        let timeout = self.config.call_timeout;
        let items = async {
            with_timeout(timeout, self.ledger.items_details())
                .await
                .map_err(LedgerError::Timeout)?
        };
        let bought = async {
            with_timeout(timeout, self.ledger.items_bought_by(address))
                .await
                .map_err(LedgerError::Timeout)?
        };
        tokio::try_join!(items, bought)
    }

    // -- Selection ----------------------------------------------------------

    /// Makes `asset` current for `category` if `entitlements` allow it.
    ///
    /// Allowed: the category default, or a catalog skin of that category
    /// whose key is unlocked. Anything else is denied and the store is
    /// left untouched.
    pub async fn try_select(
        &self,
        category: SkinCategory,
        asset: AssetRef,
        entitlements: &Entitlements,
    ) -> Selection {
        let is_default = self.catalog.default_asset(category) == Some(&asset);
        if !is_default {
            let Some(skin) = self.catalog.find(category, &asset) else {
                return Selection::Denied(DenyReason::UnknownAsset);
            };
            if !entitlements.is_unlocked(&skin.key) {
                tracing::debug!(
                    address = %entitlements.address,
                    skin = %skin.key,
                    "selection denied"
                );
                return Selection::Denied(DenyReason::NotEntitled);
            }
        }

        tracing::info!(
            address = %entitlements.address,
            %category,
            %asset,
            "skin selected"
        );
        self.store.set(category, asset).await;
        Selection::Selected
    }

    /// Resolves `address` and then attempts the selection.
    pub async fn select_for(
        &self,
        address: &Address,
        category: SkinCategory,
        asset: AssetRef,
    ) -> Selection {
        let entitlements = self.current_entitlements(address).await;
        self.try_select(category, asset, &entitlements).await
    }

    // -- Ledger -------------------------------------------------------------

    /// All ledger items with their ids.
    pub async fn items(&self) -> Result<Vec<LedgerItem>, LedgerError> {
        with_timeout(self.config.call_timeout, self.ledger.items_details())
            .await
            .map_err(LedgerError::Timeout)?
    }

    /// Buys `item_id` for `buyer`, paying exactly `value`.
    ///
    /// Checks the item exists, isn't owned yet, and that `value` is the
    /// exact price before submitting; then waits up to `receipt_timeout`
    /// for the receipt.
    /// Nothing is recorded locally: the next entitlement read sees the
    /// purchase through the ledger.
    pub async fn purchase(
        &self,
        buyer: &Address,
        item_id: ItemId,
        value: Wei,
    ) -> Result<TransactionReceipt, PurchaseError> {
        let timeout = self.config.call_timeout;

        let (items, bought) = self.read_purchases(buyer).await?;
        let item = items
            .into_iter()
            .find(|item| item.id == item_id)
            .ok_or(PurchaseError::UnknownItem(item_id))?;
        if bought.contains(&item_id) {
            return Err(PurchaseError::AlreadyOwned(item_id));
        }
        if item.price != value {
            return Err(PurchaseError::PriceMismatch {
                expected: item.price,
                offered: value,
            });
        }

        let tx = with_timeout(timeout, self.ledger.buy_item(buyer, item_id, value))
            .await
            .map_err(LedgerError::Timeout)??;
        let receipt = with_timeout(
            self.config.receipt_timeout,
            self.ledger.wait_for_receipt(&tx),
        )
        .await
        .map_err(LedgerError::Timeout)??;

        if !receipt.succeeded() {
            tracing::warn!(buyer = %buyer, item = %item_id, tx = %tx, "purchase reverted");
            return Err(PurchaseError::Reverted(tx));
        }

        tracing::info!(buyer = %buyer, item = %item_id, name = %item.name, tx = %tx, "item purchased");
        Ok(receipt)
    }
}

/// Runs `fut` with a deadline. `Err` carries the timeout that elapsed.
async fn with_timeout<F: Future>(limit: Duration, fut: F) -> Result<F::Output, Duration> {
    tokio::time::timeout(limit, fut).await.map_err(|_| limit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MemoryLedger, StaticOracle};

    fn addr(digit: char) -> Address {
        Address::parse(&format!("0x{}", digit.to_string().repeat(40))).unwrap()
    }

    fn gating() -> Address {
        Address::parse("0x05aA491820662b131d285757E5DA4b74BD0F0e5F").unwrap()
    }

    fn resolver() -> EntitlementResolver<MemoryLedger, StaticOracle> {
        EntitlementResolver::new(
            MemoryLedger::new([("k2".to_string(), Wei::new(250))]),
            StaticOracle::new(),
            SkinCatalog::default(),
            ResolverConfig::new(gating()),
        )
    }

    #[tokio::test]
    async fn test_resolve_shape_key_matches_gating_contract() {
        let r = resolver();
        r.oracle().grant(&addr('a'), &gating()).await;
        r.oracle().grant(&addr('b'), &addr('f')).await;

        assert!(r.resolve_shape_key(&addr('a')).await);
        assert!(!r.resolve_shape_key(&addr('b')).await);
    }

    #[tokio::test]
    async fn test_resolve_shape_key_oracle_error_is_false_and_uncached() {
        let r = resolver();
        r.oracle().grant(&addr('a'), &gating()).await;
        r.oracle().set_failing(true).await;

        assert!(!r.resolve_shape_key(&addr('a')).await);
        assert_eq!(r.cached_shape_key(&addr('a')).await, ShapeKeyStatus::Unknown);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolve_shape_key_timeout_is_false() {
        let r = resolver();
        r.oracle().grant(&addr('a'), &gating()).await;
        r.oracle().set_delay(Some(Duration::from_secs(60))).await;

        assert!(!r.resolve_shape_key(&addr('a')).await);
    }

    #[tokio::test]
    async fn test_commit_shape_key_drops_stale_ticket() {
        let r = resolver();
        let a = addr('a');
        let old = r.issue_ticket(&a).await;
        let new = r.issue_ticket(&a).await;

        r.commit_shape_key(&a, new, false).await;
        r.commit_shape_key(&a, old, true).await;

        assert_eq!(r.cached_shape_key(&a).await, ShapeKeyStatus::NotPossessed);
    }

    #[tokio::test]
    async fn test_commit_shape_key_after_forget_is_noop() {
        let r = resolver();
        let a = addr('a');
        let before = r.issue_ticket(&a).await;

        r.forget(&a).await;
        r.commit_shape_key(&a, before, true).await;
        assert_eq!(r.cached_shape_key(&a).await, ShapeKeyStatus::Unknown);

        // A check started after reconnecting still lands.
        let after = r.issue_ticket(&a).await;
        r.commit_shape_key(&a, before, true).await;
        assert_eq!(r.cached_shape_key(&a).await, ShapeKeyStatus::Unknown);
        r.commit_shape_key(&a, after, false).await;
        assert_eq!(r.cached_shape_key(&a).await, ShapeKeyStatus::NotPossessed);
    }

    #[tokio::test]
    async fn test_current_entitlements_positive_shape_key_is_cached() {
        let r = resolver();
        r.oracle().grant(&addr('a'), &gating()).await;
        assert_eq!(
            r.current_entitlements(&addr('a')).await.shape_key,
            ShapeKeyStatus::Possessed
        );

        // Oracle goes down; the fresh positive result still holds.
        r.oracle().set_failing(true).await;
        let e = r.current_entitlements(&addr('a')).await;

        assert_eq!(e.shape_key, ShapeKeyStatus::Possessed);
        assert!(e.degraded.is_empty());
        assert!(e.is_unlocked("map2"));
    }

    #[tokio::test]
    async fn test_current_entitlements_oracle_down_fails_closed() {
        let r = resolver();
        r.oracle().set_failing(true).await;

        let e = r.current_entitlements(&addr('a')).await;

        assert_eq!(e.shape_key, ShapeKeyStatus::Unknown);
        assert_eq!(e.degraded, vec![Source::Oracle]);
        assert!(!e.is_unlocked("map2"));
    }

    #[tokio::test]
    async fn test_failed_lookups_leave_no_cache_entries() {
        let r = resolver();
        r.oracle().set_failing(true).await;

        for i in 0..500u32 {
            let address = Address::parse(&format!("0x{i:040x}")).unwrap();
            r.current_entitlements(&address).await;
            r.resolve_shape_key(&address).await;
        }

        assert!(r.shape_keys.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_failed_lookup_keeps_an_earlier_result() {
        let r = resolver();
        r.oracle().grant(&addr('a'), &gating()).await;
        assert!(r.resolve_shape_key(&addr('a')).await);

        r.oracle().set_failing(true).await;
        assert!(!r.resolve_shape_key(&addr('a')).await);

        assert_eq!(r.cached_shape_key(&addr('a')).await, ShapeKeyStatus::Possessed);
    }

    #[tokio::test]
    async fn test_prune_shape_keys_drops_entries_past_ttl() {
        let r = resolver();
        r.oracle().grant(&addr('a'), &gating()).await;
        assert!(r.resolve_shape_key(&addr('a')).await);
        assert!(!r.resolve_shape_key(&addr('b')).await);
        let ttl = r.config().shape_key_ttl;

        assert_eq!(r.prune_shape_keys(Instant::now()).await, 0);
        assert_eq!(r.prune_shape_keys(Instant::now() + ttl).await, 2);

        assert!(r.shape_keys.lock().await.is_empty());
        assert_eq!(r.cached_shape_key(&addr('a')).await, ShapeKeyStatus::Unknown);
    }

    #[tokio::test]
    async fn test_prune_shape_keys_in_flight_result_is_dropped() {
        let r = resolver();
        let a = addr('a');
        let ticket = r.issue_ticket(&a).await;

        r.prune_shape_keys(Instant::now() + r.config().shape_key_ttl).await;
        r.commit_shape_key(&a, ticket, true).await;

        assert_eq!(r.cached_shape_key(&a).await, ShapeKeyStatus::Unknown);
    }

    #[tokio::test]
    async fn test_current_entitlements_ledger_down_fails_closed() {
        let r = resolver();
        r.ledger().grant(&addr('a'), ItemId::new(0)).await;
        r.ledger().set_unavailable(true).await;

        let e = r.current_entitlements(&addr('a')).await;

        assert!(e.purchased_item_ids.is_empty());
        assert_eq!(e.degraded, vec![Source::Ledger]);
        assert!(!e.is_unlocked("k2"));
    }

    #[tokio::test]
    async fn test_try_select_default_always_allowed() {
        let r = resolver();
        let nothing = Entitlements::empty(addr('a'));

        for category in SkinCategory::ALL {
            let default = r.catalog().default_asset(category).cloned().unwrap();
            assert_eq!(
                r.try_select(category, default, &nothing).await,
                Selection::Selected
            );
        }
    }

    #[tokio::test]
    async fn test_try_select_unknown_asset_denied() {
        let r = resolver();
        let nothing = Entitlements::empty(addr('a'));

        let selection = r
            .try_select(SkinCategory::MageCard, AssetRef::new("x.png"), &nothing)
            .await;

        assert_eq!(selection, Selection::Denied(DenyReason::UnknownAsset));
    }

    #[tokio::test]
    async fn test_try_select_denied_leaves_store_unchanged() {
        let r = resolver();
        let before = r.store().snapshot().await;

        let selection = r
            .try_select(
                SkinCategory::KnightCard,
                AssetRef::new("assets/k2.jpg"),
                &Entitlements::empty(addr('a')),
            )
            .await;

        assert_eq!(selection, Selection::Denied(DenyReason::NotEntitled));
        assert_eq!(r.store().snapshot().await, before);
    }

    #[tokio::test]
    async fn test_purchase_validates_before_submitting() {
        let r = resolver();
        let a = addr('a');

        assert_eq!(
            r.purchase(&a, ItemId::new(5), Wei::new(250)).await,
            Err(PurchaseError::UnknownItem(ItemId::new(5)))
        );
        assert_eq!(
            r.purchase(&a, ItemId::new(0), Wei::new(249)).await,
            Err(PurchaseError::PriceMismatch {
                expected: Wei::new(250),
                offered: Wei::new(249),
            })
        );

        r.purchase(&a, ItemId::new(0), Wei::new(250)).await.unwrap();
        assert_eq!(
            r.purchase(&a, ItemId::new(0), Wei::new(250)).await,
            Err(PurchaseError::AlreadyOwned(ItemId::new(0)))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_purchase_waits_past_call_timeout_for_receipt() {
        let r = resolver();
        let a = addr('a');
        let slow_block = r.config().call_timeout * 4;
        r.ledger().set_mining_delay(Some(slow_block)).await;

        let receipt = r.purchase(&a, ItemId::new(0), Wei::new(250)).await.unwrap();

        assert!(receipt.succeeded());
    }

    #[tokio::test(start_paused = true)]
    async fn test_purchase_receipt_timeout_is_ledger_timeout() {
        let r = resolver();
        let limit = r.config().receipt_timeout;
        r.ledger()
            .set_mining_delay(Some(limit + Duration::from_secs(1)))
            .await;

        assert_eq!(
            r.purchase(&addr('a'), ItemId::new(0), Wei::new(250)).await,
            Err(PurchaseError::Ledger(LedgerError::Timeout(limit)))
        );
    }

    #[tokio::test]
    async fn test_purchase_ledger_down_surfaces_error() {
        let r = resolver();
        r.ledger().set_unavailable(true).await;

        let result = r.purchase(&addr('a'), ItemId::new(0), Wei::new(250)).await;

        assert!(matches!(
            result,
            Err(PurchaseError::Ledger(LedgerError::Unavailable(_)))
        ));
    }
}
