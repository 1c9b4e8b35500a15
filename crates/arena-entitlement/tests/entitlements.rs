//! Integration tests for entitlement resolution and skin selection.

use std::sync::Arc;
use std::time::Duration;

use arena_entitlement::{
    AssetRef, DenyReason, EntitlementResolver, Entitlements, ItemId, MemoryLedger,
    ResolverConfig, Selection, ShapeKeyStatus, SkinCatalog, SkinCategory, StaticOracle, Wei,
};
use arena_protocol::Address;

type Resolver = EntitlementResolver<MemoryLedger, StaticOracle>;

fn gating() -> Address {
    Address::parse("0x05aA491820662b131d285757E5DA4b74BD0F0e5F").unwrap()
}

fn player() -> Address {
    Address::parse("0x00000000000000000000000000000000000000aa").unwrap()
}

/// Item 3 is `k2`, the way the live contract lists it.
fn resolver() -> Resolver {
    EntitlementResolver::new(
        MemoryLedger::new([
            ("sword".to_string(), Wei::new(10)),
            ("shield".to_string(), Wei::new(20)),
            ("bow".to_string(), Wei::new(30)),
            ("k2".to_string(), Wei::new(1_000_000_000_000_000)),
        ]),
        StaticOracle::new(),
        SkinCatalog::default(),
        ResolverConfig::new(gating()),
    )
}

fn k2() -> AssetRef {
    AssetRef::new("assets/k2.jpg")
}

fn map2() -> AssetRef {
    AssetRef::new("assets/map2.jpeg")
}

#[tokio::test]
async fn test_purchased_k2_is_selectable_and_visible() {
    let r = resolver();
    r.ledger().grant(&player(), ItemId::new(3)).await;

    let selection = r
        .select_for(&player(), SkinCategory::KnightCard, k2())
        .await;

    assert_eq!(selection, Selection::Selected);
    assert_eq!(r.store().get(SkinCategory::KnightCard).await, Some(k2()));
}

#[tokio::test]
async fn test_buying_k2_then_selecting() {
    let r = resolver();
    let price = Wei::new(1_000_000_000_000_000);

    assert_eq!(
        r.select_for(&player(), SkinCategory::KnightCard, k2()).await,
        Selection::Denied(DenyReason::NotEntitled)
    );

    let receipt = r.purchase(&player(), ItemId::new(3), price).await.unwrap();
    assert!(receipt.succeeded());

    assert_eq!(
        r.select_for(&player(), SkinCategory::KnightCard, k2()).await,
        Selection::Selected
    );
}

#[tokio::test]
async fn test_shape_key_gained_unlocks_map2() {
    let r = resolver();

    let before = r.select_for(&player(), SkinCategory::Map, map2()).await;
    assert_eq!(before, Selection::Denied(DenyReason::NotEntitled));
    assert_eq!(
        r.cached_shape_key(&player()).await,
        ShapeKeyStatus::NotPossessed
    );

    // Negative results aren't cached, so the next read sees the new token.
    r.oracle().grant(&player(), &gating()).await;
    let after = r.select_for(&player(), SkinCategory::Map, map2()).await;

    assert_eq!(after, Selection::Selected);
    assert_eq!(r.store().get(SkinCategory::Map).await, Some(map2()));
}

#[tokio::test]
async fn test_unentitled_assets_denied_in_every_category() {
    let r = resolver();
    let nothing = Entitlements::empty(player());
    let candidates = [k2(), map2(), AssetRef::new("assets/not-a-skin.png")];

    for category in SkinCategory::ALL {
        for asset in &candidates {
            let selection = r.try_select(category, asset.clone(), &nothing).await;
            assert!(
                !selection.is_selected(),
                "{category} accepted {asset} without entitlement"
            );
        }
    }
    assert_eq!(&r.store().snapshot().await, r.catalog().defaults());
}

#[tokio::test]
async fn test_entitled_skin_rejected_in_wrong_category() {
    let r = resolver();
    r.ledger().grant(&player(), ItemId::new(3)).await;

    let selection = r.select_for(&player(), SkinCategory::TankCard, k2()).await;

    assert_eq!(selection, Selection::Denied(DenyReason::UnknownAsset));
}

#[tokio::test]
async fn test_reset_all_then_snapshot_is_defaults() {
    let r = resolver();
    r.ledger().grant(&player(), ItemId::new(3)).await;
    r.oracle().grant(&player(), &gating()).await;
    r.select_for(&player(), SkinCategory::KnightCard, k2()).await;
    r.select_for(&player(), SkinCategory::Map, map2()).await;
    assert_ne!(&r.store().snapshot().await, r.catalog().defaults());

    r.store().reset_all().await;

    assert_eq!(&r.store().snapshot().await, r.catalog().defaults());
}

#[tokio::test]
async fn test_addresses_differing_in_case_share_entitlements() {
    let r = resolver();
    let lower = Address::parse("0x00000000000000000000000000000000000000ab").unwrap();
    let upper = Address::parse("0x00000000000000000000000000000000000000AB").unwrap();
    r.ledger().grant(&lower, ItemId::new(3)).await;

    let e = r.current_entitlements(&upper).await;

    assert!(e.is_unlocked("k2"));
}

#[tokio::test(start_paused = true)]
async fn test_forget_during_check_discards_result() {
    let r = Arc::new(resolver());
    r.oracle().grant(&player(), &gating()).await;
    r.oracle().set_delay(Some(Duration::from_secs(2))).await;

    let in_flight = {
        let r = Arc::clone(&r);
        tokio::spawn(async move { r.resolve_shape_key(&player()).await })
    };
    // Let the check issue its ticket and park in the oracle.
    for _ in 0..4 {
        tokio::task::yield_now().await;
    }

    r.forget(&player()).await;
    let answered = in_flight.await.unwrap();

    assert!(answered, "the caller still gets the oracle's answer");
    assert_eq!(r.cached_shape_key(&player()).await, ShapeKeyStatus::Unknown);
}

#[tokio::test(start_paused = true)]
async fn test_slow_oracle_times_out_fail_closed() {
    let r = resolver();
    r.oracle().grant(&player(), &gating()).await;
    r.oracle().set_delay(Some(Duration::from_secs(30))).await;

    let e = r.current_entitlements(&player()).await;

    assert_eq!(e.shape_key, ShapeKeyStatus::Unknown);
    assert!(!e.is_unlocked("map2"));
}
