//! The process-wide current-skin mapping.

use std::collections::BTreeMap;

use tokio::sync::RwLock;

use crate::{AssetRef, SkinCatalog, SkinCategory};

/// Which asset is active for each category.
///
/// Exactly one asset per category, always. Selecting overwrites. The
/// store does no entitlement checks of its own: the only write path is
/// [`EntitlementResolver::try_select`](crate::EntitlementResolver::try_select),
/// which does them first.
#[derive(Debug)]
pub struct SkinSelectionStore {
    defaults: BTreeMap<SkinCategory, AssetRef>,
    current: RwLock<BTreeMap<SkinCategory, AssetRef>>,
}

impl SkinSelectionStore {
    /// A store holding the catalog's defaults.
    pub fn new(catalog: &SkinCatalog) -> Self {
        let defaults = catalog.defaults().clone();
        Self {
            current: RwLock::new(defaults.clone()),
            defaults,
        }
    }

    /// The active asset for `category`.
    pub async fn get(&self, category: SkinCategory) -> Option<AssetRef> {
        self.current.read().await.get(&category).cloned()
    }

    /// Every category's active asset, read in one go.
    pub async fn snapshot(&self) -> BTreeMap<SkinCategory, AssetRef> {
        self.current.read().await.clone()
    }

    /// Puts every category back on its default.
    pub async fn reset_all(&self) {
        let mut current = self.current.write().await;
        *current = self.defaults.clone();
        tracing::info!("skins reset to defaults");
    }

    pub fn defaults(&self) -> &BTreeMap<SkinCategory, AssetRef> {
        &self.defaults
    }

    pub(crate) async fn set(&self, category: SkinCategory, asset: AssetRef) {
        self.current.write().await.insert(category, asset);
    }
}
