//! The skin catalog: categories, default assets, and unlockable skins.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::EntitlementError;

// ---------------------------------------------------------------------------
// SkinCategory
// ---------------------------------------------------------------------------

/// A slot that holds exactly one active skin.
///
/// Serialized with the variant name as-is (`"KnightCard"`, `"Map"`),
/// which is what the client uses as its map key.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum SkinCategory {
    ScoutCard,
    KnightCard,
    HealerCard,
    MageCard,
    TankCard,
    Map,
}

impl SkinCategory {
    /// Every category, in display order.
    pub const ALL: [SkinCategory; 6] = [
        Self::ScoutCard,
        Self::KnightCard,
        Self::HealerCard,
        Self::MageCard,
        Self::TankCard,
        Self::Map,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ScoutCard => "ScoutCard",
            Self::KnightCard => "KnightCard",
            Self::HealerCard => "HealerCard",
            Self::MageCard => "MageCard",
            Self::TankCard => "TankCard",
            Self::Map => "Map",
        }
    }
}

impl fmt::Display for SkinCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SkinCategory {
    type Err = EntitlementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| EntitlementError::InvalidCategory(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// AssetRef
// ---------------------------------------------------------------------------

/// Opaque reference to a skin image. The server never loads it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetRef(String);

impl AssetRef {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Unlockable skins
// ---------------------------------------------------------------------------

/// What it takes to unlock a skin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum SkinGate {
    /// Owning the ledger item whose name equals `item_name`.
    Purchase { item_name: String },

    /// Owning any NFT from the gating (shape key) contract.
    ShapeKey,
}

/// A non-default skin and its gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlockableSkin {
    pub key: String,
    pub title: String,
    pub category: SkinCategory,
    pub asset: AssetRef,
    pub gate: SkinGate,
}

// ---------------------------------------------------------------------------
// SkinCatalog
// ---------------------------------------------------------------------------

/// Defaults for every category plus the skins that can replace them.
#[derive(Debug, Clone)]
pub struct SkinCatalog {
    defaults: BTreeMap<SkinCategory, AssetRef>,
    unlockables: Vec<UnlockableSkin>,
}

impl SkinCatalog {
    /// Builds a catalog.
    ///
    /// Categories missing from `defaults` fall back to the built-in
    /// default asset, so every category always has one.
    pub fn new(
        defaults: BTreeMap<SkinCategory, AssetRef>,
        unlockables: Vec<UnlockableSkin>,
    ) -> Self {
        let mut all = builtin_defaults();
        all.extend(defaults);
        Self {
            defaults: all,
            unlockables,
        }
    }

    /// The default asset of every category.
    pub fn defaults(&self) -> &BTreeMap<SkinCategory, AssetRef> {
        &self.defaults
    }

    pub fn default_asset(&self, category: SkinCategory) -> Option<&AssetRef> {
        self.defaults.get(&category)
    }

    pub fn unlockables(&self) -> &[UnlockableSkin] {
        &self.unlockables
    }

    /// Looks up a skin by its key (`"k2"`).
    pub fn skin(&self, key: &str) -> Option<&UnlockableSkin> {
        self.unlockables.iter().find(|s| s.key == key)
    }

    /// The unlockable skin that puts `asset` into `category`, if any.
    pub fn find(&self, category: SkinCategory, asset: &AssetRef) -> Option<&UnlockableSkin> {
        self.unlockables
            .iter()
            .find(|s| s.category == category && &s.asset == asset)
    }
}

impl Default for SkinCatalog {
    fn default() -> Self {
        Self {
            defaults: builtin_defaults(),
            unlockables: vec![
                UnlockableSkin {
                    key: "k2".into(),
                    title: "Knight of Valor".into(),
                    category: SkinCategory::KnightCard,
                    asset: AssetRef::new("assets/k2.jpg"),
                    gate: SkinGate::Purchase {
                        item_name: "k2".into(),
                    },
                },
                UnlockableSkin {
                    key: "map2".into(),
                    title: "Depth of Fire".into(),
                    category: SkinCategory::Map,
                    asset: AssetRef::new("assets/map2.jpeg"),
                    gate: SkinGate::ShapeKey,
                },
            ],
        }
    }
}

fn builtin_defaults() -> BTreeMap<SkinCategory, AssetRef> {
    SkinCategory::ALL
        .into_iter()
        .map(|category| {
            let asset = match category {
                SkinCategory::Map => AssetRef::new("assets/map.jpeg"),
                other => AssetRef::new(format!("assets/{other}.jpg")),
            };
            (category, asset)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_from_str_round_trips_display() {
        for category in SkinCategory::ALL {
            assert_eq!(category.to_string().parse::<SkinCategory>().unwrap(), category);
        }
    }

    #[test]
    fn test_category_from_str_unknown_is_error() {
        assert_eq!(
            "WizardCard".parse::<SkinCategory>(),
            Err(EntitlementError::InvalidCategory("WizardCard".into()))
        );
    }

    #[test]
    fn test_category_serializes_as_variant_name() {
        let json = serde_json::to_string(&SkinCategory::KnightCard).unwrap();
        assert_eq!(json, "\"KnightCard\"");
    }

    #[test]
    fn test_default_catalog_covers_every_category() {
        let catalog = SkinCatalog::default();
        for category in SkinCategory::ALL {
            assert!(catalog.default_asset(category).is_some(), "{category}");
        }
    }

    #[test]
    fn test_find_matches_category_and_asset() {
        let catalog = SkinCatalog::default();
        let k2 = AssetRef::new("assets/k2.jpg");

        assert_eq!(
            catalog.find(SkinCategory::KnightCard, &k2).map(|s| s.key.as_str()),
            Some("k2")
        );
        assert!(catalog.find(SkinCategory::MageCard, &k2).is_none());
    }

    #[test]
    fn test_new_fills_missing_defaults() {
        let catalog = SkinCatalog::new(
            BTreeMap::from([(SkinCategory::Map, AssetRef::new("custom/map.png"))]),
            Vec::new(),
        );

        assert_eq!(
            catalog.default_asset(SkinCategory::Map),
            Some(&AssetRef::new("custom/map.png"))
        );
        assert_eq!(
            catalog.default_asset(SkinCategory::ScoutCard),
            Some(&AssetRef::new("assets/ScoutCard.jpg"))
        );
    }

    #[test]
    fn test_gate_serializes_with_kind_tag() {
        let json = serde_json::to_value(SkinGate::Purchase {
            item_name: "k2".into(),
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"kind": "purchase", "itemName": "k2"}));
    }
}
