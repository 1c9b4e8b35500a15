//! The ownership oracle the binary runs with.

use arena_entitlement::{AlchemyOracle, OracleError, OwnedNft, OwnershipOracle, StaticOracle};
use arena_protocol::Address;

use crate::ServerConfig;

/// Alchemy when an oracle URL is configured, the in-memory oracle
/// otherwise.
#[derive(Debug)]
pub enum ConfiguredOracle {
    Alchemy(AlchemyOracle),
    Static(StaticOracle),
}

impl ConfiguredOracle {
    pub fn from_config(config: &ServerConfig) -> Self {
        match &config.oracle_url {
            Some(url) => {
                tracing::info!("using Alchemy NFT oracle");
                Self::Alchemy(AlchemyOracle::new(url.clone()))
            }
            None => {
                tracing::warn!("ARENA_ORACLE_URL unset; shape key checks use an empty in-memory oracle");
                Self::Static(StaticOracle::new())
            }
        }
    }
}

impl OwnershipOracle for ConfiguredOracle {
    async fn nfts_for_owner(&self, owner: &Address) -> Result<Vec<OwnedNft>, OracleError> {
        match self {
            Self::Alchemy(oracle) => oracle.nfts_for_owner(owner).await,
            Self::Static(oracle) => oracle.nfts_for_owner(owner).await,
        }
    }
}
