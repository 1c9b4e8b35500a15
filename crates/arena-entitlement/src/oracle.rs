//! NFT ownership lookups.
//!
//! The resolver only needs to know which contracts an account holds
//! tokens from. [`AlchemyOracle`] asks the Alchemy NFT API over HTTP;
//! [`StaticOracle`] answers from memory for local runs and tests.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use arena_protocol::Address;
use serde::Deserialize;
use tokio::sync::RwLock;

use crate::OracleError;

/// One token held by an account. Only the contract matters here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnedNft {
    pub contract_address: Address,
}

/// Answers "which NFTs does this account hold?".
pub trait OwnershipOracle: Send + Sync + 'static {
    fn nfts_for_owner(
        &self,
        owner: &Address,
    ) -> impl Future<Output = Result<Vec<OwnedNft>, OracleError>> + Send;
}

// ---------------------------------------------------------------------------
// AlchemyOracle
// ---------------------------------------------------------------------------

/// Page cap for one lookup. A wallet with more NFTs than this is only
/// partially scanned; it still resolves correctly if the gating token
/// shows up in the scanned pages.
const MAX_PAGES: usize = 20;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NftsForOwnerPage {
    #[serde(default)]
    owned_nfts: Vec<AlchemyNft>,
    #[serde(default)]
    page_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AlchemyNft {
    contract: AlchemyContract,
}

#[derive(Debug, Deserialize)]
struct AlchemyContract {
    address: String,
}

/// `getNFTsForOwner` against an Alchemy NFT API endpoint.
///
/// `base_url` includes the network and API key, e.g.
/// `https://shape-mainnet.g.alchemy.com/nft/v3/<key>`.
#[derive(Debug, Clone)]
pub struct AlchemyOracle {
    client: reqwest::Client,
    base_url: String,
}

impl AlchemyOracle {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn fetch_page(
        &self,
        owner: &Address,
        page_key: Option<&str>,
    ) -> Result<NftsForOwnerPage, OracleError> {
        let mut query = vec![
            ("owner", owner.as_str()),
            ("withMetadata", "false"),
            ("pageSize", "100"),
        ];
        if let Some(key) = page_key {
            query.push(("pageKey", key));
        }

        let page = self
            .client
            .get(format!("{}/getNFTsForOwner", self.base_url))
            .query(&query)
            .send()
            .await?
            .error_for_status()?
            .json::<NftsForOwnerPage>()
            .await?;
        Ok(page)
    }
}

impl OwnershipOracle for AlchemyOracle {
    async fn nfts_for_owner(&self, owner: &Address) -> Result<Vec<OwnedNft>, OracleError> {
        let mut nfts = Vec::new();
        let mut page_key: Option<String> = None;

        for _ in 0..MAX_PAGES {
            let page = self.fetch_page(owner, page_key.as_deref()).await?;
            for nft in page.owned_nfts {
                match Address::parse(&nft.contract.address) {
                    Ok(contract_address) => nfts.push(OwnedNft { contract_address }),
                    Err(e) => tracing::debug!(error = %e, "skipping nft with odd contract"),
                }
            }
            match page.page_key {
                Some(next) if !next.is_empty() => page_key = Some(next),
                _ => return Ok(nfts),
            }
        }

        tracing::warn!(owner = %owner, pages = MAX_PAGES, "nft listing truncated");
        Ok(nfts)
    }
}

// ---------------------------------------------------------------------------
// StaticOracle
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct StaticState {
    holdings: HashMap<Address, Vec<OwnedNft>>,
    failing: bool,
    delay: Option<Duration>,
}

/// In-memory oracle. Holdings are set by hand; failures and slowness can
/// be switched on to exercise the resolver's fail-closed paths.
#[derive(Debug, Default)]
pub struct StaticOracle {
    state: RwLock<StaticState>,
}

impl StaticOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Gives `owner` a token from `contract`.
    pub async fn grant(&self, owner: &Address, contract: &Address) {
        let mut state = self.state.write().await;
        state.holdings.entry(owner.clone()).or_default().push(OwnedNft {
            contract_address: contract.clone(),
        });
    }

    /// Removes every token `owner` holds.
    pub async fn revoke_all(&self, owner: &Address) {
        self.state.write().await.holdings.remove(owner);
    }

    /// Makes lookups fail with [`OracleError::Request`].
    pub async fn set_failing(&self, failing: bool) {
        self.state.write().await.failing = failing;
    }

    /// Delays every lookup by `delay`.
    pub async fn set_delay(&self, delay: Option<Duration>) {
        self.state.write().await.delay = delay;
    }
}

impl OwnershipOracle for StaticOracle {
    async fn nfts_for_owner(&self, owner: &Address) -> Result<Vec<OwnedNft>, OracleError> {
        let delay = self.state.read().await.delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let state = self.state.read().await;
        if state.failing {
            return Err(OracleError::Request("static oracle set to fail".into()));
        }
        Ok(state.holdings.get(owner).cloned().unwrap_or_default())
    }
}
