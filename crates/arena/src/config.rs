//! Server configuration, read from the environment.
//!
//! A `.env` file in the working directory is loaded first if present.
//! Every setting has a default except the gating contract, whose absence
//! is fatal at startup.
//!
//! | Variable                     | Default                 |
//! |------------------------------|-------------------------|
//! | `ARENA_HTTP_ADDR`            | `127.0.0.1:3001`        |
//! | `ARENA_WS_ADDR`              | `127.0.0.1:3002`        |
//! | `ARENA_GATING_CONTRACT`      | required                |
//! | `ARENA_ORACLE_URL`           | unset: in-memory oracle |
//! | `ARENA_ROOM_IDLE_SECS`       | `600`                   |
//! | `ARENA_SWEEP_INTERVAL_SECS`  | `30`                    |
//! | `ARENA_CALL_TIMEOUT_MS`      | `5000`                  |
//! | `ARENA_RECEIPT_TIMEOUT_SECS` | `120`                   |
//! | `ARENA_SHAPE_KEY_TTL_SECS`   | `600`                   |
//! | `ARENA_ITEMS`                | `k2:1000000000000000`   |
//!
//! `ARENA_ITEMS` lists the in-memory ledger's items as `name:price`
//! pairs separated by commas; the position in the list is the item id.
//! The sweep interval and both timeouts must be non-zero.

use std::str::FromStr;
use std::time::Duration;

use arena_entitlement::{ResolverConfig, Wei};
use arena_protocol::Address;
use arena_session::SessionConfig;

use crate::ConfigError;

const DEFAULT_ITEMS: &str = "k2:1000000000000000";

/// Everything the server binary needs to start.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub http_addr: String,
    pub ws_addr: String,
    pub gating_contract: Address,
    /// Alchemy NFT API base URL (with key). `None` selects the
    /// in-memory oracle, in which nobody holds the shape key.
    pub oracle_url: Option<String>,
    pub room_idle_timeout: Duration,
    pub sweep_interval: Duration,
    pub call_timeout: Duration,
    /// How long a purchase may wait to be mined.
    pub receipt_timeout: Duration,
    pub shape_key_ttl: Duration,
    pub items: Vec<(String, Wei)>,
}

impl ServerConfig {
    /// Defaults for everything but the gating contract.
    pub fn new(gating_contract: Address) -> Self {
        Self {
            http_addr: "127.0.0.1:3001".to_string(),
            ws_addr: "127.0.0.1:3002".to_string(),
            gating_contract,
            oracle_url: None,
            room_idle_timeout: Duration::from_secs(600),
            sweep_interval: Duration::from_secs(30),
            call_timeout: Duration::from_millis(5000),
            receipt_timeout: Duration::from_secs(120),
            shape_key_ttl: Duration::from_secs(600),
            items: vec![("k2".to_string(), Wei::new(1_000_000_000_000_000))],
        }
    }

    /// Reads `.env` (if any) and then the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Err(e) = dotenv::dotenv() {
            tracing::debug!(error = %e, "no .env file loaded");
        }
        Self::from_lookup(|key| dotenv::var(key).ok())
    }

    /// Builds a config from any key → value source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let raw_contract =
            get("ARENA_GATING_CONTRACT").ok_or(ConfigError::Missing("ARENA_GATING_CONTRACT"))?;
        let gating_contract =
            Address::parse(&raw_contract).map_err(|e| ConfigError::Invalid {
                var: "ARENA_GATING_CONTRACT",
                reason: e.to_string(),
            })?;

        let mut config = Self::new(gating_contract);

        if let Some(addr) = get("ARENA_HTTP_ADDR") {
            config.http_addr = addr;
        }
        if let Some(addr) = get("ARENA_WS_ADDR") {
            config.ws_addr = addr;
        }
        config.oracle_url = get("ARENA_ORACLE_URL");

        if let Some(raw) = get("ARENA_ROOM_IDLE_SECS") {
            config.room_idle_timeout = Duration::from_secs(parse("ARENA_ROOM_IDLE_SECS", &raw)?);
        }
        if let Some(raw) = get("ARENA_SWEEP_INTERVAL_SECS") {
            config.sweep_interval =
                Duration::from_secs(parse_nonzero("ARENA_SWEEP_INTERVAL_SECS", &raw)?);
        }
        if let Some(raw) = get("ARENA_CALL_TIMEOUT_MS") {
            config.call_timeout =
                Duration::from_millis(parse_nonzero("ARENA_CALL_TIMEOUT_MS", &raw)?);
        }
        if let Some(raw) = get("ARENA_RECEIPT_TIMEOUT_SECS") {
            config.receipt_timeout =
                Duration::from_secs(parse_nonzero("ARENA_RECEIPT_TIMEOUT_SECS", &raw)?);
        }
        if let Some(raw) = get("ARENA_SHAPE_KEY_TTL_SECS") {
            config.shape_key_ttl =
                Duration::from_secs(parse("ARENA_SHAPE_KEY_TTL_SECS", &raw)?);
        }
        config.items = parse_items(get("ARENA_ITEMS").as_deref().unwrap_or(DEFAULT_ITEMS))?;

        Ok(config)
    }

    /// The session-layer slice of this config.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            idle_timeout: self.room_idle_timeout,
            ..SessionConfig::default()
        }
    }

    /// The resolver slice of this config.
    pub fn resolver_config(&self) -> ResolverConfig {
        ResolverConfig {
            call_timeout: self.call_timeout,
            receipt_timeout: self.receipt_timeout,
            shape_key_ttl: self.shape_key_ttl,
            ..ResolverConfig::new(self.gating_contract.clone())
        }
    }
}

fn parse<T: FromStr>(var: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        var,
        reason: e.to_string(),
    })
}

fn parse_nonzero(var: &'static str, raw: &str) -> Result<u64, ConfigError> {
    match parse(var, raw)? {
        0 => Err(ConfigError::Invalid {
            var,
            reason: "must be at least 1".into(),
        }),
        n => Ok(n),
    }
}

/// Parses `name:price,name:price`.
fn parse_items(raw: &str) -> Result<Vec<(String, Wei)>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (name, price) = entry.split_once(':').ok_or_else(|| ConfigError::Invalid {
                var: "ARENA_ITEMS",
                reason: format!("{entry:?} is not name:price"),
            })?;
            let price = parse::<Wei>("ARENA_ITEMS", price)?;
            Ok((name.trim().to_string(), price))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    const CONTRACT: &str = "0x05aA491820662b131d285757E5DA4b74BD0F0e5F";

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_from_lookup_missing_contract_is_fatal() {
        let result = ServerConfig::from_lookup(lookup(&[]));
        assert_eq!(
            result.unwrap_err(),
            ConfigError::Missing("ARENA_GATING_CONTRACT")
        );
    }

    #[test]
    fn test_from_lookup_defaults() {
        let config = ServerConfig::from_lookup(lookup(&[("ARENA_GATING_CONTRACT", CONTRACT)]))
            .unwrap();

        assert_eq!(
            config.gating_contract.as_str(),
            "0x05aa491820662b131d285757e5da4b74bd0f0e5f"
        );
        assert_eq!(config.call_timeout, Duration::from_secs(5));
        assert!(config.oracle_url.is_none());
        assert_eq!(config.items, vec![("k2".to_string(), Wei::new(1_000_000_000_000_000))]);
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("ARENA_GATING_CONTRACT", CONTRACT),
            ("ARENA_HTTP_ADDR", "0.0.0.0:8080"),
            ("ARENA_ROOM_IDLE_SECS", "60"),
            ("ARENA_CALL_TIMEOUT_MS", "250"),
            ("ARENA_RECEIPT_TIMEOUT_SECS", "300"),
            ("ARENA_ITEMS", "sword:5, shield:7 ,bow:9,k2:11"),
        ]))
        .unwrap();

        assert_eq!(config.http_addr, "0.0.0.0:8080");
        assert_eq!(config.session_config().idle_timeout, Duration::from_secs(60));
        assert_eq!(config.resolver_config().call_timeout, Duration::from_millis(250));
        assert_eq!(config.resolver_config().receipt_timeout, Duration::from_secs(300));
        assert_eq!(config.items[3], ("k2".to_string(), Wei::new(11)));
    }

    #[test]
    fn test_from_lookup_rejects_bad_values() {
        let bad_number = ServerConfig::from_lookup(lookup(&[
            ("ARENA_GATING_CONTRACT", CONTRACT),
            ("ARENA_ROOM_IDLE_SECS", "soon"),
        ]));
        assert!(matches!(
            bad_number,
            Err(ConfigError::Invalid { var: "ARENA_ROOM_IDLE_SECS", .. })
        ));

        for var in [
            "ARENA_SWEEP_INTERVAL_SECS",
            "ARENA_CALL_TIMEOUT_MS",
            "ARENA_RECEIPT_TIMEOUT_SECS",
        ] {
            let zero = ServerConfig::from_lookup(lookup(&[
                ("ARENA_GATING_CONTRACT", CONTRACT),
                (var, "0"),
            ]));
            assert_eq!(
                zero.unwrap_err(),
                ConfigError::Invalid {
                    var,
                    reason: "must be at least 1".into()
                }
            );
        }

        let bad_contract =
            ServerConfig::from_lookup(lookup(&[("ARENA_GATING_CONTRACT", "0x1234")]));
        assert!(matches!(bad_contract, Err(ConfigError::Invalid { .. })));

        let bad_items = ServerConfig::from_lookup(lookup(&[
            ("ARENA_GATING_CONTRACT", CONTRACT),
            ("ARENA_ITEMS", "k2=5"),
        ]));
        assert!(matches!(
            bad_items,
            Err(ConfigError::Invalid { var: "ARENA_ITEMS", .. })
        ));
    }
}
