//! Application configuration.
//!
//! Defaults match the production mainnet deployment. Every value can be overridden from the
//! environment, which is how the binary is configured.

use std::path::PathBuf;
use std::time::Duration;

/// Static network parameters merged into every session config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkDefaults {
    pub network_name: String,
    pub default_host: String,
    pub default_port: u16,
}

impl Default for NetworkDefaults {
    fn default() -> Self {
        Self {
            network_name: "mainnet".to_string(),
            default_host: "lightd1.pirate.black".to_string(),
            default_port: 443,
        }
    }
}

/// Delays and timeouts used by the session manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionTimings {
    /// Pause after each stop call so the native layer can release the session.
    pub stop_settle_delay: Duration,
    /// Pause after the whole teardown pass, before a new session is created.
    pub teardown_settle_delay: Duration,
    /// Retry delay when the synchronizer reports another session still running.
    pub conflict_retry_delay: Duration,
    /// Retry delay for any other start failure.
    pub transient_retry_delay: Duration,
    /// Upper bound for any single synchronizer call.
    pub call_timeout: Duration,
}

impl Default for SessionTimings {
    fn default() -> Self {
        Self {
            stop_settle_delay: Duration::from_secs(1),
            teardown_settle_delay: Duration::from_secs(1),
            conflict_retry_delay: Duration::from_secs(10),
            transient_retry_delay: Duration::from_secs(5),
            call_timeout: Duration::from_secs(45),
        }
    }
}

/// Aliases, besides the session's own, that a start must stop before creating a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeardownAliases {
    /// Alias used by builds that did not key sessions by wallet id.
    pub default_alias: String,
    /// Prefix of the `<prefix><wallet id>` alias format used by older builds.
    pub legacy_prefix: Option<String>,
}

impl Default for TeardownAliases {
    fn default() -> Self {
        Self {
            default_alias: "piratechain".to_string(),
            legacy_prefix: Some("piratechain_".to_string()),
        }
    }
}

impl TeardownAliases {
    /// Every alias to stop before starting `alias`, without duplicates, in the order
    /// they should be tried.
    pub fn candidates(&self, alias: &str, recorded_wallet_id: Option<&str>) -> Vec<String> {
        let mut candidates = vec![alias.to_string(), self.default_alias.clone()];
        if let Some(id) = recorded_wallet_id {
            candidates.push(id.to_string());
            if let Some(prefix) = &self.legacy_prefix {
                candidates.push(format!("{}{}", prefix, id));
            }
        }

        let mut unique: Vec<String> = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            if !candidate.is_empty() && !unique.contains(&candidate) {
                unique.push(candidate);
            }
        }
        unique
    }
}

/// Errors raised while reading configuration overrides.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub network: NetworkDefaults,
    pub timings: SessionTimings,
    pub aliases: TeardownAliases,
    /// Directory holding the persisted wallet registry.
    pub data_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            network: NetworkDefaults::default(),
            timings: SessionTimings::default(),
            aliases: TeardownAliases::default(),
            data_dir: PathBuf::from("./wallet-data"),
        }
    }
}

impl AppConfig {
    /// Defaults overridden by `PIRATE_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each supported key.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(network) = lookup("PIRATE_NETWORK") {
            config.network.network_name = network;
        }
        if let Some(host) = lookup("PIRATE_LIGHTD_HOST") {
            config.network.default_host = host;
        }
        if let Some(port) = lookup("PIRATE_LIGHTD_PORT") {
            config.network.default_port =
                port.trim()
                    .parse::<u16>()
                    .map_err(|e| ConfigError::InvalidValue {
                        key: "PIRATE_LIGHTD_PORT",
                        value: port.clone(),
                        reason: e.to_string(),
                    })?;
        }
        if let Some(dir) = lookup("PIRATE_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(secs) = lookup("PIRATE_CALL_TIMEOUT_SECS") {
            let parsed = secs
                .trim()
                .parse::<u64>()
                .map_err(|e| ConfigError::InvalidValue {
                    key: "PIRATE_CALL_TIMEOUT_SECS",
                    value: secs.clone(),
                    reason: e.to_string(),
                })?;
            if parsed == 0 {
                return Err(ConfigError::InvalidValue {
                    key: "PIRATE_CALL_TIMEOUT_SECS",
                    value: secs,
                    reason: "timeout must be positive".to_string(),
                });
            }
            config.timings.call_timeout = Duration::from_secs(parsed);
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_overrides() {
        let config = AppConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.timings.conflict_retry_delay, Duration::from_secs(10));
        assert_eq!(config.timings.transient_retry_delay, Duration::from_secs(5));
    }

    #[test]
    fn applies_overrides() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("PIRATE_LIGHTD_HOST", "localhost"),
            ("PIRATE_LIGHTD_PORT", "9067"),
            ("PIRATE_DATA_DIR", "/tmp/wallets"),
            ("PIRATE_CALL_TIMEOUT_SECS", "30"),
        ]))
        .unwrap();
        assert_eq!(config.network.default_host, "localhost");
        assert_eq!(config.network.default_port, 9067);
        assert_eq!(config.data_dir, PathBuf::from("/tmp/wallets"));
        assert_eq!(config.timings.call_timeout, Duration::from_secs(30));
    }

    #[test]
    fn rejects_bad_numbers() {
        assert!(AppConfig::from_lookup(lookup_from(&[("PIRATE_LIGHTD_PORT", "http")])).is_err());
        assert!(
            AppConfig::from_lookup(lookup_from(&[("PIRATE_CALL_TIMEOUT_SECS", "0")])).is_err()
        );
    }

    #[test]
    fn teardown_candidates_are_ordered_and_unique() {
        let aliases = TeardownAliases::default();
        assert_eq!(
            aliases.candidates("w2", Some("w1")),
            vec!["w2", "piratechain", "w1", "piratechain_w1"]
        );
        assert_eq!(
            aliases.candidates("w1", Some("w1")),
            vec!["w1", "piratechain", "piratechain_w1"]
        );
        assert_eq!(aliases.candidates("w1", None), vec!["w1", "piratechain"]);
    }
}
