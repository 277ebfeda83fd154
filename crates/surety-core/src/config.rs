//! Configuration parsing and validation.
//!
//! Configuration comes from a TOML file with CLI overrides layered on top
//! by the daemon. Every section has serde defaults so a missing file is a
//! usable simulator; validation is fail-closed and runs before any remote
//! call is made.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Wei amounts exceed `i64`, so they travel as decimal strings in TOML.
mod wei_string {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse::<u128>()
            .map_err(|_| serde::de::Error::custom(format!("invalid wei amount: {raw:?}")))
    }
}

/// One ether in wei; the contract's required oracle stake.
pub const ONE_ETHER_WEI: u128 = 1_000_000_000_000_000_000;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse TOML.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// Failed to serialize to TOML.
    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Configuration is syntactically valid but semantically rejected.
    #[error("invalid configuration: {0}")]
    Validation(String),
}

/// Top-level oracle network configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OracleNetConfig {
    /// Oracle pool settings.
    #[serde(default)]
    pub oracles: OraclesConfig,

    /// Simulated ledger settings.
    #[serde(default)]
    pub ledger: LedgerConfig,

    /// Dispatch loop settings.
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Synthetic traffic generator settings.
    #[serde(default)]
    pub traffic: TrafficConfig,

    /// Status endpoint settings.
    #[serde(default)]
    pub status: StatusConfig,
}

impl OracleNetConfig {
    /// Load and validate configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or validated.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid or validation fails.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Fail-closed semantic validation.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] naming the first rejected field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.oracles.count == 0 {
            return Err(ConfigError::Validation(
                "oracles.count must be greater than zero".to_string(),
            ));
        }
        if self.oracles.pool_offset + self.oracles.count > self.oracles.pool_size {
            return Err(ConfigError::Validation(format!(
                "oracle range [{}, {}) exceeds pool size {}",
                self.oracles.pool_offset,
                self.oracles.pool_offset + self.oracles.count,
                self.oracles.pool_size
            )));
        }
        if self.ledger.index_range == 0 || self.ledger.index_range > 32 {
            return Err(ConfigError::Validation(format!(
                "ledger.index_range must be in 1..=32, got {}",
                self.ledger.index_range
            )));
        }
        if self.ledger.indices_per_oracle == 0
            || usize::from(self.ledger.indices_per_oracle) > usize::from(self.ledger.index_range)
        {
            return Err(ConfigError::Validation(format!(
                "ledger.indices_per_oracle must be in 1..=index_range ({}), got {}",
                self.ledger.index_range, self.ledger.indices_per_oracle
            )));
        }
        if self.ledger.consensus_threshold == 0 {
            return Err(ConfigError::Validation(
                "ledger.consensus_threshold must be greater than zero".to_string(),
            ));
        }
        if self.dispatch.rpc_timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "dispatch.rpc_timeout_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Oracle pool configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OraclesConfig {
    /// Number of identities to register as oracles.
    #[serde(default = "default_oracle_count")]
    pub count: usize,

    /// First pool slot used for oracles; earlier slots are reserved for
    /// other roles (owner, airlines, passengers).
    #[serde(default = "default_pool_offset")]
    pub pool_offset: usize,

    /// Total simulated accounts in the pool.
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,

    /// Seed the account handles are derived from.
    #[serde(default = "default_pool_seed")]
    pub pool_seed: u64,

    /// Stake attached to each registration, in wei.
    #[serde(with = "wei_string", default = "default_stake")]
    pub stake_wei: u128,
}

impl Default for OraclesConfig {
    fn default() -> Self {
        Self {
            count: default_oracle_count(),
            pool_offset: default_pool_offset(),
            pool_size: default_pool_size(),
            pool_seed: default_pool_seed(),
            stake_wei: default_stake(),
        }
    }
}

/// Simulated ledger configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Minimum stake the ledger accepts for registration, in wei.
    #[serde(with = "wei_string", default = "default_stake")]
    pub required_stake_wei: u128,

    /// Partition indices are drawn from `[0, index_range)`.
    #[serde(default = "default_index_range")]
    pub index_range: u8,

    /// How many distinct indices each oracle is assigned.
    #[serde(default = "default_indices_per_oracle")]
    pub indices_per_oracle: u8,

    /// Identical votes needed before a request is closed.
    #[serde(default = "default_consensus_threshold")]
    pub consensus_threshold: usize,

    /// Seed for the ledger's index-assignment RNG.
    #[serde(default = "default_ledger_seed")]
    pub seed: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            required_stake_wei: default_stake(),
            index_range: default_index_range(),
            indices_per_oracle: default_indices_per_oracle(),
            consensus_threshold: default_consensus_threshold(),
            seed: default_ledger_seed(),
        }
    }
}

/// Dispatch loop configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Bound on every remote call (register, index query, submission).
    #[serde(default = "default_rpc_timeout_ms")]
    pub rpc_timeout_ms: u64,

    /// Delay before re-subscribing after the event stream drops.
    #[serde(default = "default_resubscribe_delay_ms")]
    pub resubscribe_delay_ms: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            rpc_timeout_ms: default_rpc_timeout_ms(),
            resubscribe_delay_ms: default_resubscribe_delay_ms(),
        }
    }
}

/// Synthetic traffic generator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrafficConfig {
    /// Interval between synthetic flight requests; 0 disables the
    /// generator.
    #[serde(default = "default_traffic_interval_ms")]
    pub interval_ms: u64,
}

impl Default for TrafficConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_traffic_interval_ms(),
        }
    }
}

/// Status endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusConfig {
    /// TCP port for the liveness route.
    #[serde(default = "default_status_port")]
    pub port: u16,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            port: default_status_port(),
        }
    }
}

const fn default_oracle_count() -> usize {
    25
}

const fn default_pool_offset() -> usize {
    4
}

const fn default_pool_size() -> usize {
    50
}

const fn default_pool_seed() -> u64 {
    1
}

const fn default_stake() -> u128 {
    ONE_ETHER_WEI
}

const fn default_index_range() -> u8 {
    10
}

const fn default_indices_per_oracle() -> u8 {
    3
}

const fn default_consensus_threshold() -> usize {
    3
}

const fn default_ledger_seed() -> u64 {
    42
}

const fn default_rpc_timeout_ms() -> u64 {
    5_000
}

const fn default_resubscribe_delay_ms() -> u64 {
    1_000
}

const fn default_traffic_interval_ms() -> u64 {
    10_000
}

const fn default_status_port() -> u16 {
    8550
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_simulated_network() {
        let config = OracleNetConfig::default();
        assert_eq!(config.oracles.count, 25);
        assert_eq!(config.oracles.pool_offset, 4);
        assert_eq!(config.oracles.stake_wei, ONE_ETHER_WEI);
        assert_eq!(config.ledger.index_range, 10);
        assert_eq!(config.ledger.indices_per_oracle, 3);
        config.validate().unwrap();
    }

    #[test]
    fn empty_toml_yields_defaults() {
        let config = OracleNetConfig::from_toml("").unwrap();
        assert_eq!(config.oracles.count, 25);
        assert_eq!(config.dispatch.rpc_timeout_ms, 5_000);
    }

    #[test]
    fn toml_round_trip() {
        let config = OracleNetConfig::default();
        let rendered = config.to_toml().unwrap();
        let back = OracleNetConfig::from_toml(&rendered).unwrap();
        assert_eq!(back.oracles.count, config.oracles.count);
        assert_eq!(back.ledger.required_stake_wei, config.ledger.required_stake_wei);
    }

    #[test]
    fn wei_amounts_parse_from_strings() {
        let config = OracleNetConfig::from_toml(
            r#"
            [oracles]
            stake_wei = "2000000000000000000"
            "#,
        )
        .unwrap();
        assert_eq!(config.oracles.stake_wei, 2 * ONE_ETHER_WEI);
    }

    #[test]
    fn zero_oracle_count_rejected() {
        let err = OracleNetConfig::from_toml("[oracles]\ncount = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn oracle_range_past_pool_end_rejected() {
        let err = OracleNetConfig::from_toml(
            "[oracles]\ncount = 30\npool_offset = 25\npool_size = 50\n",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn indices_per_oracle_beyond_range_rejected() {
        let err = OracleNetConfig::from_toml(
            "[ledger]\nindex_range = 4\nindices_per_oracle = 5\n",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn malformed_wei_string_rejected() {
        let err =
            OracleNetConfig::from_toml("[oracles]\nstake_wei = \"one ether\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
