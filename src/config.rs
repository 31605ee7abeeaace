//! Configuration for the execution engine
//!
//! Loads settings from TOML files with environment variable substitution.
//! Chain metadata (fee token, average gas price, address prefix, explorer
//! link template) lives in a `ChainRegistry` keyed by chain ID.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::path::Path;
use std::time::Duration;

use crate::error::{ExecResult, ExecutionError};

/// Tuning knobs for the execution orchestrator
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Delay between confirmation poll attempts
    pub poll_interval_ms: u64,
    /// Optional upper bound on a single confirmation wait. `None` means the
    /// orchestrator polls until cancelled; expiry surfaces as an unresolved
    /// transfer, never as silent success.
    pub confirm_timeout_secs: Option<u64>,
    /// Gas budget for a signature group that only transfers
    pub gas_budget_transfer: u64,
    /// Gas budget for a signature group that executes an on-chain swap
    pub gas_budget_swap: u64,
    /// Default slippage tolerance passed to the message builder, in percent
    pub slippage_percent: f64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1_000,
            confirm_timeout_secs: None,
            gas_budget_transfer: 200_000,
            gas_budget_swap: 800_000,
            slippage_percent: 3.0,
        }
    }
}

impl ExecutorConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn confirm_timeout(&self) -> Option<Duration> {
        self.confirm_timeout_secs.map(Duration::from_secs)
    }
}

/// Static metadata for one chain
#[derive(Debug, Clone, Deserialize)]
pub struct ChainInfo {
    pub chain_id: String,
    pub name: String,
    /// Account address prefix (e.g. "cosmos", "osmo")
    pub bech32_prefix: String,
    /// Denom the chain charges fees in
    pub fee_denom: Option<String>,
    /// Average gas price in `fee_denom` per gas unit
    pub average_gas_price: Option<f64>,
    /// Explorer transaction URL template containing `{tx_hash}`
    pub explorer_tx_url: Option<String>,
}

impl ChainInfo {
    /// Fee token denom and average gas price, if the chain carries them
    pub fn fee_info(&self) -> Option<(&str, f64)> {
        match (&self.fee_denom, self.average_gas_price) {
            (Some(denom), Some(price)) => Some((denom.as_str(), price)),
            _ => None,
        }
    }
}

/// Chain metadata lookup used by the orchestrator
#[derive(Debug, Clone, Default)]
pub struct ChainRegistry {
    chains: HashMap<String, ChainInfo>,
}

impl ChainRegistry {
    pub fn new(chains: Vec<ChainInfo>) -> Self {
        Self {
            chains: chains
                .into_iter()
                .map(|c| (c.chain_id.clone(), c))
                .collect(),
        }
    }

    pub fn get(&self, chain_id: &str) -> Option<&ChainInfo> {
        self.chains.get(chain_id)
    }

    /// Fee token denom and average gas price for a chain.
    ///
    /// Missing metadata is fatal for that chain: the precheck cannot price
    /// a transaction it cannot denominate.
    pub fn fee_info(&self, chain_id: &str) -> ExecResult<(String, f64)> {
        self.get(chain_id)
            .and_then(|c| c.fee_info())
            .map(|(denom, price)| (denom.to_string(), price))
            .ok_or_else(|| ExecutionError::NoFeeInfoAvailable {
                chain_id: chain_id.to_string(),
            })
    }

    /// Best-effort explorer link for a broadcast transaction
    pub fn explorer_tx_link(&self, chain_id: &str, tx_hash: &str) -> Option<String> {
        self.get(chain_id)
            .and_then(|c| c.explorer_tx_url.as_ref())
            .map(|template| template.replace("{tx_hash}", tx_hash))
    }

    pub fn chain_ids(&self) -> impl Iterator<Item = &String> {
        self.chains.keys()
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }
}

/// Root settings structure for file-based configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub executor: ExecutorConfig,
    pub chains: Vec<ChainInfo>,
}

impl Settings {
    /// Load settings from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        // Substitute environment variables
        let config_str = substitute_env_vars(&config_str);

        let settings: Settings =
            toml::from_str(&config_str).with_context(|| "Failed to parse configuration")?;

        settings.validate()?;

        Ok(settings)
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.chains.is_empty() {
            anyhow::bail!("At least one chain must be configured");
        }

        for chain in &self.chains {
            if chain.bech32_prefix.is_empty() {
                anyhow::bail!("Chain {} has no bech32 prefix configured", chain.chain_id);
            }
            if chain.fee_info().is_none() {
                tracing::warn!(
                    "Chain {} has no fee metadata - executions touching it will fail the precheck",
                    chain.chain_id
                );
            }
        }

        Ok(())
    }

    pub fn registry(&self) -> ChainRegistry {
        ChainRegistry::new(self.chains.clone())
    }
}

/// Substitute environment variables in the format ${VAR_NAME}
fn substitute_env_vars(input: &str) -> String {
    let mut result = input.to_string();
    let re = regex::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").unwrap();

    for cap in re.captures_iter(input) {
        let var_name = &cap[1];
        let var_value = env::var(var_name).unwrap_or_default();
        result = result.replace(&cap[0], &var_value);
    }

    result
}
