//! Gas-token sufficiency precheck
//!
//! Before any signature is requested for a group, the signer's balance of
//! the origin chain's fee token must cover the estimated cost. Failing
//! here halts the execution with no side effects.

use tracing::debug;

use crate::clients::ChainClient;
use crate::config::{ChainRegistry, ExecutorConfig};
use crate::error::{ExecResult, ExecutionError};

/// Prices a signature group against the origin chain's fee token
#[derive(Debug, Clone)]
pub struct FeeChecker {
    gas_budget_transfer: u64,
    gas_budget_swap: u64,
}

impl FeeChecker {
    pub fn new(gas_budget_transfer: u64, gas_budget_swap: u64) -> Self {
        Self {
            gas_budget_transfer,
            gas_budget_swap,
        }
    }

    pub fn from_config(config: &ExecutorConfig) -> Self {
        Self::new(config.gas_budget_transfer, config.gas_budget_swap)
    }

    /// Gas budget for a group. Swap execution is more gas-intensive than
    /// a pure transfer, so swap groups get the elevated budget.
    pub fn gas_budget(&self, group_has_swap: bool) -> u64 {
        if group_has_swap {
            self.gas_budget_swap
        } else {
            self.gas_budget_transfer
        }
    }

    /// Required fee-token amount: gas budget x average gas price,
    /// rounded up
    pub fn required_amount(&self, gas_budget: u64, average_gas_price: f64) -> u128 {
        (gas_budget as f64 * average_gas_price).ceil() as u128
    }

    /// Verify the signer can pay for one group on its origin chain
    pub async fn ensure_fee_balance(
        &self,
        chain: &dyn ChainClient,
        registry: &ChainRegistry,
        chain_id: &str,
        address: &str,
        group_has_swap: bool,
    ) -> ExecResult<()> {
        let (denom, average_gas_price) = registry.fee_info(chain_id)?;

        let gas_budget = self.gas_budget(group_has_swap);
        let required = self.required_amount(gas_budget, average_gas_price);
        let available = chain.balance(chain_id, address, &denom).await?;

        debug!(
            chain_id,
            denom, required, available, "fee precheck"
        );

        if available < required {
            return Err(ExecutionError::InsufficientFeeToken {
                chain_id: chain_id.to_string(),
                denom,
                required,
                available,
            });
        }

        Ok(())
    }
}
