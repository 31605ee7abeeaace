//! Wire-faithful route and operation types

use serde::{Deserialize, Serialize};

use crate::error::{ExecResult, ExecutionError};

/// One typed step in a route.
///
/// Externally tagged to match the routing-service JSON:
/// `{"transfer": {...}}`, `{"bridge_transfer": {...}}` or `{"swap": {...}}`.
/// Matches over this enum are exhaustive everywhere it is consumed, so a
/// new bridging primitive fails to compile instead of falling through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operation {
    #[serde(rename = "transfer")]
    Transfer(TransferOp),
    #[serde(rename = "bridge_transfer")]
    BridgeTransfer(BridgeTransferOp),
    #[serde(rename = "swap")]
    Swap(SwapOp),
}

/// Native inter-chain transfer. Carries only its origin chain; the
/// destination is inferred from the following operation during
/// decomposition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferOp {
    pub chain_id: String,
    pub denom_in: String,
    pub denom_out: String,
    pub bridge_id: String,
    pub amount_in: String,
    pub amount_out: String,
    pub tx_index: u32,
}

/// Fee-based third-party bridge transfer. Endpoints are explicit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeTransferOp {
    pub from_chain_id: String,
    pub to_chain_id: String,
    pub denom_in: String,
    pub denom_out: String,
    pub bridge_id: String,
    pub fee_amount: String,
    pub fee_denom: String,
    pub amount_in: String,
    pub amount_out: String,
    pub tx_index: u32,
}

/// Single-chain asset exchange through one venue, possibly across
/// multiple pool legs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwapOp {
    pub swap_venue: SwapVenue,
    pub swap_operations: Vec<SwapLeg>,
    pub amount_in: String,
    pub amount_out: String,
    pub tx_index: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwapVenue {
    pub name: String,
    pub chain_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwapLeg {
    pub pool: String,
    pub denom_in: String,
    pub denom_out: String,
}

impl Operation {
    /// Signature group ordinal this operation is bundled into
    pub fn tx_index(&self) -> u32 {
        match self {
            Operation::Transfer(op) => op.tx_index,
            Operation::BridgeTransfer(op) => op.tx_index,
            Operation::Swap(op) => op.tx_index,
        }
    }

    /// Chain where this operation starts executing
    pub fn origin_chain_id(&self) -> &str {
        match self {
            Operation::Transfer(op) => &op.chain_id,
            Operation::BridgeTransfer(op) => &op.from_chain_id,
            Operation::Swap(op) => &op.swap_venue.chain_id,
        }
    }

    /// Operation name for logs and metrics
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Transfer(_) => "transfer",
            Operation::BridgeTransfer(_) => "bridge_transfer",
            Operation::Swap(_) => "swap",
        }
    }
}

/// Ordered plan of operations moving an asset between chains.
///
/// Produced by an external routing service and consumed as given; the
/// route-finding algorithm itself is out of scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub source_asset_denom: String,
    pub source_asset_chain_id: String,
    pub dest_asset_denom: String,
    pub dest_asset_chain_id: String,
    pub amount_in: String,
    /// Estimated output amount, when the routing service provides one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount_out: Option<String>,
    /// Chains visited, in order. Length = number of hops + 1.
    pub chain_ids: Vec<String>,
    pub operations: Vec<Operation>,
    /// Count of distinct signature groups
    pub txs_required: u32,
}

impl Route {
    /// Check the structural invariants of a routing-service response.
    ///
    /// A route failing these checks is a service-contract violation, not
    /// a runtime condition to recover from; callers should validate once
    /// at the trust boundary.
    pub fn validate(&self) -> ExecResult<()> {
        if self.operations.is_empty() {
            return Err(ExecutionError::InvalidRoute("no operations".into()));
        }
        if self.chain_ids.is_empty() {
            return Err(ExecutionError::InvalidRoute("empty chain_ids".into()));
        }
        if self.txs_required == 0 {
            return Err(ExecutionError::InvalidRoute("txs_required is zero".into()));
        }
        if self.chain_ids.first() != Some(&self.source_asset_chain_id) {
            return Err(ExecutionError::InvalidRoute(format!(
                "chain_ids starts at {:?}, source chain is {}",
                self.chain_ids.first(),
                self.source_asset_chain_id
            )));
        }
        if self.chain_ids.last() != Some(&self.dest_asset_chain_id) {
            return Err(ExecutionError::InvalidRoute(format!(
                "chain_ids ends at {:?}, destination chain is {}",
                self.chain_ids.last(),
                self.dest_asset_chain_id
            )));
        }

        let mut prev_index = 0u32;
        for (pos, op) in self.operations.iter().enumerate() {
            if op.tx_index() < prev_index {
                return Err(ExecutionError::InvalidRoute(format!(
                    "operation {} has tx_index {} after {}",
                    pos,
                    op.tx_index(),
                    prev_index
                )));
            }
            prev_index = op.tx_index();

            if let Operation::Swap(swap) = op {
                if swap.swap_operations.is_empty() {
                    return Err(ExecutionError::InvalidRoute(format!(
                        "swap operation {} has no pool legs",
                        pos
                    )));
                }
            }
        }

        Ok(())
    }

    /// Operations bundled into one signature group, in route order
    pub fn operations_in_group(&self, tx_index: u32) -> Vec<&Operation> {
        self.operations
            .iter()
            .filter(|op| op.tx_index() == tx_index)
            .collect()
    }
}
