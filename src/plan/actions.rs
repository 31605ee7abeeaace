//! Action decomposition - normalizing operations into typed actions

use serde::Serialize;

use crate::route::{Operation, Route};

/// An inter-chain value movement with fully resolved endpoints
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransferAction {
    /// Stable identifier `transfer-<transferIndex>-<operationIndex>`,
    /// correlating the action back to its operation and to external
    /// status indexing.
    pub id: String,
    pub denom_in: String,
    pub denom_out: String,
    pub from_chain_id: String,
    pub to_chain_id: String,
    pub bridge_id: Option<String>,
    pub amount_in: String,
    pub amount_out: String,
    pub signature_group: u32,
    pub sign_required: bool,
}

/// A single-chain asset exchange, collapsed to one action regardless of
/// how many pool legs the venue routes through
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SwapAction {
    /// Stable identifier `swap-<swapIndex>-<operationIndex>`
    pub id: String,
    pub denom_in: String,
    pub denom_out: String,
    pub chain_id: String,
    pub venue: String,
    pub amount_in: String,
    pub amount_out: String,
    pub signature_group: u32,
    pub sign_required: bool,
}

/// Canonical, derived representation of one operation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Action {
    Transfer(TransferAction),
    Swap(SwapAction),
}

impl Action {
    pub fn id(&self) -> &str {
        match self {
            Action::Transfer(t) => &t.id,
            Action::Swap(s) => &s.id,
        }
    }

    pub fn signature_group(&self) -> u32 {
        match self {
            Action::Transfer(t) => t.signature_group,
            Action::Swap(s) => s.signature_group,
        }
    }

    pub fn sign_required(&self) -> bool {
        match self {
            Action::Transfer(t) => t.sign_required,
            Action::Swap(s) => s.sign_required,
        }
    }

    /// Chain where this action executes (transfer origin, swap chain)
    pub fn chain_id(&self) -> &str {
        match self {
            Action::Transfer(t) => &t.from_chain_id,
            Action::Swap(s) => &s.chain_id,
        }
    }

    /// Chain where this action's output lands. For consecutive actions
    /// the arrival chain of one equals the chain of the next.
    pub fn arrival_chain_id(&self) -> &str {
        match self {
            Action::Transfer(t) => &t.to_chain_id,
            Action::Swap(s) => &s.chain_id,
        }
    }

    pub fn denom_out(&self) -> &str {
        match self {
            Action::Transfer(t) => &t.denom_out,
            Action::Swap(s) => &s.denom_out,
        }
    }

    pub fn amount_in(&self) -> &str {
        match self {
            Action::Transfer(t) => &t.amount_in,
            Action::Swap(s) => &s.amount_in,
        }
    }

    pub fn amount_out(&self) -> &str {
        match self {
            Action::Transfer(t) => &t.amount_out,
            Action::Swap(s) => &s.amount_out,
        }
    }

    pub fn as_transfer(&self) -> Option<&TransferAction> {
        match self {
            Action::Transfer(t) => Some(t),
            Action::Swap(_) => None,
        }
    }

    pub fn as_swap(&self) -> Option<&SwapAction> {
        match self {
            Action::Swap(s) => Some(s),
            Action::Transfer(_) => None,
        }
    }
}

/// Decompose a route's operations into an ordered action list.
///
/// Pure and total for well-formed routes (see `Route::validate`). Plain
/// transfers carry only their origin chain on the wire; the destination
/// is resolved here, before any orchestration, as the origin of the next
/// operation or the route's final destination chain.
///
/// The first action always requires a signature. A later action requires
/// one exactly when its signature group is strictly greater than the
/// previous action's: the routing service batches consecutive operations
/// executable under one signature into a group, and the client prompts
/// once per group, in ascending order.
pub fn decompose(route: &Route) -> Vec<Action> {
    let mut actions: Vec<Action> = Vec::with_capacity(route.operations.len());
    let mut transfer_count = 0usize;
    let mut swap_count = 0usize;

    for (index, op) in route.operations.iter().enumerate() {
        let sign_required = match actions.last() {
            None => true,
            Some(prev) => op.tx_index() > prev.signature_group(),
        };

        let action = match op {
            Operation::Transfer(transfer) => {
                let id = format!("transfer-{}-{}", transfer_count, index);
                transfer_count += 1;
                Action::Transfer(TransferAction {
                    id,
                    denom_in: transfer.denom_in.clone(),
                    denom_out: transfer.denom_out.clone(),
                    from_chain_id: transfer.chain_id.clone(),
                    to_chain_id: next_origin(route, index),
                    bridge_id: Some(transfer.bridge_id.clone()),
                    amount_in: transfer.amount_in.clone(),
                    amount_out: transfer.amount_out.clone(),
                    signature_group: transfer.tx_index,
                    sign_required,
                })
            }
            Operation::BridgeTransfer(bridge) => {
                let id = format!("transfer-{}-{}", transfer_count, index);
                transfer_count += 1;
                Action::Transfer(TransferAction {
                    id,
                    denom_in: bridge.denom_in.clone(),
                    denom_out: bridge.denom_out.clone(),
                    from_chain_id: bridge.from_chain_id.clone(),
                    to_chain_id: bridge.to_chain_id.clone(),
                    bridge_id: Some(bridge.bridge_id.clone()),
                    amount_in: bridge.amount_in.clone(),
                    amount_out: bridge.amount_out.clone(),
                    signature_group: bridge.tx_index,
                    sign_required,
                })
            }
            Operation::Swap(swap) => {
                let id = format!("swap-{}-{}", swap_count, index);
                swap_count += 1;
                // Multi-leg swaps collapse to a single action: input denom
                // of the first leg, output denom of the last.
                let denom_in = swap
                    .swap_operations
                    .first()
                    .map(|leg| leg.denom_in.clone())
                    .unwrap_or_default();
                let denom_out = swap
                    .swap_operations
                    .last()
                    .map(|leg| leg.denom_out.clone())
                    .unwrap_or_default();
                Action::Swap(SwapAction {
                    id,
                    denom_in,
                    denom_out,
                    chain_id: swap.swap_venue.chain_id.clone(),
                    venue: swap.swap_venue.name.clone(),
                    amount_in: swap.amount_in.clone(),
                    amount_out: swap.amount_out.clone(),
                    signature_group: swap.tx_index,
                    sign_required,
                })
            }
        };

        actions.push(action);
    }

    actions
}

/// Origin chain of the operation after `index`, or the route destination
/// when `index` is the last operation
fn next_origin(route: &Route, index: usize) -> String {
    route
        .operations
        .get(index + 1)
        .map(|op| op.origin_chain_id().to_string())
        .unwrap_or_else(|| route.dest_asset_chain_id.clone())
}
