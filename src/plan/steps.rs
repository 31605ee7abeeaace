//! Chain step planning - mapping actions onto the visited-chain sequence

use std::collections::HashSet;

use serde::Serialize;

use super::{Action, SwapAction, TransferAction};
use crate::route::Route;

/// One entry per chain the route visits. Carries the transfer whose edge
/// touches this chain and the swap rooted at it, when present. Drives
/// both orchestration iteration and UI column layout.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChainStep {
    pub chain_id: String,
    pub transfer: Option<TransferAction>,
    pub swap: Option<SwapAction>,
}

/// Plan the per-chain step list for a route.
///
/// Pure; output length always equals `route.chain_ids.len()` and each
/// action attaches to exactly one step. A transfer matches the step whose
/// outgoing edge it is (or, at the final chain, whose incoming edge it
/// is). A swap matches its chain, disambiguated by amount continuity with
/// the transfer arriving at that visit, which keeps duplicate hub visits
/// apart.
pub fn plan(route: &Route, actions: &[Action]) -> Vec<ChainStep> {
    let mut used: HashSet<String> = HashSet::new();
    let mut steps: Vec<ChainStep> = Vec::with_capacity(route.chain_ids.len());

    for (i, chain_id) in route.chain_ids.iter().enumerate() {
        let next = route.chain_ids.get(i + 1);
        let prev = if i > 0 { route.chain_ids.get(i - 1) } else { None };

        let transfer = actions
            .iter()
            .filter_map(Action::as_transfer)
            .find(|t| {
                if used.contains(&t.id) {
                    return false;
                }
                match next {
                    // Not the last chain: the transfer leaving it
                    Some(next) => t.from_chain_id == *chain_id && t.to_chain_id == **next,
                    // Last chain: the transfer arriving at it
                    None => prev
                        .map(|p| t.from_chain_id == **p && t.to_chain_id == *chain_id)
                        .unwrap_or(false),
                }
            })
            .cloned();

        // The transfer delivering funds to this visit is the one matched
        // at the previous step.
        let incoming = steps
            .last()
            .and_then(|s: &ChainStep| s.transfer.as_ref())
            .filter(|t| t.to_chain_id == *chain_id)
            .cloned();

        let swap = actions
            .iter()
            .filter_map(Action::as_swap)
            .find(|s| {
                if used.contains(&s.id) || s.chain_id != *chain_id {
                    return false;
                }
                match &incoming {
                    Some(t) => t.amount_out == s.amount_in,
                    // No arriving transfer: only a route that opens with a
                    // swap on the source chain qualifies.
                    None => {
                        i == 0
                            && actions
                                .first()
                                .and_then(Action::as_swap)
                                .map(|first| first.id == s.id)
                                .unwrap_or(false)
                    }
                }
            })
            .cloned();

        if let Some(ref t) = transfer {
            used.insert(t.id.clone());
        }
        if let Some(ref s) = swap {
            used.insert(s.id.clone());
        }

        steps.push(ChainStep {
            chain_id: chain_id.clone(),
            transfer,
            swap,
        });
    }

    steps
}
