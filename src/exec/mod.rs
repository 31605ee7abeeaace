//! Execution orchestration
//!
//! Walks a route's signature groups strictly in order: for each group,
//! precheck fees, build and sign the message, broadcast, then wait for
//! cross-chain confirmation before advancing. One orchestrator instance
//! owns one execution's state; concurrent executions use independent
//! instances.

mod confirm;
mod engine;
mod fees;

pub use confirm::{ConfirmTarget, ConfirmationWaiter};
pub use engine::RouteExecutor;
pub use fees::FeeChecker;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{mpsc, watch};

use crate::error::ExecutionError;
use crate::route::Route;

/// One broadcast transaction. Appended per signature group, in execution
/// order; the list is owned by a single execution and handed back in the
/// report for the caller to persist or discard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BroadcastedTx {
    pub chain_id: String,
    pub tx_hash: String,
    pub explorer_link: Option<String>,
    pub broadcast_at: DateTime<Utc>,
}

/// Per-execution state machine, observable through the context's watch
/// channel. `group` is the signature-group ordinal, `0 <= group < txs_required`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExecutionState {
    NotStarted,
    Signing(u32),
    Broadcasting(u32),
    Confirming(u32),
    Complete,
    Failed,
    Rejected,
}

/// Terminal outcome of one execution
#[derive(Debug)]
pub enum ExecutionOutcome {
    /// Every signature group broadcast and confirmed
    Complete,
    /// User declined a signature; prior groups remain committed
    Rejected,
    Failed(ExecutionError),
}

/// What one execution did: the broadcast list plus how it ended
#[derive(Debug)]
pub struct ExecutionReport {
    pub broadcasted: Vec<BroadcastedTx>,
    pub outcome: ExecutionOutcome,
}

impl ExecutionReport {
    pub fn is_complete(&self) -> bool {
        matches!(self.outcome, ExecutionOutcome::Complete)
    }

    /// Some groups broadcast, later ones not. Distinct from total failure
    /// (nothing broadcast) and from total success.
    pub fn is_partial(&self) -> bool {
        !self.is_complete() && !self.broadcasted.is_empty()
    }
}

/// Cooperative cancellation flag, honored at every suspension point
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Explicitly-scoped state for one route execution.
///
/// Created at submit, consumed by `RouteExecutor::execute`, destroyed at
/// the terminal state. Orchestration never reaches into ambient global
/// state; everything it needs rides in here.
pub struct ExecutionContext {
    pub route: Route,
    /// One user address per entry in `route.chain_ids`
    pub addresses: HashMap<String, String>,
    /// Slippage tolerance forwarded to the message builder; `None` uses
    /// the configured default
    pub slippage_percent: Option<f64>,
    pub(crate) tx_events: Option<mpsc::UnboundedSender<BroadcastedTx>>,
    pub(crate) state_tx: Option<watch::Sender<ExecutionState>>,
    pub(crate) cancel: CancelToken,
}

impl ExecutionContext {
    pub fn new(route: Route, addresses: HashMap<String, String>) -> Self {
        Self {
            route,
            addresses,
            slippage_percent: None,
            tx_events: None,
            state_tx: None,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_slippage(mut self, percent: f64) -> Self {
        self.slippage_percent = Some(percent);
        self
    }

    /// Stream of broadcast transactions, delivered as each group lands
    pub fn tx_stream(&mut self) -> mpsc::UnboundedReceiver<BroadcastedTx> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.tx_events = Some(tx);
        rx
    }

    /// Watch channel following the execution state machine
    pub fn state_updates(&mut self) -> watch::Receiver<ExecutionState> {
        let (tx, rx) = watch::channel(ExecutionState::NotStarted);
        self.state_tx = Some(tx);
        rx
    }

    /// Handle for cooperative cancellation from another task
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub(crate) fn set_state(&self, state: ExecutionState) {
        if let Some(tx) = &self.state_tx {
            // Receivers may have been dropped; state is advisory.
            let _ = tx.send(state);
        }
    }

    pub(crate) fn emit_tx(&self, tx: &BroadcastedTx) {
        if let Some(events) = &self.tx_events {
            let _ = events.send(tx.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_token_is_shared() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn partial_report_requires_broadcasts() {
        let report = ExecutionReport {
            broadcasted: vec![],
            outcome: ExecutionOutcome::Failed(ExecutionError::UserRejected),
        };
        assert!(!report.is_partial());

        let report = ExecutionReport {
            broadcasted: vec![BroadcastedTx {
                chain_id: "cosmoshub-4".into(),
                tx_hash: "AA11".into(),
                explorer_link: None,
                broadcast_at: Utc::now(),
            }],
            outcome: ExecutionOutcome::Rejected,
        };
        assert!(report.is_partial());
        assert!(!report.is_complete());
    }
}
