//! Per-step display state derivation
//!
//! Translates tracking-service transfer statuses and the broadcast
//! record into the state a caller renders for each action: success,
//! pending, error, plus the most relevant explorer link. Pure reads
//! over immutable inputs; orchestration never depends on this module.

use serde::{Deserialize, Serialize};

use crate::clients::{TransferState, TransferStatus, TxRecord};
use crate::exec::BroadcastedTx;
use crate::plan::Action;

/// Which signature group a swap's display state reads from.
///
/// A swap usually rides on the signature of the transfer that delivered
/// its input, so its visual state mirrors that transfer's relay
/// progress. `OwnGroup` instead reads the swap's own group, for venues
/// where the swap broadcasts separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwapGroupBinding {
    #[default]
    PrecedingTransfer,
    OwnGroup,
}

/// Display state for one action. At most one of the three flags is set;
/// all false means no signal yet (nothing broadcast or tracked).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct StepState {
    pub is_success: bool,
    pub is_pending: bool,
    pub is_error: bool,
    pub explorer_link: Option<String>,
}

impl StepState {
    fn success(explorer_link: Option<String>) -> Self {
        Self {
            is_success: true,
            explorer_link,
            ..Self::default()
        }
    }

    fn pending(explorer_link: Option<String>) -> Self {
        Self {
            is_pending: true,
            explorer_link,
            ..Self::default()
        }
    }

    fn error(explorer_link: Option<String>) -> Self {
        Self {
            is_error: true,
            explorer_link,
            ..Self::default()
        }
    }

    fn neutral(explorer_link: Option<String>) -> Self {
        Self {
            explorer_link,
            ..Self::default()
        }
    }
}

/// Derives per-action display state from execution artifacts
#[derive(Debug, Clone, Default)]
pub struct StatusTracker {
    binding: SwapGroupBinding,
}

impl StatusTracker {
    pub fn new(binding: SwapGroupBinding) -> Self {
        Self { binding }
    }

    /// Derive the display state for `action`.
    ///
    /// `statuses` holds one tracking-service transfer status per
    /// signature group, in broadcast order; `broadcasted` likewise. Both
    /// may be shorter than the group count while execution is underway.
    pub fn derive_step_state(
        &self,
        action: &Action,
        all_actions: &[Action],
        broadcasted: &[BroadcastedTx],
        statuses: &[TransferStatus],
    ) -> StepState {
        let ordinal = self.group_ordinal(action, all_actions);
        let status = statuses.get(ordinal);
        let link = explorer_link(status, broadcasted.get(ordinal));

        let Some(status) = status else {
            return StepState::neutral(link);
        };

        match status.state {
            TransferState::Success | TransferState::Received => StepState::success(link),
            TransferState::Pending => {
                if self.pending_suppressed(action, all_actions) {
                    StepState::neutral(link)
                } else {
                    StepState::pending(link)
                }
            }
            TransferState::Failure | TransferState::Unknown => StepState::error(link),
        }
    }

    /// Signature-group ordinal whose status drives this action's display.
    /// Transfers read their own group. Swaps read the group of the
    /// transfer that delivered their input (group 0 when the swap leads
    /// the route), unless bound to their own group.
    fn group_ordinal(&self, action: &Action, all_actions: &[Action]) -> usize {
        let position = all_actions
            .iter()
            .position(|a| a.id() == action.id())
            .unwrap_or(0);

        let read_from = match (action, self.binding) {
            (Action::Swap(_), SwapGroupBinding::PrecedingTransfer) => all_actions[..position]
                .iter()
                .rposition(|a| a.as_transfer().is_some()),
            _ => Some(position),
        };

        match read_from {
            Some(index) => ordinal_of(all_actions, index),
            None => 0,
        }
    }

    /// A transfer chained directly after a route-leading swap shares the
    /// swap's signature and visual step, so it carries no pending
    /// indicator of its own.
    fn pending_suppressed(&self, action: &Action, all_actions: &[Action]) -> bool {
        if action.as_transfer().is_none() {
            return false;
        }
        matches!(all_actions.first(), Some(Action::Swap(_)))
            && all_actions.get(1).map(Action::id) == Some(action.id())
    }
}

/// Signature-group ordinal of the action at `index`: how many groups
/// started at or before it, minus one
fn ordinal_of(all_actions: &[Action], index: usize) -> usize {
    all_actions[..=index]
        .iter()
        .filter(|a| a.sign_required())
        .count()
        .saturating_sub(1)
}

/// Most relevant on-chain artifact: the receive side once the
/// destination confirmed, otherwise the send side, otherwise whatever
/// was recorded at broadcast time
fn explorer_link(
    status: Option<&TransferStatus>,
    broadcast: Option<&BroadcastedTx>,
) -> Option<String> {
    let record_link = |record: &Option<TxRecord>| {
        record.as_ref().and_then(|r| r.explorer_link.clone())
    };

    if let Some(status) = status {
        let confirmed = matches!(
            status.state,
            TransferState::Success | TransferState::Received
        );
        if confirmed {
            if let Some(link) = record_link(&status.receive_tx) {
                return Some(link);
            }
        }
        if let Some(link) = record_link(&status.send_tx) {
            return Some(link);
        }
    }

    broadcast.and_then(|b| b.explorer_link.clone())
}
