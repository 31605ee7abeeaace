//! Cross-chain confirmation waiting
//!
//! A broadcast group is confirmed when either the tracking service
//! reports a terminal relay state or the destination chain's balance of
//! the expected output denom rises above the pre-broadcast snapshot. The
//! loop is deadline-aware and cancellable at every iteration; it never
//! interrupts an in-flight network call.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info};

use super::CancelToken;
use crate::clients::{ChainClient, TransferState, TransferTracker};
use crate::clients::TrackingState;
use crate::error::{ExecResult, ExecutionError};

/// What to watch while one signature group settles
#[derive(Debug, Clone)]
pub struct ConfirmTarget {
    pub tx_hash: String,
    pub origin_chain_id: String,
    pub dest_chain_id: String,
    pub dest_address: String,
    pub dest_denom: String,
    /// Destination balance observed immediately before broadcast
    pub balance_before: u128,
}

/// Polls tracking and balance state until a group reaches a terminal,
/// non-error condition
#[derive(Debug, Clone)]
pub struct ConfirmationWaiter {
    poll_interval: Duration,
    timeout: Option<Duration>,
}

impl ConfirmationWaiter {
    pub fn new(poll_interval: Duration, timeout: Option<Duration>) -> Self {
        Self {
            poll_interval,
            timeout,
        }
    }

    /// Block until the transfer is confirmed, fails, or the deadline or
    /// cancellation fires. Deadline expiry surfaces as an unresolved
    /// transfer, never as success.
    pub async fn wait(
        &self,
        chain: &dyn ChainClient,
        tracker: &dyn TransferTracker,
        target: &ConfirmTarget,
        cancel: &CancelToken,
    ) -> ExecResult<()> {
        let deadline = self.timeout.map(|t| Instant::now() + t);

        loop {
            if cancel.is_cancelled() {
                return Err(ExecutionError::Cancelled);
            }
            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    return Err(ExecutionError::UnknownTransferState {
                        chain_id: target.origin_chain_id.clone(),
                        tx_hash: target.tx_hash.clone(),
                    });
                }
            }

            match tracker.status(&target.tx_hash, &target.origin_chain_id).await {
                Ok(status) => {
                    // A packet-level failure halts the execution even while
                    // the overall relay still reports pending.
                    if let Some(failed) = status
                        .transfer_sequence
                        .iter()
                        .find(|t| t.state == TransferState::Failure)
                    {
                        return Err(ExecutionError::PacketError {
                            tx_hash: target.tx_hash.clone(),
                            message: failed
                                .error
                                .clone()
                                .or(status.error)
                                .unwrap_or_else(|| "packet execution failed".to_string()),
                        });
                    }

                    match status.state {
                        TrackingState::Completed => {
                            if let Some(message) = status.error {
                                return Err(ExecutionError::RelayFailure {
                                    tx_hash: target.tx_hash.clone(),
                                    message,
                                });
                            }
                            if status
                                .transfer_sequence
                                .iter()
                                .any(|t| t.state == TransferState::Unknown)
                            {
                                // Must not be silently treated as success.
                                return Err(ExecutionError::UnknownTransferState {
                                    chain_id: target.origin_chain_id.clone(),
                                    tx_hash: target.tx_hash.clone(),
                                });
                            }
                            info!(
                                tx_hash = %target.tx_hash,
                                "transfer confirmed by tracking service"
                            );
                            return Ok(());
                        }
                        TrackingState::Pending => {}
                    }
                }
                Err(e) => {
                    debug!(
                        tx_hash = %target.tx_hash,
                        "tracking unavailable, relying on balance polling: {e}"
                    );
                }
            }

            // Balance-delta detection on the destination chain
            match chain
                .balance(&target.dest_chain_id, &target.dest_address, &target.dest_denom)
                .await
            {
                Ok(balance) if balance > target.balance_before => {
                    info!(
                        tx_hash = %target.tx_hash,
                        dest_chain = %target.dest_chain_id,
                        balance,
                        "transfer confirmed by destination balance delta"
                    );
                    return Ok(());
                }
                Ok(_) => {}
                Err(e) => {
                    debug!(
                        dest_chain = %target.dest_chain_id,
                        "destination balance query failed during confirmation: {e}"
                    );
                }
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }
}
