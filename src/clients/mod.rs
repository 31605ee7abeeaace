//! Collaborator interfaces for route execution
//!
//! The orchestrator talks to four external services, each behind a
//! trait: chain reads/broadcast, wallet signing, signable-message
//! construction, and inter-chain transfer tracking. Implementations live
//! in the embedding application; tests mock them.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ExecResult;
use crate::route::Operation;

/// One signable payload returned by the message-building service:
/// a fully-formed message type with its JSON-encoded value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignablePayload {
    pub chain_id: String,
    pub type_url: String,
    pub value: serde_json::Value,
}

/// A signed, broadcast-ready transaction
#[derive(Debug, Clone, PartialEq)]
pub struct SignedTx {
    pub chain_id: String,
    pub bytes: Vec<u8>,
}

/// Which signing document a wallet is asked to sign.
///
/// Hardware wallets cannot sign the richer direct-signing document, so
/// the orchestrator downgrades to amino for them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SigningMode {
    Direct,
    AminoJson,
}

/// Request to the message-building service: the resolved addresses, the
/// operations of one signature group, and the slippage tolerance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MsgRequest {
    pub addresses: HashMap<String, String>,
    pub operations: Vec<Operation>,
    pub slippage_percent: f64,
}

/// Overall packet-relay state reported by the tracking service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackingState {
    #[serde(rename = "STATE_PENDING")]
    Pending,
    #[serde(rename = "STATE_COMPLETED")]
    Completed,
}

/// Per-packet transfer state within a tracked transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferState {
    #[serde(rename = "TRANSFER_PENDING")]
    Pending,
    /// Destination-chain side of the packet observed
    #[serde(rename = "TRANSFER_RECEIVED")]
    Received,
    #[serde(rename = "TRANSFER_SUCCESS")]
    Success,
    #[serde(rename = "TRANSFER_FAILURE")]
    Failure,
    #[serde(rename = "TRANSFER_UNKNOWN")]
    Unknown,
}

impl TransferState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransferState::Success | TransferState::Failure)
    }
}

/// An observed on-chain transaction, with a best-effort explorer link
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TxRecord {
    pub chain_id: String,
    pub tx_hash: String,
    pub explorer_link: Option<String>,
}

/// Status of one inter-chain transfer (one signature group's packet)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferStatus {
    pub state: TransferState,
    pub send_tx: Option<TxRecord>,
    pub receive_tx: Option<TxRecord>,
    pub error: Option<String>,
}

/// Tracking-service response for one broadcast transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedStatus {
    pub state: TrackingState,
    pub transfer_sequence: Vec<TransferStatus>,
    pub error: Option<String>,
}

/// Read-only chain queries plus raw broadcast
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Balance of `denom` held by `address` on `chain_id`
    async fn balance(&self, chain_id: &str, address: &str, denom: &str) -> ExecResult<u128>;

    /// Broadcast a signed transaction, returning its hash
    async fn broadcast(&self, chain_id: &str, signed: &SignedTx) -> ExecResult<String>;
}

/// Connected wallet able to produce signatures per chain
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WalletAdapter: Send + Sync {
    /// Whether the wallet is backed by a hardware/ledger device
    fn is_ledger(&self) -> bool;

    /// Sign one payload for a chain. Suspends until the user approves;
    /// an explicit decline surfaces as `ExecutionError::UserRejected`.
    async fn sign(
        &self,
        chain_id: &str,
        payload: &SignablePayload,
        mode: SigningMode,
    ) -> ExecResult<SignedTx>;
}

/// Message-building service turning a signature group into payloads
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageBuilder: Send + Sync {
    /// One signable payload per chain touched in the group
    async fn build(&self, request: &MsgRequest) -> ExecResult<Vec<SignablePayload>>;
}

/// Inter-chain transfer tracking service
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TransferTracker: Send + Sync {
    /// Register a broadcast transaction for tracking
    async fn submit(&self, tx_hash: &str, chain_id: &str) -> ExecResult<()>;

    /// Current relay status keyed by `(tx_hash, chain_id)`
    async fn status(&self, tx_hash: &str, chain_id: &str) -> ExecResult<TrackedStatus>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracking_states_parse_from_wire_names() {
        let state: TrackingState = serde_json::from_str("\"STATE_COMPLETED\"").unwrap();
        assert_eq!(state, TrackingState::Completed);

        let state: TransferState = serde_json::from_str("\"TRANSFER_SUCCESS\"").unwrap();
        assert_eq!(state, TransferState::Success);
        assert!(state.is_terminal());
        assert!(!TransferState::Received.is_terminal());
    }

    #[test]
    fn tracked_status_parses_full_response() {
        let json = r#"{
            "state": "STATE_PENDING",
            "transfer_sequence": [
                {
                    "state": "TRANSFER_PENDING",
                    "send_tx": {
                        "chain_id": "cosmoshub-4",
                        "tx_hash": "AA11",
                        "explorer_link": null
                    },
                    "receive_tx": null,
                    "error": null
                }
            ],
            "error": null
        }"#;
        let status: TrackedStatus = serde_json::from_str(json).unwrap();
        assert_eq!(status.state, TrackingState::Pending);
        assert_eq!(status.transfer_sequence.len(), 1);
        assert_eq!(
            status.transfer_sequence[0].send_tx.as_ref().unwrap().tx_hash,
            "AA11"
        );
    }
}
