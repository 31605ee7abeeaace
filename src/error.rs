//! Error types for route execution

use thiserror::Error;

/// Main error type surfaced by the execution orchestrator.
///
/// Decomposition and planning are pure and do not fail at runtime for
/// well-formed routes; every failure a caller can observe during an
/// execution is one of these variants.
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("route is malformed: {0}")]
    InvalidRoute(String),

    #[error("no address supplied for chain {chain_id}")]
    MissingAddress { chain_id: String },

    #[error("address {address} is not valid for chain {chain_id}")]
    IncompatibleAddress { chain_id: String, address: String },

    #[error(
        "insufficient fee token {denom} on chain {chain_id}: need {required}, have {available}"
    )]
    InsufficientFeeToken {
        chain_id: String,
        denom: String,
        required: u128,
        available: u128,
    },

    #[error("no fee token metadata available for chain {chain_id}")]
    NoFeeInfoAvailable { chain_id: String },

    #[error("signature request rejected by user")]
    UserRejected,

    #[error("no signer available for chain {chain_id}: {message}")]
    SignerUnavailable { chain_id: String, message: String },

    #[error("broadcast rejected on chain {chain_id}: {message}")]
    BroadcastFailure { chain_id: String, message: String },

    #[error("relay failed for tx {tx_hash}: {message}")]
    RelayFailure { tx_hash: String, message: String },

    #[error("packet error for tx {tx_hash}: {message}")]
    PacketError { tx_hash: String, message: String },

    #[error("transfer state unresolved for tx {tx_hash} on chain {chain_id}")]
    UnknownTransferState { chain_id: String, tx_hash: String },

    #[error("chain query failed on chain {chain_id}: {message}")]
    ChainQuery { chain_id: String, message: String },

    #[error("message building failed: {0}")]
    MessageBuild(String),

    #[error("transfer tracking error: {0}")]
    Tracking(String),

    #[error("execution cancelled")]
    Cancelled,
}

impl ExecutionError {
    /// True for an explicit user decline of a signature request.
    ///
    /// Rejection is not a failure: already-broadcast groups remain
    /// committed and the caller may safely re-offer the submit action.
    pub fn is_user_rejection(&self) -> bool {
        matches!(self, ExecutionError::UserRejected)
    }

    /// True when the condition can clear without code changes
    /// (user tops up the fee token, tracking service recovers).
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ExecutionError::InsufficientFeeToken { .. }
                | ExecutionError::ChainQuery { .. }
                | ExecutionError::Tracking(_)
                | ExecutionError::UserRejected
        )
    }
}

/// Result type for execution operations
pub type ExecResult<T> = Result<T, ExecutionError>;
