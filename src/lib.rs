//! Crossflow - cross-chain asset routing execution
//!
//! Takes a route produced by an external routing service and carries it
//! to completion across multiple chains:
//!
//! - Parse and validate the route's operation list (`route`)
//! - Decompose operations into typed actions and attach them to
//!   per-chain steps (`plan`)
//! - Execute signature groups strictly in order: fee precheck, sign,
//!   broadcast, confirm (`exec`)
//! - Derive per-action display state for callers rendering progress
//!   (`track`)
//!
//! All chain, wallet, message-building, and tracking collaborators sit
//! behind async traits (`clients`), so the library carries no opinion on
//! transports or key management. This is a library for a UI or service
//! layer to embed; it exposes no CLI or network surface of its own.

pub mod clients;
pub mod config;
pub mod error;
pub mod exec;
pub mod metrics;
pub mod plan;
pub mod route;
pub mod track;

pub use config::{ChainInfo, ChainRegistry, ExecutorConfig, Settings};
pub use error::{ExecResult, ExecutionError};
pub use exec::{
    BroadcastedTx, CancelToken, ExecutionContext, ExecutionOutcome, ExecutionReport,
    ExecutionState, RouteExecutor,
};
pub use plan::{decompose, plan, Action, ChainStep};
pub use route::{Operation, Route};
pub use track::{StatusTracker, StepState, SwapGroupBinding};
