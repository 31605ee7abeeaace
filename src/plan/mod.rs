//! Route decomposition and per-chain step planning
//!
//! Both passes are pure and deterministic:
//! 1. `decompose` normalizes the heterogeneous operation list into a
//!    canonical sequence of transfer/swap actions with resolved hop
//!    boundaries and signature flags.
//! 2. `plan` maps the route's visited-chain sequence to the action(s)
//!    active at each chain, for orchestration and UI progress tracking.

mod actions;
mod steps;

pub use actions::{decompose, Action, SwapAction, TransferAction};
pub use steps::{plan, ChainStep};
