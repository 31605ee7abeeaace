//! Route model - typed representation of a routing-service response
//!
//! A `Route` is an ordered plan of heterogeneous operations moving an
//! asset from a source chain/denom to a destination chain/denom. It is
//! pure data: validation only, no behavior.

mod model;

pub use model::{
    BridgeTransferOp, Operation, Route, SwapLeg, SwapOp, SwapVenue, TransferOp,
};
