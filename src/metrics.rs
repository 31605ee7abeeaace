//! Prometheus metrics for route execution
//!
//! Counters and histograms only; exposition is the embedding
//! application's concern (the default registry is used so any exporter
//! the host runs picks these up).

use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, HistogramVec,
};
use std::time::Duration;

lazy_static! {
    pub static ref TX_BROADCAST: CounterVec = register_counter_vec!(
        "crossflow_txs_broadcast_total",
        "Total transactions broadcast, by origin chain",
        &["chain_id"]
    )
    .unwrap();

    pub static ref TRANSFERS_CONFIRMED: CounterVec = register_counter_vec!(
        "crossflow_transfers_confirmed_total",
        "Total cross-chain transfers confirmed, by origin chain",
        &["chain_id"]
    )
    .unwrap();

    pub static ref EXECUTIONS: CounterVec = register_counter_vec!(
        "crossflow_executions_total",
        "Route executions by terminal outcome",
        &["outcome"]
    )
    .unwrap();

    pub static ref CONFIRMATION_SECONDS: HistogramVec = register_histogram_vec!(
        "crossflow_confirmation_seconds",
        "Time from broadcast to confirmation, by origin chain",
        &["chain_id"],
        vec![1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0]
    )
    .unwrap();
}

pub fn record_tx_broadcast(chain_id: &str) {
    TX_BROADCAST.with_label_values(&[chain_id]).inc();
}

pub fn record_transfer_confirmed(chain_id: &str, elapsed: Duration) {
    TRANSFERS_CONFIRMED.with_label_values(&[chain_id]).inc();
    CONFIRMATION_SECONDS
        .with_label_values(&[chain_id])
        .observe(elapsed.as_secs_f64());
}

pub fn record_execution(outcome: &str) {
    EXECUTIONS.with_label_values(&[outcome]).inc();
}
