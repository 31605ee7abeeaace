//! Route execution engine
//!
//! Executes a route end-to-end against live chain endpoints and wallet
//! signers, exactly one broadcast transaction at a time. Signature
//! groups run strictly sequentially: the confirmation of group `i`
//! completes before group `i+1`'s fee precheck reads chain state, so a
//! chain visited twice never sees a stale balance.

use std::sync::Arc;

use chrono::Utc;
use futures::future::try_join;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use super::confirm::{ConfirmTarget, ConfirmationWaiter};
use super::fees::FeeChecker;
use super::{
    BroadcastedTx, ExecutionContext, ExecutionOutcome, ExecutionReport, ExecutionState,
};
use crate::clients::{
    ChainClient, MessageBuilder, MsgRequest, SigningMode, TransferTracker, WalletAdapter,
};
use crate::config::{ChainRegistry, ExecutorConfig};
use crate::error::{ExecResult, ExecutionError};
use crate::metrics;
use crate::plan::{decompose, Action};

/// One signature group's slice of the action list
struct SignatureGroup<'a> {
    tx_index: u32,
    origin_chain_id: String,
    has_swap: bool,
    final_action: &'a Action,
}

/// Split an action list into signature groups, in ascending group order.
/// Group boundaries are exactly the actions flagged `sign_required`.
fn signature_groups(actions: &[Action]) -> Vec<SignatureGroup<'_>> {
    let mut groups: Vec<SignatureGroup> = Vec::new();

    for action in actions {
        if action.sign_required() || groups.is_empty() {
            groups.push(SignatureGroup {
                tx_index: action.signature_group(),
                origin_chain_id: action.chain_id().to_string(),
                has_swap: action.as_swap().is_some(),
                final_action: action,
            });
        } else if let Some(group) = groups.last_mut() {
            group.has_swap |= action.as_swap().is_some();
            group.final_action = action;
        }
    }

    groups
}

/// Stateful, effectful orchestrator for a single route execution.
///
/// Holds only collaborators and configuration; all per-execution state
/// lives in the `ExecutionContext` and the report, so concurrent
/// executions through separate contexts never share mutable state.
pub struct RouteExecutor {
    chain: Arc<dyn ChainClient>,
    wallet: Arc<dyn WalletAdapter>,
    msg_builder: Arc<dyn MessageBuilder>,
    tracker: Arc<dyn TransferTracker>,
    registry: ChainRegistry,
    config: ExecutorConfig,
}

impl RouteExecutor {
    pub fn new(
        chain: Arc<dyn ChainClient>,
        wallet: Arc<dyn WalletAdapter>,
        msg_builder: Arc<dyn MessageBuilder>,
        tracker: Arc<dyn TransferTracker>,
        registry: ChainRegistry,
        config: ExecutorConfig,
    ) -> Self {
        Self {
            chain,
            wallet,
            msg_builder,
            tracker,
            registry,
            config,
        }
    }

    /// Execute a route to its terminal state.
    ///
    /// The context is consumed; its broadcast stream and state watch stay
    /// valid until the returned report is produced. A user declining a
    /// signature yields `ExecutionOutcome::Rejected` with every prior
    /// group's broadcast still committed.
    pub async fn execute(&self, ctx: ExecutionContext) -> ExecutionReport {
        let mut broadcasted = Vec::new();

        let outcome = match self.run(&ctx, &mut broadcasted).await {
            Ok(()) => {
                ctx.set_state(ExecutionState::Complete);
                metrics::record_execution("complete");
                info!(txs = broadcasted.len(), "route execution complete");
                ExecutionOutcome::Complete
            }
            Err(e) if e.is_user_rejection() => {
                ctx.set_state(ExecutionState::Rejected);
                metrics::record_execution("rejected");
                info!(
                    committed = broadcasted.len(),
                    "signature request declined, remaining groups cancelled"
                );
                ExecutionOutcome::Rejected
            }
            Err(e) => {
                ctx.set_state(ExecutionState::Failed);
                metrics::record_execution("failed");
                error!(committed = broadcasted.len(), "route execution failed: {e}");
                ExecutionOutcome::Failed(e)
            }
        };

        ExecutionReport {
            broadcasted,
            outcome,
        }
    }

    async fn run(
        &self,
        ctx: &ExecutionContext,
        broadcasted: &mut Vec<BroadcastedTx>,
    ) -> ExecResult<()> {
        ctx.route.validate()?;
        self.verify_addresses(ctx)?;

        let actions = decompose(&ctx.route);
        let groups = signature_groups(&actions);
        let fees = FeeChecker::from_config(&self.config);
        let waiter =
            ConfirmationWaiter::new(self.config.poll_interval(), self.config.confirm_timeout());
        let slippage = ctx
            .slippage_percent
            .unwrap_or(self.config.slippage_percent);

        info!(
            source = %ctx.route.source_asset_chain_id,
            dest = %ctx.route.dest_asset_chain_id,
            groups = groups.len(),
            "starting route execution"
        );

        for (ordinal, group) in groups.iter().enumerate() {
            let ordinal = ordinal as u32;
            if ctx.cancel.is_cancelled() {
                return Err(ExecutionError::Cancelled);
            }

            let origin = group.origin_chain_id.as_str();
            let origin_address = self.address_for(ctx, origin)?;

            let dest_chain = group.final_action.arrival_chain_id().to_string();
            let dest_denom = group.final_action.denom_out().to_string();
            let dest_address = self.address_for(ctx, &dest_chain)?.to_string();

            // Two read-only queries before anything is signed: the fee
            // precheck (running against post-confirmation balances of the
            // previous group, never stale reads) and the destination
            // balance snapshot the confirmation wait compares against.
            let (_, balance_before) = try_join(
                fees.ensure_fee_balance(
                    self.chain.as_ref(),
                    &self.registry,
                    origin,
                    origin_address,
                    group.has_swap,
                ),
                self.chain.balance(&dest_chain, &dest_address, &dest_denom),
            )
            .await?;

            let request = MsgRequest {
                addresses: ctx.addresses.clone(),
                operations: ctx
                    .route
                    .operations_in_group(group.tx_index)
                    .into_iter()
                    .cloned()
                    .collect(),
                slippage_percent: slippage,
            };
            let payloads = self.msg_builder.build(&request).await?;
            let payload = payloads
                .into_iter()
                .find(|p| p.chain_id == origin)
                .ok_or_else(|| {
                    ExecutionError::MessageBuild(format!("no payload for chain {origin}"))
                })?;

            // Hardware wallets cannot sign the direct-signing document.
            let mode = if self.wallet.is_ledger() {
                SigningMode::AminoJson
            } else {
                SigningMode::Direct
            };

            ctx.set_state(ExecutionState::Signing(ordinal));
            debug!(group = ordinal, chain = origin, ?mode, "requesting signature");
            let signed = self.wallet.sign(origin, &payload, mode).await?;

            ctx.set_state(ExecutionState::Broadcasting(ordinal));
            let tx_hash = self.chain.broadcast(origin, &signed).await?;

            let record = BroadcastedTx {
                chain_id: origin.to_string(),
                tx_hash: tx_hash.clone(),
                explorer_link: self.registry.explorer_tx_link(origin, &tx_hash),
                broadcast_at: Utc::now(),
            };
            info!(group = ordinal, chain = origin, tx_hash = %tx_hash, "transaction broadcast");
            metrics::record_tx_broadcast(origin);
            broadcasted.push(record.clone());
            ctx.emit_tx(&record);

            // Tracking registration is best-effort; balance polling covers
            // a tracker outage.
            if let Err(e) = self.tracker.submit(&tx_hash, origin).await {
                warn!(tx_hash = %tx_hash, "transfer tracking registration failed: {e}");
            }

            ctx.set_state(ExecutionState::Confirming(ordinal));
            let started = Instant::now();
            waiter
                .wait(
                    self.chain.as_ref(),
                    self.tracker.as_ref(),
                    &ConfirmTarget {
                        tx_hash,
                        origin_chain_id: origin.to_string(),
                        dest_chain_id: dest_chain,
                        dest_address,
                        dest_denom,
                        balance_before,
                    },
                    &ctx.cancel,
                )
                .await?;
            metrics::record_transfer_confirmed(origin, started.elapsed());
        }

        Ok(())
    }

    /// Every visited chain needs an address, and the address format must
    /// match the chain's account system. Runs before any signing, so a
    /// failure here has no side effects.
    fn verify_addresses(&self, ctx: &ExecutionContext) -> ExecResult<()> {
        for chain_id in &ctx.route.chain_ids {
            let address = self.address_for(ctx, chain_id)?;
            match self.registry.get(chain_id) {
                Some(info) => {
                    if !address.starts_with(&info.bech32_prefix) {
                        return Err(ExecutionError::IncompatibleAddress {
                            chain_id: chain_id.clone(),
                            address: address.to_string(),
                        });
                    }
                }
                None => {
                    debug!(chain_id, "no registry entry, skipping address prefix check");
                }
            }
        }
        Ok(())
    }

    fn address_for<'a>(&self, ctx: &'a ExecutionContext, chain_id: &str) -> ExecResult<&'a str> {
        ctx.addresses
            .get(chain_id)
            .map(String::as_str)
            .ok_or_else(|| ExecutionError::MissingAddress {
                chain_id: chain_id.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::{
        MockChainClient, MockMessageBuilder, MockTransferTracker, MockWalletAdapter,
        SignablePayload, SignedTx, TrackedStatus, TrackingState, TransferState, TransferStatus,
    };
    use crate::config::ChainInfo;
    use crate::route::{Operation, Route, SwapLeg, SwapOp, SwapVenue, TransferOp};
    use std::collections::HashMap;

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    fn chain_info(chain_id: &str, prefix: &str, fee_denom: &str) -> ChainInfo {
        ChainInfo {
            chain_id: chain_id.into(),
            name: chain_id.into(),
            bech32_prefix: prefix.into(),
            fee_denom: Some(fee_denom.into()),
            average_gas_price: Some(0.025),
            explorer_tx_url: Some(format!("https://scan.test/{chain_id}/{{tx_hash}}")),
        }
    }

    fn registry() -> ChainRegistry {
        ChainRegistry::new(vec![
            chain_info("cosmoshub-4", "cosmos", "uatom"),
            chain_info("osmosis-1", "osmo", "uosmo"),
            chain_info("akashnet-2", "akash", "uakt"),
        ])
    }

    fn addresses() -> HashMap<String, String> {
        [
            ("cosmoshub-4", "cosmos1sender"),
            ("osmosis-1", "osmo1sender"),
            ("akashnet-2", "akash1receiver"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    fn transfer_op(chain_id: &str, denom_out: &str, tx_index: u32) -> Operation {
        Operation::Transfer(TransferOp {
            chain_id: chain_id.into(),
            denom_in: "uatom".into(),
            denom_out: denom_out.into(),
            bridge_id: "IBC".into(),
            amount_in: "1000".into(),
            amount_out: "1000".into(),
            tx_index,
        })
    }

    // cosmoshub -> osmosis (swap shares group 0) -> akash, two signatures
    fn two_group_route() -> Route {
        Route {
            source_asset_denom: "uatom".into(),
            source_asset_chain_id: "cosmoshub-4".into(),
            dest_asset_denom: "uakt".into(),
            dest_asset_chain_id: "akashnet-2".into(),
            amount_in: "1000".into(),
            amount_out: Some("987".into()),
            chain_ids: vec!["cosmoshub-4".into(), "osmosis-1".into(), "akashnet-2".into()],
            operations: vec![
                transfer_op("cosmoshub-4", "ibc/27...", 0),
                Operation::Swap(SwapOp {
                    swap_venue: SwapVenue {
                        name: "osmosis-poolmanager".into(),
                        chain_id: "osmosis-1".into(),
                    },
                    swap_operations: vec![SwapLeg {
                        pool: "1".into(),
                        denom_in: "ibc/27...".into(),
                        denom_out: "ibc/D1...".into(),
                    }],
                    amount_in: "1000".into(),
                    amount_out: "987".into(),
                    tx_index: 0,
                }),
                transfer_op("osmosis-1", "uakt", 1),
            ],
            txs_required: 2,
        }
    }

    fn payload_for(chain_id: &str) -> SignablePayload {
        SignablePayload {
            chain_id: chain_id.into(),
            type_url: "/ibc.applications.transfer.v1.MsgTransfer".into(),
            value: serde_json::json!({"memo": ""}),
        }
    }

    fn permissive_builder() -> MockMessageBuilder {
        let mut builder = MockMessageBuilder::new();
        builder.expect_build().returning(|req| {
            let chain = req.operations[0].origin_chain_id().to_string();
            Ok(vec![payload_for(&chain)])
        });
        builder
    }

    fn completed_tracker() -> MockTransferTracker {
        let mut tracker = MockTransferTracker::new();
        tracker.expect_submit().returning(|_, _| Ok(()));
        tracker.expect_status().returning(|_, _| {
            Ok(TrackedStatus {
                state: TrackingState::Completed,
                transfer_sequence: vec![TransferStatus {
                    state: TransferState::Success,
                    send_tx: None,
                    receive_tx: None,
                    error: None,
                }],
                error: None,
            })
        });
        tracker
    }

    fn executor(
        chain: MockChainClient,
        wallet: MockWalletAdapter,
        builder: MockMessageBuilder,
        tracker: MockTransferTracker,
    ) -> RouteExecutor {
        RouteExecutor::new(
            Arc::new(chain),
            Arc::new(wallet),
            Arc::new(builder),
            Arc::new(tracker),
            registry(),
            ExecutorConfig {
                poll_interval_ms: 10,
                ..ExecutorConfig::default()
            },
        )
    }

    #[tokio::test(start_paused = true)]
    async fn happy_path_broadcasts_every_group_in_order() {
        init_tracing();
        let mut chain = MockChainClient::new();
        chain.expect_balance().returning(|_, _, denom| {
            // fee prechecks see plenty; destination snapshots see zero so
            // the first confirmation poll (which never runs here, the
            // tracker confirms) would still be correct
            if denom.starts_with('u') {
                Ok(1_000_000)
            } else {
                Ok(0)
            }
        });
        let mut seq = 0u32;
        chain.expect_broadcast().returning(move |chain_id, _| {
            seq += 1;
            Ok(format!("{}-TX{}", chain_id.to_uppercase(), seq))
        });

        let mut wallet = MockWalletAdapter::new();
        wallet.expect_is_ledger().return_const(false);
        wallet.expect_sign().times(2).returning(|chain_id, _, mode| {
            assert_eq!(mode, SigningMode::Direct);
            Ok(SignedTx {
                chain_id: chain_id.into(),
                bytes: vec![1, 2, 3],
            })
        });

        let exec = executor(chain, wallet, permissive_builder(), completed_tracker());

        let mut ctx = ExecutionContext::new(two_group_route(), addresses());
        let mut stream = ctx.tx_stream();
        let report = exec.execute(ctx).await;

        assert!(report.is_complete());
        assert_eq!(report.broadcasted.len(), 2);
        assert_eq!(report.broadcasted[0].chain_id, "cosmoshub-4");
        assert_eq!(report.broadcasted[1].chain_id, "osmosis-1");
        assert!(report.broadcasted[0]
            .explorer_link
            .as_ref()
            .unwrap()
            .contains("COSMOSHUB-4-TX1"));

        // stream observed the same records, in order
        assert_eq!(stream.recv().await.unwrap().chain_id, "cosmoshub-4");
        assert_eq!(stream.recv().await.unwrap().chain_id, "osmosis-1");
    }

    #[tokio::test(start_paused = true)]
    async fn insufficient_fee_token_halts_before_any_signing() {
        let mut chain = MockChainClient::new();
        // 200_000 * 0.025 = 5_000 required, only 120 available
        chain.expect_balance().returning(|_, _, _| Ok(120));
        chain.expect_broadcast().never();

        let mut wallet = MockWalletAdapter::new();
        wallet.expect_is_ledger().return_const(false);
        wallet.expect_sign().never();

        let exec = executor(
            chain,
            wallet,
            MockMessageBuilder::new(),
            MockTransferTracker::new(),
        );
        let report = exec
            .execute(ExecutionContext::new(two_group_route(), addresses()))
            .await;

        assert!(report.broadcasted.is_empty());
        match report.outcome {
            ExecutionOutcome::Failed(ExecutionError::InsufficientFeeToken {
                chain_id,
                required,
                available,
                ..
            }) => {
                assert_eq!(chain_id, "cosmoshub-4");
                assert!(required > available);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn user_rejection_on_second_group_keeps_the_first_committed() {
        let mut chain = MockChainClient::new();
        chain.expect_balance().returning(|_, _, denom| {
            if denom.starts_with('u') {
                Ok(1_000_000)
            } else {
                Ok(0)
            }
        });
        chain
            .expect_broadcast()
            .times(1)
            .returning(|_, _| Ok("AA11".to_string()));

        let mut wallet = MockWalletAdapter::new();
        wallet.expect_is_ledger().return_const(false);
        wallet.expect_sign().returning(|chain_id, _, _| {
            if chain_id == "cosmoshub-4" {
                Ok(SignedTx {
                    chain_id: chain_id.into(),
                    bytes: vec![1],
                })
            } else {
                Err(ExecutionError::UserRejected)
            }
        });

        let exec = executor(chain, wallet, permissive_builder(), completed_tracker());
        let report = exec
            .execute(ExecutionContext::new(two_group_route(), addresses()))
            .await;

        assert!(matches!(report.outcome, ExecutionOutcome::Rejected));
        assert_eq!(report.broadcasted.len(), 1);
        assert!(report.is_partial());
    }

    #[tokio::test(start_paused = true)]
    async fn relay_failure_halts_remaining_groups() {
        let mut chain = MockChainClient::new();
        chain.expect_balance().returning(|_, _, denom| {
            if denom.starts_with('u') {
                Ok(1_000_000)
            } else {
                Ok(0)
            }
        });
        chain
            .expect_broadcast()
            .times(1)
            .returning(|_, _| Ok("AA11".to_string()));

        let mut wallet = MockWalletAdapter::new();
        wallet.expect_is_ledger().return_const(false);
        wallet.expect_sign().times(1).returning(|chain_id, _, _| {
            Ok(SignedTx {
                chain_id: chain_id.into(),
                bytes: vec![1],
            })
        });

        let mut tracker = MockTransferTracker::new();
        tracker.expect_submit().returning(|_, _| Ok(()));
        tracker.expect_status().returning(|_, _| {
            Ok(TrackedStatus {
                state: TrackingState::Completed,
                transfer_sequence: vec![],
                error: Some("acknowledgement error".into()),
            })
        });

        let exec = executor(chain, wallet, permissive_builder(), tracker);
        let report = exec
            .execute(ExecutionContext::new(two_group_route(), addresses()))
            .await;

        assert_eq!(report.broadcasted.len(), 1);
        assert!(matches!(
            report.outcome,
            ExecutionOutcome::Failed(ExecutionError::RelayFailure { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn ledger_wallets_sign_amino() {
        let mut chain = MockChainClient::new();
        chain.expect_balance().returning(|_, _, denom| {
            if denom.starts_with('u') {
                Ok(1_000_000)
            } else {
                Ok(0)
            }
        });
        chain
            .expect_broadcast()
            .returning(|_, _| Ok("AA11".to_string()));

        let mut wallet = MockWalletAdapter::new();
        wallet.expect_is_ledger().return_const(true);
        wallet.expect_sign().times(2).returning(|chain_id, _, mode| {
            assert_eq!(mode, SigningMode::AminoJson);
            Ok(SignedTx {
                chain_id: chain_id.into(),
                bytes: vec![1],
            })
        });

        let exec = executor(chain, wallet, permissive_builder(), completed_tracker());
        let report = exec
            .execute(ExecutionContext::new(two_group_route(), addresses()))
            .await;
        assert!(report.is_complete());
    }

    #[tokio::test(start_paused = true)]
    async fn incompatible_address_aborts_with_no_side_effects() {
        let mut chain = MockChainClient::new();
        chain.expect_balance().never();
        chain.expect_broadcast().never();
        let mut wallet = MockWalletAdapter::new();
        wallet.expect_sign().never();
        wallet.expect_is_ledger().return_const(false);

        let mut addrs = addresses();
        addrs.insert("osmosis-1".into(), "cosmos1wrongprefix".into());

        let exec = executor(
            chain,
            wallet,
            MockMessageBuilder::new(),
            MockTransferTracker::new(),
        );
        let report = exec
            .execute(ExecutionContext::new(two_group_route(), addrs))
            .await;

        assert!(report.broadcasted.is_empty());
        assert!(matches!(
            report.outcome,
            ExecutionOutcome::Failed(ExecutionError::IncompatibleAddress { .. })
        ));
    }

    #[test]
    fn signature_groups_split_on_sign_required() {
        let actions = decompose(&two_group_route());
        let groups = signature_groups(&actions);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].origin_chain_id, "cosmoshub-4");
        assert!(groups[0].has_swap);
        assert_eq!(groups[0].final_action.arrival_chain_id(), "osmosis-1");
        assert_eq!(groups[1].origin_chain_id, "osmosis-1");
        assert!(!groups[1].has_swap);
    }
}
