//! Submission Tests
//!
//! Drives the dispatch half of [`PayFlow`] against the fake node: exactly one
//! submission per confirmation, in-flight gating, failure surfacing with
//! manual retry, stale-result discarding after the payment request is
//! replaced, and fee limit selection.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use bitcoin::Network;
use sendflow::{
    Amount, Balances, BlockedReason, CurrencyUnit, Notification, OnchainFeeEstimates, PayFlow,
    Route, SubmissionRequest, WizardStep,
};
use sendflow_fake_node::{create_fake_expired_invoice, create_fake_invoice, FakeNode, FixedRates};
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;

const MAINNET_ADDRESS: &str = "bc1qar0srrr7xfkvy5l643lydnw9re59gtzzwf5mdq";

fn setup_tracing() {
    // Ok if successful, Err if already initialized
    // Allows us to setup tracing at the start of several parallel tests
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .try_init();
}

fn flow_with_node(node: FakeNode) -> PayFlow {
    PayFlow::builder()
        .network(Network::Bitcoin)
        .shared_backend(Arc::new(node))
        .rates(FixedRates::default())
        .build()
        .expect("failed to build flow")
}

fn rich_balances() -> Balances {
    Balances {
        wallet_confirmed: Amount::from(1_000_000),
        wallet_unconfirmed: Amount::ZERO,
        channel_local: Amount::from(500_000),
        channel_pending_open: Amount::ZERO,
    }
}

async fn wait_for<F>(
    events: &mut broadcast::Receiver<Notification>,
    mut predicate: F,
) -> Notification
where
    F: FnMut(&Notification) -> bool,
{
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let notification = events.recv().await.expect("notification stream closed");
            if predicate(&notification) {
                return notification;
            }
        }
    })
    .await
    .expect("expected notification before timeout")
}

#[tokio::test]
async fn test_onchain_submission_uses_fastest_fee() -> Result<()> {
    setup_tracing();
    let node = FakeNode::new();
    let steering = node.clone();
    let flow = flow_with_node(node);
    let mut events = flow.subscribe();

    flow.balances_updated(rich_balances());
    flow.fee_estimates_updated(OnchainFeeEstimates {
        fastest: 18,
        half_hour: 9,
        hour: 4,
    });

    flow.pay_req_changed(MAINNET_ADDRESS);
    flow.amount_crypto_changed("2500");
    flow.submit();
    assert_eq!(flow.snapshot().wizard().current, WizardStep::Summary);

    flow.submit();
    let notification = wait_for(&mut events, |n| {
        matches!(n, Notification::SubmissionSucceeded { .. })
    })
    .await;
    match notification {
        Notification::SubmissionSucceeded { outcome, .. } => {
            assert_eq!(outcome.total_spent, Some(Amount::from(2500)));
            assert!(outcome.payment_proof.is_some());
        }
        other => panic!("unexpected notification {:?}", other),
    }

    let sent = steering.sent().await;
    assert_eq!(sent.len(), 1);
    match &sent[0] {
        SubmissionRequest::Onchain(onchain) => {
            assert_eq!(onchain.amount, Amount::from(2500));
            assert_eq!(onchain.unit, CurrencyUnit::Sat);
            assert_eq!(onchain.sat_per_vbyte, Some(18));
        }
        other => panic!("expected onchain submission, got {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn test_fixed_invoice_fee_limit_is_costliest_route() -> Result<()> {
    setup_tracing();
    let node = FakeNode::with_routes(vec![
        Route {
            total_fee: Amount::from(4),
            hops: 2,
        },
        Route {
            total_fee: Amount::from(9),
            hops: 4,
        },
    ]);
    let steering = node.clone();
    let flow = flow_with_node(node);
    let mut events = flow.subscribe();

    flow.balances_updated(rich_balances());
    flow.pay_req_changed(create_fake_invoice(Some(100_000), "fee bounds".to_string()).to_string());

    // routes must be in before send so the limit covers every quote
    wait_for(&mut events, |n| {
        matches!(n, Notification::FeeBoundsUpdated { .. })
    })
    .await;

    flow.submit();
    let notification = wait_for(&mut events, |n| {
        matches!(n, Notification::SubmissionSucceeded { .. })
    })
    .await;
    match notification {
        Notification::SubmissionSucceeded { outcome, .. } => {
            // fake settles over the cheapest quoted route
            assert_eq!(outcome.total_spent, Some(Amount::from(104)));
        }
        other => panic!("unexpected notification {:?}", other),
    }

    let sent = steering.sent().await;
    assert_eq!(sent.len(), 1);
    match &sent[0] {
        SubmissionRequest::Lightning(lightning) => {
            assert_eq!(lightning.amount, None);
            assert_eq!(lightning.fee_limit, Some(Amount::from(9)));
        }
        other => panic!("expected lightning submission, got {:?}", other),
    }
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_second_send_blocked_while_submission_in_flight() -> Result<()> {
    setup_tracing();
    let node = FakeNode::new().with_payment_delay(1);
    let steering = node.clone();
    let flow = flow_with_node(node);
    let mut events = flow.subscribe();

    flow.balances_updated(rich_balances());
    flow.pay_req_changed(create_fake_invoice(Some(100_000), "slow node".to_string()).to_string());
    assert_eq!(flow.snapshot().wizard().current, WizardStep::Summary);

    // first press dispatches, second is refused while the node settles
    flow.submit();
    flow.submit();

    wait_for(&mut events, |n| {
        matches!(
            n,
            Notification::SubmissionBlocked(BlockedReason::SubmissionInFlight)
        )
    })
    .await;
    wait_for(&mut events, |n| {
        matches!(n, Notification::SubmissionSucceeded { .. })
    })
    .await;

    assert_eq!(steering.sent().await.len(), 1);
    assert!(!flow.snapshot().submission_in_flight());
    Ok(())
}

#[tokio::test]
async fn test_failed_submission_can_be_retried() -> Result<()> {
    setup_tracing();
    let node = FakeNode::new();
    let steering = node.clone();
    let flow = flow_with_node(node);
    let mut events = flow.subscribe();

    flow.balances_updated(rich_balances());
    flow.pay_req_changed(create_fake_invoice(Some(100_000), "flaky node".to_string()).to_string());

    steering.set_fail_payments(true);
    flow.submit();
    let notification = wait_for(&mut events, |n| {
        matches!(n, Notification::SubmissionFailed { .. })
    })
    .await;
    match notification {
        Notification::SubmissionFailed { error, .. } => {
            assert!(error.contains("Payment failed"));
        }
        other => panic!("unexpected notification {:?}", other),
    }

    // the failure frees the flow for a manual retry, nothing auto-retries
    assert!(!flow.snapshot().submission_in_flight());
    assert_eq!(steering.sent().await.len(), 1);

    steering.set_fail_payments(false);
    flow.submit();
    wait_for(&mut events, |n| {
        matches!(n, Notification::SubmissionSucceeded { .. })
    })
    .await;
    assert_eq!(steering.sent().await.len(), 2);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_replaced_request_discards_in_flight_result() -> Result<()> {
    setup_tracing();
    let node = FakeNode::new().with_payment_delay(1);
    let steering = node.clone();
    let flow = flow_with_node(node);
    let mut events = flow.subscribe();

    flow.balances_updated(rich_balances());
    flow.pay_req_changed(create_fake_invoice(Some(100_000), "superseded".to_string()).to_string());
    flow.submit();

    // the payment request is replaced while the submission is still settling
    flow.set_pay_req(MAINNET_ADDRESS);
    let snapshot = flow.snapshot();
    assert!(snapshot.classification().is_onchain());
    assert!(!snapshot.submission_in_flight());

    // give the node time to settle the superseded submission
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(steering.sent().await.len(), 1);

    // its result must not surface into the new session
    let mut seen = Vec::new();
    while let Ok(notification) = events.try_recv() {
        seen.push(notification);
    }
    assert!(!seen.iter().any(|n| matches!(
        n,
        Notification::SubmissionSucceeded { .. } | Notification::SubmissionFailed { .. }
    )));
    assert_eq!(flow.snapshot().wizard().current, WizardStep::Amount);
    Ok(())
}

#[tokio::test]
async fn test_route_failure_does_not_block_submission() -> Result<()> {
    setup_tracing();
    let node = FakeNode::new();
    let steering = node.clone();
    steering.set_fail_route_queries(true);
    let flow = flow_with_node(node);
    let mut events = flow.subscribe();

    flow.balances_updated(rich_balances());
    flow.pay_req_changed(create_fake_invoice(Some(100_000), "no quotes".to_string()).to_string());
    assert_eq!(flow.snapshot().wizard().current, WizardStep::Summary);

    // no fee bounds, the payment still goes out with an open limit
    flow.submit();
    wait_for(&mut events, |n| {
        matches!(n, Notification::SubmissionSucceeded { .. })
    })
    .await;

    let sent = steering.sent().await;
    match &sent[0] {
        SubmissionRequest::Lightning(lightning) => {
            assert_eq!(lightning.fee_limit, None);
        }
        other => panic!("expected lightning submission, got {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn test_insufficient_channel_funds_block_dispatch() -> Result<()> {
    setup_tracing();
    let node = FakeNode::new();
    let steering = node.clone();
    let flow = flow_with_node(node);
    let mut events = flow.subscribe();

    flow.balances_updated(Balances {
        channel_local: Amount::from(50),
        ..Default::default()
    });
    flow.pay_req_changed(create_fake_invoice(Some(100_000), "too big".to_string()).to_string());
    assert_eq!(flow.snapshot().wizard().current, WizardStep::Summary);

    flow.submit();
    wait_for(&mut events, |n| {
        matches!(
            n,
            Notification::SubmissionBlocked(BlockedReason::InsufficientFunds)
        )
    })
    .await;

    assert!(steering.sent().await.is_empty());
    assert!(!flow.snapshot().submission_in_flight());
    Ok(())
}

#[tokio::test]
async fn test_expired_invoice_blocked_at_summary() -> Result<()> {
    setup_tracing();
    let node = FakeNode::new();
    let steering = node.clone();
    let flow = flow_with_node(node);
    let mut events = flow.subscribe();

    flow.balances_updated(rich_balances());
    flow.pay_req_changed(
        create_fake_expired_invoice(Some(100_000), "too late".to_string()).to_string(),
    );

    // expiry does not affect classification, only dispatch
    assert!(flow.snapshot().classification().is_lightning());
    assert_eq!(flow.snapshot().wizard().current, WizardStep::Summary);

    flow.submit();
    wait_for(&mut events, |n| {
        matches!(
            n,
            Notification::SubmissionBlocked(BlockedReason::InvoiceExpired)
        )
    })
    .await;
    assert!(steering.sent().await.is_empty());
    Ok(())
}
