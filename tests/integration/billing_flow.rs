use std::sync::Arc;

use gantry::engine::prelude::*;

use crate::helpers::{drain, harness, names, run_request, wait_until, MeteredProvider};

#[tokio::test]
async fn each_usage_unit_is_billed_exactly_once() {
    let harness = harness(Arc::new(MeteredProvider::new([Some("a"), Some("b")])));

    let mut handle = harness.port.run_graph(run_request("demo:writer"));
    let run_id = handle.run_id.clone();
    let events = drain(&mut handle.events).await;

    // Usage events are consumed by the billing layer, never forwarded.
    assert!(names(&events).iter().all(|name| *name != "usage_report"));
    assert!(matches!(
        handle.outcome.wait().await,
        RunOutcome::Completed { .. },
    ));

    let receipts = harness.ledger.receipts_for_run(&run_id);
    assert_eq!(receipts.len(), 2);
    assert_eq!(receipts[0].source_reference, format!("{run_id}/0/a"));
    assert_eq!(receipts[1].source_reference, format!("{run_id}/0/b"));
    assert!(receipts
        .iter()
        .all(|receipt| receipt.status == ChargeStatus::Posted));
    assert!(receipts.iter().all(|receipt| receipt.tenant_id == "t1"));
}

#[tokio::test]
async fn missing_unit_id_bills_under_a_fallback_key() {
    let harness = harness(Arc::new(MeteredProvider::new([Some("a"), None])));

    let mut handle = harness.port.run_graph(run_request("demo:writer"));
    let run_id = handle.run_id.clone();
    drain(&mut handle.events).await;

    // The defective fact is still billed and the run still completes.
    assert!(matches!(
        handle.outcome.wait().await,
        RunOutcome::Completed { .. },
    ));
    let receipts = harness.ledger.receipts_for_run(&run_id);
    assert_eq!(receipts.len(), 2);
    assert_eq!(receipts[1].source_reference, format!("MISSING:{run_id}/2"));
    assert_eq!(receipts[1].status, ChargeStatus::PostedWithFallbackKey);
}

#[tokio::test]
async fn billing_survives_a_disconnected_consumer() {
    let harness = harness(Arc::new(MeteredProvider::new([Some("a"), Some("b")])));

    let handle = harness.port.run_graph(run_request("demo:writer"));
    let run_id = handle.run_id.clone();
    // The caller walks away without reading a single event.
    drop(handle.events);

    let ledger = harness.ledger.clone();
    wait_until("both charges to commit", || {
        ledger.receipts_for_run(&run_id).len() == 2
    })
    .await;

    assert!(matches!(
        handle.outcome.wait().await,
        RunOutcome::Completed { .. },
    ));
}
