use std::sync::Arc;
use std::time::Duration;

use gantry::engine::prelude::*;

use crate::helpers::{harness, names, run_request, MeteredProvider};

#[tokio::test]
async fn lossless_tap_sees_the_full_stream_while_best_effort_lags() {
    let harness = harness(Arc::new(MeteredProvider::new([Some("a")])));

    let handle = harness.port.run_graph(run_request("demo:writer"));
    let run_id = handle.run_id.clone();

    let mut relay = EventRelay::new(handle.events);
    let mut history = relay.subscribe("history", DeliveryPolicy::Lossless, 1);
    let ui = relay.subscribe("ui", DeliveryPolicy::BestEffort, 1);
    // The websocket went away before the first event.
    drop(ui);
    relay.spawn();

    let mut events = Vec::new();
    while let Some(event) = history.next().await {
        tokio::time::sleep(Duration::from_millis(2)).await;
        events.push(event);
    }

    assert_eq!(names(&events), vec!["text_delta", "assistant_final", "done"]);
    assert!(matches!(
        handle.outcome.wait().await,
        RunOutcome::Completed { .. },
    ));
    assert_eq!(harness.ledger.receipts_for_run(&run_id).len(), 1);
}

#[tokio::test]
async fn abandoned_taps_do_not_block_billing() {
    let harness = harness(Arc::new(MeteredProvider::new([Some("a"), Some("b")])));

    let handle = harness.port.run_graph(run_request("demo:writer"));
    let run_id = handle.run_id.clone();

    let mut relay = EventRelay::new(handle.events);
    let ui = relay.subscribe("ui", DeliveryPolicy::BestEffort, 4);
    let history = relay.subscribe("history", DeliveryPolicy::BestEffort, 4);
    drop(ui);
    drop(history);

    // The pump drains the upstream anyway, which is what lets the billing
    // layer upstream of it see every usage event.
    let relayed = relay.spawn().await.expect("pump");
    assert_eq!(relayed, 3);
    assert_eq!(harness.ledger.receipts_for_run(&run_id).len(), 2);
}
