use std::sync::Arc;

use gantry::engine::prelude::*;

use crate::helpers::{drain, harness, names, run_request, MeteredProvider};

#[tokio::test]
async fn run_streams_delta_final_and_done_in_order() {
    let harness = harness(Arc::new(MeteredProvider::new([Some("a")])));

    let mut handle = harness.port.run_graph(run_request("demo:writer"));
    let events = drain(&mut handle.events).await;

    assert_eq!(names(&events), vec!["text_delta", "assistant_final", "done"]);
    match handle.outcome.wait().await {
        RunOutcome::Completed { content, .. } => assert_eq!(content, "ran writer"),
        other => panic!("expected completion, got {other:?}"),
    }
}

#[tokio::test]
async fn run_ids_are_server_minted_and_unique() {
    let harness = harness(Arc::new(MeteredProvider::new([Some("a")])));

    let mut first = harness.port.run_graph(run_request("demo:writer"));
    let mut second = harness.port.run_graph(run_request("demo:writer"));

    assert_ne!(first.run_id, second.run_id);
    futures::future::join(drain(&mut first.events), drain(&mut second.events)).await;
}

#[tokio::test]
async fn unknown_graph_resolves_not_found_through_the_stack() {
    let harness = harness(Arc::new(MeteredProvider::new([Some("a")])));

    let mut handle = harness.port.run_graph(run_request("demo:ghost"));
    let events = drain(&mut handle.events).await;

    assert_eq!(names(&events), vec!["error"]);
    assert!(matches!(
        handle.outcome.wait().await,
        RunOutcome::Error {
            code: ErrorCode::NotFound,
            ..
        },
    ));
}

#[tokio::test]
async fn unnamespaced_graph_id_is_rejected() {
    let harness = harness(Arc::new(MeteredProvider::new([Some("a")])));

    let mut handle = harness.port.run_graph(run_request("writer"));
    drain(&mut handle.events).await;

    assert!(matches!(
        handle.outcome.wait().await,
        RunOutcome::Error {
            code: ErrorCode::InvalidRequest,
            ..
        },
    ));
}
