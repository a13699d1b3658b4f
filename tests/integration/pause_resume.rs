use std::sync::Arc;

use gantry::engine::prelude::*;

use crate::helpers::{drain, harness, names, run_request, wait_until, ApprovalProvider};

async fn pause(harness: &crate::helpers::Harness) -> String {
    let mut handle = harness
        .port
        .run_graph(run_request("demo:writer").with_state_key("s1"));
    drain(&mut handle.events).await;
    match handle.outcome.wait().await {
        RunOutcome::NeedsInput {
            state_key,
            interrupt,
        } => {
            assert_eq!(interrupt.kind, "approval");
            state_key
        }
        other => panic!("expected pause, got {other:?}"),
    }
}

fn resume_request(state_key: &str, resume_id: &str) -> RunRequest {
    run_request("demo:writer")
        .with_state_key(state_key)
        .with_resume(ResumeRequest::new(
            resume_id,
            serde_json::json!({"approve": true}),
        ))
}

#[tokio::test]
async fn paused_run_resumes_to_completion() {
    let provider = Arc::new(ApprovalProvider::new());
    let harness = harness(provider.clone());
    let state_key = pause(&harness).await;

    assert!(harness.store.get("t1", &state_key).is_some());

    let mut resumed = harness.port.run_graph(resume_request(&state_key, "x1"));
    let events = drain(&mut resumed.events).await;

    assert_eq!(names(&events), vec!["assistant_final", "done"]);
    match resumed.outcome.wait().await {
        RunOutcome::Completed { content, .. } => assert_eq!(content, "approved"),
        other => panic!("expected completion, got {other:?}"),
    }
    assert_eq!(provider.resume_count(), 1);
}

#[tokio::test]
async fn replayed_resume_id_does_not_reexecute() {
    let provider = Arc::new(ApprovalProvider::new());
    let harness = harness(provider.clone());
    let state_key = pause(&harness).await;

    let mut first = harness.port.run_graph(resume_request(&state_key, "x1"));
    drain(&mut first.events).await;
    let first = first.outcome.wait().await;

    let mut replay = harness.port.run_graph(resume_request(&state_key, "x1"));
    drain(&mut replay.events).await;
    let replay = replay.outcome.wait().await;

    assert_eq!(first, replay);
    assert_eq!(provider.resume_count(), 1);
}

#[tokio::test]
async fn concurrent_resume_is_rejected_while_the_lock_is_held() {
    let gate = Arc::new(tokio::sync::Notify::new());
    let provider = Arc::new(ApprovalProvider::gated(gate.clone()));
    let harness = harness(provider.clone());
    let state_key = pause(&harness).await;

    // The first resume parks inside the provider, holding the lock.
    let first = harness.port.run_graph(resume_request(&state_key, "x1"));
    wait_until("the first resume to reach the provider", || {
        provider.resume_count() == 1
    })
    .await;

    let mut second = harness.port.run_graph(resume_request(&state_key, "x2"));
    drain(&mut second.events).await;
    match second.outcome.wait().await {
        RunOutcome::Error { code, message } => {
            assert_eq!(code, ErrorCode::Aborted);
            assert!(message.contains("conflict"), "got: {message}");
        }
        other => panic!("expected conflict, got {other:?}"),
    }

    gate.notify_one();
    let mut first = first;
    drain(&mut first.events).await;
    assert!(matches!(
        first.outcome.wait().await,
        RunOutcome::Completed { .. },
    ));

    // The lineage is completed now; further resumes are rejected too.
    let mut third = harness.port.run_graph(resume_request(&state_key, "x3"));
    drain(&mut third.events).await;
    assert!(matches!(
        third.outcome.wait().await,
        RunOutcome::Error {
            code: ErrorCode::Aborted,
            ..
        },
    ));
}

#[tokio::test]
async fn fresh_pause_cannot_steal_a_held_resume_lock() {
    let gate = Arc::new(tokio::sync::Notify::new());
    let provider = Arc::new(ApprovalProvider::gated(gate.clone()));
    let harness = harness(provider.clone());
    let state_key = pause(&harness).await;

    // The resume parks inside the provider, holding the lock.
    let first = harness.port.run_graph(resume_request(&state_key, "x1"));
    wait_until("the first resume to reach the provider", || {
        provider.resume_count() == 1
    })
    .await;

    // A fresh run pausing on the same key must not replace the record.
    let mut intruder = harness
        .port
        .run_graph(run_request("demo:writer").with_state_key(&state_key));
    drain(&mut intruder.events).await;
    assert!(matches!(
        intruder.outcome.wait().await,
        RunOutcome::Error {
            code: ErrorCode::Aborted,
            ..
        },
    ));
    let held = harness.store.get("t1", &state_key).expect("handle");
    assert!(held.lock_holder_id.is_some());

    // The lock survived, so a competing resume still conflicts.
    let mut rival = harness.port.run_graph(resume_request(&state_key, "x2"));
    drain(&mut rival.events).await;
    assert!(matches!(
        rival.outcome.wait().await,
        RunOutcome::Error {
            code: ErrorCode::Aborted,
            ..
        },
    ));
    assert_eq!(provider.resume_count(), 1);

    gate.notify_one();
    let mut first = first;
    drain(&mut first.events).await;
    assert!(matches!(
        first.outcome.wait().await,
        RunOutcome::Completed { .. },
    ));
}

#[tokio::test]
async fn resume_with_unknown_state_key_is_not_found() {
    let harness = harness(Arc::new(ApprovalProvider::new()));

    let mut handle = harness.port.run_graph(resume_request("nope", "x1"));
    drain(&mut handle.events).await;

    assert!(matches!(
        handle.outcome.wait().await,
        RunOutcome::Error {
            code: ErrorCode::NotFound,
            ..
        },
    ));
}

#[tokio::test]
async fn resume_without_state_key_is_invalid() {
    let harness = harness(Arc::new(ApprovalProvider::new()));

    let request = run_request("demo:writer").with_resume(ResumeRequest::new(
        "x1",
        serde_json::json!({"approve": true}),
    ));
    let mut handle = harness.port.run_graph(request);
    drain(&mut handle.events).await;

    assert!(matches!(
        handle.outcome.wait().await,
        RunOutcome::Error {
            code: ErrorCode::InvalidRequest,
            ..
        },
    ));
}
