//! Wire-shape assertions for the types that cross process boundaries.

use gantry::engine::prelude::*;

#[test]
fn event_tags_cover_the_stream_protocol() {
    let events = vec![
        Event::TextDelta {
            run_id: "r1".to_string(),
            message_id: "m1".to_string(),
            delta: "hi".to_string(),
        },
        Event::ToolCallStart {
            run_id: "r1".to_string(),
            tool: "search".to_string(),
            call_id: "c1".to_string(),
            input: serde_json::json!({"q": "rust"}),
        },
        Event::ToolCallResult {
            run_id: "r1".to_string(),
            tool: "search".to_string(),
            call_id: "c1".to_string(),
            output: serde_json::json!([]),
        },
        Event::AssistantFinal {
            run_id: "r1".to_string(),
            content: "done".to_string(),
        },
        Event::Done {
            run_id: "r1".to_string(),
        },
        Event::Error {
            run_id: "r1".to_string(),
            code: ErrorCode::Timeout,
            message: "slow".to_string(),
        },
    ];

    for event in &events {
        let json = serde_json::to_value(event).expect("serialize");
        assert_eq!(json["type"], event.name());
    }
}

#[test]
fn events_round_trip_through_json() {
    let event = Event::Error {
        run_id: "r1".to_string(),
        code: ErrorCode::RateLimit,
        message: "busy".to_string(),
    };
    let json = serde_json::to_string(&event).expect("serialize");
    let back: Event = serde_json::from_str(&json).expect("deserialize");

    match back {
        Event::Error { code, message, .. } => {
            assert_eq!(code, ErrorCode::RateLimit);
            assert_eq!(message, "busy");
        }
        other => panic!("expected error event, got {other:?}"),
    }
}

#[test]
fn outcome_kind_tag_discriminates_all_shapes() {
    let outcomes = vec![
        (
            RunOutcome::Completed {
                content: "hi".to_string(),
                usage: TokenUsage::default(),
            },
            "completed",
        ),
        (
            RunOutcome::NeedsInput {
                state_key: "s1".to_string(),
                interrupt: InterruptEnvelope::new("approval", serde_json::json!({})),
            },
            "needs_input",
        ),
        (
            RunOutcome::error(ErrorCode::InsufficientCredits, "empty"),
            "error",
        ),
    ];

    for (outcome, kind) in &outcomes {
        let json = serde_json::to_value(outcome).expect("serialize");
        assert_eq!(json["kind"], *kind);
    }
}

#[test]
fn receipt_serializes_its_queryable_columns() {
    let fact = UsageFact {
        run_id: "r1".to_string(),
        attempt: 0,
        usage_unit_id: Some("a".to_string()),
        source: "demo".to_string(),
        tenant_id: "t1".to_string(),
        account_id: "a1".to_string(),
        request_id: "req-1".to_string(),
        tokens: TokenUsage::default(),
        cost: 0.25,
    };
    let key = IdempotencyKey::for_fact(&fact).expect("key");
    let receipt = ChargeReceipt::from_fact(&fact, &key, ChargeStatus::Posted);

    let json = serde_json::to_value(&receipt).expect("serialize");
    assert_eq!(json["source_system"], "demo");
    assert_eq!(json["source_reference"], "r1/0/a");
    assert_eq!(json["run_id"], "r1");
    assert_eq!(json["attempt"], 0);
    assert_eq!(json["tenant_id"], "t1");
    assert_eq!(json["status"], "posted");
    assert!(json["receipt_id"].is_string());
    assert!(json["created_at"].is_string());
}
