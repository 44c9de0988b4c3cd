//! End-to-end session tests against the fake generation client.
//!
//! Tokio time is paused, so delays, timeouts and backoff run instantly while
//! keeping their relative order.

use shield_common::config::GenerationSettings;
use shield_common::corpus::ReferenceCorpus;
use shield_common::generation_client::{FakeGenerationClient, FakeResponse, GenerationError};
use shield_common::reveal::{ManualClock, RevealState};
use shield_common::session::{Resolution, Session, SessionContext, SessionState};
use shield_shared::error::{ErrorKind, ShieldError, GENERATION_FAILED_PREFIX};
use shield_shared::render::{render, render_step, DisplayNode, Span};
use shield_shared::report::{ContentModel, OptionField, OptionKey};
use shield_shared::scenarios::{self, ScenarioKey};
use std::sync::Arc;
use std::time::Duration;

/// A valid generated document, as the service would return it
fn generated(key: ScenarioKey) -> String {
    let mut doc = scenarios::load(key).unwrap().to_json();
    let obj = doc.as_object_mut().unwrap();
    for meta in ["id", "title", "issueText", "createdAt", "scenarioKey"] {
        obj.remove(meta);
    }
    serde_json::to_string(&doc).unwrap()
}

fn session_with(settings: GenerationSettings) -> (Session, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new());
    let corpus = ReferenceCorpus::from_sections([(
        "5. Employee Benefit Programs",
        "Faculty members are not entitled to vacation time.",
    )])
    .unwrap();
    let ctx = SessionContext::new(
        "front-office",
        Arc::new(corpus),
        settings,
        Duration::from_millis(750),
    );
    (Session::new(ctx, clock.clone()), clock)
}

fn session() -> (Session, Arc<ManualClock>) {
    session_with(GenerationSettings::default())
}

#[tokio::test(start_paused = true)]
async fn test_successful_generation_completes_with_closed_steps() {
    let (mut s, _) = session();
    let client = FakeGenerationClient::always(generated(ScenarioKey::FacultyLeave));
    let resolution = s
        .submit("Teacher asks to use sick days as vacation", &client)
        .await
        .unwrap();
    assert_eq!(resolution, Resolution::Applied);
    let report = match s.state() {
        SessionState::Complete(r) => r,
        other => panic!("expected complete, got {:?}", other),
    };
    assert_eq!(report.issue_text(), "Teacher asks to use sick days as vacation");
    assert!(s.slots().iter().all(|slot| slot.reveal == RevealState::Closed));
    assert_eq!(client.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_late_result_of_older_request_is_discarded() {
    let (mut s, _) = session();
    let slow = FakeGenerationClient::new(vec![FakeResponse::ok(generated(
        ScenarioKey::ParentComplaint,
    ))
    .after(Duration::from_secs(5))]);
    let fast = FakeGenerationClient::new(vec![FakeResponse::ok(generated(
        ScenarioKey::FacultyLeave,
    ))
    .after(Duration::from_secs(1))]);

    let first = s.begin_submit("first issue").unwrap();
    let second = s.begin_submit("second issue").unwrap();
    let (older, newer) = tokio::join!(first.run(&slow), second.run(&fast));

    // arrival order: newer first, then the slow older one
    assert_eq!(s.resolve(newer), Resolution::Applied);
    assert_eq!(s.resolve(older), Resolution::Superseded);
    assert_eq!(s.report().unwrap().issue_text(), "second issue");
}

#[tokio::test(start_paused = true)]
async fn test_early_result_of_older_request_is_discarded() {
    let (mut s, _) = session();
    let fast = FakeGenerationClient::new(vec![FakeResponse::ok(generated(
        ScenarioKey::ParentComplaint,
    ))
    .after(Duration::from_millis(10))]);
    let slow = FakeGenerationClient::new(vec![FakeResponse::ok(generated(
        ScenarioKey::FacultyLeave,
    ))
    .after(Duration::from_secs(3))]);

    let first = s.begin_submit("first issue").unwrap();
    let second = s.begin_submit("second issue").unwrap();
    let older = first.run(&fast).await;
    assert_eq!(s.resolve(older), Resolution::Superseded);
    assert!(matches!(s.state(), SessionState::Generating { .. }));

    let newer = second.run(&slow).await;
    assert_eq!(s.resolve(newer), Resolution::Applied);
    assert_eq!(s.report().unwrap().issue_text(), "second issue");
}

#[tokio::test(start_paused = true)]
async fn test_malformed_output_fails_with_single_error_slot() {
    let (mut s, _) = session();
    let client = FakeGenerationClient::always("{ \"step1\": ");
    s.submit("Bus driver left a student behind", &client)
        .await
        .unwrap();

    match s.state() {
        SessionState::Failed { error, issue_text } => {
            assert_eq!(error.kind(), ErrorKind::Parse);
            assert_eq!(issue_text, "Bus driver left a student behind");
        }
        other => panic!("expected failed, got {:?}", other),
    }

    let slots = s.slots();
    assert_eq!(slots.len(), 1);
    assert_eq!(slots[0].index, 1);
    assert_eq!(slots[0].title, "Error");
    assert_eq!(slots[0].reveal, RevealState::Open);
    let ContentModel::Error(message) = &slots[0].content else {
        panic!("error slot must hold the Error variant");
    };
    assert!(message.starts_with(GENERATION_FAILED_PREFIX));

    let tree = render(&slots[0].content);
    assert_eq!(tree.len(), 1);
    assert!(matches!(tree.nodes()[0], DisplayNode::Message { .. }));
}

#[tokio::test(start_paused = true)]
async fn test_schema_violation_fails_without_retry() {
    let (mut s, _) = session_with(GenerationSettings {
        max_retries: 3,
        ..GenerationSettings::default()
    });
    let client = FakeGenerationClient::always(r#"{"step1": {"title": "x", "content": []}}"#);
    s.submit("Missing field trip form", &client).await.unwrap();
    match s.state() {
        SessionState::Failed { error, .. } => assert_eq!(error.kind(), ErrorKind::Schema),
        other => panic!("expected failed, got {:?}", other),
    }
    assert_eq!(client.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_timeout_is_network_error() {
    let (mut s, _) = session_with(GenerationSettings {
        timeout_secs: 2,
        ..GenerationSettings::default()
    });
    let client = FakeGenerationClient::new(vec![FakeResponse::ok(generated(
        ScenarioKey::FacultyLeave,
    ))
    .after(Duration::from_secs(30))]);
    s.submit("Parent threatens lawsuit", &client).await.unwrap();
    match s.state() {
        SessionState::Failed { error, .. } => {
            assert!(matches!(error, ShieldError::Network(m) if m.contains("timed out after 2s")));
        }
        other => panic!("expected failed, got {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_network_failures_are_retried() {
    let (mut s, _) = session_with(GenerationSettings {
        max_retries: 2,
        retry_backoff_ms: 100,
        ..GenerationSettings::default()
    });
    let client = FakeGenerationClient::new(vec![
        FakeResponse::err(GenerationError::Transport("connection reset".into())),
        FakeResponse::err(GenerationError::Status {
            code: 503,
            message: "overloaded".into(),
        }),
        FakeResponse::ok(generated(ScenarioKey::ParentComplaint)),
    ]);
    let ticket = s.begin_submit("Parent complaint about suspension").unwrap();
    let started = tokio::time::Instant::now();
    let outcome = ticket.run(&client).await;
    assert_eq!(outcome.attempts, 3);
    // backoff of 100ms then 200ms, with no service delay
    let waited = tokio::time::Instant::now() - started;
    assert!(waited >= Duration::from_millis(300) && waited < Duration::from_millis(400));
    assert_eq!(s.resolve(outcome), Resolution::Applied);
    assert!(matches!(s.state(), SessionState::Complete(_)));
    assert_eq!(client.call_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_retries_exhausted_reports_last_error() {
    let (mut s, _) = session_with(GenerationSettings {
        max_retries: 1,
        ..GenerationSettings::default()
    });
    let client = FakeGenerationClient::always_error(GenerationError::Status {
        code: 500,
        message: "internal".into(),
    });
    s.submit("Coach used inappropriate language", &client)
        .await
        .unwrap();
    assert_eq!(client.call_count(), 2);
    match s.state() {
        SessionState::Failed { error, .. } => {
            assert!(error.user_message().contains("500 - internal"));
        }
        other => panic!("expected failed, got {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_scenario_invalidates_in_flight_request() {
    let (mut s, _) = session();
    let client = FakeGenerationClient::always(generated(ScenarioKey::FacultyLeave));
    let ticket = s.begin_submit("Live issue").unwrap();
    s.select_scenario("parentComplaint").unwrap();
    let outcome = ticket.run(&client).await;
    assert_eq!(s.resolve(outcome), Resolution::Superseded);
    assert!(matches!(s.state(), SessionState::DemoComplete(_)));
}

#[test]
fn test_parent_complaint_walkthrough() {
    let (mut s, _) = session();
    let report = s.select_scenario("parent-complaint").unwrap().clone();

    let ContentModel::OptionSet(options) = report.step(4).unwrap().content() else {
        panic!("step 4 must be an option set");
    };
    let scores: Vec<&str> = OptionKey::ALL
        .iter()
        .map(|k| options.option(*k).get(OptionField::RiskScore).unwrap())
        .collect();
    assert_eq!(scores, vec!["Low", "Moderate", "High"]);

    let ContentModel::RecommendationBlock(block) = report.step(6).unwrap().content() else {
        panic!("step 6 must be a recommendation block");
    };
    assert_eq!(block.implementation_steps.len(), 5);
    for (i, step) in block.implementation_steps.iter().enumerate() {
        assert!(step.starts_with(&format!("{}. ", i + 1)));
    }

    let DisplayNode::Section { children, .. } = render_step(report.step(6).unwrap()) else {
        panic!("steps render as sections");
    };
    let DisplayNode::Line { spans } = &children[0] else {
        panic!("summary renders as lines");
    };
    assert_eq!(spans[0], Span::Emphasis("Recommended Option:".into()));

    assert!(s.slots().iter().all(|slot| slot.reveal == RevealState::Open));
}

#[tokio::test(start_paused = true)]
async fn test_reveal_after_live_generation() {
    let (mut s, clock) = session();
    let client = FakeGenerationClient::always(generated(ScenarioKey::ParentComplaint));
    s.submit("Parent complaint about suspension", &client)
        .await
        .unwrap();

    assert_eq!(s.toggle_step(2).unwrap(), RevealState::Pending);
    assert_eq!(s.reveal().label(2).unwrap(), "Analyzing...");
    assert_eq!(s.toggle_step(2).unwrap(), RevealState::Pending);
    clock.advance(Duration::from_millis(750));
    assert_eq!(s.reveal().state(2).unwrap(), RevealState::Open);
    assert_eq!(s.toggle_step(2).unwrap(), RevealState::Closed);
    assert_eq!(s.reveal().label(2).unwrap(), "Analyze");
}

#[tokio::test(start_paused = true)]
async fn test_new_submit_cancels_pending_reveals() {
    let (mut s, clock) = session();
    let client = FakeGenerationClient::always(generated(ScenarioKey::ParentComplaint));
    s.submit("first", &client).await.unwrap();
    s.toggle_step(1).unwrap();
    s.toggle_step(3).unwrap();
    assert_eq!(s.reveal().pending_count(), 2);

    let _ticket = s.begin_submit("second").unwrap();
    clock.advance(Duration::from_secs(1));
    assert_eq!(s.reveal().pending_count(), 0);
    assert!(s
        .reveal()
        .states()
        .iter()
        .all(|state| *state == RevealState::Closed));
}
