// SPDX-FileCopyrightText: 2026 Lorekeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end integration tests for the complete Lorekeep pipeline.
//!
//! Each test creates an isolated TestHarness with temp SQLite and mock
//! adapters. Tests are independent and order-insensitive.

use lorekeep_core::types::{JobStatus, LearningCategory, ValidationReport};
use lorekeep_core::StorageAdapter;
use lorekeep_sanitize::is_sanitized;
use lorekeep_test_utils::TestHarness;
use lorekeep_worker::Tick;

// ---- Capture ----

#[tokio::test]
async fn test_capture_stores_redacted_prompt_and_one_job() {
    let harness = TestHarness::builder().build().await.unwrap();

    harness
        .capture(r#"{"prompt":"call 555-123-4567","session_id":"s1"}"#)
        .await
        .unwrap();

    let conv = harness
        .storage
        .find_conversation("s1")
        .await
        .unwrap()
        .expect("conversation keyed s1");
    let messages = harness.storage.get_messages(&conv.id).await.unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].content, "call [REDACTED_PHONE]");
    assert_eq!(messages[0].sequence, 1);

    let jobs = harness
        .storage
        .list_jobs(Some(JobStatus::Queued), 10)
        .await
        .unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].job_type, "sanitize_async");
    assert_eq!(harness.storage.store_counts().await.unwrap().conversations, 1);
}

#[tokio::test]
async fn test_turns_with_same_session_share_a_conversation() {
    let harness = TestHarness::builder().build().await.unwrap();

    for line in [
        r#"{"prompt":"first","response":"one","session_id":"s1"}"#,
        r#"{"prompt":"second","response":"two","session_id":"s1"}"#,
    ] {
        harness.capture(line).await.unwrap();
    }

    let conv = harness.storage.find_conversation("s1").await.unwrap().unwrap();
    let sequences: Vec<_> = harness
        .storage
        .get_messages(&conv.id)
        .await
        .unwrap()
        .iter()
        .map(|m| m.sequence)
        .collect();
    assert_eq!(sequences, vec![1, 2, 3, 4]);
}

#[tokio::test]
async fn test_nothing_raw_reaches_the_store() {
    let harness = TestHarness::builder().build().await.unwrap();
    harness
        .capture(
            r#"{"prompt":"reach me at ann@example.com from 10.0.0.7","response":"see /home/ann/notes and use sk-ant-REDACTED","session_id":"s1"}"#,
        )
        .await
        .unwrap();

    let conv = harness.storage.find_conversation("s1").await.unwrap().unwrap();
    for message in harness.storage.get_messages(&conv.id).await.unwrap() {
        assert!(is_sanitized(&message.content), "raw text in {:?}", message.content);
    }
}

#[tokio::test]
async fn test_malformed_capture_stores_nothing() {
    let harness = TestHarness::builder().build().await.unwrap();
    assert!(harness.capture("{ definitely not json").await.is_none());
    assert!(harness.capture("").await.is_none());

    assert_eq!(harness.storage.store_counts().await.unwrap().messages, 0);
    assert_eq!(harness.storage.job_counts().await.unwrap().total(), 0);
}

// ---- Learning extraction ----

#[tokio::test]
async fn test_code_block_response_yields_technical_learning() {
    let harness = TestHarness::builder().build().await.unwrap();
    harness
        .capture(
            r#"{"prompt":"how do I list ports?","response":"Use:\n```sh\nss -tlnp\n```","session_id":"s1"}"#,
        )
        .await
        .unwrap();

    harness.drain().await.unwrap();

    let learnings = harness.storage.list_learnings(None).await.unwrap();
    assert_eq!(learnings.len(), 1);
    assert_eq!(learnings[0].category, LearningCategory::Technical);
    assert_eq!(learnings[0].title, "Code example shared");
    assert_eq!(learnings[0].content, "ss -tlnp");
}

#[tokio::test]
async fn test_reasoning_learning_is_sanitized() {
    let harness = TestHarness::builder()
        .with_reasoning(vec![
            r#"{"category":"debugging","title":"Flaky test","content":"Ask bob@example.com about the CI runner."}"#
                .to_string(),
        ])
        .build()
        .await
        .unwrap();
    harness
        .capture(r#"{"prompt":"why flaky?","response":"the runner is slow","session_id":"s1"}"#)
        .await
        .unwrap();

    harness.drain().await.unwrap();

    let learnings = harness.storage.list_learnings(None).await.unwrap();
    assert_eq!(learnings.len(), 1);
    assert_eq!(learnings[0].category, LearningCategory::Debugging);
    assert_eq!(learnings[0].content, "Ask [REDACTED_EMAIL] about the CI runner.");
    assert_eq!(harness.provider.requests().await.len(), 1);
}

#[tokio::test]
async fn test_provider_outage_falls_back_to_heuristic() {
    let harness = TestHarness::builder()
        .with_reasoning(vec![])
        .build()
        .await
        .unwrap();
    harness.provider.set_unavailable(true);
    harness
        .capture(r#"{"prompt":"q","response":"```\nmake test\n```","session_id":"s1"}"#)
        .await
        .unwrap();

    let ticks = harness.drain().await.unwrap();
    assert!(ticks.iter().all(|t| matches!(t, Tick::Committed(_))));

    let learnings = harness.storage.list_learnings(None).await.unwrap();
    assert_eq!(learnings.len(), 1);
    assert_eq!(learnings[0].content, "make test");
}

#[tokio::test]
async fn test_plain_conversation_completes_without_learning() {
    let harness = TestHarness::builder().build().await.unwrap();
    harness
        .capture(r#"{"prompt":"thanks","response":"you're welcome","session_id":"s1"}"#)
        .await
        .unwrap();

    harness.drain().await.unwrap();

    assert!(harness.storage.list_learnings(None).await.unwrap().is_empty());
    let counts = harness.storage.job_counts().await.unwrap();
    assert_eq!(counts.completed, 3);
}

// ---- Sanitization audit ----

#[tokio::test]
async fn test_validator_issues_become_a_finding() {
    let harness = TestHarness::builder()
        .with_validator_reports(vec![ValidationReport::with_issues(vec!["address".into()])])
        .build()
        .await
        .unwrap();
    let summary = harness
        .capture(r#"{"prompt":"send it to 12 Oak Avenue","session_id":"s1"}"#)
        .await
        .unwrap();

    harness.drain().await.unwrap();

    let message_id = &summary.message_ids[0];
    let finding = harness
        .storage
        .get_finding(message_id)
        .await
        .unwrap()
        .expect("finding recorded");
    assert_eq!(finding.issues, vec!["address"]);

    // The audit never rewrites content.
    let message = harness.storage.get_message(message_id).await.unwrap().unwrap();
    assert_eq!(message.content, "send it to 12 Oak Avenue");
}

#[tokio::test]
async fn test_validator_only_sees_redacted_text() {
    let harness = TestHarness::builder().build().await.unwrap();
    harness
        .capture(r#"{"prompt":"mail zoe@example.com"}"#)
        .await
        .unwrap();

    harness.drain().await.unwrap();

    assert_eq!(harness.validator.seen().await, vec!["mail [REDACTED_EMAIL]"]);
}

// ---- Failure handling ----

#[tokio::test]
async fn test_outage_dead_letters_then_operator_retry_succeeds() {
    let harness = TestHarness::builder()
        .with_max_attempts(3)
        .build()
        .await
        .unwrap();
    harness.validator.set_unavailable(true);
    let summary = harness.capture(r#"{"prompt":"hello"}"#).await.unwrap();
    let job_id = summary.job_ids[0];

    let ticks = harness.drain().await.unwrap();
    assert_eq!(
        ticks,
        vec![
            Tick::Retried(job_id),
            Tick::Retried(job_id),
            Tick::DeadLettered(job_id)
        ]
    );
    let job = harness.storage.get_job(job_id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::DeadLetter);
    assert_eq!(job.attempts, 3);
    assert!(job.error.as_deref().unwrap_or("").contains("unavailable"));

    harness.validator.set_unavailable(false);
    assert!(harness.storage.requeue_dead_letter(job_id).await.unwrap());
    assert_eq!(harness.drain().await.unwrap(), vec![Tick::Committed(job_id)]);
    assert_eq!(
        harness.storage.get_job(job_id).await.unwrap().unwrap().status,
        JobStatus::Completed
    );
}

#[tokio::test]
async fn test_harnesses_are_isolated() {
    let h1 = TestHarness::builder().build().await.unwrap();
    let h2 = TestHarness::builder().build().await.unwrap();

    h1.capture(r#"{"prompt":"one"}"#).await.unwrap();
    assert_eq!(h1.storage.job_counts().await.unwrap().queued, 1);
    assert_eq!(h2.storage.job_counts().await.unwrap().queued, 0);
}
