//! End-to-end reconciliation scenarios.
//!
//! Drives a full `RetryScheduler::run()` over a mixed batch of cases
//! and checks every case ends where the lifecycle says it should,
//! both against the in-memory mocks and against real SQLite adapters.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use casewatch::adapters::mock::{MockHarness, MockReviewClient, SubmitOutcome};
use casewatch::adapters::sqlite::{
    all_embedded_migrations, create_test_pool, Migrator, SqliteCaseStore, SqliteOrderGateway,
};
use casewatch::domain::models::{CaseRecord, CaseStatus, ReviewUpdate, VerificationSignals};
use casewatch::domain::ports::NoopPaymentEnvironment;
use casewatch::services::RetryScheduler;

#[tokio::test]
async fn mixed_batch_ends_in_expected_states() {
    let harness = MockHarness::new();

    // Case A: async-wait, few retries, no signals. Must stay put.
    let case_a = CaseRecord::new("A-1001").with_retry_count(2);
    // Case B: async-wait, past the retry threshold. Must be promoted.
    let case_b = CaseRecord::new("B-1002").with_retry_count(6);
    // Case C: waiting submission, service assigns a code. Must go in review.
    let mut case_c = CaseRecord::new("C-1003");
    case_c.status = CaseStatus::WaitingSubmission;
    // Case D: in review, remote state identical. Must stay unchanged but be re-saved.
    let mut case_d = CaseRecord::new("D-1004").with_field("score", json!(500));
    case_d.status = CaseStatus::InReview;
    case_d.external_code = Some("D-CODE".into());

    let (a, b, c, d) = (case_a.id, case_b.id, case_c.id, case_d.id);
    for case in [case_a, case_b, case_c, case_d] {
        harness.store.insert(case).await;
    }

    harness
        .review
        .on_submit("C-1003", SubmitOutcome::Code("X123".into()))
        .await;
    harness
        .review
        .on_fetch(
            "D-CODE",
            ReviewUpdate::new(BTreeMap::from([("score".to_string(), json!(500))])),
        )
        .await;

    let scheduler = RetryScheduler::new(
        harness.store.clone(),
        harness.review.clone(),
        harness.orders.clone(),
        harness.environment.clone(),
        5,
    );
    scheduler.run().await;

    let after_a = harness.store.get(a).await.unwrap();
    assert_eq!(after_a.status, CaseStatus::AsyncWait);
    assert_eq!(harness.store.save_count(a).await, 0);

    let after_b = harness.store.get(b).await.unwrap();
    assert_eq!(after_b.status, CaseStatus::WaitingSubmission);

    let after_c = harness.store.get(c).await.unwrap();
    assert_eq!(after_c.status, CaseStatus::InReview);
    assert_eq!(after_c.external_code.as_deref(), Some("X123"));

    let after_d = harness.store.get(d).await.unwrap();
    assert_eq!(after_d.status, CaseStatus::InReview);
    assert_eq!(after_d.fields["score"], json!(500));
    // Re-saved purely to release the lock, with no order update.
    assert_eq!(harness.store.save_count(d).await, 1);
    assert!(harness.orders.updated().await.is_empty());

    // No locks left behind anywhere.
    for id in [a, b, c, d] {
        assert!(!harness.store.is_locked(id).await);
    }
}

#[tokio::test]
async fn signals_promote_and_full_lifecycle_over_ticks() {
    let harness = MockHarness::new();

    let case = CaseRecord::new("E-2001").with_retry_count(0);
    let id = case.id;
    harness.store.insert(case).await;
    harness
        .orders
        .set_signals("E-2001", VerificationSignals::new(Some("Y".into()), Some("M".into())))
        .await;
    harness
        .review
        .on_submit("E-2001", SubmitOutcome::Code("E-CODE".into()))
        .await;
    harness
        .review
        .on_fetch(
            "E-CODE",
            ReviewUpdate::new(BTreeMap::from([
                ("score".to_string(), json!(240)),
                ("guaranteeDisposition".to_string(), json!("DECLINED")),
            ])),
        )
        .await;

    let scheduler = RetryScheduler::new(
        harness.store.clone(),
        harness.review.clone(),
        harness.orders.clone(),
        harness.environment.clone(),
        5,
    );

    // Tick 1: promotion only.
    scheduler.run().await;
    assert_eq!(
        harness.store.get(id).await.unwrap().status,
        CaseStatus::WaitingSubmission
    );

    // Tick 2: submission.
    scheduler.run().await;
    let submitted = harness.store.get(id).await.unwrap();
    assert_eq!(submitted.status, CaseStatus::InReview);
    assert_eq!(submitted.external_code.as_deref(), Some("E-CODE"));

    // Tick 3: reconcile, with the verdict flowing to the order.
    scheduler.run().await;
    let reconciled = harness.store.get(id).await.unwrap();
    assert_eq!(reconciled.fields["guaranteeDisposition"], json!("DECLINED"));
    assert_eq!(harness.orders.updated().await, vec!["E-2001".to_string()]);

    // Tick 4: nothing new remotely; no second order update.
    scheduler.run().await;
    assert_eq!(harness.orders.updated().await.len(), 1);
}

#[tokio::test]
async fn sqlite_backed_lifecycle() {
    let pool = create_test_pool().await.unwrap();
    Migrator::new(pool.clone())
        .run_embedded_migrations(all_embedded_migrations())
        .await
        .unwrap();

    let store = Arc::new(
        SqliteCaseStore::new(pool.clone())
            .with_lock_settings(Duration::from_millis(200), Duration::from_secs(60)),
    );
    let orders = Arc::new(SqliteOrderGateway::new(pool.clone()));
    let review = Arc::new(MockReviewClient::new());

    orders
        .insert_order(
            "S-3001",
            "1",
            "USD",
            Some("Y"),
            Some("M"),
            &json!({"total": "120.00"}),
        )
        .await
        .unwrap();

    let case = CaseRecord::new("S-3001");
    store.insert(&case).await.unwrap();

    review
        .on_submit("S-3001", SubmitOutcome::Code("S-CODE".into()))
        .await;
    review
        .on_fetch(
            "S-CODE",
            ReviewUpdate::new(BTreeMap::from([
                ("score".to_string(), json!(910.0)),
                ("guaranteeDisposition".to_string(), json!("APPROVED")),
            ])),
        )
        .await;

    let scheduler = RetryScheduler::new(
        store.clone(),
        review.clone(),
        orders.clone(),
        Arc::new(NoopPaymentEnvironment),
        5,
    );

    use casewatch::domain::ports::CaseStore;

    // Promotion via present signals, then submission, then reconcile.
    scheduler.run().await;
    scheduler.run().await;
    scheduler.run().await;

    let in_review = store.find_by_status(CaseStatus::InReview).await.unwrap();
    assert_eq!(in_review.len(), 1);
    assert_eq!(in_review[0].external_code.as_deref(), Some("S-CODE"));
    assert_eq!(in_review[0].fields["guaranteeDisposition"], json!("APPROVED"));
    assert!(in_review[0].lock_token.is_none());

    // The verdict landed on the order row.
    let row: (Option<String>, Option<f64>) =
        sqlx::query_as("SELECT review_disposition, review_score FROM orders WHERE reference = ?")
            .bind("S-3001")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(row.0.as_deref(), Some("APPROVED"));
    assert_eq!(row.1, Some(910.0));
}
