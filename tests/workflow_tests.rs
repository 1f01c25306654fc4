mod common;

use common::{employee, harness, harness_with, manager, submission};
use expenseflow::domain::expense::ExpenseStatus;
use expenseflow::domain::policy::ApprovalPolicy;
use expenseflow::domain::ports::{ExpenseFilter, ExpenseStore};
use expenseflow::domain::settlement::SettlementMessage;
use expenseflow::error::WorkflowError;
use expenseflow::interfaces::messaging;
use rust_decimal_macros::dec;

#[tokio::test]
async fn test_auto_approved_submission_settles_end_to_end() {
    let mut h = harness();

    let view = h
        .engine
        .submit_expense(Some(&employee(1)), submission(dec!(500_000)))
        .await
        .unwrap();
    assert!(view.auto_approved);
    assert_eq!(view.status, "pending");

    let delivery = h.consumer.recv().await.unwrap();
    assert!(
        messaging::handle_delivery(&h.engine, delivery).await.is_none(),
        "auto settlement should be acknowledged"
    );

    let expense = h.store.get_by_id(view.id).await.unwrap();
    assert_eq!(expense.status, ExpenseStatus::Approved);
    assert!(expense.processed_at.is_some());

    let approvals = h.store.approvals(view.id).await.unwrap();
    assert_eq!(approvals.len(), 1);
    assert_eq!(approvals[0].approver_id, 0);
    assert_eq!(approvals[0].notes, "Auto Approved");

    let payments = h.gateway.requests();
    assert_eq!(payments.len(), 1);
    assert_eq!(payments[0].amount.value(), dec!(500_000));
}

#[tokio::test]
async fn test_large_submission_requires_manager() {
    let mut h = harness();

    let view = h
        .engine
        .submit_expense(Some(&employee(1)), submission(dec!(2_000_000)))
        .await
        .unwrap();
    assert!(!view.auto_approved);

    // Submission itself publishes nothing for manual expenses.
    tokio::task::yield_now().await;
    assert!(h.consumer.try_recv().is_none());

    let ack = h
        .engine
        .approve_expense(Some(&manager(2)), view.id, "within budget")
        .await
        .unwrap();
    assert_eq!(ack.message, format!("Expense {} approved", view.id));

    let delivery = h.consumer.recv().await.unwrap();
    let message: SettlementMessage = serde_json::from_slice(&delivery.body).unwrap();
    assert_eq!(message.approver_id, 2);
    assert!(messaging::handle_delivery(&h.engine, delivery).await.is_none());

    let expense = h.store.get_by_id(view.id).await.unwrap();
    assert_eq!(expense.status, ExpenseStatus::Approved);
    assert_eq!(h.gateway.requests().len(), 1);
}

#[tokio::test]
async fn test_rejection_is_recorded_without_payment() {
    let h = harness();

    let view = h
        .engine
        .submit_expense(Some(&employee(1)), submission(dec!(2_000_000)))
        .await
        .unwrap();
    let ack = h
        .engine
        .reject_expense(Some(&manager(2)), view.id, "needs sign-off")
        .await
        .unwrap();
    assert_eq!(ack.message, format!("Expense {} successfully rejected", view.id));

    let expense = h.store.get_by_id(view.id).await.unwrap();
    assert_eq!(expense.status, ExpenseStatus::Rejected);
    assert!(h.gateway.requests().is_empty());

    let trail = h.store.audit_trail(view.id).await.unwrap();
    let last = trail.last().unwrap();
    assert_eq!(last.new_status, ExpenseStatus::Rejected);
    assert_eq!(last.notes, "needs sign-off");
}

#[tokio::test]
async fn test_non_manager_decisions_are_forbidden() {
    let mut h = harness();

    let view = h
        .engine
        .submit_expense(Some(&employee(1)), submission(dec!(2_000_000)))
        .await
        .unwrap();

    for result in [
        h.engine
            .approve_expense(Some(&employee(1)), view.id, "self-approval")
            .await,
        h.engine
            .reject_expense(Some(&employee(3)), view.id, "peer rejection")
            .await,
    ] {
        let err = result.unwrap_err();
        assert_eq!(err.to_string(), "user is not a manager");
    }

    // No message published, no decision recorded.
    tokio::task::yield_now().await;
    assert!(h.consumer.try_recv().is_none());
    assert_eq!(
        h.store.get_by_id(view.id).await.unwrap().status,
        ExpenseStatus::Pending
    );
    assert!(h.store.approvals(view.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_admin_approval_is_policy_gated() {
    let h = harness();
    let view = h
        .engine
        .submit_expense(Some(&employee(1)), submission(dec!(2_000_000)))
        .await
        .unwrap();
    let err = h
        .engine
        .approve_expense(Some(&common::admin(9)), view.id, "admin override")
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::Forbidden));

    let lenient = harness_with(
        ApprovalPolicy {
            admins_can_approve: true,
            ..ApprovalPolicy::default()
        },
        5,
    );
    let view = lenient
        .engine
        .submit_expense(Some(&employee(1)), submission(dec!(2_000_000)))
        .await
        .unwrap();
    lenient
        .engine
        .approve_expense(Some(&common::admin(9)), view.id, "admin override")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_employee_listing_is_scoped_to_self() {
    let h = harness();

    h.engine
        .submit_expense(Some(&employee(1)), submission(dec!(2_000_000)))
        .await
        .unwrap();
    h.engine
        .submit_expense(Some(&employee(2)), submission(dec!(3_000_000)))
        .await
        .unwrap();

    // The employee asks for someone else's expenses; the filter is
    // silently overridden.
    let listing = h
        .engine
        .list_expenses(
            Some(&employee(1)),
            ExpenseFilter {
                user_id: Some(2),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(listing.total, 1);
    assert!(listing.expenses.iter().all(|e| e.user_id == 1));

    let all = h
        .engine
        .list_expenses(Some(&manager(5)), ExpenseFilter::default())
        .await
        .unwrap();
    assert_eq!(all.total, 2);
    assert_eq!(all.page, 1);
    assert_eq!(all.page_size, 10);
}

#[tokio::test]
async fn test_listing_clamps_pagination() {
    let h = harness();
    h.engine
        .submit_expense(Some(&employee(1)), submission(dec!(2_000_000)))
        .await
        .unwrap();

    let listing = h
        .engine
        .list_expenses(
            Some(&manager(5)),
            ExpenseFilter {
                page: 0,
                page_size: 0,
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(listing.page, 1);
    assert_eq!(listing.page_size, 10);
    assert_eq!(listing.expenses.len(), 1);
}

#[tokio::test]
async fn test_creation_audit_survives_publish_failure() {
    let common::TestHarness {
        engine,
        store,
        consumer,
        ..
    } = harness();
    // Kill the consumer half so the detached auto-approval publish fails.
    drop(consumer);

    let view = engine
        .submit_expense(Some(&employee(1)), submission(dec!(500_000)))
        .await
        .unwrap();
    assert!(view.auto_approved);

    tokio::task::yield_now().await;
    let trail = store.audit_trail(view.id).await.unwrap();
    assert_eq!(trail.len(), 1);
    assert_eq!(trail[0].notes, "Expense created");
}

#[tokio::test]
async fn test_audit_failures_never_surface() {
    let h = harness();
    h.faults.fail_audit(true);

    let view = h
        .engine
        .submit_expense(Some(&employee(1)), submission(dec!(2_000_000)))
        .await
        .unwrap();
    h.engine
        .reject_expense(Some(&manager(2)), view.id, "no receipt")
        .await
        .unwrap();

    // Primary effects landed even though every audit write failed.
    assert_eq!(
        h.store.get_by_id(view.id).await.unwrap().status,
        ExpenseStatus::Rejected
    );
    assert!(h.store.audit_trail(view.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_get_expense_requires_identity_and_existence() {
    let h = harness();
    assert!(matches!(
        h.engine.get_expense(None, 1).await.unwrap_err(),
        WorkflowError::Unauthenticated
    ));

    let err = h
        .engine
        .get_expense(Some(&employee(1)), 42)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "expense not found");
}

#[tokio::test]
async fn test_health_check_reports_store_liveness() {
    let h = harness();
    h.engine.health_check().await.unwrap();
}
