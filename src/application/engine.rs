use super::views::{ApprovalAck, ExpenseListView, ExpenseView, SubmitExpense};
use crate::domain::expense::{Amount, AuditLogEntry, Expense, ExpenseStatus};
use crate::domain::policy::ApprovalPolicy;
use crate::domain::ports::{
    ExpenseFilter, ExpenseStoreRef, PaymentGatewayRef, PaymentRequest, SettlementPublisherRef,
};
use crate::domain::settlement::SettlementMessage;
use crate::domain::user::{Caller, UserRole};
use crate::error::{Result, WorkflowError};
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// The expense workflow state machine.
///
/// `ExpenseEngine` orchestrates submission, approval decisioning and the
/// asynchronous payment settlement. It holds no mutable state of its own:
/// every shared write goes through the store, which serializes concurrent
/// decisions on the same expense.
pub struct ExpenseEngine {
    store: ExpenseStoreRef,
    gateway: PaymentGatewayRef,
    publisher: SettlementPublisherRef,
    policy: ApprovalPolicy,
}

impl ExpenseEngine {
    pub fn new(
        store: ExpenseStoreRef,
        gateway: PaymentGatewayRef,
        publisher: SettlementPublisherRef,
        policy: ApprovalPolicy,
    ) -> Self {
        Self {
            store,
            gateway,
            publisher,
            policy,
        }
    }

    pub fn policy(&self) -> &ApprovalPolicy {
        &self.policy
    }

    /// Persists a new expense and, when the amount classifies as
    /// auto-approved, hands it to the settlement channel on a detached task.
    /// The caller never waits on the publish and never sees its failure.
    pub async fn submit_expense(
        &self,
        caller: Option<&Caller>,
        request: SubmitExpense,
    ) -> Result<ExpenseView> {
        let caller = caller.ok_or(WorkflowError::Unauthenticated)?;
        info!(user_id = caller.id, "user is submitting expense");

        let classification = self.policy.classify(request.amount);
        if !classification.valid {
            return Err(WorkflowError::Validation(format!(
                "expense amount {} is outside the allowed range",
                request.amount
            )));
        }

        let expense = self
            .store
            .create_expense(Expense {
                id: 0,
                user_id: caller.id,
                amount: Amount::new(request.amount)?,
                description: request.description,
                receipt_url: request.receipt_url,
                status: ExpenseStatus::Pending,
                auto_approved: classification.auto_approved,
                submitted_at: Utc::now(),
                processed_at: None,
            })
            .await?;

        self.write_audit(AuditLogEntry {
            expense_id: expense.id,
            new_status: ExpenseStatus::Pending,
            status_before: ExpenseStatus::Pending,
            notes: "Expense created".to_string(),
            created_at: Utc::now(),
        })
        .await;

        if classification.auto_approved {
            let publisher = Arc::clone(&self.publisher);
            let message = SettlementMessage::auto_approval(expense.id);
            tokio::spawn(async move {
                if let Err(err) = publisher.publish(&message).await {
                    warn!(
                        expense_id = message.expense_id,
                        error = %err,
                        "auto-approval settlement publish failed"
                    );
                }
            });
        }

        Ok(ExpenseView::from(&expense))
    }

    /// Paginated listing. Employees only ever see their own expenses; any
    /// `user_id` they put in the filter is overwritten with their identity.
    pub async fn list_expenses(
        &self,
        caller: Option<&Caller>,
        mut filter: ExpenseFilter,
    ) -> Result<ExpenseListView> {
        let caller = caller.ok_or(WorkflowError::Unauthenticated)?;

        if filter.page == 0 {
            filter.page = 1;
        }
        if filter.page_size == 0 {
            filter.page_size = 10;
        }
        if caller.role == UserRole::Employee {
            filter.user_id = Some(caller.id);
        }

        let (expenses, total) = self.store.list_paginated(&filter).await?;
        Ok(ExpenseListView {
            expenses: expenses.iter().map(ExpenseView::from).collect(),
            total,
            page: filter.page,
            page_size: filter.page_size,
        })
    }

    /// Fetch by id. Requires authentication but no particular role.
    pub async fn get_expense(&self, caller: Option<&Caller>, expense_id: i64) -> Result<ExpenseView> {
        caller.ok_or(WorkflowError::Unauthenticated)?;
        let expense = self.store.get_by_id(expense_id).await?;
        Ok(ExpenseView::from(&expense))
    }

    /// Queues the approval for asynchronous settlement and returns
    /// immediately. The status mutation, payment call and audit entry all
    /// happen later in `process_settlement`; publishing the message is this
    /// operation's only effect, so a publish failure is surfaced.
    pub async fn approve_expense(
        &self,
        caller: Option<&Caller>,
        expense_id: i64,
        notes: &str,
    ) -> Result<ApprovalAck> {
        let caller = self.require_approver(caller)?;

        let message = SettlementMessage::approval(expense_id, caller.id, notes);
        self.publisher.publish(&message).await?;
        info!(
            expense_id,
            approver_id = caller.id,
            "expense approval queued for settlement"
        );

        Ok(ApprovalAck {
            message: format!("Expense {expense_id} approved"),
        })
    }

    /// Rejection is synchronous: no payment is involved, so the decision is
    /// recorded in-line.
    pub async fn reject_expense(
        &self,
        caller: Option<&Caller>,
        expense_id: i64,
        notes: &str,
    ) -> Result<ApprovalAck> {
        let caller = self.require_approver(caller)?;

        let expense = self.store.get_by_id(expense_id).await?;
        self.store
            .record_approval(expense_id, caller.id, ExpenseStatus::Rejected, notes)
            .await?;

        self.write_audit(AuditLogEntry {
            expense_id,
            new_status: ExpenseStatus::Rejected,
            status_before: expense.status,
            notes: notes.to_string(),
            created_at: Utc::now(),
        })
        .await;

        Ok(ApprovalAck {
            message: format!("Expense {expense_id} successfully rejected"),
        })
    }

    /// Consumer-side settlement handler, invoked once per delivered message.
    ///
    /// Idempotent against redelivery: once the expense left the
    /// Pending/AutoApproved states the settleable guard fails with
    /// `InvalidState`, which consumers must acknowledge rather than retry.
    /// Every other failure propagates so the channel redelivers.
    pub async fn process_settlement(&self, message: &SettlementMessage) -> Result<()> {
        let expense = self.store.get_by_id(message.expense_id).await?;
        if !expense.status.is_settleable() {
            warn!(
                expense_id = expense.id,
                status = %expense.status,
                "expense is not pending"
            );
            return Err(WorkflowError::InvalidState);
        }

        let decision = message.decision().ok_or_else(|| {
            WorkflowError::Validation(format!(
                "unknown decision status code {}",
                message.status
            ))
        })?;

        let mut status_before = expense.status;
        let new_status = match decision {
            ExpenseStatus::Pending => {
                return Err(WorkflowError::Validation(
                    "pending is not a settlement decision".to_string(),
                ));
            }
            ExpenseStatus::Rejected => {
                self.store
                    .record_approval(
                        message.expense_id,
                        message.approver_id,
                        ExpenseStatus::Rejected,
                        &message.notes,
                    )
                    .await?;
                ExpenseStatus::Rejected
            }
            ExpenseStatus::Approved | ExpenseStatus::AutoApproved => {
                // Durably mark the fast path before finalizing. Safe under
                // redelivery: AutoApproved is still settleable.
                if decision == ExpenseStatus::AutoApproved
                    && expense.status == ExpenseStatus::Pending
                {
                    self.store
                        .update_status(message.expense_id, ExpenseStatus::AutoApproved)
                        .await?;
                    status_before = ExpenseStatus::AutoApproved;
                }

                self.store
                    .record_approval(
                        message.expense_id,
                        message.approver_id,
                        ExpenseStatus::Approved,
                        &message.notes,
                    )
                    .await?;

                let receipt = self
                    .gateway
                    .process_payment(PaymentRequest {
                        amount: expense.amount,
                        idempotency_key: Uuid::new_v4().to_string(),
                    })
                    .await?;
                info!(
                    expense_id = expense.id,
                    transaction_id = %receipt.transaction_id,
                    status = %receipt.status,
                    "payment processed"
                );
                ExpenseStatus::Approved
            }
        };

        self.write_audit(AuditLogEntry {
            expense_id: message.expense_id,
            new_status,
            status_before,
            notes: message.notes.clone(),
            created_at: Utc::now(),
        })
        .await;

        Ok(())
    }

    pub async fn health_check(&self) -> Result<()> {
        self.store.ping().await
    }

    fn require_approver<'c>(&self, caller: Option<&'c Caller>) -> Result<&'c Caller> {
        let caller = caller.ok_or(WorkflowError::Unauthenticated)?;
        if !self.policy.can_approve(caller.role) {
            warn!(user_id = caller.id, role = %caller.role, "user is not a manager");
            return Err(WorkflowError::Forbidden);
        }
        Ok(caller)
    }

    /// The audit trail is best-effort relative to the primary operation:
    /// a failed write is logged, never surfaced to the caller.
    async fn write_audit(&self, entry: AuditLogEntry) {
        if let Err(err) = self.store.write_audit_log(entry).await {
            warn!(error = %err, "failed to write audit log");
        }
    }
}
