#![allow(dead_code)]

use async_trait::async_trait;
use expenseflow::application::engine::ExpenseEngine;
use expenseflow::application::views::SubmitExpense;
use expenseflow::domain::expense::{AuditLogEntry, Expense, ExpenseApproval, ExpenseStatus};
use expenseflow::domain::policy::ApprovalPolicy;
use expenseflow::domain::ports::{ExpenseFilter, ExpenseStore};
use expenseflow::domain::user::{Caller, UserRole};
use expenseflow::error::{Result, WorkflowError};
use expenseflow::infrastructure::channel::{SettlementConsumer, settlement_channel};
use expenseflow::infrastructure::gateway::RecordingGateway;
use expenseflow::infrastructure::in_memory::InMemoryExpenseStore;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

pub struct TestHarness {
    pub engine: Arc<ExpenseEngine>,
    pub store: Arc<InMemoryExpenseStore>,
    pub faults: Arc<FaultInjectingStore>,
    pub gateway: Arc<RecordingGateway>,
    pub consumer: SettlementConsumer,
}

pub fn harness() -> TestHarness {
    harness_with(ApprovalPolicy::default(), 5)
}

pub fn harness_with(policy: ApprovalPolicy, max_redeliveries: u32) -> TestHarness {
    let store = Arc::new(InMemoryExpenseStore::new());
    let faults = Arc::new(FaultInjectingStore::new(store.clone()));
    let gateway = Arc::new(RecordingGateway::new());
    let (publisher, consumer) = settlement_channel(max_redeliveries);
    let engine = Arc::new(ExpenseEngine::new(
        faults.clone(),
        gateway.clone(),
        Arc::new(publisher),
        policy,
    ));
    TestHarness {
        engine,
        store,
        faults,
        gateway,
        consumer,
    }
}

pub fn employee(id: i64) -> Caller {
    Caller::new(id, format!("employee{id}@example.com"), UserRole::Employee)
}

pub fn manager(id: i64) -> Caller {
    Caller::new(id, format!("manager{id}@example.com"), UserRole::Manager)
}

pub fn admin(id: i64) -> Caller {
    Caller::new(id, format!("admin{id}@example.com"), UserRole::Admin)
}

pub fn submission(amount: Decimal) -> SubmitExpense {
    SubmitExpense {
        amount,
        description: "Test Expense".to_string(),
        receipt_url: Some("https://example.com/receipt.jpg".to_string()),
    }
}

/// Store wrapper with switchable failures, so error paths of the engine can
/// be driven against otherwise-real storage.
pub struct FaultInjectingStore {
    inner: Arc<InMemoryExpenseStore>,
    fail_gets: AtomicU32,
    fail_audit: AtomicBool,
}

impl FaultInjectingStore {
    pub fn new(inner: Arc<InMemoryExpenseStore>) -> Self {
        Self {
            inner,
            fail_gets: AtomicU32::new(0),
            fail_audit: AtomicBool::new(false),
        }
    }

    /// The next `n` calls to `get_by_id` fail with a storage error.
    pub fn fail_next_gets(&self, n: u32) {
        self.fail_gets.store(n, Ordering::SeqCst);
    }

    /// All audit-log writes fail until reset.
    pub fn fail_audit(&self, on: bool) {
        self.fail_audit.store(on, Ordering::SeqCst);
    }
}

#[async_trait]
impl ExpenseStore for FaultInjectingStore {
    async fn create_expense(&self, expense: Expense) -> Result<Expense> {
        self.inner.create_expense(expense).await
    }

    async fn record_approval(
        &self,
        expense_id: i64,
        approver_id: i64,
        status: ExpenseStatus,
        notes: &str,
    ) -> Result<()> {
        self.inner
            .record_approval(expense_id, approver_id, status, notes)
            .await
    }

    async fn update_status(&self, expense_id: i64, status: ExpenseStatus) -> Result<()> {
        self.inner.update_status(expense_id, status).await
    }

    async fn get_by_id(&self, expense_id: i64) -> Result<Expense> {
        let pending = self.fail_gets.load(Ordering::SeqCst);
        if pending > 0
            && self
                .fail_gets
                .compare_exchange(pending, pending - 1, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
        {
            return Err(WorkflowError::Store("database connection failed".to_string()));
        }
        self.inner.get_by_id(expense_id).await
    }

    async fn list_paginated(&self, filter: &ExpenseFilter) -> Result<(Vec<Expense>, u64)> {
        self.inner.list_paginated(filter).await
    }

    async fn write_audit_log(&self, entry: AuditLogEntry) -> Result<()> {
        if self.fail_audit.load(Ordering::SeqCst) {
            return Err(WorkflowError::Store("audit log failed".to_string()));
        }
        self.inner.write_audit_log(entry).await
    }

    async fn audit_trail(&self, expense_id: i64) -> Result<Vec<AuditLogEntry>> {
        self.inner.audit_trail(expense_id).await
    }

    async fn approvals(&self, expense_id: i64) -> Result<Vec<ExpenseApproval>> {
        self.inner.approvals(expense_id).await
    }

    async fn ping(&self) -> Result<()> {
        self.inner.ping().await
    }
}
