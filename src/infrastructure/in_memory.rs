use crate::domain::expense::{AuditLogEntry, Expense, ExpenseApproval, ExpenseStatus};
use crate::domain::ports::{ExpenseFilter, ExpenseStore};
use crate::error::{Result, WorkflowError};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct StoreInner {
    expenses: HashMap<i64, Expense>,
    approvals: Vec<ExpenseApproval>,
    audit_log: Vec<AuditLogEntry>,
    next_id: i64,
}

/// A thread-safe in-memory expense store.
///
/// All records live behind one `RwLock` so that `record_approval`'s two
/// writes (status update + approval row) are atomic and concurrent
/// decisions on the same expense serialize on the lock. Ideal for tests
/// and the batch runner where persistence is not required.
#[derive(Default, Clone)]
pub struct InMemoryExpenseStore {
    inner: Arc<RwLock<StoreInner>>,
}

impl InMemoryExpenseStore {
    /// Creates a new, empty in-memory expense store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ExpenseStore for InMemoryExpenseStore {
    async fn create_expense(&self, mut expense: Expense) -> Result<Expense> {
        let mut inner = self.inner.write().await;
        inner.next_id += 1;
        expense.id = inner.next_id;
        expense.submitted_at = Utc::now();
        inner.expenses.insert(expense.id, expense.clone());
        Ok(expense)
    }

    async fn record_approval(
        &self,
        expense_id: i64,
        approver_id: i64,
        status: ExpenseStatus,
        notes: &str,
    ) -> Result<()> {
        let mut inner = self.inner.write().await;
        let expense = inner
            .expenses
            .get_mut(&expense_id)
            .ok_or(WorkflowError::NotFound)?;
        expense.transition(status, Utc::now())?;
        inner.approvals.push(ExpenseApproval {
            expense_id,
            approver_id,
            status,
            notes: notes.to_string(),
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn update_status(&self, expense_id: i64, status: ExpenseStatus) -> Result<()> {
        let mut inner = self.inner.write().await;
        let expense = inner
            .expenses
            .get_mut(&expense_id)
            .ok_or(WorkflowError::NotFound)?;
        expense.transition(status, Utc::now())
    }

    async fn get_by_id(&self, expense_id: i64) -> Result<Expense> {
        let inner = self.inner.read().await;
        inner
            .expenses
            .get(&expense_id)
            .cloned()
            .ok_or(WorkflowError::NotFound)
    }

    async fn list_paginated(&self, filter: &ExpenseFilter) -> Result<(Vec<Expense>, u64)> {
        let inner = self.inner.read().await;
        let mut matching: Vec<Expense> = inner
            .expenses
            .values()
            .filter(|e| filter.user_id.is_none_or(|user_id| e.user_id == user_id))
            .filter(|e| filter.status.is_none_or(|status| e.status == status))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.id.cmp(&a.id));

        let total = matching.len() as u64;
        let page = filter.page.max(1) as usize;
        let page_size = filter.page_size.max(1) as usize;
        let start = (page - 1) * page_size;
        let items = if start >= matching.len() {
            Vec::new()
        } else {
            matching[start..(start + page_size).min(matching.len())].to_vec()
        };
        Ok((items, total))
    }

    async fn write_audit_log(&self, entry: AuditLogEntry) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.audit_log.push(entry);
        Ok(())
    }

    async fn audit_trail(&self, expense_id: i64) -> Result<Vec<AuditLogEntry>> {
        let inner = self.inner.read().await;
        Ok(inner
            .audit_log
            .iter()
            .filter(|e| e.expense_id == expense_id)
            .cloned()
            .collect())
    }

    async fn approvals(&self, expense_id: i64) -> Result<Vec<ExpenseApproval>> {
        let inner = self.inner.read().await;
        Ok(inner
            .approvals
            .iter()
            .filter(|a| a.expense_id == expense_id)
            .cloned()
            .collect())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
