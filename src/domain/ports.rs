use super::expense::{Amount, AuditLogEntry, Expense, ExpenseApproval, ExpenseStatus};
use super::settlement::SettlementMessage;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Filter for paginated expense listings. `page` and `page_size` are
/// 1-based; the engine supplies defaults and clamps non-positive values
/// before the store ever sees them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpenseFilter {
    pub page: u32,
    pub page_size: u32,
    pub user_id: Option<i64>,
    pub status: Option<ExpenseStatus>,
}

/// Durable record of expenses, approvals and the audit trail.
///
/// Implementations must make `record_approval` atomic: the status update
/// and the approval row become visible together or not at all, and
/// concurrent decisions on the same expense serialize here. The store is
/// the engine's only synchronization point.
#[async_trait]
pub trait ExpenseStore: Send + Sync {
    /// Assigns an id, stamps the submission time and persists the expense.
    async fn create_expense(&self, expense: Expense) -> Result<Expense>;

    /// Atomically updates the expense status and inserts the decision
    /// record. Fails with `InvalidState` when the expense is already in a
    /// terminal state; that guard is what makes redelivered settlements
    /// idempotent.
    async fn record_approval(
        &self,
        expense_id: i64,
        approver_id: i64,
        status: ExpenseStatus,
        notes: &str,
    ) -> Result<()>;

    /// Single-field status transition, subject to the same terminal-state
    /// guard as `record_approval`.
    async fn update_status(&self, expense_id: i64, status: ExpenseStatus) -> Result<()>;

    async fn get_by_id(&self, expense_id: i64) -> Result<Expense>;

    /// Returns the matching page (ordered by id descending) and the total
    /// number of matching expenses.
    async fn list_paginated(&self, filter: &ExpenseFilter) -> Result<(Vec<Expense>, u64)>;

    /// Append-only; the engine logs failures here without surfacing them.
    async fn write_audit_log(&self, entry: AuditLogEntry) -> Result<()>;

    async fn audit_trail(&self, expense_id: i64) -> Result<Vec<AuditLogEntry>>;

    async fn approvals(&self, expense_id: i64) -> Result<Vec<ExpenseApproval>>;

    /// Liveness probe for health reporting.
    async fn ping(&self) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaymentRequest {
    pub amount: Amount,
    /// Fresh per attempt; the gateway guarantees at most one financial
    /// effect per key.
    pub idempotency_key: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaymentReceipt {
    pub transaction_id: String,
    pub idempotency_key: String,
    pub status: String,
}

/// Synchronous call into the external payment processor.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn process_payment(&self, request: PaymentRequest) -> Result<PaymentReceipt>;
}

/// Publish half of the settlement channel. Durable, at-least-once delivery
/// to the consumer side is the transport's concern; the engine only hands
/// over the message.
#[async_trait]
pub trait SettlementPublisher: Send + Sync {
    async fn publish(&self, message: &SettlementMessage) -> Result<()>;
}

pub type ExpenseStoreRef = Arc<dyn ExpenseStore>;
pub type PaymentGatewayRef = Arc<dyn PaymentGateway>;
pub type SettlementPublisherRef = Arc<dyn SettlementPublisher>;
