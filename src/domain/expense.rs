use crate::error::WorkflowError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Represents a positive monetary amount for an expense.
///
/// This is a wrapper around `rust_decimal::Decimal` to enforce domain-specific
/// rules and provide type safety for financial values.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self, WorkflowError> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(WorkflowError::Validation(
                "Amount must be positive".to_string(),
            ))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = WorkflowError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl std::fmt::Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Lifecycle status of an expense.
///
/// The integer codes are the wire/storage encoding and are kept stable:
/// they appear in settlement messages and in persisted records.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseStatus {
    Pending,
    AutoApproved,
    Approved,
    Rejected,
}

impl ExpenseStatus {
    pub fn code(&self) -> i32 {
        match self {
            ExpenseStatus::Pending => 3,
            ExpenseStatus::AutoApproved => 2,
            ExpenseStatus::Approved => 1,
            ExpenseStatus::Rejected => -1,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            3 => Some(ExpenseStatus::Pending),
            2 => Some(ExpenseStatus::AutoApproved),
            1 => Some(ExpenseStatus::Approved),
            -1 => Some(ExpenseStatus::Rejected),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExpenseStatus::Pending => "pending",
            ExpenseStatus::AutoApproved => "auto_approved",
            ExpenseStatus::Approved => "approved",
            ExpenseStatus::Rejected => "rejected",
        }
    }

    /// Renders an arbitrary wire code for display and logging. Total over
    /// all integers; codes outside the known set render as "Unknown".
    pub fn label_for(code: i32) -> &'static str {
        match Self::from_code(code) {
            Some(status) => status.as_str(),
            None => "Unknown",
        }
    }

    /// Approved and Rejected are terminal; no transition leads out of them.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExpenseStatus::Approved | ExpenseStatus::Rejected)
    }

    /// An expense can only be settled while Pending or AutoApproved.
    pub fn is_settleable(&self) -> bool {
        matches!(self, ExpenseStatus::Pending | ExpenseStatus::AutoApproved)
    }
}

impl std::fmt::Display for ExpenseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A submitted expense. Mutated only by the workflow engine through the
/// store's approval/rejection/settlement operations; never deleted.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Expense {
    pub id: i64,
    pub user_id: i64,
    pub amount: Amount,
    pub description: String,
    pub receipt_url: Option<String>,
    pub status: ExpenseStatus,
    /// Classification flag set at submission time; records *how* the expense
    /// became eligible for settlement, independent of the status field.
    pub auto_approved: bool,
    pub submitted_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl Expense {
    /// Applies a status transition. Transitions are one-directional:
    /// leaving a terminal state is refused with `InvalidState`, and the
    /// first terminal transition stamps `processed_at`.
    pub fn transition(
        &mut self,
        status: ExpenseStatus,
        now: DateTime<Utc>,
    ) -> Result<(), WorkflowError> {
        if self.status.is_terminal() {
            return Err(WorkflowError::InvalidState);
        }
        self.status = status;
        if status.is_terminal() {
            self.processed_at = Some(now);
        }
        Ok(())
    }
}

/// A single approval/rejection decision. Immutable after creation; an
/// `approver_id` of zero marks an auto-approval.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct ExpenseApproval {
    pub expense_id: i64,
    pub approver_id: i64,
    pub status: ExpenseStatus,
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

/// Append-only record of one status-affecting operation.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct AuditLogEntry {
    pub expense_id: i64,
    pub new_status: ExpenseStatus,
    pub status_before: ExpenseStatus,
    pub notes: String,
    pub created_at: DateTime<Utc>,
}
