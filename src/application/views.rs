use crate::domain::expense::Expense;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A new expense submission, as received from the transport layer.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct SubmitExpense {
    pub amount: Decimal,
    pub description: String,
    pub receipt_url: Option<String>,
}

/// Outward projection of an expense. The status is rendered as its display
/// string and the `auto_approved` flag is always present.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct ExpenseView {
    pub id: i64,
    pub user_id: i64,
    pub amount: Decimal,
    pub description: String,
    pub receipt_url: Option<String>,
    pub status: String,
    pub auto_approved: bool,
}

impl From<&Expense> for ExpenseView {
    fn from(expense: &Expense) -> Self {
        Self {
            id: expense.id,
            user_id: expense.user_id,
            amount: expense.amount.value(),
            description: expense.description.clone(),
            receipt_url: expense.receipt_url.clone(),
            status: expense.status.as_str().to_string(),
            auto_approved: expense.auto_approved,
        }
    }
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct ExpenseListView {
    pub expenses: Vec<ExpenseView>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
}

/// Acknowledgement returned by the approval/rejection operations.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct ApprovalAck {
    pub message: String,
}
