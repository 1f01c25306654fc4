use super::expense::ExpenseStatus;
use serde::{Deserialize, Serialize};

/// Payload carried over the settlement channel.
///
/// This is the one wire contract the core owns: a JSON object with integer
/// `expense_id` and `approver_id`, free-text `notes`, and the integer
/// `status` code of the decision. An `approver_id` of zero marks an
/// auto-approval.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct SettlementMessage {
    pub expense_id: i64,
    pub approver_id: i64,
    pub notes: String,
    pub status: i32,
}

impl SettlementMessage {
    /// Message published when a manager approves an expense.
    pub fn approval(expense_id: i64, approver_id: i64, notes: impl Into<String>) -> Self {
        Self {
            expense_id,
            approver_id,
            notes: notes.into(),
            status: ExpenseStatus::Approved.code(),
        }
    }

    /// Message published on the auto-approval fast path at submission.
    pub fn auto_approval(expense_id: i64) -> Self {
        Self {
            expense_id,
            approver_id: 0,
            notes: "Auto Approved".to_string(),
            status: ExpenseStatus::AutoApproved.code(),
        }
    }

    /// The decision carried by this message, if its code is known.
    pub fn decision(&self) -> Option<ExpenseStatus> {
        ExpenseStatus::from_code(self.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_shape_is_stable() {
        let msg = SettlementMessage::approval(123, 2, "Approved by manager");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "expense_id": 123,
                "approver_id": 2,
                "notes": "Approved by manager",
                "status": 1,
            })
        );
    }

    #[test]
    fn test_auto_approval_shape() {
        let msg = SettlementMessage::auto_approval(7);
        assert_eq!(msg.approver_id, 0);
        assert_eq!(msg.notes, "Auto Approved");
        assert_eq!(msg.status, 2);
        assert_eq!(msg.decision(), Some(ExpenseStatus::AutoApproved));
    }

    #[test]
    fn test_round_trip_through_json() {
        let msg = SettlementMessage::approval(9, 4, "ok");
        let bytes = serde_json::to_vec(&msg).unwrap();
        let back: SettlementMessage = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(back, msg);
    }

    #[test]
    fn test_unknown_decision_code() {
        let msg = SettlementMessage {
            expense_id: 1,
            approver_id: 1,
            notes: String::new(),
            status: 42,
        };
        assert_eq!(msg.decision(), None);
    }
}
