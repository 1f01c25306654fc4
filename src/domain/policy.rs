use super::user::UserRole;
use rust_decimal::Decimal;

/// Outcome of classifying a submitted amount against the approval policy.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Classification {
    pub valid: bool,
    pub auto_approved: bool,
}

/// Amount bounds and approver eligibility.
///
/// These are deployment configuration, not business logic baked into the
/// engine; the defaults mirror the production values (IDR).
#[derive(Debug, Clone, PartialEq)]
pub struct ApprovalPolicy {
    pub min_amount: Decimal,
    pub max_amount: Decimal,
    /// Amounts strictly below this skip manager review.
    pub auto_approve_below: Decimal,
    /// Whether admins may approve/reject in addition to managers.
    pub admins_can_approve: bool,
}

impl Default for ApprovalPolicy {
    fn default() -> Self {
        Self {
            min_amount: Decimal::from(10_000),
            max_amount: Decimal::from(50_000_000),
            auto_approve_below: Decimal::from(1_000_000),
            admins_can_approve: false,
        }
    }
}

impl ApprovalPolicy {
    pub fn classify(&self, amount: Decimal) -> Classification {
        Classification {
            valid: amount >= self.min_amount && amount <= self.max_amount,
            auto_approved: amount < self.auto_approve_below,
        }
    }

    pub fn can_approve(&self, role: UserRole) -> bool {
        match role {
            UserRole::Manager => true,
            UserRole::Admin => self.admins_can_approve,
            UserRole::Employee => false,
        }
    }
}
