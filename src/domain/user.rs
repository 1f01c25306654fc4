use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Manager,
    Employee,
}

impl UserRole {
    pub fn code(&self) -> i32 {
        match self {
            UserRole::Admin => 1,
            UserRole::Manager => 2,
            UserRole::Employee => 3,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(UserRole::Admin),
            2 => Some(UserRole::Manager),
            3 => Some(UserRole::Employee),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::Manager => "manager",
            UserRole::Employee => "employee",
        }
    }

    /// Display/logging helper, total over all integers; unknown codes
    /// render as "Unknown".
    pub fn label_for(code: i32) -> &'static str {
        match Self::from_code(code) {
            Some(role) => role.as_str(),
            None => "Unknown",
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The authenticated identity attached to a request.
///
/// Token validation happens in an outer layer; the engine only ever sees
/// this already-verified value, threaded explicitly through every operation
/// instead of being fished out of an ambient context.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Caller {
    pub id: i64,
    pub email: String,
    pub role: UserRole,
}

impl Caller {
    pub fn new(id: i64, email: impl Into<String>, role: UserRole) -> Self {
        Self {
            id,
            email: email.into(),
            role,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_codes_round_trip() {
        for role in [UserRole::Admin, UserRole::Manager, UserRole::Employee] {
            assert_eq!(UserRole::from_code(role.code()), Some(role));
        }
        assert_eq!(UserRole::from_code(0), None);
    }

    #[test]
    fn test_role_labels() {
        assert_eq!(UserRole::label_for(1), "admin");
        assert_eq!(UserRole::label_for(2), "manager");
        assert_eq!(UserRole::label_for(3), "employee");
        assert_eq!(UserRole::label_for(7), "Unknown");
    }
}
