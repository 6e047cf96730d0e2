use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// unique identifier for an identity
pub type IdentityId = Uuid;

/// unique identifier for a loan application
pub type LoanId = Uuid;

/// access role, ordered by privilege: borrower < verifier < admin
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Borrower,
    Verifier,
    Admin,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Admin, Role::Verifier, Role::Borrower];

    /// whether holding `self` is enough for something that requires `required`
    pub fn satisfies(self, required: Role) -> bool {
        self >= required
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Verifier => "verifier",
            Role::Borrower => "borrower",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "verifier" => Ok(Role::Verifier),
            "borrower" => Ok(Role::Borrower),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// loan application status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    /// submitted, waiting for a verifier
    Pending,
    /// screened by a verifier, waiting for an admin decision
    Verified,
    /// turned down (terminal)
    Rejected,
    /// accepted (terminal)
    Approved,
}

impl LoanStatus {
    pub const ALL: [LoanStatus; 4] = [
        LoanStatus::Pending,
        LoanStatus::Verified,
        LoanStatus::Rejected,
        LoanStatus::Approved,
    ];

    pub fn is_terminal(&self) -> bool {
        matches!(self, LoanStatus::Rejected | LoanStatus::Approved)
    }

    /// target status and minimum role for `action` taken from this status,
    /// `None` when the action is not allowed here
    pub fn transition(self, action: LoanAction) -> Option<(LoanStatus, Role)> {
        match (self, action) {
            (LoanStatus::Pending, LoanAction::Verify) => Some((LoanStatus::Verified, Role::Verifier)),
            (LoanStatus::Pending, LoanAction::Reject) => Some((LoanStatus::Rejected, Role::Verifier)),
            (LoanStatus::Verified, LoanAction::Approve) => Some((LoanStatus::Approved, Role::Admin)),
            (LoanStatus::Verified, LoanAction::Reject) => Some((LoanStatus::Rejected, Role::Admin)),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LoanStatus::Pending => "pending",
            LoanStatus::Verified => "verified",
            LoanStatus::Rejected => "rejected",
            LoanStatus::Approved => "approved",
        }
    }
}

impl fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// review actions a caller can take on a loan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoanAction {
    Verify,
    Reject,
    Approve,
}

impl fmt::Display for LoanAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LoanAction::Verify => "verify",
            LoanAction::Reject => "reject",
            LoanAction::Approve => "approve",
        };
        f.pad(s)
    }
}

/// loan product category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum LoanType {
    #[default]
    #[serde(rename = "Debt Net")]
    DebtNet,
    #[serde(rename = "Credit Net")]
    CreditNet,
    #[serde(rename = "Fully Paid")]
    FullyPaid,
    Other,
}

impl LoanType {
    pub fn label(&self) -> &'static str {
        match self {
            LoanType::DebtNet => "Debt Net",
            LoanType::CreditNet => "Credit Net",
            LoanType::FullyPaid => "Fully Paid",
            LoanType::Other => "Other",
        }
    }
}

impl fmt::Display for LoanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}
