/// serializable projections for display
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::identity::Identity;
use crate::lifecycle::LoanApplication;
use crate::types::{IdentityId, LoanId, LoanStatus, LoanType, Role};

/// one row of the loan table
#[derive(Debug, Serialize, Deserialize)]
pub struct LoanView {
    pub id: LoanId,
    pub applicant: ApplicantView,
    pub amount: Money,
    pub amount_display: String,
    pub status: LoanStatus,
    pub purpose: String,
    pub loan_type: LoanType,
    pub description: String,
    /// e.g. "Mar 05, 2024"
    pub date_applied: String,
    /// e.g. "2:30 PM"
    pub time_applied: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_terminal: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApplicantView {
    pub id: IdentityId,
    pub name: String,
    pub email: String,
    pub avatar: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IdentityView {
    pub id: IdentityId,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub avatar_url: Option<String>,
    /// false for the session identity itself and for the last admin
    pub can_delete: bool,
}

impl LoanView {
    pub fn from_loan(loan: &LoanApplication) -> Self {
        LoanView {
            id: loan.id,
            applicant: ApplicantView {
                id: loan.applicant_id,
                name: loan.applicant_name.clone(),
                email: loan.applicant_email.clone(),
                avatar: loan.applicant_avatar.clone(),
            },
            amount: loan.amount,
            amount_display: loan.amount.to_grouped_string(),
            status: loan.status,
            purpose: loan.purpose.clone(),
            loan_type: loan.loan_type,
            description: loan.description.clone(),
            date_applied: loan.created_at.format("%b %d, %Y").to_string(),
            time_applied: loan.created_at.format("%-I:%M %p").to_string(),
            created_at: loan.created_at,
            updated_at: loan.updated_at,
            is_terminal: loan.status.is_terminal(),
        }
    }

    /// convert to pretty-printed json string
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl IdentityView {
    /// `all` is the full directory, used for the last-admin check
    pub fn from_identity(identity: &Identity, session: Option<&Identity>, all: &[Identity]) -> Self {
        let is_self = session.is_some_and(|s| s.id == identity.id);
        let last_admin =
            identity.role == Role::Admin && all.iter().filter(|i| i.role == Role::Admin).count() <= 1;

        IdentityView {
            id: identity.id,
            name: identity.display_name.clone(),
            email: identity.email.clone(),
            role: identity.role,
            avatar_url: identity.avatar_url.clone(),
            can_delete: !is_self && !last_admin,
        }
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
