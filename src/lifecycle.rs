//! Loan applications and their review workflow.
//!
//! ```text
//! pending  --verify  (verifier)--> verified
//! pending  --reject  (verifier)--> rejected
//! verified --approve (admin)-----> approved
//! verified --reject  (admin)-----> rejected
//! ```

use chrono::{DateTime, Utc};
use hourglass_rs::SafeTimeProvider;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::Permissions;
use crate::decimal::Money;
use crate::errors::{DeskError, Result};
use crate::events::{Event, EventStore};
use crate::identity::Identity;
use crate::types::{IdentityId, LoanAction, LoanId, LoanStatus, LoanType};

/// a submitted loan application
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanApplication {
    pub id: LoanId,
    // applicant fields are copied at submission and never follow later edits
    pub applicant_id: IdentityId,
    pub applicant_name: String,
    pub applicant_email: String,
    pub applicant_avatar: String,
    pub amount: Money,
    pub status: LoanStatus,
    pub purpose: String,
    pub loan_type: LoanType,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// what a borrower fills in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanRequest {
    pub amount: Money,
    pub purpose: String,
    #[serde(default)]
    pub loan_type: LoanType,
    #[serde(default)]
    pub description: String,
}

impl LoanRequest {
    pub fn new(amount: Money, purpose: impl Into<String>) -> Self {
        Self {
            amount,
            purpose: purpose.into(),
            loan_type: LoanType::default(),
            description: String::new(),
        }
    }

    pub fn loan_type(mut self, loan_type: LoanType) -> Self {
        self.loan_type = loan_type;
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    fn validate(&self) -> Result<()> {
        if !self.amount.is_positive() {
            return Err(DeskError::validation(format!(
                "amount must be greater than zero, got {}",
                self.amount
            )));
        }
        if self.purpose.trim().is_empty() {
            return Err(DeskError::validation("purpose must not be empty"));
        }
        Ok(())
    }
}

/// loan table filter; empty filter matches everything
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoanFilter {
    pub status: Option<LoanStatus>,
    pub search: Option<String>,
    pub applicant_id: Option<IdentityId>,
}

impl LoanFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(mut self, status: LoanStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// case-insensitive substring over purpose and applicant name
    pub fn search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    pub fn applicant(mut self, id: IdentityId) -> Self {
        self.applicant_id = Some(id);
        self
    }

    pub fn matches(&self, loan: &LoanApplication) -> bool {
        if self.status.is_some_and(|status| loan.status != status) {
            return false;
        }
        if self.applicant_id.is_some_and(|id| loan.applicant_id != id) {
            return false;
        }
        match self.search.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(term) => {
                let term = term.to_lowercase();
                loan.purpose.to_lowercase().contains(&term)
                    || loan.applicant_name.to_lowercase().contains(&term)
            }
        }
    }
}

/// one page of a larger result, pages numbered from 1
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub per_page: usize,
    pub total_items: usize,
    pub total_pages: usize,
}

impl<T> Page<T> {
    /// slice `items` to page `page`; out-of-range pages clamp to the last one
    pub fn of(items: Vec<T>, page: usize, per_page: usize) -> Self {
        let per_page = per_page.max(1);
        let total_items = items.len();
        let total_pages = total_items.div_ceil(per_page);
        let page = page.clamp(1, total_pages.max(1));

        let start = (page - 1) * per_page;
        let items: Vec<T> = items.into_iter().skip(start).take(per_page).collect();

        Self {
            items,
            page,
            per_page,
            total_items,
            total_pages,
        }
    }

    /// 1-based position of the first item, 0 when empty ("showing 8 to 14 of 20")
    pub fn first_index(&self) -> usize {
        if self.items.is_empty() {
            0
        } else {
            (self.page - 1) * self.per_page + 1
        }
    }

    pub fn last_index(&self) -> usize {
        (self.page * self.per_page).min(self.total_items)
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }
}

/// the loan collection, newest first
#[derive(Debug, Default)]
pub struct LoanBook {
    loans: Vec<LoanApplication>,
    default_avatar: String,
    pub events: EventStore,
}

impl LoanBook {
    pub fn new(default_avatar: impl Into<String>) -> Self {
        Self {
            loans: Vec::new(),
            default_avatar: default_avatar.into(),
            events: EventStore::new(),
        }
    }

    /// submit an application on behalf of `applicant`
    pub fn apply(
        &mut self,
        applicant: &Identity,
        request: LoanRequest,
        time_provider: &SafeTimeProvider,
    ) -> Result<LoanApplication> {
        if let Err(e) = request.validate() {
            tracing::warn!(applicant_id = %applicant.id, error = %e, "rejected loan application");
            return Err(e);
        }

        let now = time_provider.now();
        let loan = LoanApplication {
            id: Uuid::new_v4(),
            applicant_id: applicant.id,
            applicant_name: applicant.display_name.clone(),
            applicant_email: applicant.email.clone(),
            applicant_avatar: applicant
                .avatar_url
                .clone()
                .unwrap_or_else(|| self.default_avatar.clone()),
            amount: request.amount,
            status: LoanStatus::Pending,
            purpose: request.purpose.trim().to_string(),
            loan_type: request.loan_type,
            description: request.description,
            created_at: now,
            updated_at: now,
        };

        self.loans.insert(0, loan.clone());
        self.events.emit(Event::LoanApplied {
            loan_id: loan.id,
            applicant_id: applicant.id,
            amount: loan.amount,
            timestamp: now,
        });
        tracing::info!(loan_id = %loan.id, applicant_id = %applicant.id, amount = %loan.amount, "loan applied");

        Ok(loan)
    }

    /// pending -> verified, verifier or above
    pub fn verify<P: Permissions>(
        &mut self,
        actor: &P,
        loan_id: LoanId,
        time_provider: &SafeTimeProvider,
    ) -> Result<LoanApplication> {
        self.transition(actor, loan_id, LoanAction::Verify, time_provider)
    }

    /// pending -> rejected (verifier or above), verified -> rejected (admin)
    pub fn reject<P: Permissions>(
        &mut self,
        actor: &P,
        loan_id: LoanId,
        time_provider: &SafeTimeProvider,
    ) -> Result<LoanApplication> {
        self.transition(actor, loan_id, LoanAction::Reject, time_provider)
    }

    /// verified -> approved, admin only
    pub fn approve<P: Permissions>(
        &mut self,
        actor: &P,
        loan_id: LoanId,
        time_provider: &SafeTimeProvider,
    ) -> Result<LoanApplication> {
        self.transition(actor, loan_id, LoanAction::Approve, time_provider)
    }

    /// state is checked before role, so terminal loans always report
    /// `InvalidTransition` whoever asks
    fn transition<P: Permissions>(
        &mut self,
        actor: &P,
        loan_id: LoanId,
        action: LoanAction,
        time_provider: &SafeTimeProvider,
    ) -> Result<LoanApplication> {
        let idx = self
            .position(loan_id)
            .ok_or_else(|| DeskError::loan_not_found(loan_id))?;
        let from = self.loans[idx].status;

        let Some((to, required)) = from.transition(action) else {
            tracing::warn!(%loan_id, %action, status = %from, "invalid loan transition");
            return Err(DeskError::InvalidTransition { from, action });
        };

        let actor_id = match actor.require_role(required) {
            Ok(identity) => identity.id,
            Err(e) => {
                tracing::warn!(%loan_id, %action, %required, "loan transition forbidden");
                return Err(e);
            }
        };

        let now = time_provider.now();
        let loan = &mut self.loans[idx];
        loan.status = to;
        loan.updated_at = now;
        let updated = loan.clone();

        self.events.emit(Event::LoanStatusChanged {
            loan_id,
            action,
            old_status: from,
            new_status: to,
            actor_id,
            timestamp: now,
        });
        tracing::info!(%loan_id, %action, from = %from, to = %to, %actor_id, "loan status changed");

        Ok(updated)
    }

    pub fn get(&self, loan_id: LoanId) -> Option<&LoanApplication> {
        self.loans.iter().find(|loan| loan.id == loan_id)
    }

    /// every loan, newest first
    pub fn all(&self) -> &[LoanApplication] {
        &self.loans
    }

    pub fn list_loans(&self, filter: &LoanFilter) -> Vec<&LoanApplication> {
        self.loans.iter().filter(|loan| filter.matches(loan)).collect()
    }

    pub fn paginate(&self, filter: &LoanFilter, page: usize, per_page: usize) -> Page<&LoanApplication> {
        Page::of(self.list_loans(filter), page, per_page)
    }

    /// newest `n` loans
    pub fn recent(&self, n: usize) -> &[LoanApplication] {
        &self.loans[..n.min(self.loans.len())]
    }

    pub fn count(&self, status: LoanStatus) -> usize {
        self.loans.iter().filter(|loan| loan.status == status).count()
    }

    pub fn len(&self) -> usize {
        self.loans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loans.is_empty()
    }

    fn position(&self, loan_id: LoanId) -> Option<usize> {
        self.loans.iter().position(|loan| loan.id == loan_id)
    }
}
