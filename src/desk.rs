use std::sync::Arc;

use hourglass_rs::{SafeTimeProvider, TimeSource};

use crate::auth::{IdentityService, Permissions};
use crate::config::DeskConfig;
use crate::dashboard::{ChartPoint, DashboardStats, SeriesMetric};
use crate::errors::{DeskError, Result};
use crate::events::{Event, EventStore};
use crate::identity::{Identity, IdentityUpdate, NewIdentity};
use crate::lifecycle::{LoanApplication, LoanBook, LoanFilter, LoanRequest, Page};
use crate::store::KeyValueStore;
use crate::types::{IdentityId, LoanId, Role};
use crate::views::{IdentityView, LoanView};

/// the application context: config, both services, clock and change log
pub struct LoanDesk<S: KeyValueStore> {
    pub config: DeskConfig,
    identities: IdentityService<S>,
    loans: LoanBook,
    time: Arc<SafeTimeProvider>,
    events: EventStore,
}

impl<S: KeyValueStore> LoanDesk<S> {
    /// open against `store` with the system clock
    pub fn open(store: S, config: DeskConfig) -> Result<Self> {
        Self::open_with_time(store, config, Arc::new(SafeTimeProvider::new(TimeSource::System)))
    }

    /// open with a shared clock; keep a handle to drive test time from outside
    pub fn open_with_time(store: S, config: DeskConfig, time: Arc<SafeTimeProvider>) -> Result<Self> {
        config.validate()?;
        let identities = IdentityService::load(store, &config)?;
        let loans = LoanBook::new(config.default_avatar.clone());
        tracing::info!(
            identities = identities.list_identities().len(),
            signed_in = identities.current_identity().is_some(),
            "loan desk opened"
        );

        Ok(Self {
            config,
            identities,
            loans,
            time,
            events: EventStore::new(),
        })
    }

    pub fn time(&self) -> &SafeTimeProvider {
        &self.time
    }

    // session

    pub fn authenticate(&mut self, email: &str, secret: &str) -> Result<Identity> {
        let result = self.identities.authenticate(email, secret);
        self.collect_events();
        result
    }

    pub fn sign_out(&mut self) -> Result<()> {
        let result = self.identities.sign_out();
        self.collect_events();
        result
    }

    pub fn current_identity(&self) -> Option<&Identity> {
        self.identities.current_identity()
    }

    pub fn has_sufficient_role(&self, required: Role) -> bool {
        self.identities.has_sufficient_role(required)
    }

    // directory

    pub fn list_identities(&self) -> &[Identity] {
        self.identities.list_identities()
    }

    pub fn get_identity(&self, id: IdentityId) -> Option<&Identity> {
        self.identities.get_identity(id)
    }

    /// admins only, newest additions last
    pub fn admins(&self) -> Vec<&Identity> {
        self.identities.with_role(Role::Admin).collect()
    }

    pub fn add_identity(&mut self, data: NewIdentity) -> Result<Identity> {
        let result = self.identities.add_identity(data);
        self.collect_events();
        result
    }

    pub fn update_identity(&mut self, id: IdentityId, update: IdentityUpdate) -> Result<Identity> {
        let result = self.identities.update_identity(id, update);
        self.collect_events();
        result
    }

    pub fn delete_identity(&mut self, id: IdentityId) -> Result<Identity> {
        let result = self.identities.delete_identity(id);
        self.collect_events();
        result
    }

    // loans

    /// apply on behalf of an explicit identity
    pub fn apply(&mut self, applicant: &Identity, request: LoanRequest) -> Result<LoanApplication> {
        let result = self.loans.apply(applicant, request, &self.time);
        self.collect_events();
        result
    }

    /// apply on behalf of whoever is signed in
    pub fn apply_for_loan(&mut self, request: LoanRequest) -> Result<LoanApplication> {
        let applicant = match self.identities.require_role(Role::Borrower) {
            Ok(identity) => identity.clone(),
            Err(e) => {
                tracing::warn!("loan application without a session");
                return Err(e);
            }
        };
        self.apply(&applicant, request)
    }

    pub fn verify(&mut self, loan_id: LoanId) -> Result<LoanApplication> {
        let result = self.loans.verify(&self.identities, loan_id, &self.time);
        self.collect_events();
        result
    }

    pub fn reject(&mut self, loan_id: LoanId) -> Result<LoanApplication> {
        let result = self.loans.reject(&self.identities, loan_id, &self.time);
        self.collect_events();
        result
    }

    pub fn approve(&mut self, loan_id: LoanId) -> Result<LoanApplication> {
        let result = self.loans.approve(&self.identities, loan_id, &self.time);
        self.collect_events();
        result
    }

    pub fn get_loan(&self, loan_id: LoanId) -> Result<&LoanApplication> {
        self.loans
            .get(loan_id)
            .ok_or_else(|| DeskError::loan_not_found(loan_id))
    }

    pub fn list_loans(&self, filter: &LoanFilter) -> Vec<&LoanApplication> {
        self.loans.list_loans(filter)
    }

    /// loans belonging to the signed-in identity
    pub fn my_loans(&self) -> Vec<&LoanApplication> {
        match self.current_identity() {
            Some(identity) => self.loans.list_loans(&LoanFilter::new().applicant(identity.id)),
            None => Vec::new(),
        }
    }

    /// one page of the loan table at the configured page size
    pub fn loan_page(&self, filter: &LoanFilter, page: usize) -> Page<&LoanApplication> {
        self.loans.paginate(filter, page, self.config.rows_per_page)
    }

    pub fn recent_loans(&self) -> &[LoanApplication] {
        self.loans.recent(self.config.recent_loans)
    }

    /// loan table rows for one page
    pub fn loan_views(&self, filter: &LoanFilter, page: usize) -> Vec<LoanView> {
        self.loan_page(filter, page)
            .items
            .into_iter()
            .map(LoanView::from_loan)
            .collect()
    }

    /// directory rows with delete buttons enabled where allowed
    pub fn identity_views(&self) -> Vec<IdentityView> {
        let all = self.identities.list_identities();
        let session = self.current_identity();
        all.iter()
            .map(|identity| IdentityView::from_identity(identity, session, all))
            .collect()
    }

    // dashboard

    pub fn dashboard(&self) -> DashboardStats {
        DashboardStats::compute(self.identities.list_identities(), self.loans.all())
    }

    pub fn monthly_series(&self, year: i32, metric: SeriesMetric) -> Vec<ChartPoint> {
        crate::dashboard::monthly_series(self.loans.all(), year, metric)
    }

    // change notifications

    /// drain change events in the order they happened
    pub fn take_events(&mut self) -> Vec<Event> {
        self.events.take_events()
    }

    pub fn into_store(self) -> S {
        self.identities.into_store()
    }

    fn collect_events(&mut self) {
        self.events.absorb(&mut self.identities.events);
        self.events.absorb(&mut self.loans.events);
    }
}
