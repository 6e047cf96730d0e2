use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::types::{IdentityId, LoanAction, LoanId, LoanStatus, Role};

/// all change notifications emitted by the desk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // session events
    SignedIn {
        identity_id: IdentityId,
        role: Role,
    },
    SignedOut {
        identity_id: IdentityId,
    },

    // directory events
    IdentityAdded {
        identity_id: IdentityId,
        email: String,
        role: Role,
    },
    IdentityUpdated {
        identity_id: IdentityId,
        old_role: Role,
        new_role: Role,
    },
    IdentityDeleted {
        identity_id: IdentityId,
        email: String,
    },

    // loan events
    LoanApplied {
        loan_id: LoanId,
        applicant_id: IdentityId,
        amount: Money,
        timestamp: DateTime<Utc>,
    },
    LoanStatusChanged {
        loan_id: LoanId,
        action: LoanAction,
        old_status: LoanStatus,
        new_status: LoanStatus,
        actor_id: IdentityId,
        timestamp: DateTime<Utc>,
    },
}

impl Event {
    /// whether the identity directory or session changed
    pub fn touches_identities(&self) -> bool {
        !self.touches_loans()
    }

    /// whether the loan collection changed
    pub fn touches_loans(&self) -> bool {
        matches!(self, Event::LoanApplied { .. } | Event::LoanStatusChanged { .. })
    }
}

/// event store for collecting events during operations
#[derive(Debug, Default)]
pub struct EventStore {
    events: Vec<Event>,
}

impl EventStore {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    /// move every event out of `other`, keeping their order
    pub fn absorb(&mut self, other: &mut EventStore) {
        self.events.append(&mut other.events);
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
