use thiserror::Error;

use crate::store::StoreError;
use crate::types::{LoanAction, LoanStatus, Role};

#[derive(Error, Debug)]
pub enum DeskError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("an identity with email {email} already exists")]
    DuplicateEmail {
        email: String,
    },

    #[error("{kind} not found: {id}")]
    NotFound {
        kind: &'static str,
        id: String,
    },

    #[error("an identity cannot delete itself")]
    SelfDeletion,

    #[error("at least one admin must remain")]
    LastAdminGuard,

    #[error("forbidden: requires {required}, current role is {}", display_role(.actual))]
    Forbidden {
        required: Role,
        actual: Option<Role>,
    },

    #[error("cannot {action} a loan that is {from}")]
    InvalidTransition {
        from: LoanStatus,
        action: LoanAction,
    },

    #[error("validation error: {message}")]
    ValidationError {
        message: String,
    },

    #[error("invalid configuration: {message}")]
    InvalidConfiguration {
        message: String,
    },

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

fn display_role(role: &Option<Role>) -> &'static str {
    match role {
        Some(r) => r.as_str(),
        None => "none (signed out)",
    }
}

impl DeskError {
    pub(crate) fn identity_not_found(id: impl ToString) -> Self {
        DeskError::NotFound {
            kind: "identity",
            id: id.to_string(),
        }
    }

    pub(crate) fn loan_not_found(id: impl ToString) -> Self {
        DeskError::NotFound {
            kind: "loan",
            id: id.to_string(),
        }
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        DeskError::ValidationError {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DeskError>;
