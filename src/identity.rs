use serde::{Deserialize, Serialize};

use crate::errors::{DeskError, Result};
use crate::types::{IdentityId, Role};

/// a known user of the desk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: IdentityId,
    pub display_name: String,
    pub email: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

impl Identity {
    pub fn from_new(id: IdentityId, data: NewIdentity) -> Self {
        Self {
            id,
            display_name: data.display_name,
            email: data.email,
            role: data.role,
            avatar_url: data.avatar_url,
        }
    }

    /// case-insensitive email comparison
    pub fn has_email(&self, email: &str) -> bool {
        self.email.to_lowercase() == email.trim().to_lowercase()
    }

    /// copy of `self` with `update` applied
    pub fn merged(&self, update: &IdentityUpdate) -> Self {
        let mut next = self.clone();
        if let Some(name) = &update.display_name {
            next.display_name = name.trim().to_string();
        }
        if let Some(email) = &update.email {
            next.email = email.trim().to_string();
        }
        if let Some(role) = update.role {
            next.role = role;
        }
        if let Some(avatar) = &update.avatar_url {
            next.avatar_url = avatar.clone();
        }
        next
    }
}

/// data for creating an identity (id assigned by the directory)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewIdentity {
    pub display_name: String,
    pub email: String,
    pub role: Role,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl NewIdentity {
    pub fn new(display_name: impl Into<String>, email: impl Into<String>, role: Role) -> Self {
        Self {
            display_name: display_name.into(),
            email: email.into(),
            role,
            avatar_url: None,
        }
    }

    pub fn with_avatar(mut self, url: impl Into<String>) -> Self {
        self.avatar_url = Some(url.into());
        self
    }

    /// trim fields and reject blank names or malformed emails
    pub(crate) fn normalized(mut self) -> Result<Self> {
        self.display_name = self.display_name.trim().to_string();
        self.email = self.email.trim().to_string();
        validate_display_name(&self.display_name)?;
        validate_email(&self.email)?;
        Ok(self)
    }
}

/// partial update; `None` fields are left unchanged
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityUpdate {
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
    /// `Some(None)` clears the avatar
    pub avatar_url: Option<Option<String>>,
}

impl IdentityUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    pub fn avatar_url(mut self, url: Option<String>) -> Self {
        self.avatar_url = Some(url);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.display_name.is_none()
            && self.email.is_none()
            && self.role.is_none()
            && self.avatar_url.is_none()
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if let Some(name) = &self.display_name {
            validate_display_name(name.trim())?;
        }
        if let Some(email) = &self.email {
            validate_email(email.trim())?;
        }
        Ok(())
    }
}

fn validate_display_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(DeskError::validation("display name must not be empty"));
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<()> {
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
        _ => Err(DeskError::validation(format!("invalid email address: {email:?}"))),
    }
}
