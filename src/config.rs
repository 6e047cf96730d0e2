use serde::{Deserialize, Serialize};

use crate::errors::{DeskError, Result};
use crate::identity::NewIdentity;
use crate::types::Role;

/// desk configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeskConfig {
    pub storage: StorageKeys,
    /// secret accepted by `authenticate` for every identity
    pub access_secret: String,
    /// avatar copied onto loans whose applicant has none
    pub default_avatar: String,
    /// loan table page size
    pub rows_per_page: usize,
    /// number of loans shown in the dashboard's recent list
    pub recent_loans: usize,
    /// directory written at first run, when the store has no identities yet
    pub seed_identities: Vec<NewIdentity>,
}

/// store keys
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageKeys {
    pub identities: String,
    pub session: String,
}

impl Default for StorageKeys {
    fn default() -> Self {
        Self {
            identities: "users".to_string(),
            session: "user".to_string(),
        }
    }
}

impl Default for DeskConfig {
    fn default() -> Self {
        Self::demo()
    }
}

impl DeskConfig {
    /// demo configuration with one identity per role
    pub fn demo() -> Self {
        Self {
            storage: StorageKeys::default(),
            access_secret: "password".to_string(),
            default_avatar: "https://i.pravatar.cc/150?u=default".to_string(),
            rows_per_page: 7,
            recent_loans: 7,
            seed_identities: vec![
                NewIdentity::new("John Doe", "admin@example.com", Role::Admin)
                    .with_avatar("https://i.pravatar.cc/150?u=admin"),
                NewIdentity::new("John Okoh", "verifier@example.com", Role::Verifier)
                    .with_avatar("https://i.pravatar.cc/150?u=verifier"),
                NewIdentity::new("Alice Smith", "borrower@example.com", Role::Borrower)
                    .with_avatar("https://i.pravatar.cc/150?u=borrower"),
            ],
        }
    }

    /// configuration seeded with a single admin
    pub fn with_admin(display_name: impl Into<String>, email: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            access_secret: secret.into(),
            seed_identities: vec![NewIdentity::new(display_name, email, Role::Admin)],
            ..Self::demo()
        }
    }

    /// parse from json; missing fields take their demo defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.rows_per_page == 0 {
            return Err(invalid("rows_per_page must be at least 1"));
        }
        if self.storage.identities.is_empty() || self.storage.session.is_empty() {
            return Err(invalid("storage keys must not be empty"));
        }
        if self.storage.identities == self.storage.session {
            return Err(invalid("identity and session keys must differ"));
        }
        if self.access_secret.is_empty() {
            return Err(invalid("access_secret must not be empty"));
        }
        if !self.seed_identities.iter().any(|i| i.role == Role::Admin) {
            return Err(invalid("seed identities must include an admin"));
        }

        let mut seen: Vec<String> = Vec::with_capacity(self.seed_identities.len());
        for seed in &self.seed_identities {
            let email = seed.email.trim().to_lowercase();
            if seen.contains(&email) {
                return Err(invalid(format!("duplicate seed email: {}", seed.email)));
            }
            seen.push(email);
        }

        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> DeskError {
    DeskError::InvalidConfiguration {
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_config_is_valid() {
        let config = DeskConfig::demo();
        config.validate().unwrap();
        assert_eq!(config.seed_identities.len(), 3);
        assert_eq!(config.storage.identities, "users");
        assert_eq!(config.storage.session, "user");
    }

    #[test]
    fn test_partial_json_falls_back_to_defaults() {
        let config = DeskConfig::from_json(r#"{ "rows_per_page": 20, "storage": { "session": "current" } }"#).unwrap();
        assert_eq!(config.rows_per_page, 20);
        assert_eq!(config.recent_loans, 7);
        assert_eq!(config.storage.identities, "users");
        assert_eq!(config.storage.session, "current");
        assert_eq!(config.access_secret, "password");
    }

    #[test]
    fn test_rejects_bad_values() {
        let zero_rows = DeskConfig {
            rows_per_page: 0,
            ..DeskConfig::demo()
        };
        assert!(matches!(zero_rows.validate(), Err(DeskError::InvalidConfiguration { .. })));

        let mut same_keys = DeskConfig::demo();
        same_keys.storage.session = same_keys.storage.identities.clone();
        assert!(same_keys.validate().is_err());

        let mut no_admin = DeskConfig::demo();
        no_admin.seed_identities.retain(|i| i.role != Role::Admin);
        assert!(no_admin.validate().is_err());

        let mut dup = DeskConfig::demo();
        dup.seed_identities.push(NewIdentity::new("Copy", "ADMIN@example.com", Role::Borrower));
        assert!(dup.validate().is_err());
    }

    #[test]
    fn test_with_admin() {
        let config = DeskConfig::with_admin("Root", "root@bank.test", "s3cret");
        config.validate().unwrap();
        assert_eq!(config.seed_identities.len(), 1);
        assert_eq!(config.access_secret, "s3cret");
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(DeskConfig::from_json("{ not json"), Err(DeskError::Serialization(_))));
    }
}
