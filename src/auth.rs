//! Identity directory, session and role checks.

use uuid::Uuid;

use crate::config::{DeskConfig, StorageKeys};
use crate::errors::{DeskError, Result};
use crate::events::{Event, EventStore};
use crate::identity::{Identity, IdentityUpdate, NewIdentity};
use crate::store::KeyValueStore;
use crate::types::{IdentityId, Role};

/// role checks against whoever is signed in
pub trait Permissions {
    fn current_identity(&self) -> Option<&Identity>;

    /// no session satisfies nothing
    fn has_sufficient_role(&self, required: Role) -> bool {
        self.current_identity()
            .is_some_and(|identity| identity.role.satisfies(required))
    }

    /// the session identity, or `Forbidden` if its role is too low
    fn require_role(&self, required: Role) -> Result<&Identity> {
        match self.current_identity() {
            Some(identity) if identity.role.satisfies(required) => Ok(identity),
            other => Err(DeskError::Forbidden {
                required,
                actual: other.map(|identity| identity.role),
            }),
        }
    }
}

/// a bare session snapshot, handy when no directory is involved
impl Permissions for Option<Identity> {
    fn current_identity(&self) -> Option<&Identity> {
        self.as_ref()
    }
}

/// identity directory plus the current session, written through to a store
pub struct IdentityService<S: KeyValueStore> {
    store: S,
    keys: StorageKeys,
    access_secret: String,
    identities: Vec<Identity>,
    session: Option<Identity>,
    pub events: EventStore,
}

impl<S: KeyValueStore> IdentityService<S> {
    /// load the directory and session from `store`, seeding on first run
    pub fn load(store: S, config: &DeskConfig) -> Result<Self> {
        let mut service = Self {
            store,
            keys: config.storage.clone(),
            access_secret: config.access_secret.clone(),
            identities: Vec::new(),
            session: None,
            events: EventStore::new(),
        };

        match service.store.get(&service.keys.identities)? {
            Some(json) => {
                service.identities = serde_json::from_str(&json)?;
                tracing::debug!(count = service.identities.len(), "loaded identity directory");
            }
            None => {
                let seeded = config
                    .seed_identities
                    .iter()
                    .cloned()
                    .map(|data| -> Result<Identity> {
                        Ok(Identity::from_new(Uuid::new_v4(), data.normalized()?))
                    })
                    .collect::<Result<Vec<_>>>()?;
                service.write_identities(&seeded)?;
                service.identities = seeded;
                tracing::info!(count = service.identities.len(), "seeded identity directory");
            }
        }

        if let Some(json) = service.store.get(&service.keys.session)? {
            let saved: Identity = serde_json::from_str(&json)?;
            if service.find(saved.id).is_some() {
                service.session = Some(saved);
            } else {
                tracing::warn!(identity_id = %saved.id, "discarding session for unknown identity");
                service.store.remove(&service.keys.session)?;
            }
        }

        Ok(service)
    }

    pub fn authenticate(&mut self, email: &str, secret: &str) -> Result<Identity> {
        let found = self
            .identities
            .iter()
            .find(|identity| identity.has_email(email))
            .cloned();

        let identity = match found {
            Some(identity) if secret == self.access_secret => identity,
            _ => {
                tracing::warn!(email, "authentication failed");
                return Err(DeskError::InvalidCredentials);
            }
        };

        self.write_session(&identity)?;
        self.session = Some(identity.clone());
        self.events.emit(Event::SignedIn {
            identity_id: identity.id,
            role: identity.role,
        });
        tracing::info!(identity_id = %identity.id, role = %identity.role, "signed in");

        Ok(identity)
    }

    /// clear the session; a no-op when nobody is signed in
    pub fn sign_out(&mut self) -> Result<()> {
        let Some(identity) = self.session.as_ref() else {
            return Ok(());
        };
        let identity_id = identity.id;

        self.store.remove(&self.keys.session)?;
        self.session = None;
        self.events.emit(Event::SignedOut { identity_id });
        tracing::info!(%identity_id, "signed out");

        Ok(())
    }

    pub fn list_identities(&self) -> &[Identity] {
        &self.identities
    }

    pub fn get_identity(&self, id: IdentityId) -> Option<&Identity> {
        self.find(id).map(|idx| &self.identities[idx])
    }

    /// identities holding `role`
    pub fn with_role(&self, role: Role) -> impl Iterator<Item = &Identity> {
        self.identities.iter().filter(move |identity| identity.role == role)
    }

    pub fn admin_count(&self) -> usize {
        self.with_role(Role::Admin).count()
    }

    pub fn add_identity(&mut self, data: NewIdentity) -> Result<Identity> {
        let data = data.normalized()?;
        if self.email_taken(&data.email, None) {
            tracing::warn!(email = %data.email, "rejected duplicate email");
            return Err(DeskError::DuplicateEmail { email: data.email });
        }

        let identity = Identity::from_new(Uuid::new_v4(), data);
        let mut next = self.identities.clone();
        next.push(identity.clone());
        self.write_identities(&next)?;
        self.identities = next;

        self.events.emit(Event::IdentityAdded {
            identity_id: identity.id,
            email: identity.email.clone(),
            role: identity.role,
        });
        tracing::info!(identity_id = %identity.id, role = %identity.role, "identity added");

        Ok(identity)
    }

    pub fn update_identity(&mut self, id: IdentityId, update: IdentityUpdate) -> Result<Identity> {
        update.validate()?;
        let idx = self.find(id).ok_or_else(|| DeskError::identity_not_found(id))?;
        let current = &self.identities[idx];
        let updated = current.merged(&update);

        if !current.has_email(&updated.email) && self.email_taken(&updated.email, Some(id)) {
            tracing::warn!(email = %updated.email, "rejected duplicate email");
            return Err(DeskError::DuplicateEmail { email: updated.email });
        }
        if current.role == Role::Admin && updated.role != Role::Admin && self.admin_count() == 1 {
            tracing::warn!(identity_id = %id, "refused to downgrade the last admin");
            return Err(DeskError::LastAdminGuard);
        }

        let old_role = current.role;
        let mut next = self.identities.clone();
        next[idx] = updated.clone();
        self.write_identities(&next)?;
        self.identities = next;
        self.events.emit(Event::IdentityUpdated {
            identity_id: id,
            old_role,
            new_role: updated.role,
        });

        // the directory is committed; a failed session write only leaves the
        // snapshot stale, in memory and in the store alike
        let is_session = self.session.as_ref().is_some_and(|s| s.id == id);
        if is_session {
            if let Err(e) = self.write_session(&updated) {
                tracing::warn!(identity_id = %id, error = %e, "session snapshot not refreshed");
                return Err(e);
            }
            self.session = Some(updated.clone());
        }
        tracing::info!(identity_id = %id, refreshed_session = is_session, "identity updated");

        Ok(updated)
    }

    /// remove an identity, returning the removed record
    pub fn delete_identity(&mut self, id: IdentityId) -> Result<Identity> {
        if self.session.as_ref().is_some_and(|s| s.id == id) {
            tracing::warn!(identity_id = %id, "refused self deletion");
            return Err(DeskError::SelfDeletion);
        }
        let idx = self.find(id).ok_or_else(|| DeskError::identity_not_found(id))?;
        if self.identities[idx].role == Role::Admin && self.admin_count() == 1 {
            tracing::warn!(identity_id = %id, "refused to delete the last admin");
            return Err(DeskError::LastAdminGuard);
        }

        let mut next = self.identities.clone();
        let removed = next.remove(idx);
        self.write_identities(&next)?;
        self.identities = next;

        self.events.emit(Event::IdentityDeleted {
            identity_id: id,
            email: removed.email.clone(),
        });
        tracing::info!(identity_id = %id, "identity deleted");

        Ok(removed)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// give the backing store back, e.g. to reopen it later
    pub fn into_store(self) -> S {
        self.store
    }

    fn find(&self, id: IdentityId) -> Option<usize> {
        self.identities.iter().position(|identity| identity.id == id)
    }

    fn email_taken(&self, email: &str, except: Option<IdentityId>) -> bool {
        self.identities
            .iter()
            .any(|identity| Some(identity.id) != except && identity.has_email(email))
    }

    fn write_identities(&mut self, identities: &[Identity]) -> Result<()> {
        let json = serde_json::to_string_pretty(identities)?;
        self.store.set(&self.keys.identities, json)?;
        Ok(())
    }

    fn write_session(&mut self, identity: &Identity) -> Result<()> {
        let json = serde_json::to_string_pretty(identity)?;
        self.store.set(&self.keys.session, json)?;
        Ok(())
    }
}

impl<S: KeyValueStore> Permissions for IdentityService<S> {
    fn current_identity(&self) -> Option<&Identity> {
        self.session.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, StoreError};

    fn service() -> IdentityService<MemoryStore> {
        IdentityService::load(MemoryStore::new(), &DeskConfig::demo()).unwrap()
    }

    fn id_of(service: &IdentityService<MemoryStore>, email: &str) -> IdentityId {
        service
            .list_identities()
            .iter()
            .find(|i| i.has_email(email))
            .unwrap()
            .id
    }

    /// store whose writes can be switched off, for every key or just one
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryStore,
        fail_writes: bool,
        fail_key: Option<&'static str>,
    }

    impl KeyValueStore for FlakyStore {
        fn get(&self, key: &str) -> std::result::Result<Option<String>, StoreError> {
            self.inner.get(key)
        }

        fn set(&mut self, key: &str, value: String) -> std::result::Result<(), StoreError> {
            if self.fail_writes || self.fail_key.is_some_and(|k| k == key) {
                return Err(StoreError::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk full")));
            }
            self.inner.set(key, value)
        }

        fn remove(&mut self, key: &str) -> std::result::Result<(), StoreError> {
            self.inner.remove(key)
        }
    }

    #[test]
    fn test_first_run_seeds_and_persists() {
        let service = service();
        assert_eq!(service.list_identities().len(), 3);
        assert_eq!(service.admin_count(), 1);
        assert!(service.current_identity().is_none());
        assert!(service.store().get("users").unwrap().is_some());
    }

    #[test]
    fn test_authenticate_is_case_insensitive() {
        let mut service = service();
        let identity = service.authenticate("ADMIN@example.COM", "password").unwrap();
        assert_eq!(identity.role, Role::Admin);
        assert_eq!(service.current_identity(), Some(&identity));

        let saved = service.store().get("user").unwrap().unwrap();
        let saved: Identity = serde_json::from_str(&saved).unwrap();
        assert_eq!(saved, identity);
    }

    #[test]
    fn test_authenticate_failures() {
        let mut service = service();
        assert!(matches!(
            service.authenticate("nobody@example.com", "password"),
            Err(DeskError::InvalidCredentials)
        ));
        assert!(matches!(
            service.authenticate("admin@example.com", "wrong"),
            Err(DeskError::InvalidCredentials)
        ));
        assert!(service.current_identity().is_none());
        assert!(service.store().get("user").unwrap().is_none());
    }

    #[test]
    fn test_sign_out_clears_session() {
        let mut service = service();
        service.authenticate("verifier@example.com", "password").unwrap();
        service.sign_out().unwrap();

        assert!(service.current_identity().is_none());
        assert!(service.store().get("user").unwrap().is_none());
        // second sign out is harmless
        service.sign_out().unwrap();
    }

    #[test]
    fn test_role_sufficiency_per_session() {
        let mut service = service();
        for role in Role::ALL {
            assert!(!service.has_sufficient_role(role));
        }

        service.authenticate("admin@example.com", "password").unwrap();
        for role in Role::ALL {
            assert!(service.has_sufficient_role(role));
        }

        service.authenticate("verifier@example.com", "password").unwrap();
        assert!(!service.has_sufficient_role(Role::Admin));
        assert!(service.has_sufficient_role(Role::Verifier));
        assert!(service.has_sufficient_role(Role::Borrower));

        service.authenticate("borrower@example.com", "password").unwrap();
        assert!(!service.has_sufficient_role(Role::Admin));
        assert!(!service.has_sufficient_role(Role::Verifier));
        assert!(service.has_sufficient_role(Role::Borrower));
    }

    #[test]
    fn test_require_role_reports_actual_role() {
        let mut service = service();
        assert!(matches!(
            service.require_role(Role::Borrower),
            Err(DeskError::Forbidden { required: Role::Borrower, actual: None })
        ));

        service.authenticate("borrower@example.com", "password").unwrap();
        assert!(matches!(
            service.require_role(Role::Verifier),
            Err(DeskError::Forbidden { required: Role::Verifier, actual: Some(Role::Borrower) })
        ));
        assert!(service.require_role(Role::Borrower).is_ok());
    }

    #[test]
    fn test_add_identity_keeps_emails_unique() {
        let mut service = service();
        let added = service
            .add_identity(NewIdentity::new("Tom Cruise", "tom@example.com", Role::Borrower))
            .unwrap();

        let matching: Vec<_> = service
            .list_identities()
            .iter()
            .filter(|i| i.has_email("TOM@example.com"))
            .collect();
        assert_eq!(matching.len(), 1);
        assert_eq!(matching[0].id, added.id);

        let err = service
            .add_identity(NewIdentity::new("Other Tom", "Tom@Example.com", Role::Verifier))
            .unwrap_err();
        assert!(matches!(err, DeskError::DuplicateEmail { .. }));
        assert_eq!(service.list_identities().len(), 4);
    }

    #[test]
    fn test_add_identity_assigns_fresh_ids() {
        let mut service = service();
        let a = service.add_identity(NewIdentity::new("A", "a@example.com", Role::Borrower)).unwrap();
        let b = service.add_identity(NewIdentity::new("B", "b@example.com", Role::Borrower)).unwrap();
        assert_ne!(a.id, b.id);
        assert!(service.list_identities().iter().all(|i| i.id != Uuid::nil()));
    }

    #[test]
    fn test_update_identity() {
        let mut service = service();
        let id = id_of(&service, "borrower@example.com");

        let updated = service
            .update_identity(id, IdentityUpdate::new().display_name("Alice S.").role(Role::Verifier))
            .unwrap();
        assert_eq!(updated.display_name, "Alice S.");
        assert_eq!(updated.role, Role::Verifier);
        assert_eq!(service.get_identity(id), Some(&updated));

        // changing only the case of one's own email is fine
        service
            .update_identity(id, IdentityUpdate::new().email("BORROWER@example.com"))
            .unwrap();

        let err = service
            .update_identity(id, IdentityUpdate::new().email("admin@EXAMPLE.com"))
            .unwrap_err();
        assert!(matches!(err, DeskError::DuplicateEmail { .. }));

        let err = service
            .update_identity(Uuid::new_v4(), IdentityUpdate::new().display_name("Ghost"))
            .unwrap_err();
        assert!(matches!(err, DeskError::NotFound { kind: "identity", .. }));
    }

    #[test]
    fn test_update_refreshes_session_snapshot() {
        let mut service = service();
        let me = service.authenticate("verifier@example.com", "password").unwrap();

        service
            .update_identity(me.id, IdentityUpdate::new().display_name("John Okoh Jr."))
            .unwrap();

        assert_eq!(service.current_identity().unwrap().display_name, "John Okoh Jr.");
        let saved: Identity = serde_json::from_str(&service.store().get("user").unwrap().unwrap()).unwrap();
        assert_eq!(saved.display_name, "John Okoh Jr.");
    }

    #[test]
    fn test_cannot_downgrade_last_admin() {
        let mut service = service();
        let admin = id_of(&service, "admin@example.com");

        let err = service
            .update_identity(admin, IdentityUpdate::new().role(Role::Verifier))
            .unwrap_err();
        assert!(matches!(err, DeskError::LastAdminGuard));
        assert_eq!(service.admin_count(), 1);

        service
            .add_identity(NewIdentity::new("Second Admin", "admin2@example.com", Role::Admin))
            .unwrap();
        service
            .update_identity(admin, IdentityUpdate::new().role(Role::Verifier))
            .unwrap();
        assert_eq!(service.admin_count(), 1);
    }

    #[test]
    fn test_delete_self_always_fails() {
        let mut service = service();
        for email in ["admin@example.com", "verifier@example.com", "borrower@example.com"] {
            let me = service.authenticate(email, "password").unwrap();
            assert!(matches!(service.delete_identity(me.id), Err(DeskError::SelfDeletion)));
        }
        assert_eq!(service.list_identities().len(), 3);
    }

    #[test]
    fn test_last_admin_guard_on_delete() {
        let config = DeskConfig {
            seed_identities: vec![
                NewIdentity::new("A", "a@example.com", Role::Admin),
                NewIdentity::new("V", "v@example.com", Role::Verifier),
            ],
            ..DeskConfig::demo()
        };
        let mut service = IdentityService::load(MemoryStore::new(), &config).unwrap();
        let a = id_of(&service, "a@example.com");
        let v = id_of(&service, "v@example.com");

        assert!(matches!(service.delete_identity(a), Err(DeskError::LastAdminGuard)));
        let removed = service.delete_identity(v).unwrap();
        assert_eq!(removed.id, v);
        assert_eq!(service.list_identities().len(), 1);
        assert!(matches!(service.delete_identity(v), Err(DeskError::NotFound { .. })));
    }

    #[test]
    fn test_directory_round_trips_through_store() {
        let mut service = service();
        service.add_identity(NewIdentity::new("Matt Damon", "matt@example.com", Role::Verifier)).unwrap();
        let before = service.list_identities().to_vec();

        let reloaded = IdentityService::load(service.into_store(), &DeskConfig::demo()).unwrap();
        assert_eq!(reloaded.list_identities(), before.as_slice());
    }

    #[test]
    fn test_session_survives_restart() {
        let mut service = service();
        let me = service.authenticate("verifier@example.com", "password").unwrap();

        let reloaded = IdentityService::load(service.into_store(), &DeskConfig::demo()).unwrap();
        assert_eq!(reloaded.current_identity(), Some(&me));
    }

    #[test]
    fn test_stale_session_is_discarded_on_load() {
        let mut store = MemoryStore::new();
        let ghost = Identity::from_new(Uuid::new_v4(), NewIdentity::new("Ghost", "ghost@example.com", Role::Admin));
        store.set("user", serde_json::to_string(&ghost).unwrap()).unwrap();

        let service = IdentityService::load(store, &DeskConfig::demo()).unwrap();
        assert!(service.current_identity().is_none());
        assert!(service.store().get("user").unwrap().is_none());
    }

    #[test]
    fn test_failed_write_leaves_memory_untouched() {
        let mut service = IdentityService::load(FlakyStore::default(), &DeskConfig::demo()).unwrap();
        service.store.fail_writes = true;

        let err = service
            .add_identity(NewIdentity::new("Chris Evans", "chris@example.com", Role::Borrower))
            .unwrap_err();
        assert!(matches!(err, DeskError::Store(_)));
        assert_eq!(service.list_identities().len(), 3);

        let verifier = service
            .list_identities()
            .iter()
            .find(|i| i.role == Role::Verifier)
            .unwrap()
            .id;
        assert!(service.delete_identity(verifier).is_err());
        assert!(service.get_identity(verifier).is_some());
    }

    #[test]
    fn test_failed_session_write_keeps_directory_in_sync() {
        let mut service = IdentityService::load(FlakyStore::default(), &DeskConfig::demo()).unwrap();
        let me = service.authenticate("verifier@example.com", "password").unwrap();
        service.store.fail_key = Some("user");

        let err = service
            .update_identity(me.id, IdentityUpdate::new().display_name("Renamed"))
            .unwrap_err();
        assert!(matches!(err, DeskError::Store(_)));

        let stored: Vec<Identity> = serde_json::from_str(&service.store().get("users").unwrap().unwrap()).unwrap();
        assert_eq!(stored.as_slice(), service.list_identities());
        assert_eq!(service.get_identity(me.id).unwrap().display_name, "Renamed");

        let saved: Identity = serde_json::from_str(&service.store().get("user").unwrap().unwrap()).unwrap();
        assert_eq!(service.current_identity(), Some(&saved));
        assert_eq!(saved.display_name, "John Okoh");
        assert!(matches!(service.events.take_events().last(), Some(Event::IdentityUpdated { .. })));
    }

    #[test]
    fn test_mutations_emit_events() {
        let mut service = service();
        service.authenticate("admin@example.com", "password").unwrap();
        let added = service.add_identity(NewIdentity::new("Sam Smith", "sam@example.com", Role::Borrower)).unwrap();
        service.delete_identity(added.id).unwrap();
        service.sign_out().unwrap();

        let events = service.events.take_events();
        assert_eq!(events.len(), 4);
        assert!(matches!(events[0], Event::SignedIn { role: Role::Admin, .. }));
        assert!(matches!(events[1], Event::IdentityAdded { .. }));
        assert!(matches!(events[2], Event::IdentityDeleted { .. }));
        assert!(matches!(events[3], Event::SignedOut { .. }));
    }

    #[test]
    fn test_option_identity_permissions() {
        let none: Option<Identity> = None;
        assert!(!none.has_sufficient_role(Role::Borrower));

        let verifier = Some(Identity::from_new(
            Uuid::new_v4(),
            NewIdentity::new("V", "v@example.com", Role::Verifier),
        ));
        assert!(verifier.has_sufficient_role(Role::Verifier));
        assert!(!verifier.has_sufficient_role(Role::Admin));
    }
}
