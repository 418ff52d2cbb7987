//! Credential store collaborator
//!
//! Persists the opaque session token and the last-selected
//! role/organization/warehouse identifiers across restarts, the way the
//! browser console keeps them in cookies/localStorage. Getters are
//! forgiving (a broken store reads as "nothing persisted"); setters and
//! removals report their errors.

mod persistent;

pub use persistent::PersistentCredentialStore;

use parking_lot::Mutex;

use crate::Result;

/// Synchronous persisted-credential surface
pub trait CredentialStore: Send + Sync {
    fn token(&self) -> Option<String>;
    fn set_token(&self, token: &str) -> Result<()>;
    fn remove_token(&self) -> Result<()>;

    fn current_role(&self) -> Option<String>;
    fn set_current_role(&self, uuid: &str) -> Result<()>;
    fn remove_current_role(&self) -> Result<()>;

    fn current_organization(&self) -> Option<String>;
    fn set_current_organization(&self, uuid: &str) -> Result<()>;
    fn remove_current_organization(&self) -> Result<()>;

    fn current_warehouse(&self) -> Option<String>;
    fn set_current_warehouse(&self, uuid: &str) -> Result<()>;
    fn remove_current_warehouse(&self) -> Result<()>;
}

/// In-memory credential store for tests
///
/// Not persistent; should NOT be used in production.
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    inner: Mutex<Persisted>,
}

#[derive(Debug, Default, Clone)]
struct Persisted {
    token: Option<String>,
    role: Option<String>,
    organization: Option<String>,
    warehouse: Option<String>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store, mirroring identifiers left by a previous session
    pub fn with_persisted(
        token: Option<&str>,
        role: Option<&str>,
        organization: Option<&str>,
        warehouse: Option<&str>,
    ) -> Self {
        Self {
            inner: Mutex::new(Persisted {
                token: token.map(str::to_string),
                role: role.map(str::to_string),
                organization: organization.map(str::to_string),
                warehouse: warehouse.map(str::to_string),
            }),
        }
    }
}

impl CredentialStore for InMemoryCredentialStore {
    fn token(&self) -> Option<String> {
        self.inner.lock().token.clone()
    }

    fn set_token(&self, token: &str) -> Result<()> {
        self.inner.lock().token = Some(token.to_string());
        Ok(())
    }

    fn remove_token(&self) -> Result<()> {
        self.inner.lock().token = None;
        Ok(())
    }

    fn current_role(&self) -> Option<String> {
        self.inner.lock().role.clone()
    }

    fn set_current_role(&self, uuid: &str) -> Result<()> {
        self.inner.lock().role = Some(uuid.to_string());
        Ok(())
    }

    fn remove_current_role(&self) -> Result<()> {
        self.inner.lock().role = None;
        Ok(())
    }

    fn current_organization(&self) -> Option<String> {
        self.inner.lock().organization.clone()
    }

    fn set_current_organization(&self, uuid: &str) -> Result<()> {
        self.inner.lock().organization = Some(uuid.to_string());
        Ok(())
    }

    fn remove_current_organization(&self) -> Result<()> {
        self.inner.lock().organization = None;
        Ok(())
    }

    fn current_warehouse(&self) -> Option<String> {
        self.inner.lock().warehouse.clone()
    }

    fn set_current_warehouse(&self, uuid: &str) -> Result<()> {
        self.inner.lock().warehouse = Some(uuid.to_string());
        Ok(())
    }

    fn remove_current_warehouse(&self) -> Result<()> {
        self.inner.lock().warehouse = None;
        Ok(())
    }
}
