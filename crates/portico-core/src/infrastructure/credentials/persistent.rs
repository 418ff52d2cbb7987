//! Keyring + file backed credential store
//!
//! The session token is a secret and lives in the operating system's
//! credential store (macOS Keychain, Windows Credential Manager, Linux
//! Secret Service). The role/organization/warehouse selections are not
//! secret and live in a small TOML file next to the configuration.

use std::fs;
use std::path::PathBuf;

use keyring::Entry;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::Config;
use crate::error::{Error, Result};

use super::CredentialStore;

/// Keyring user name under which the token entry is created
const KEYRING_TOKEN_USER: &str = "session-token";

/// Selections file name inside the config directory
const SELECTIONS_FILE: &str = "selections.toml";

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct Selections {
    role: Option<String>,
    organization: Option<String>,
    warehouse: Option<String>,
}

/// Credential store backed by the OS keyring and a selections file
#[derive(Debug)]
pub struct PersistentCredentialStore {
    service: String,
    selections_path: PathBuf,
    // Guards read-modify-write cycles on the selections file
    selections: Mutex<()>,
}

impl PersistentCredentialStore {
    /// Create a store from the application config
    pub fn from_config(config: &Config) -> Result<Self> {
        let selections_path = match &config.credentials.selections_path {
            Some(path) => path.clone(),
            None => Config::config_dir()
                .map_err(|e| Error::Config(e.to_string()))?
                .join(SELECTIONS_FILE),
        };
        Ok(Self {
            service: config.credentials.keyring_service.clone(),
            selections_path,
            selections: Mutex::new(()),
        })
    }

    /// Create a store with explicit service name and selections file path
    pub fn with_paths(service: impl Into<String>, selections_path: PathBuf) -> Self {
        Self {
            service: service.into(),
            selections_path,
            selections: Mutex::new(()),
        }
    }

    fn entry(&self) -> Result<Entry> {
        Entry::new(&self.service, KEYRING_TOKEN_USER)
            .map_err(|e| Error::CredentialStore(format!("Failed to create keyring entry: {}", e)))
    }

    fn load_selections(&self) -> Selections {
        match fs::read_to_string(&self.selections_path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|error| {
                warn!(%error, path = %self.selections_path.display(), "selections file is corrupt, ignoring it");
                Selections::default()
            }),
            Err(_) => Selections::default(),
        }
    }

    fn store_selections(&self, selections: &Selections) -> Result<()> {
        if let Some(dir) = self.selections_path.parent() {
            fs::create_dir_all(dir)?;
        }
        let contents = toml::to_string_pretty(selections)
            .map_err(|e| Error::CredentialStore(format!("Failed to serialize selections: {}", e)))?;
        fs::write(&self.selections_path, contents)?;
        Ok(())
    }

    fn update_selections(&self, apply: impl FnOnce(&mut Selections)) -> Result<()> {
        let _guard = self.selections.lock();
        let mut selections = self.load_selections();
        apply(&mut selections);
        self.store_selections(&selections)
    }
}

impl CredentialStore for PersistentCredentialStore {
    fn token(&self) -> Option<String> {
        let entry = self.entry().ok()?;
        match entry.get_password() {
            Ok(token) => Some(token),
            Err(keyring::Error::NoEntry) => None,
            Err(error) => {
                warn!(%error, "failed to read session token from keyring");
                None
            }
        }
    }

    fn set_token(&self, token: &str) -> Result<()> {
        self.entry()?
            .set_password(token)
            .map_err(|e| Error::CredentialStore(format!("Failed to store session token: {}", e)))
    }

    fn remove_token(&self) -> Result<()> {
        match self.entry()?.delete_password() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(Error::CredentialStore(format!(
                "Failed to remove session token: {}",
                e
            ))),
        }
    }

    fn current_role(&self) -> Option<String> {
        self.load_selections().role
    }

    fn set_current_role(&self, uuid: &str) -> Result<()> {
        let uuid = uuid.to_string();
        self.update_selections(|s| s.role = Some(uuid))
    }

    fn remove_current_role(&self) -> Result<()> {
        self.update_selections(|s| s.role = None)
    }

    fn current_organization(&self) -> Option<String> {
        self.load_selections().organization
    }

    fn set_current_organization(&self, uuid: &str) -> Result<()> {
        let uuid = uuid.to_string();
        self.update_selections(|s| s.organization = Some(uuid))
    }

    fn remove_current_organization(&self) -> Result<()> {
        self.update_selections(|s| s.organization = None)
    }

    fn current_warehouse(&self) -> Option<String> {
        self.load_selections().warehouse
    }

    fn set_current_warehouse(&self, uuid: &str) -> Result<()> {
        let uuid = uuid.to_string();
        self.update_selections(|s| s.warehouse = Some(uuid))
    }

    fn remove_current_warehouse(&self) -> Result<()> {
        self.update_selections(|s| s.warehouse = None)
    }
}
