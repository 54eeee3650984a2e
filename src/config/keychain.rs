//! Secret store access
//!
//! The vault key lives in the OS keychain as a single named secret. Access
//! goes through the [`SecretStore`] trait so headless environments and tests
//! can substitute an in-memory store.

use keyring::Entry;
use parking_lot::Mutex;
use std::collections::HashMap;

use crate::error::Error;

/// Service name for keychain entries
const SERVICE_NAME: &str = "NebulaSSH";

/// Account under which the vault key is stored
pub const VAULT_KEY_ACCOUNT: &str = "encryption_key";

/// One named secret per account, get-or-absent semantics.
pub trait SecretStore: Send + Sync {
    /// Read a secret. `Ok(None)` means the entry does not exist yet.
    fn get(&self, account: &str) -> Result<Option<String>, Error>;

    /// Write (or overwrite) a secret.
    fn set(&self, account: &str, secret: &str) -> Result<(), Error>;
}

/// [`SecretStore`] backed by the system keychain via the `keyring` crate.
pub struct Keychain {
    service: String,
}

impl Keychain {
    pub fn new() -> Self {
        Self {
            service: SERVICE_NAME.to_string(),
        }
    }

    /// Create with custom service name (for testing)
    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }
}

impl Default for Keychain {
    fn default() -> Self {
        Self::new()
    }
}

impl SecretStore for Keychain {
    fn get(&self, account: &str) -> Result<Option<String>, Error> {
        let entry = Entry::new(&self.service, account)
            .map_err(|e| Error::Storage(e.to_string()))?;
        match entry.get_password() {
            Ok(secret) => {
                tracing::debug!("keychain get: service={}, account={}", self.service, account);
                Ok(Some(secret))
            }
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => {
                tracing::error!("keychain get failed: account={}, error={:?}", account, e);
                Err(Error::Storage(e.to_string()))
            }
        }
    }

    fn set(&self, account: &str, secret: &str) -> Result<(), Error> {
        let entry = Entry::new(&self.service, account)
            .map_err(|e| Error::Storage(e.to_string()))?;
        entry.set_password(secret).map_err(|e| {
            tracing::error!("keychain set failed: account={}, error={:?}", account, e);
            Error::Storage(e.to_string())
        })?;
        tracing::info!("keychain set: service={}, account={}", self.service, account);
        Ok(())
    }
}

/// In-memory [`SecretStore`] for tests and environments without a keychain.
#[derive(Default)]
pub struct MemorySecretStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SecretStore for MemorySecretStore {
    fn get(&self, account: &str) -> Result<Option<String>, Error> {
        Ok(self.entries.lock().get(account).cloned())
    }

    fn set(&self, account: &str, secret: &str) -> Result<(), Error> {
        self.entries.lock().insert(account.into(), secret.into());
        Ok(())
    }
}
