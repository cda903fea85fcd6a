use keyring::Entry;
use tracing::debug;

use super::{KeyValueStore, StorageError};

const SERVICE_NAME: &str = "tourbook";

/// OS keychain store. Each key is its own keychain entry under the
/// `tourbook` service.
#[derive(Debug, Clone)]
pub struct KeyringStore {
    service: String,
}

impl Default for KeyringStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyringStore {
    pub fn new() -> Self {
        Self::with_service(SERVICE_NAME)
    }

    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, key: &str) -> Result<Entry, StorageError> {
        Ok(Entry::new(&self.service, key)?)
    }
}

impl KeyValueStore for KeyringStore {
    fn get(&self, key: &str) -> Option<String> {
        let entry = self.entry(key).ok()?;
        match entry.get_password() {
            Ok(value) => Some(value),
            Err(keyring::Error::NoEntry) => None,
            Err(e) => {
                debug!(key = key, error = %e, "Keychain lookup failed");
                None
            }
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entry(key)?.set_password(value)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[ignore = "needs an OS credential store"]
    fn test_value_visible_through_a_new_store() {
        let service = format!("tourbook-test-{}", std::process::id());
        KeyringStore::with_service(&service).set("token", "abc").unwrap();

        let reopened = KeyringStore::with_service(&service);
        assert_eq!(reopened.get("token"), Some("abc".to_string()));

        reopened.remove("token").unwrap();
        assert_eq!(KeyringStore::with_service(&service).get("token"), None);
        // removing twice is fine
        reopened.remove("token").unwrap();
    }
}
