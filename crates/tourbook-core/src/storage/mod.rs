//! Persistent key-value storage for credentials.
//!
//! This module provides the `KeyValueStore` trait, a synchronous
//! get/set/remove surface keyed by string, and its backends:
//! - `MemoryStore`: in-process map
//! - `FileStore`: JSON object file, rewritten on every mutation
//! - `KeyringStore`: OS keychain via `keyring`
//!
//! Stores hold plain strings. They do not enforce expiry on their own.

pub mod file;
pub mod keychain;
pub mod memory;

use std::sync::Arc;

use anyhow::Result;
use thiserror::Error;

use crate::config::{Config, StorageBackend};

pub use self::file::FileStore;
pub use self::keychain::KeyringStore;
pub use self::memory::MemoryStore;

/// Key holding the raw session token
pub const TOKEN_KEY: &str = "token";

/// Key holding the client-known token expiry (RFC 3339 or parsable date)
pub const TOKEN_EXPIRES_KEY: &str = "tokenExpires";

/// File name of the file-backed store inside the cache directory
const STORAGE_FILE: &str = "storage.json";

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Keychain error: {0}")]
    Keyring(#[from] keyring::Error),
}

/// Opaque synchronous key-value storage.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Open the store selected by the config.
pub fn open_store(config: &Config) -> Result<Arc<dyn KeyValueStore>> {
    let store: Arc<dyn KeyValueStore> = match config.storage {
        StorageBackend::File => {
            let path = config.cache_dir()?.join(STORAGE_FILE);
            Arc::new(FileStore::open(path)?)
        }
        StorageBackend::Keyring => Arc::new(KeyringStore::new()),
        StorageBackend::Memory => Arc::new(MemoryStore::new()),
    };
    Ok(store)
}
