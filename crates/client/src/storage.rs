//! Key/value persistence for credentials and checkout progress.
//!
//! Two scopes mirror a browser tab: the *local* store outlives the process
//! and holds the signed-in user, the *session* store holds checkout
//! selections and the last placed order. Both are plain string maps behind
//! the [`Storage`] trait so the CLI can keep them in files while tests use
//! memory.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::warn;

/// Storage keys shared with the web front end.
pub mod keys {
    /// Key (local scope) for the signed-in user record.
    pub const CURRENT_USER: &str = "currentUser";

    /// Key for the selected shipping address id.
    pub const SHIPPING_ADDRESS_ID: &str = "shippingAddressId";

    /// Key for the selected billing address id (absent means same as shipping).
    pub const BILLING_ADDRESS_ID: &str = "billingAddressId";

    /// Key for the chosen payment method.
    pub const PAYMENT_METHOD: &str = "paymentMethod";

    /// Key for the JSON encoded card details.
    pub const CARD_DATA: &str = "cardData";

    /// Key for the id of the order just placed.
    pub const ORDER_ID: &str = "orderId";

    /// Key for the display number of the order just placed.
    pub const ORDER_NUMBER: &str = "orderNumber";

    /// Keys cleared once an order has been placed.
    pub const CHECKOUT: [&str; 4] = [
        SHIPPING_ADDRESS_ID,
        BILLING_ADDRESS_ID,
        PAYMENT_METHOD,
        CARD_DATA,
    ];

    /// Every session-scoped key.
    pub const SESSION: [&str; 6] = [
        SHIPPING_ADDRESS_ID,
        BILLING_ADDRESS_ID,
        PAYMENT_METHOD,
        CARD_DATA,
        ORDER_ID,
        ORDER_NUMBER,
    ];
}

/// Errors raised by a storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or writing the backing file failed.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The backing file or a stored value is not valid JSON.
    #[error("storage encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    /// A previous writer panicked while holding the lock.
    #[error("storage lock poisoned")]
    Poisoned,
}

/// A string key/value store.
pub trait Storage: Send + Sync {
    /// Read a value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write a value, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove a value. Removing a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, StorageError> {
    mutex.lock().map_err(|_| StorageError::Poisoned)
}

// =============================================================================
// MemoryStorage
// =============================================================================

/// In-process storage, scoped to the lifetime of the value.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStorage {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(lock(&self.entries)?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        lock(&self.entries)?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        lock(&self.entries)?.remove(key);
        Ok(())
    }
}

// =============================================================================
// FileStorage
// =============================================================================

/// Storage persisted as a single JSON object file.
///
/// Every operation re-reads the file so that separate CLI invocations see
/// each other's writes. A missing file is an empty store.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    guard: Mutex<()>,
}

impl FileStorage {
    /// Create a store backed by `path`. The file is created on first write.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            guard: Mutex::new(()),
        }
    }

    /// Location of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<BTreeMap<String, String>, StorageError> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) if contents.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_map(&self, map: &BTreeMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(map)?)?;
        Ok(())
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let _guard = lock(&self.guard)?;
        Ok(self.read_map()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let _guard = lock(&self.guard)?;
        let mut map = self.read_map()?;
        map.insert(key.to_string(), value.to_string());
        self.write_map(&map)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let _guard = lock(&self.guard)?;
        let mut map = self.read_map()?;
        if map.remove(key).is_some() {
            self.write_map(&map)?;
        }
        Ok(())
    }
}

// =============================================================================
// SessionStore
// =============================================================================

/// The pair of stores used by the client.
#[derive(Clone)]
pub struct SessionStore {
    local: Arc<dyn Storage>,
    session: Arc<dyn Storage>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore").finish_non_exhaustive()
    }
}

impl SessionStore {
    /// Pair a persistent local store with a session store.
    #[must_use]
    pub fn new(local: Arc<dyn Storage>, session: Arc<dyn Storage>) -> Self {
        Self { local, session }
    }

    /// Both scopes in memory.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()), Arc::new(MemoryStorage::new()))
    }

    /// Both scopes as JSON files inside `dir` (`local.json`, `session.json`).
    #[must_use]
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(
            Arc::new(FileStorage::new(dir.join("local.json"))),
            Arc::new(FileStorage::new(dir.join("session.json"))),
        )
    }

    /// The persistent store.
    #[must_use]
    pub fn local(&self) -> &dyn Storage {
        self.local.as_ref()
    }

    /// The session-scoped store.
    #[must_use]
    pub fn session(&self) -> &dyn Storage {
        self.session.as_ref()
    }

    /// Read a session value.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.session.get(key)
    }

    /// Write a session value.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    pub fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.session.set(key, value)
    }

    /// Remove a session value.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    pub fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.session.remove(key)
    }

    /// Read a session value and parse it, discarding values that do not parse.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn get_parsed<T: std::str::FromStr>(&self, key: &str) -> Result<Option<T>, StorageError> {
        Ok(self.session.get(key)?.and_then(|raw| {
            let parsed = raw.parse().ok();
            if parsed.is_none() {
                warn!(key, "ignoring unparseable session value");
            }
            parsed
        }))
    }

    /// Read a JSON encoded value from `storage`.
    ///
    /// A value that does not decode is removed and reported as absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be accessed.
    pub fn get_json<T: DeserializeOwned>(
        storage: &dyn Storage,
        key: &str,
    ) -> Result<Option<T>, StorageError> {
        let Some(raw) = storage.get(key)? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!(key, error = %e, "discarding malformed stored value");
                storage.remove(key)?;
                Ok(None)
            }
        }
    }

    /// Write a JSON encoded value to `storage`.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails or the store cannot be written.
    pub fn set_json<T: Serialize + ?Sized>(
        storage: &dyn Storage,
        key: &str,
        value: &T,
    ) -> Result<(), StorageError> {
        storage.set(key, &serde_json::to_string(value)?)
    }

    /// Remove the four checkout selection keys, leaving the order keys.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    pub fn clear_checkout(&self) -> Result<(), StorageError> {
        keys::CHECKOUT
            .iter()
            .try_for_each(|key| self.session.remove(key))
    }

    /// Remove every session-scoped key.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    pub fn clear_session(&self) -> Result<(), StorageError> {
        keys::SESSION
            .iter()
            .try_for_each(|key| self.session.remove(key))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn seeded() -> SessionStore {
        let store = SessionStore::in_memory();
        for key in keys::SESSION {
            store.set(key, "1").unwrap();
        }
        store
    }

    #[test]
    fn test_clear_checkout_keeps_order_keys() {
        let store = seeded();
        store.clear_checkout().unwrap();

        for key in keys::CHECKOUT {
            assert_eq!(store.get(key).unwrap(), None, "{key} should be cleared");
        }
        assert_eq!(store.get(keys::ORDER_ID).unwrap().as_deref(), Some("1"));
        assert_eq!(store.get(keys::ORDER_NUMBER).unwrap().as_deref(), Some("1"));
    }

    #[test]
    fn test_clear_session_removes_everything() {
        let store = seeded();
        store.local().set(keys::CURRENT_USER, "{}").unwrap();
        store.clear_session().unwrap();

        for key in keys::SESSION {
            assert_eq!(store.get(key).unwrap(), None);
        }
        // The local scope is untouched.
        assert!(store.local().get(keys::CURRENT_USER).unwrap().is_some());
    }

    #[test]
    fn test_get_json_discards_malformed_values() {
        let storage = MemoryStorage::new();
        storage.set("thing", "{not json").unwrap();

        let value: Option<BTreeMap<String, String>> =
            SessionStore::get_json(&storage, "thing").unwrap();
        assert!(value.is_none());
        assert_eq!(storage.get("thing").unwrap(), None);
    }

    #[test]
    fn test_get_parsed_ignores_garbage() {
        let store = SessionStore::in_memory();
        store.set(keys::SHIPPING_ADDRESS_ID, "abc").unwrap();
        let parsed: Option<i64> = store.get_parsed(keys::SHIPPING_ADDRESS_ID).unwrap();
        assert_eq!(parsed, None);

        store.set(keys::SHIPPING_ADDRESS_ID, "7").unwrap();
        let parsed: Option<i64> = store.get_parsed(keys::SHIPPING_ADDRESS_ID).unwrap();
        assert_eq!(parsed, Some(7));
    }

    #[test]
    fn test_file_storage_persists_between_instances() {
        let dir = std::env::temp_dir().join(format!(
            "bazaar-storage-test-{}-{}",
            std::process::id(),
            line!()
        ));
        let path = dir.join("session.json");

        let first = FileStorage::new(&path);
        assert_eq!(first.get("orderId").unwrap(), None);
        first.set("orderId", "42").unwrap();
        first.set("orderNumber", "ORD-42").unwrap();

        let second = FileStorage::new(&path);
        assert_eq!(second.get("orderId").unwrap().as_deref(), Some("42"));
        second.remove("orderId").unwrap();
        assert_eq!(first.get("orderId").unwrap(), None);
        assert_eq!(first.get("orderNumber").unwrap().as_deref(), Some("ORD-42"));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
