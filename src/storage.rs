//! Durable local key-value storage.
//!
//! The platform keeps small per-user records (the identity record in
//! particular) in local storage shared between browsing contexts. This
//! module exposes that as a port trait with two backends: an in-memory
//! store whose handles can be shared between contexts, and an on-disk
//! store for standalone desktop use.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

/// Storage key holding the serialized user record.
pub const USER_STORAGE_KEY: &str = "tridyme_user";

/// Change notification delivered to storage listeners after a write.
#[derive(Debug, Clone)]
pub struct StorageEvent {
    pub key: String,
    pub new_value: Option<String>,
}

pub type StorageListener = Box<dyn Fn(&StorageEvent) + Send + Sync>;

/// Port over durable local key-value storage.
///
/// Writes are best-effort: backends log failures instead of propagating
/// them, mirroring how browser storage behaves for its callers.
pub trait KeyValueStorage: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    /// Persist `value` under `key` (`None` removes the entry), then notify
    /// every registered listener synchronously. Listeners must not write
    /// back into the storage they observe.
    fn set(&self, key: &str, value: Option<&str>);

    /// Register a listener invoked after every `set`, including sets made
    /// through other handles sharing the same backend.
    fn subscribe(&self, listener: StorageListener);
}

#[derive(Default)]
struct ListenerSet {
    listeners: Mutex<Vec<StorageListener>>,
}

impl ListenerSet {
    fn push(&self, listener: StorageListener) {
        self.listeners.lock().unwrap().push(listener);
    }

    fn notify(&self, key: &str, new_value: Option<&str>) {
        let event = StorageEvent {
            key: key.to_string(),
            new_value: new_value.map(str::to_string),
        };
        for listener in self.listeners.lock().unwrap().iter() {
            listener(&event);
        }
    }
}

/// In-memory storage backend.
///
/// Cloned handles share the same entries and listeners, so two handles
/// behave like two browsing contexts over one local storage area.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    inner: Arc<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    entries: Mutex<HashMap<String, String>>,
    listeners: ListenerSet,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.inner.entries.lock().unwrap().get(key).cloned()
    }

    fn set(&self, key: &str, value: Option<&str>) {
        {
            let mut entries = self.inner.entries.lock().unwrap();
            match value {
                Some(v) => entries.insert(key.to_string(), v.to_string()),
                None => entries.remove(key),
            };
        }
        self.inner.listeners.notify(key, value);
    }

    fn subscribe(&self, listener: StorageListener) {
        self.inner.listeners.push(listener);
    }
}

/// On-disk storage backend: one JSON file per key under a base directory.
///
/// Notifications are process-local only; other processes writing the same
/// directory are not observed.
pub struct FileStorage {
    dir: PathBuf,
    listeners: ListenerSet,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            listeners: ListenerSet::default(),
        }
    }

    /// Conventional storage directory for standalone installs.
    pub fn default_dir() -> Option<PathBuf> {
        dirs::data_local_dir().map(|d| d.join("tridyme"))
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStorage for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        fs::read_to_string(self.path_for(key)).ok()
    }

    fn set(&self, key: &str, value: Option<&str>) {
        let path = self.path_for(key);
        match value {
            Some(v) => {
                if let Err(e) = fs::create_dir_all(&self.dir)
                    .and_then(|()| fs::write(&path, v))
                {
                    warn!(key, error = %e, "failed to persist storage entry");
                    return;
                }
                debug!(key, path = %path.display(), "persisted storage entry");
            }
            None => {
                if let Err(e) = fs::remove_file(&path) {
                    if e.kind() != std::io::ErrorKind::NotFound {
                        warn!(key, error = %e, "failed to remove storage entry");
                        return;
                    }
                }
            }
        }
        self.listeners.notify(key, value);
    }

    fn subscribe(&self, listener: StorageListener) {
        self.listeners.push(listener);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn memory_set_get_remove() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.get("k"), None);
        storage.set("k", Some("v"));
        assert_eq!(storage.get("k").as_deref(), Some("v"));
        storage.set("k", None);
        assert_eq!(storage.get("k"), None);
    }

    #[test]
    fn cloned_memory_handles_share_entries_and_listeners() {
        let a = MemoryStorage::new();
        let b = a.clone();
        let fired = Arc::new(AtomicUsize::new(0));

        let observed = Arc::clone(&fired);
        b.subscribe(Box::new(move |event| {
            assert_eq!(event.key, "k");
            assert_eq!(event.new_value.as_deref(), Some("v"));
            observed.fetch_add(1, Ordering::SeqCst);
        }));

        a.set("k", Some("v"));
        assert_eq!(b.get("k").as_deref(), Some("v"));
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn listener_receives_removal_as_none() {
        let storage = MemoryStorage::new();
        let last = Arc::new(Mutex::new(Some("sentinel".to_string())));
        let seen = Arc::clone(&last);
        storage.subscribe(Box::new(move |event| {
            *seen.lock().unwrap() = event.new_value.clone();
        }));
        storage.set("k", None);
        assert_eq!(*last.lock().unwrap(), None);
    }

    #[test]
    fn file_storage_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());

        assert_eq!(storage.get(USER_STORAGE_KEY), None);
        storage.set(USER_STORAGE_KEY, Some(r#"{"_id":"u1"}"#));
        assert_eq!(
            storage.get(USER_STORAGE_KEY).as_deref(),
            Some(r#"{"_id":"u1"}"#)
        );
        assert!(dir.path().join("tridyme_user.json").exists());

        storage.set(USER_STORAGE_KEY, None);
        assert_eq!(storage.get(USER_STORAGE_KEY), None);
    }

    #[test]
    fn file_storage_removal_of_missing_key_still_notifies() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());
        let fired = Arc::new(AtomicUsize::new(0));
        let observed = Arc::clone(&fired);
        storage.subscribe(Box::new(move |_| {
            observed.fetch_add(1, Ordering::SeqCst);
        }));
        storage.set("absent", None);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }
}
