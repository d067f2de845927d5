//! User identity store.
//!
//! Centralizes access to the user record under [`USER_STORAGE_KEY`] and
//! keeps an in-memory copy synchronized with writes made through other
//! store instances sharing the same storage backend.

use std::sync::{Arc, RwLock};

use tracing::warn;

use crate::model::User;
use crate::storage::{KeyValueStorage, StorageEvent, USER_STORAGE_KEY};

pub struct UserStore {
    storage: Arc<dyn KeyValueStorage>,
    current: Arc<RwLock<Option<User>>>,
}

/// Parse a stored user record. `"null"` and malformed JSON both yield
/// `None`; parse failures are logged, never propagated.
fn parse_user(raw: &str) -> Option<User> {
    match serde_json::from_str::<Option<User>>(raw) {
        Ok(user) => user,
        Err(e) => {
            warn!(error = %e, "ignoring malformed user record");
            None
        }
    }
}

impl UserStore {
    /// Build a store over `storage` and register the change listener that
    /// keeps this instance consistent with other contexts. On malformed
    /// incoming JSON the in-memory record is left unchanged.
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        let initial = storage.get(USER_STORAGE_KEY).as_deref().and_then(parse_user);
        let current = Arc::new(RwLock::new(initial));

        let shared = Arc::clone(&current);
        storage.subscribe(Box::new(move |event: &StorageEvent| {
            if event.key != USER_STORAGE_KEY {
                return;
            }
            match event.new_value.as_deref() {
                None => *shared.write().unwrap() = None,
                Some(raw) => match serde_json::from_str::<Option<User>>(raw) {
                    Ok(user) => *shared.write().unwrap() = user,
                    Err(e) => {
                        warn!(error = %e, "ignoring malformed user record from storage event");
                    }
                },
            }
        }));

        Self { storage, current }
    }

    pub fn user(&self) -> Option<User> {
        self.current.read().unwrap().clone()
    }

    pub fn user_id(&self) -> Option<String> {
        self.current.read().unwrap().as_ref().map(|u| u.id.clone())
    }

    /// Persist `user` (`None` clears storage) and update the in-memory
    /// record in the same call.
    pub fn set_user(&self, user: Option<User>) {
        match &user {
            Some(u) => match serde_json::to_string(u) {
                Ok(raw) => self.storage.set(USER_STORAGE_KEY, Some(&raw)),
                Err(e) => warn!(error = %e, "failed to serialize user record"),
            },
            None => self.storage.set(USER_STORAGE_KEY, None),
        }
        *self.current.write().unwrap() = user;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use serde_json::json;

    fn user(id: &str) -> User {
        User {
            id: id.to_string(),
            extra: serde_json::Map::new(),
        }
    }

    #[test]
    fn missing_record_yields_no_user() {
        let store = UserStore::new(Arc::new(MemoryStorage::new()));
        assert_eq!(store.user(), None);
        assert_eq!(store.user_id(), None);
    }

    #[test]
    fn malformed_record_yields_no_user_and_never_panics() {
        for raw in ["{", "not json", r#"{"email":"a@b.c"}"#, "[1,2]"] {
            let storage = MemoryStorage::new();
            storage.set(USER_STORAGE_KEY, Some(raw));
            let store = UserStore::new(Arc::new(storage));
            assert_eq!(store.user(), None, "raw = {raw}");
        }
    }

    #[test]
    fn literal_null_record_yields_no_user() {
        let storage = MemoryStorage::new();
        storage.set(USER_STORAGE_KEY, Some("null"));
        let store = UserStore::new(Arc::new(storage));
        assert_eq!(store.user(), None);
    }

    #[test]
    fn set_user_persists_and_clears() {
        let storage = MemoryStorage::new();
        let store = UserStore::new(Arc::new(storage.clone()));

        store.set_user(Some(user("u1")));
        assert_eq!(store.user_id().as_deref(), Some("u1"));
        assert_eq!(
            serde_json::from_str::<serde_json::Value>(
                &storage.get(USER_STORAGE_KEY).unwrap()
            )
            .unwrap(),
            json!({ "_id": "u1" })
        );

        store.set_user(None);
        assert_eq!(store.user(), None);
        assert_eq!(storage.get(USER_STORAGE_KEY), None);
    }

    #[test]
    fn two_contexts_over_shared_storage_stay_consistent() {
        let storage = MemoryStorage::new();
        let first = UserStore::new(Arc::new(storage.clone()));
        let second = UserStore::new(Arc::new(storage));

        first.set_user(Some(user("u1")));
        assert_eq!(second.user_id().as_deref(), Some("u1"));
        assert_eq!(first.user(), second.user());

        second.set_user(None);
        assert_eq!(first.user(), None);
    }

    #[test]
    fn malformed_external_write_leaves_record_unchanged() {
        let storage = MemoryStorage::new();
        let store = UserStore::new(Arc::new(storage.clone()));
        store.set_user(Some(user("u1")));

        // Another context corrupts the key; the listener must not clobber
        // the last known good record.
        storage.set(USER_STORAGE_KEY, Some("{broken"));
        assert_eq!(store.user_id().as_deref(), Some("u1"));
    }
}
