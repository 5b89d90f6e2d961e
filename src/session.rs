//! Per-user session store: maps a user identity to its single in-flight
//! upload. One active record per user; a new upload replaces any prior
//! unfinished one. Pure process memory, no durability across restarts.

use std::collections::HashMap;
use std::path::PathBuf;

use parking_lot::Mutex;
use tracing::debug;

/// Chat-platform user identity.
pub type UserId = i64;

/// Whether an upload is processed as a batch archive or a single file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Archive,
    SingleFile,
}

/// The single in-flight upload for one user.
#[derive(Debug, Clone)]
pub struct UploadRecord {
    /// Staged copy of the uploaded document.
    pub storage_path: PathBuf,
    pub kind: UploadKind,
    /// Name the user gave the document, used for output naming.
    pub original_name: String,
}

/// Keyed store passed by reference into the orchestrator.
/// Every operation is a single atomic map access; no lock is ever held
/// across an await point.
pub struct SessionStore {
    inner: Mutex<HashMap<UserId, UploadRecord>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
        }
    }

    /// Store the record for `user_id`, returning any replaced record.
    /// No merge: the previous record is silently dropped from the map.
    pub fn put(&self, user_id: UserId, record: UploadRecord) -> Option<UploadRecord> {
        let prev = self.inner.lock().insert(user_id, record);
        if prev.is_some() {
            debug!(user_id, "session_record_replaced");
        }
        prev
    }

    /// Current record for `user_id`, if any.
    pub fn get(&self, user_id: UserId) -> Option<UploadRecord> {
        self.inner.lock().get(&user_id).cloned()
    }

    /// Delete the mapping, returning the removed record.
    pub fn remove(&self, user_id: UserId) -> Option<UploadRecord> {
        self.inner.lock().remove(&user_id)
    }

    /// True if no user currently has an in-flight upload.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str) -> UploadRecord {
        UploadRecord {
            storage_path: PathBuf::from(format!("/tmp/{name}")),
            kind: UploadKind::SingleFile,
            original_name: name.to_string(),
        }
    }

    #[test]
    fn put_get_remove() {
        let store = SessionStore::new();
        assert!(store.get(1).is_none());

        store.put(1, record("a.srt"));
        assert_eq!(store.get(1).unwrap().original_name, "a.srt");

        let removed = store.remove(1).unwrap();
        assert_eq!(removed.original_name, "a.srt");
        assert!(store.get(1).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn new_upload_replaces_old() {
        let store = SessionStore::new();
        assert!(store.put(7, record("old.srt")).is_none());

        let prev = store.put(7, record("new.zip")).unwrap();
        assert_eq!(prev.original_name, "old.srt");
        assert_eq!(store.get(7).unwrap().original_name, "new.zip");
    }

    #[test]
    fn records_are_independent_per_user() {
        let store = SessionStore::new();
        store.put(1, record("one.srt"));
        store.put(2, record("two.srt"));

        store.remove(1);
        assert!(store.get(1).is_none());
        assert_eq!(store.get(2).unwrap().original_name, "two.srt");
    }
}
