//! Durable storage for the persisted selection.
//!
//! Two independent entries are kept, each a JSON array of strings. All reads
//! and writes go through [`SelectionStore`]; nothing else touches the medium.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use hashbrown::HashMap;
use tokio::sync::broadcast;

use crate::context::StorageError;

/// The two persisted selection entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
    SelectedCategories,
    SelectedSubtypes,
}

impl StorageKey {
    pub const ALL: [StorageKey; 2] = [StorageKey::SelectedCategories, StorageKey::SelectedSubtypes];

    pub fn as_str(&self) -> &'static str {
        match self {
            StorageKey::SelectedCategories => "selectedCategories",
            StorageKey::SelectedSubtypes => "selectedSubtypeKeys",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == name)
    }

    /// File backing this key inside a [`FileStore`] directory
    pub fn file_name(&self) -> String {
        format!("{}.json", self.as_str())
    }

    pub fn from_file_name(file_name: &str) -> Option<Self> {
        file_name
            .strip_suffix(".json")
            .and_then(Self::from_name)
    }
}

/// A persisted value changed in another session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageChange {
    pub key: StorageKey,
    /// `None` when the entry was removed
    pub new_value: Option<String>,
}

/// Synchronous key/value medium for the persisted selection.
pub trait SelectionStore {
    fn read(&self, key: StorageKey) -> Result<Option<String>, StorageError>;
    fn write(&self, key: StorageKey, value: &str) -> Result<(), StorageError>;
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // Store state stays consistent even if a writer panicked mid-update
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ─────────────────────────────────────────────────────────────────────────────
// File Store
// ─────────────────────────────────────────────────────────────────────────────

/// Last payload this session knows each entry to hold, whether it wrote the
/// payload itself or was told about it by the watcher.
///
/// Shared with the storage watcher so it can drop notifications that carry
/// nothing new, such as the echo of our own writes.
#[derive(Debug, Clone, Default)]
pub struct SeenPayloads(Arc<Mutex<HashMap<StorageKey, String>>>);

impl SeenPayloads {
    /// Remember `value` as the current content of `key`; `None` forgets it
    pub fn observe(&self, key: StorageKey, value: Option<&str>) {
        let mut seen = lock(&self.0);
        match value {
            Some(value) => {
                seen.insert(key, value.to_string());
            }
            None => {
                seen.remove(&key);
            }
        }
    }

    /// True if `value` is exactly what this session last saw in `key`
    pub fn is_current(&self, key: StorageKey, value: Option<&str>) -> bool {
        match value {
            Some(value) => lock(&self.0).get(&key).is_some_and(|seen| seen == value),
            None => false,
        }
    }
}

/// One JSON file per entry inside a directory shared by all sessions.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
    seen: SeenPayloads,
}

impl FileStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| StorageError::CreateDir {
            path: dir.clone(),
            source,
        })?;
        Ok(Self {
            dir,
            seen: SeenPayloads::default(),
        })
    }

    pub fn directory(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: StorageKey) -> PathBuf {
        self.dir.join(key.file_name())
    }

    pub fn seen_payloads(&self) -> SeenPayloads {
        self.seen.clone()
    }
}

impl SelectionStore for FileStore {
    fn read(&self, key: StorageKey) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Read { path, source }),
        }
    }

    fn write(&self, key: StorageKey, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key);

        // Record first: the watcher may observe the rename before we return
        self.seen.observe(key, Some(value));

        // Write to a uniquely named sibling, then rename, so other sessions
        // never read a partial payload or clobber our temp file
        let write_err = |source| StorageError::Write {
            path: path.clone(),
            source,
        };
        let mut tmp = tempfile::Builder::new()
            .prefix(key.as_str())
            .suffix(".tmp")
            .tempfile_in(&self.dir)
            .map_err(write_err)?;
        tmp.write_all(value.as_bytes()).map_err(write_err)?;
        tmp.persist(&path).map_err(|e| write_err(e.error))?;
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Memory Store
// ─────────────────────────────────────────────────────────────────────────────

const CHANGE_CHANNEL_CAPACITY: usize = 64;

struct MemoryBackend {
    entries: Mutex<HashMap<StorageKey, String>>,
    changes: broadcast::Sender<(u64, StorageChange)>,
    next_session: AtomicU64,
    writes: AtomicUsize,
}

/// In-process store shared by any number of sessions.
///
/// Each handle is one session; writes are broadcast to every other handle
/// connected to the same backend.
#[derive(Clone)]
pub struct MemoryStore {
    backend: Arc<MemoryBackend>,
    session_id: u64,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            backend: Arc::new(MemoryBackend {
                entries: Mutex::new(HashMap::new()),
                changes,
                next_session: AtomicU64::new(1),
                writes: AtomicUsize::new(0),
            }),
            session_id: 0,
        }
    }

    /// Handle for another session over the same backend
    pub fn connect(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            session_id: self.backend.next_session.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// Changes written by other sessions from now on
    pub fn subscribe(&self) -> StorageChanges {
        StorageChanges {
            rx: self.backend.changes.subscribe(),
            session_id: self.session_id,
        }
    }

    /// Total writes across all sessions
    pub fn write_count(&self) -> usize {
        self.backend.writes.load(Ordering::Relaxed)
    }

    /// Current raw payload, regardless of which session wrote it
    pub fn raw(&self, key: StorageKey) -> Option<String> {
        lock(&self.backend.entries).get(&key).cloned()
    }
}

impl SelectionStore for MemoryStore {
    fn read(&self, key: StorageKey) -> Result<Option<String>, StorageError> {
        Ok(self.raw(key))
    }

    fn write(&self, key: StorageKey, value: &str) -> Result<(), StorageError> {
        lock(&self.backend.entries).insert(key, value.to_string());
        self.backend.writes.fetch_add(1, Ordering::Relaxed);

        let change = StorageChange {
            key,
            new_value: Some(value.to_string()),
        };
        // No subscribers is fine
        let _ = self.backend.changes.send((self.session_id, change));
        Ok(())
    }
}

/// Receiver of changes made by other sessions on a [`MemoryStore`].
pub struct StorageChanges {
    rx: broadcast::Receiver<(u64, StorageChange)>,
    session_id: u64,
}

impl StorageChanges {
    pub async fn next(&mut self) -> Option<StorageChange> {
        loop {
            match self.rx.recv().await {
                Ok((origin, change)) if origin != self.session_id => return Some(change),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Storage change receiver lagged");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Next pending change without waiting
    pub fn try_next(&mut self) -> Option<StorageChange> {
        loop {
            match self.rx.try_recv() {
                Ok((origin, change)) if origin != self.session_id => return Some(change),
                Ok(_) => continue,
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Storage change receiver lagged");
                    continue;
                }
                Err(_) => return None,
            }
        }
    }
}
