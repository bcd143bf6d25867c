use std::path::Path;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc::{self, Receiver};

use super::error::WatcherError;
use crate::selection::{FileStore, SeenPayloads, SelectionStore, StorageChange, StorageKey};

pub enum StoreEvent {
    /// Another session changed a persisted selection entry
    Changed(StorageChange),
    Error(String),
}

/// Watches a [`FileStore`] directory and reports writes made by other
/// sessions. Notifications carrying the payload this session last wrote or
/// was last told about are dropped.
pub struct StoreWatcher {
    _watcher: RecommendedWatcher,
    rx: Receiver<notify::Result<Event>>,
    reader: FileStore,
    seen: SeenPayloads,
}

impl StoreWatcher {
    pub fn new(store: &FileStore) -> Result<Self, WatcherError> {
        let (tx, rx) = mpsc::channel(100);

        let mut watcher = RecommendedWatcher::new(
            move |res| {
                let _ = tx.blocking_send(res);
            },
            Config::default(),
        )
        .map_err(WatcherError::InitWatcher)?;

        let dir = store.directory().to_path_buf();
        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .map_err(|source| WatcherError::WatchPath {
                path: dir.clone(),
                source,
            })?;
        tracing::info!(path = %dir.display(), "Watching selection storage");

        Ok(Self {
            _watcher: watcher,
            rx,
            reader: store.clone(),
            seen: store.seen_payloads(),
        })
    }

    pub async fn next_event(&mut self) -> Option<StoreEvent> {
        while let Some(event_result) = self.rx.recv().await {
            match event_result {
                Ok(event) => {
                    if let Some(store_event) = self.process_event(event) {
                        return Some(store_event);
                    }
                }
                Err(e) => {
                    return Some(StoreEvent::Error(format!("Storage watcher error: {}", e)));
                }
            }
        }
        None
    }

    fn process_event(&mut self, event: Event) -> Option<StoreEvent> {
        let removed = match event.kind {
            EventKind::Create(_) | EventKind::Modify(_) => false,
            EventKind::Remove(_) => true,
            _ => return None,
        };

        // Renames report both the temp file and the target; only the target matters
        let key = event.paths.iter().find_map(|p| storage_key(p))?;
        let new_value = if removed {
            None
        } else {
            match self.reader.read(key) {
                Ok(value) => value,
                Err(e) => {
                    return Some(StoreEvent::Error(format!(
                        "Failed to read selection entry: {}",
                        e
                    )));
                }
            }
        };

        if self.seen.is_current(key, new_value.as_deref()) {
            return None;
        }
        self.seen.observe(key, new_value.as_deref());

        tracing::debug!(key = key.as_str(), removed, "Foreign selection write");
        Some(StoreEvent::Changed(StorageChange { key, new_value }))
    }
}

fn storage_key(path: &Path) -> Option<StorageKey> {
    path.file_name()
        .and_then(|n| n.to_str())
        .and_then(StorageKey::from_file_name)
}
