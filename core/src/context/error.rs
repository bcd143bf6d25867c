//! Error types for context operations

use std::path::PathBuf;
use thiserror::Error;

/// Errors reading or writing the persisted selection
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to create storage directory {path}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode selection")]
    Encode(#[source] serde_json::Error),
}

/// Errors loading a record feed
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("failed to read record feed {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid record feed {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors watching the storage directory for other sessions' writes
#[derive(Debug, Error)]
pub enum WatcherError {
    #[error("failed to initialize file watcher")]
    InitWatcher(#[source] notify::Error),

    #[error("failed to watch path {path}")]
    WatchPath {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },
}

/// Errors during configuration operations
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration")]
    Load(#[from] confy::ConfyError),

    #[error("failed to save configuration")]
    Save(#[source] confy::ConfyError),
}

/// Errors from the segment interaction surface
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InteractionError {
    #[error("interaction session has been torn down")]
    SessionClosed,

    #[error("hover coalescing requires a running tokio runtime")]
    NoRuntime,
}
