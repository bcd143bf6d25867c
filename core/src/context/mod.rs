mod background_tasks;
mod config;
mod error;
pub mod watcher;

pub use background_tasks::BackgroundTasks;
pub use config::{AppConfig, AppConfigExt, CategoryOrder};
pub use error::{ConfigError, FeedError, InteractionError, StorageError, WatcherError};
pub use watcher::{StoreEvent, StoreWatcher};
