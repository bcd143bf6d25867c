pub mod context;
pub mod distribution;
pub mod feed;
pub mod filter;
pub mod interaction;
pub mod selection;
pub mod session;
pub mod taxonomy;

#[cfg(test)]
mod test_support;

// Re-exports for convenience
pub use context::watcher as store_watcher;
pub use distribution::{aggregate, percentage};
pub use feed::RecordFeed;
pub use filter::{filter_records, passes};
pub use interaction::{InteractionBridge, InteractionEvent};
pub use runlens_types::*;
pub use selection::{
    FileStore, MemoryStore, SelectionEngine, SelectionState, SelectionStore, StorageChange,
    StorageKey,
};
pub use session::DashboardSession;
pub use taxonomy::{CategoryEntry, SubtypeEntry, SubtypeKey, Taxonomy};
