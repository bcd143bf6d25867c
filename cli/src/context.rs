use runlens_core::context::{AppConfig, AppConfigExt, BackgroundTasks};
use runlens_core::interaction::InteractionEvent;
use runlens_core::{DashboardSession, FileStore};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::{Mutex, RwLock};

/// Shared handle to the dashboard session, passed to commands and the store watcher.
pub type SessionHandle = Arc<RwLock<DashboardSession<FileStore>>>;

/// Holds all shared state for the CLI application.
/// This is a lightweight container - logic lives in runlens-core.
#[derive(Clone)]
pub struct CliContext {
    pub config: Arc<RwLock<AppConfig>>,
    session: SessionHandle,
    store: FileStore,
    pub tasks: Arc<Mutex<BackgroundTasks>>,
    /// Feed file most recently loaded, for `reload`
    pub feed_path: Arc<RwLock<Option<PathBuf>>>,
}

impl CliContext {
    /// Load configuration, open the selection store and hydrate the session.
    /// Must run inside the tokio runtime.
    pub fn new() -> Result<(Self, UnboundedReceiver<InteractionEvent>), String> {
        let config = AppConfig::load();
        let store = FileStore::open(config.storage_path()).map_err(|e| e.to_string())?;
        let (session, events) =
            DashboardSession::init(store.clone(), &config).map_err(|e| e.to_string())?;

        let ctx = Self {
            config: Arc::new(RwLock::new(config)),
            session: Arc::new(RwLock::new(session)),
            store,
            tasks: Arc::new(Mutex::new(BackgroundTasks::default())),
            feed_path: Arc::new(RwLock::new(None)),
        };
        Ok((ctx, events))
    }

    pub fn session(&self) -> SessionHandle {
        Arc::clone(&self.session)
    }

    pub fn store(&self) -> &FileStore {
        &self.store
    }

    /// Stop background tasks and tear the session down.
    pub async fn shutdown(&self) {
        let stopped = self.tasks.lock().await.abort_all().await;
        tracing::debug!(stopped, "Background tasks stopped");
        self.session.read().await.teardown();
    }
}
