use tokio::task::JoinHandle;

/// Long-running tasks owned by a frontend session
#[derive(Default)]
pub struct BackgroundTasks {
    pub store_watcher: Option<JoinHandle<()>>,
    pub interaction_printer: Option<JoinHandle<()>>,
}

impl BackgroundTasks {
    /// Abort every task and wait for each to finish unwinding.
    ///
    /// Returns how many tasks were running. A task that panicked is logged,
    /// not propagated, so shutdown always completes.
    pub async fn abort_all(&mut self) -> usize {
        let tasks = [
            ("interaction_printer", self.interaction_printer.take()),
            ("store_watcher", self.store_watcher.take()),
        ];

        let mut stopped = 0;
        for (name, handle) in tasks {
            let Some(handle) = handle else {
                continue;
            };
            handle.abort();
            match handle.await {
                Ok(()) => tracing::debug!(task = name, "Background task already finished"),
                Err(e) if e.is_cancelled() => tracing::debug!(task = name, "Background task aborted"),
                Err(e) => tracing::warn!(task = name, error = %e, "Background task panicked"),
            }
            stopped += 1;
        }
        stopped
    }

    pub fn is_idle(&self) -> bool {
        self.store_watcher.is_none() && self.interaction_printer.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[tokio::test]
    async fn abort_all_waits_for_running_tasks() {
        let dropped = Arc::new(AtomicBool::new(false));
        struct SetOnDrop(Arc<AtomicBool>);
        impl Drop for SetOnDrop {
            fn drop(&mut self) {
                self.0.store(true, Ordering::SeqCst);
            }
        }

        let guard = SetOnDrop(Arc::clone(&dropped));
        let mut tasks = BackgroundTasks {
            store_watcher: Some(tokio::spawn(async move {
                let _guard = guard;
                std::future::pending::<()>().await;
            })),
            interaction_printer: Some(tokio::spawn(async {})),
        };

        assert_eq!(tasks.abort_all().await, 2);
        assert!(dropped.load(Ordering::SeqCst));
        assert!(tasks.is_idle());
        assert_eq!(tasks.abort_all().await, 0);
    }

    #[tokio::test]
    async fn abort_all_survives_a_panicked_task() {
        let mut tasks = BackgroundTasks {
            store_watcher: Some(tokio::spawn(async { panic!("watcher failed") })),
            interaction_printer: None,
        };
        tokio::task::yield_now().await;

        assert_eq!(tasks.abort_all().await, 1);
        assert!(tasks.is_idle());
    }
}
