use crate::CliContext;
use runlens_core::store_watcher::{StoreEvent, StoreWatcher};
use tokio::task::JoinHandle;

/// Start following selection writes made by other sessions
pub fn init_watcher(ctx: &CliContext) -> Option<JoinHandle<()>> {
    let mut watcher = match StoreWatcher::new(ctx.store()) {
        Ok(w) => w,
        Err(e) => {
            println!("Failed to start storage watcher: {}", e);
            return None;
        }
    };

    println!("Watching selection storage: {}", ctx.store().directory().display());

    let session = ctx.session();
    let handle = tokio::spawn(async move {
        while let Some(event) = watcher.next_event().await {
            match event {
                StoreEvent::Changed(change) => {
                    let key = change.key;
                    let mut s = session.write().await;
                    s.engine_mut().handle_storage_change(change);
                    println!(
                        "\n{} changed in another session, {} records pass",
                        key.as_str(),
                        s.engine().filtered_bots().len()
                    );
                }
                StoreEvent::Error(err) => {
                    println!("Error: {}", err);
                }
            }
        }
    });

    Some(handle)
}
