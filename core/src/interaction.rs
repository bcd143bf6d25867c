//! Segment interaction bridge between the distribution view and the host.
//!
//! Hover and leave notifications are coalesced: each one replaces whatever is
//! still pending and is delivered after a fixed delay. Clicks are delivered
//! immediately.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use runlens_types::RecordId;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};

use crate::context::InteractionError;

/// Notification delivered to the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InteractionEvent {
    /// Pointer rests on a segment; highlight its records
    Highlight(Vec<RecordId>),
    ClearHighlight,
    /// Segment clicked; select its records
    Select(Vec<RecordId>),
}

/// Single-slot delayed delivery. Scheduling cancels the pending delivery.
struct HoverCoalescer {
    runtime: Handle,
    delay: Duration,
    pending: Option<JoinHandle<()>>,
}

impl HoverCoalescer {
    fn schedule(&mut self, tx: UnboundedSender<InteractionEvent>, event: InteractionEvent) {
        self.cancel();
        let deadline = Instant::now() + self.delay;
        self.pending = Some(self.runtime.spawn(async move {
            sleep_until(deadline).await;
            let _ = tx.send(event);
        }));
    }

    fn cancel(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
    }
}

impl Drop for HoverCoalescer {
    fn drop(&mut self) {
        self.cancel();
    }
}

struct BridgeState {
    /// `None` once torn down
    tx: Option<UnboundedSender<InteractionEvent>>,
    hover: HoverCoalescer,
}

/// Cloneable handle for reporting segment interactions.
#[derive(Clone)]
pub struct InteractionBridge {
    state: Arc<Mutex<BridgeState>>,
}

impl InteractionBridge {
    /// Create a bridge on the current tokio runtime. Events arrive on the
    /// returned receiver.
    pub fn new(
        delay: Duration,
    ) -> Result<(Self, UnboundedReceiver<InteractionEvent>), InteractionError> {
        let runtime = Handle::try_current().map_err(|_| InteractionError::NoRuntime)?;
        let (tx, rx) = mpsc::unbounded_channel();
        let bridge = Self {
            state: Arc::new(Mutex::new(BridgeState {
                tx: Some(tx),
                hover: HoverCoalescer {
                    runtime,
                    delay,
                    pending: None,
                },
            })),
        };
        Ok((bridge, rx))
    }

    pub fn on_segment_hover(&self, records: Vec<RecordId>) -> Result<(), InteractionError> {
        self.coalesce(InteractionEvent::Highlight(records))
    }

    pub fn on_segment_leave(&self) -> Result<(), InteractionError> {
        self.coalesce(InteractionEvent::ClearHighlight)
    }

    pub fn on_segment_click(&self, records: Vec<RecordId>) -> Result<(), InteractionError> {
        let state = self.lock();
        let tx = state.tx.as_ref().ok_or(InteractionError::SessionClosed)?;
        if tx.send(InteractionEvent::Select(records)).is_err() {
            tracing::debug!("Interaction receiver dropped, click discarded");
        }
        Ok(())
    }

    /// Cancel any pending hover delivery and close the bridge. Idempotent.
    pub fn teardown(&self) {
        let mut state = self.lock();
        state.hover.cancel();
        if state.tx.take().is_some() {
            tracing::debug!("Interaction bridge torn down");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.lock().tx.is_none()
    }

    fn coalesce(&self, event: InteractionEvent) -> Result<(), InteractionError> {
        let mut state = self.lock();
        let tx = state.tx.clone().ok_or(InteractionError::SessionClosed)?;
        state.hover.schedule(tx, event);
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, BridgeState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
