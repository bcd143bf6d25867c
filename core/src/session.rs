//! A dashboard session: selection engine plus interaction bridge, with
//! explicit init and teardown.

use runlens_types::{AppConfig, CategoryOrder, Distribution};
use tokio::sync::mpsc::UnboundedReceiver;

use crate::context::{AppConfigExt, InteractionError};
use crate::interaction::{InteractionBridge, InteractionEvent};
use crate::selection::{SelectionEngine, SelectionStore};

pub struct DashboardSession<S: SelectionStore> {
    engine: SelectionEngine<S>,
    bridge: InteractionBridge,
    order: CategoryOrder,
}

impl<S: SelectionStore> DashboardSession<S> {
    /// Hydrate the selection from `store` and open the interaction bridge.
    /// Must be called from within a tokio runtime.
    pub fn init(
        store: S,
        config: &AppConfig,
    ) -> Result<(Self, UnboundedReceiver<InteractionEvent>), InteractionError> {
        let (bridge, events) = InteractionBridge::new(config.hover_delay())?;
        let engine = SelectionEngine::init(store, config.excluded_categories());
        let session = Self {
            engine,
            bridge,
            order: config.category_order.clone(),
        };
        Ok((session, events))
    }

    pub fn engine(&self) -> &SelectionEngine<S> {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut SelectionEngine<S> {
        &mut self.engine
    }

    pub fn bridge(&self) -> &InteractionBridge {
        &self.bridge
    }

    pub fn order(&self) -> &CategoryOrder {
        &self.order
    }

    pub fn set_order(&mut self, order: CategoryOrder) {
        self.order = order;
    }

    /// Distribution in the session's configured order
    pub fn distribution(&self) -> Distribution {
        self.engine.distribution(&self.order)
    }

    /// Cancel pending interaction timers and close the bridge
    pub fn teardown(&self) {
        self.bridge.teardown();
    }
}

impl<S: SelectionStore> Drop for DashboardSession<S> {
    fn drop(&mut self) {
        self.bridge.teardown();
    }
}
