use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use crate::domain::model::id::TransportOrderId;
use crate::domain::model::transport_order::{TransportOrder, TransportOrderState};
use crate::error::{Error, Result};

/// Read/update access to transport orders.
pub trait TransportOrderService: Send + Sync {
    fn fetch_orders(&self) -> Vec<TransportOrder>;

    /// All orders currently in the given state, sorted by creation time.
    fn fetch_orders_in_state(&self, state: TransportOrderState) -> Vec<TransportOrder>;

    fn fetch_order(&self, id: &TransportOrderId) -> Option<TransportOrder>;

    fn update_order(&self, order: TransportOrder) -> Result<()>;

    /// Moves the order to `state`, validating the transition. Final states
    /// are terminal; violations surface as `InvalidStateTransition`.
    fn update_order_state(&self, id: &TransportOrderId, state: TransportOrderState) -> Result<()>;
}

/// In-memory transport-order store for tests and the demo binary.
#[derive(Clone, Default)]
pub struct InMemoryTransportOrderService {
    inner: Arc<RwLock<HashMap<TransportOrderId, TransportOrder>>>,
}

impl InMemoryTransportOrderService {
    pub fn new() -> Self {
        Self { inner: Arc::new(RwLock::new(HashMap::new())) }
    }

    pub fn add_order(&self, order: TransportOrder) {
        let mut guard = self.inner.write().unwrap();
        guard.insert(order.id.clone(), order);
    }
}

impl TransportOrderService for InMemoryTransportOrderService {
    fn fetch_orders(&self) -> Vec<TransportOrder> {
        let guard = self.inner.read().unwrap();
        let mut orders: Vec<TransportOrder> = guard.values().cloned().collect();
        orders.sort_by(|a, b| a.creation_time.cmp(&b.creation_time).then_with(|| a.id.cmp(&b.id)));
        orders
    }

    fn fetch_orders_in_state(&self, state: TransportOrderState) -> Vec<TransportOrder> {
        self.fetch_orders().into_iter().filter(|order| order.state == state).collect()
    }

    fn fetch_order(&self, id: &TransportOrderId) -> Option<TransportOrder> {
        let guard = self.inner.read().unwrap();
        guard.get(id).cloned()
    }

    fn update_order(&self, order: TransportOrder) -> Result<()> {
        let mut guard = self.inner.write().unwrap();
        if !guard.contains_key(&order.id) {
            return Err(Error::UnknownTransportOrder(order.id));
        }
        guard.insert(order.id.clone(), order);
        Ok(())
    }

    fn update_order_state(&self, id: &TransportOrderId, state: TransportOrderState) -> Result<()> {
        let mut guard = self.inner.write().unwrap();
        let order = guard.get_mut(id).ok_or_else(|| Error::UnknownTransportOrder(id.clone()))?;
        if !order.state.may_transition_to(state) {
            return Err(Error::InvalidStateTransition { order: id.clone(), from: order.state, to: state });
        }
        log::debug!("Transport order {} moves from {:?} to {:?}.", id, order.state, state);
        order.state = state;
        Ok(())
    }
}
