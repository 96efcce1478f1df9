use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use crate::domain::model::id::{TransportOrderId, VehicleId};

/// Records non-committing order -> vehicle reservations.
///
/// A reservation earmarks an order for a vehicle that cannot accept it
/// immediately. It is advisory only: it allocates nothing and changes no
/// order or vehicle state, and a consumer must re-validate routability and
/// filters before committing, since plant state may have changed in between.
#[derive(Clone, Default)]
pub struct OrderReservationPool {
    inner: Arc<RwLock<HashMap<TransportOrderId, VehicleId>>>,
}

impl OrderReservationPool {
    pub fn new() -> Self {
        Self { inner: Arc::new(RwLock::new(HashMap::new())) }
    }

    pub fn add_reservation(&self, order: TransportOrderId, vehicle: VehicleId) {
        log::debug!("Reserving transport order {} for vehicle {}.", order, vehicle);
        let mut guard = self.inner.write().unwrap();
        guard.insert(order, vehicle);
    }

    /// Orders currently reserved for the given vehicle, sorted by name for
    /// reproducible consumption order.
    pub fn find_reservations(&self, vehicle: &VehicleId) -> Vec<TransportOrderId> {
        let guard = self.inner.read().unwrap();
        let mut orders: Vec<TransportOrderId> = guard.iter().filter(|(_, v)| *v == vehicle).map(|(o, _)| o.clone()).collect();
        orders.sort();
        orders
    }

    pub fn is_reserved(&self, order: &TransportOrderId) -> bool {
        let guard = self.inner.read().unwrap();
        guard.contains_key(order)
    }

    pub fn reserved_vehicle(&self, order: &TransportOrderId) -> Option<VehicleId> {
        let guard = self.inner.read().unwrap();
        guard.get(order).cloned()
    }

    /// Clears all reservations for the vehicle. Called when one of them is
    /// consumed or the vehicle disappears.
    pub fn remove_reservations(&self, vehicle: &VehicleId) {
        let mut guard = self.inner.write().unwrap();
        guard.retain(|_, v| v != vehicle);
    }

    /// Drops the reservation for a single order, e.g. when the order became
    /// unavailable before consumption.
    pub fn remove_reservation_for_order(&self, order: &TransportOrderId) {
        let mut guard = self.inner.write().unwrap();
        guard.remove(order);
    }
}
