use serde::Serialize;
use std::collections::HashSet;

use crate::domain::model::id::{PointId, TransportOrderId, VehicleId};
use crate::domain::model::transport_order::ORDER_TYPE_ANY;

/// What a vehicle is currently doing with respect to transport orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ProcState {
    /// Not processing any order; may be picked by the dispatcher.
    Idle,
    /// Finished a drive order and waits for the next leg of its current order.
    AwaitingOrder,
    /// Executing a drive order.
    ProcessingOrder,
}

/// A vehicle as the dispatcher sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Vehicle {
    pub id: VehicleId,
    pub current_position: Option<PointId>,
    /// Destination of the last movement command sent to the vehicle, if any
    /// command is still in flight.
    pub next_position: Option<PointId>,
    /// Index of the last route step the vehicle has confirmed travelling.
    pub route_progress_index: Option<usize>,
    pub proc_state: ProcState,
    pub paused: bool,
    /// Whether the vehicle takes part in the driving course at all.
    pub integrated: bool,
    pub energy_level: u32,
    pub energy_level_critical: u32,
    /// Operation name of this vehicle's recharge destination.
    pub recharge_operation: String,
    pub acceptable_order_types: HashSet<String>,
    pub transport_order: Option<TransportOrderId>,
}

impl Vehicle {
    pub fn new(id: VehicleId, position: PointId) -> Self {
        Self {
            id,
            current_position: Some(position),
            next_position: None,
            route_progress_index: None,
            proc_state: ProcState::Idle,
            paused: false,
            integrated: true,
            energy_level: 100,
            energy_level_critical: 15,
            recharge_operation: "CHARGE".to_string(),
            acceptable_order_types: HashSet::from([ORDER_TYPE_ANY.to_string()]),
            transport_order: None,
        }
    }

    pub fn is_energy_level_critical(&self) -> bool {
        self.energy_level <= self.energy_level_critical
    }

    /// Whether the dispatcher may consider this vehicle for a new order.
    pub fn is_available_for_order(&self) -> bool {
        self.integrated
            && !self.paused
            && self.proc_state == ProcState::Idle
            && self.transport_order.is_none()
            && self.current_position.is_some()
    }

    /// The point to route from: the destination of the movement command in
    /// flight, or the current position if nothing is in flight.
    pub fn future_or_current_position(&self) -> Option<PointId> {
        self.next_position.clone().or_else(|| self.current_position.clone())
    }

    pub fn accepts_order_type(&self, order_type: &str) -> bool {
        self.acceptable_order_types.contains(order_type) || self.acceptable_order_types.contains(ORDER_TYPE_ANY)
    }
}
