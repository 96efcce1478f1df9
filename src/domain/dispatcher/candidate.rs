use crate::domain::model::transport_order::{DriveOrder, TransportOrder};
use crate::domain::model::vehicle::Vehicle;

/// An ephemeral (vehicle, order, computed drive orders) tuple produced
/// during a dispatch pass. Candidates exist only to be filtered and ranked
/// within one pass; they are never persisted.
#[derive(Debug, Clone)]
pub struct AssignmentCandidate {
    pub vehicle: Vehicle,
    pub transport_order: TransportOrder,
    /// The order's drive orders with freshly computed routes.
    pub drive_orders: Vec<DriveOrder>,
}

impl AssignmentCandidate {
    pub fn new(vehicle: Vehicle, transport_order: TransportOrder, drive_orders: Vec<DriveOrder>) -> Self {
        Self { vehicle, transport_order, drive_orders }
    }

    /// Cost of the complete routing across all drive orders.
    pub fn complete_routing_costs(&self) -> u64 {
        self.drive_orders.iter().filter_map(|drive_order| drive_order.route.as_ref()).map(|route| route.costs).sum()
    }

    /// Cost of only the first drive order's route, i.e. the way to the
    /// order's first destination.
    pub fn initial_routing_costs(&self) -> u64 {
        self.drive_orders.first().and_then(|drive_order| drive_order.route.as_ref()).map(|route| route.costs).unwrap_or(0)
    }
}
