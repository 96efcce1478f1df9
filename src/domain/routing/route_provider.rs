use std::collections::HashSet;

use crate::domain::model::id::{PathId, PointId, VehicleId};
use crate::domain::model::resource::ResourceSet;
use crate::domain::model::route::{Route, Step};
use crate::domain::model::transport_order::TransportOrder;
use crate::domain::model::vehicle::Vehicle;

/// Computes candidate routes and their costs for vehicles.
///
/// Consumed by the dispatcher and the rerouting engine. Implementations must
/// only be called from the same serialized context as the dispatcher; route
/// computations read the driving course but never write allocation state.
pub trait RouteProvider: Send + Sync {
    /// Route sequences covering the order's remaining drive orders in
    /// sequence, starting from `source`. One route per drive order within a
    /// sequence; at most `max_routes` alternative sequences. Empty if the
    /// order is unroutable for this vehicle.
    fn routes_for_order(&self, vehicle: &Vehicle, source: &PointId, order: &TransportOrder, max_routes: usize) -> Vec<Vec<Route>>;

    /// Routes from `source` to `destination` that do not touch any of
    /// `resources_to_avoid`; at most `max_routes` of them.
    fn routes_between(
        &self,
        vehicle: &Vehicle,
        source: &PointId,
        destination: &PointId,
        resources_to_avoid: &ResourceSet,
        max_routes: usize,
    ) -> Vec<Route>;

    /// The subset of `vehicles` for which a route exists that serves the
    /// whole order from the vehicle's current position.
    fn check_routability(&self, order: &TransportOrder, vehicles: &[Vehicle]) -> HashSet<VehicleId>;

    /// Informs the provider that the given paths changed (e.g. were locked
    /// or unlocked), invalidating any derived routing state.
    fn update_routing_topology(&self, changed_paths: &[PathId]);

    /// Total cost of traversing the given steps, used to re-price merged
    /// routes after rerouting.
    fn cost_of(&self, vehicle: &Vehicle, steps: &[Step]) -> u64;
}
