use std::sync::Arc;

use crate::domain::model::id::ClientId;
use crate::domain::model::resource::{ResourceRef, resource_set};
use crate::domain::model::transport_order::{DriveOrder, TransportOrder};
use crate::domain::model::vehicle::{ProcState, Vehicle};
use crate::domain::rerouting::drive_order_merger::{DriveOrderMergeStrategy, ForcedDriveOrderMergeStrategy, RegularDriveOrderMergeStrategy};
use crate::domain::routing::route_provider::RouteProvider;
use crate::domain::scheduler::scheduler::ResourceScheduler;

/// Computes a replacement for a vehicle's remaining drive orders without
/// discarding its transport-order identity or earned progress.
///
/// Returns the new remaining drive orders (starting with the one currently
/// being executed), or `None` if no reroute is possible right now.
pub trait ReroutingStrategy: Send + Sync {
    fn reroute(&self, vehicle: &Vehicle, order: &TransportOrder, scheduler: &ResourceScheduler) -> Option<Vec<DriveOrder>>;
}

/// Reroutes from the vehicle's future-or-current position: the destination
/// of the movement command already in flight, or the current position if
/// nothing is in flight. The new first route is merged with the executing
/// drive order so traversal history stays intact.
pub struct RegularReroutingStrategy {
    route_provider: Arc<dyn RouteProvider>,
    merger: RegularDriveOrderMergeStrategy,
}

impl RegularReroutingStrategy {
    pub fn new(route_provider: Arc<dyn RouteProvider>) -> Self {
        Self { route_provider, merger: RegularDriveOrderMergeStrategy }
    }
}

impl ReroutingStrategy for RegularReroutingStrategy {
    fn reroute(&self, vehicle: &Vehicle, order: &TransportOrder, _scheduler: &ResourceScheduler) -> Option<Vec<DriveOrder>> {
        let source = vehicle.future_or_current_position()?;
        compute_and_merge(vehicle, order, &source, &*self.route_provider, &self.merger)
    }
}

/// Reroutes from the vehicle's literal current position, permitted only if
/// that position can still be safely allocated to it right now. The merge
/// may leave a discontinuity; urgency wins over connectedness here.
pub struct ForcedReroutingStrategy {
    route_provider: Arc<dyn RouteProvider>,
    merger: ForcedDriveOrderMergeStrategy,
}

impl ForcedReroutingStrategy {
    pub fn new(route_provider: Arc<dyn RouteProvider>) -> Self {
        Self { route_provider, merger: ForcedDriveOrderMergeStrategy }
    }
}

impl ReroutingStrategy for ForcedReroutingStrategy {
    fn reroute(&self, vehicle: &Vehicle, order: &TransportOrder, scheduler: &ResourceScheduler) -> Option<Vec<DriveOrder>> {
        let source = vehicle.current_position.clone()?;

        // Vehicle controllers register under their vehicle's name.
        let client = ClientId::new(vehicle.id.name.clone());
        let position_resources = resource_set([ResourceRef::Point(source.clone())]);
        if !scheduler.may_allocate_now(&client, &position_resources) {
            log::warn!("Forced reroute of vehicle {} refused: its position {} cannot be safely allocated.", vehicle.id, source);
            return None;
        }
        compute_and_merge(vehicle, order, &source, &*self.route_provider, &self.merger)
    }
}

/// Shared tail of both strategies: route the remaining drive orders from
/// `source`, then merge the first of them with the drive order currently
/// being executed. An idle vehicle needs no merge; the fresh routes are
/// used as-is.
fn compute_and_merge(
    vehicle: &Vehicle,
    order: &TransportOrder,
    source: &crate::domain::model::id::PointId,
    route_provider: &dyn RouteProvider,
    merger: &dyn DriveOrderMergeStrategy,
) -> Option<Vec<DriveOrder>> {
    let mut sequences = route_provider.routes_for_order(vehicle, source, order, 1);
    let routes = match sequences.pop() {
        Some(routes) => routes,
        None => {
            log::warn!("No new route found for vehicle {} while rerouting order {}.", vehicle.id, order.id);
            return None;
        }
    };
    let mut new_drive_orders: Vec<DriveOrder> = order
        .remaining_drive_orders()
        .iter()
        .zip(routes)
        .map(|(drive_order, route)| DriveOrder::with_route(drive_order.destination.clone(), route))
        .collect();

    let mid_drive_order = vehicle.proc_state == ProcState::ProcessingOrder;
    if mid_drive_order {
        let current = order.current_drive_order()?;
        let first_new = new_drive_orders.first()?.clone();
        let merged = merger.merge_drive_orders(current, &first_new, vehicle, route_provider)?;
        new_drive_orders[0] = merged;
    }
    Some(new_drive_orders)
}
