use std::sync::Arc;

use crate::domain::dispatcher::filter::CompositeAssignmentCandidateSelectionFilter;
use crate::domain::dispatcher::order_assigner::OrderAssigner;
use crate::domain::dispatcher::phases::DispatchPhase;
use crate::domain::dispatcher::reservation_pool::OrderReservationPool;
use crate::domain::model::transport_order::TransportOrderState;
use crate::domain::store::transport_order_service::TransportOrderService;
use crate::domain::store::vehicle_service::VehicleService;
use crate::error::Result;

/// Hands reserved orders to vehicles that have become free.
///
/// Runs before open pairing so a reservation is honored without the full
/// search finding a different candidate first. Reservations are advisory:
/// the reserved order is re-validated (still dispatchable, still routable,
/// not filtered) before committing, since plant state may have changed
/// between reservation and consumption. Stale reservations are dropped.
pub struct AssignReservedOrdersPhase {
    vehicle_service: Arc<dyn VehicleService>,
    order_service: Arc<dyn TransportOrderService>,
    reservation_pool: OrderReservationPool,
    order_assigner: Arc<OrderAssigner>,
    candidate_filter: CompositeAssignmentCandidateSelectionFilter,
}

impl AssignReservedOrdersPhase {
    pub fn new(
        vehicle_service: Arc<dyn VehicleService>,
        order_service: Arc<dyn TransportOrderService>,
        reservation_pool: OrderReservationPool,
        order_assigner: Arc<OrderAssigner>,
        candidate_filter: CompositeAssignmentCandidateSelectionFilter,
    ) -> Self {
        Self { vehicle_service, order_service, reservation_pool, order_assigner, candidate_filter }
    }
}

impl DispatchPhase for AssignReservedOrdersPhase {
    fn name(&self) -> &'static str {
        "AssignReservedOrdersPhase"
    }

    fn run(&self) -> Result<()> {
        for vehicle in self.vehicle_service.fetch_vehicles() {
            if !vehicle.is_available_for_order() {
                continue;
            }
            for order_id in self.reservation_pool.find_reservations(&vehicle.id) {
                let order = match self.order_service.fetch_order(&order_id) {
                    Some(order) => order,
                    None => {
                        self.reservation_pool.remove_reservation_for_order(&order_id);
                        continue;
                    }
                };
                if order.state != TransportOrderState::Dispatchable {
                    log::debug!("Dropping reservation of order {} for vehicle {}: order is {:?}.", order_id, vehicle.id, order.state);
                    self.reservation_pool.remove_reservation_for_order(&order_id);
                    continue;
                }
                let candidate = match self.order_assigner.compute_candidate(&vehicle, &order)? {
                    Some(candidate) => candidate,
                    None => {
                        log::debug!("Reserved order {} is no longer routable for vehicle {}.", order_id, vehicle.id);
                        continue;
                    }
                };
                if !self.candidate_filter.rejection_reasons(&candidate).is_empty() {
                    continue;
                }
                log::info!("Consuming reservation: assigning order {} to vehicle {}.", order_id, vehicle.id);
                self.order_assigner.assign_order(candidate)?;
                // Consuming one reservation clears all for this vehicle.
                self.reservation_pool.remove_reservations(&vehicle.id);
                break;
            }
        }
        Ok(())
    }
}
