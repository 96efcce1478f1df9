use std::sync::Arc;

use crate::domain::dispatcher::phases::DispatchPhase;
use crate::domain::model::transport_order::TransportOrderState;
use crate::domain::model::vehicle::ProcState;
use crate::domain::store::transport_order_service::TransportOrderService;
use crate::domain::store::vehicle_service::VehicleService;
use crate::error::{Error, Result};

/// Advances vehicles within an already-assigned, multi-leg transport order.
///
/// A vehicle reporting AWAITING_ORDER gets the next drive order of its
/// current transport order; if none remain, the order is finished and the
/// vehicle freed, making it a candidate for the following phases of the
/// same run.
pub struct AssignNextDriveOrdersPhase {
    vehicle_service: Arc<dyn VehicleService>,
    order_service: Arc<dyn TransportOrderService>,
}

impl AssignNextDriveOrdersPhase {
    pub fn new(vehicle_service: Arc<dyn VehicleService>, order_service: Arc<dyn TransportOrderService>) -> Self {
        Self { vehicle_service, order_service }
    }
}

impl DispatchPhase for AssignNextDriveOrdersPhase {
    fn name(&self) -> &'static str {
        "AssignNextDriveOrdersPhase"
    }

    fn run(&self) -> Result<()> {
        for mut vehicle in self.vehicle_service.fetch_vehicles() {
            if vehicle.proc_state != ProcState::AwaitingOrder {
                continue;
            }
            let order_id = vehicle
                .transport_order
                .clone()
                .ok_or_else(|| Error::StateInconsistency(format!("Vehicle {} awaits a drive order but has no transport order", vehicle.id)))?;
            let mut order = self.order_service.fetch_order(&order_id).ok_or_else(|| Error::UnknownTransportOrder(order_id.clone()))?;
            let index = order
                .current_drive_order_index
                .ok_or_else(|| Error::StateInconsistency(format!("Transport order {} is being processed but has no current drive order", order_id)))?;

            if index + 1 < order.drive_orders.len() {
                log::debug!("Vehicle {} advances to drive order {} of transport order {}.", vehicle.id, index + 1, order_id);
                order.current_drive_order_index = Some(index + 1);
                self.order_service.update_order(order)?;

                vehicle.proc_state = ProcState::ProcessingOrder;
                vehicle.route_progress_index = None;
                self.vehicle_service.update_vehicle(vehicle)?;
            } else {
                log::info!("Transport order {} finished by vehicle {}.", order_id, vehicle.id);
                order.current_drive_order_index = None;
                self.order_service.update_order(order)?;
                self.order_service.update_order_state(&order_id, TransportOrderState::Finished)?;

                vehicle.transport_order = None;
                vehicle.proc_state = ProcState::Idle;
                vehicle.route_progress_index = None;
                self.vehicle_service.update_vehicle(vehicle)?;
            }
        }
        Ok(())
    }
}
