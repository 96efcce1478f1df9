use std::sync::Arc;

use crate::domain::dispatcher::comparator::{
    CandidateComparatorByCompleteRoutingCosts, CandidateComparatorByDeadline, OrderComparatorByDeadline, VehicleComparatorByEnergyLevel,
};
use crate::domain::dispatcher::filter::{
    CompositeAssignmentCandidateSelectionFilter, CompositeTransportOrderSelectionFilter, CompositeVehicleSelectionFilter,
};
use crate::domain::dispatcher::order_assigner::OrderAssigner;
use crate::domain::dispatcher::phases::assign_free_orders_phase::AssignFreeOrdersPhase;
use crate::domain::dispatcher::phases::assign_next_drive_orders_phase::AssignNextDriveOrdersPhase;
use crate::domain::dispatcher::phases::assign_reserved_orders_phase::AssignReservedOrdersPhase;
use crate::domain::dispatcher::phases::DispatchPhase;
use crate::domain::dispatcher::reservation_pool::OrderReservationPool;
use crate::domain::model::id::{PathId, TransportOrderId, VehicleId};
use crate::domain::model::route::ReroutingType;
use crate::domain::model::transport_order::TransportOrderState;
use crate::domain::model::vehicle::ProcState;
use crate::domain::rerouting::strategy::{ForcedReroutingStrategy, RegularReroutingStrategy, ReroutingStrategy};
use crate::domain::routing::route_provider::RouteProvider;
use crate::domain::scheduler::scheduler::ResourceScheduler;
use crate::domain::store::transport_order_service::TransportOrderService;
use crate::domain::store::vehicle_service::VehicleService;
use crate::error::{Error, Result};

/**
 * The fleet's job assignment control loop.
 *
 * A dispatch run first promotes activated orders whose dependencies are
 * met, then executes the phases in a fixed order: advance vehicles inside
 * multi-leg orders, drain reservations, then open pairing. Runs are
 * triggered periodically and on relevant state changes (order activation,
 * vehicle becoming idle, order failure) and are idempotent with respect to
 * orders already being processed.
 *
 * All methods must be called from the single serialized kernel context.
 */
pub struct Dispatcher {
    vehicle_service: Arc<dyn VehicleService>,
    order_service: Arc<dyn TransportOrderService>,
    route_provider: Arc<dyn RouteProvider>,
    reservation_pool: OrderReservationPool,
    phases: Vec<Box<dyn DispatchPhase>>,
    regular_rerouting: RegularReroutingStrategy,
    forced_rerouting: ForcedReroutingStrategy,
}

impl Dispatcher {
    /// Wires a dispatcher with the given filter chains and the default
    /// comparators.
    pub fn new(
        vehicle_service: Arc<dyn VehicleService>,
        order_service: Arc<dyn TransportOrderService>,
        route_provider: Arc<dyn RouteProvider>,
        vehicle_filter: CompositeVehicleSelectionFilter,
        order_filter: CompositeTransportOrderSelectionFilter,
        candidate_filter: CompositeAssignmentCandidateSelectionFilter,
    ) -> Self {
        let reservation_pool = OrderReservationPool::new();
        let order_assigner = Arc::new(OrderAssigner::new(
            Arc::clone(&vehicle_service),
            Arc::clone(&order_service),
            Arc::clone(&route_provider),
            reservation_pool.clone(),
            vehicle_filter,
            order_filter,
            candidate_filter.clone(),
            Arc::new(VehicleComparatorByEnergyLevel),
            Arc::new(OrderComparatorByDeadline),
            Arc::new(CandidateComparatorByDeadline),
            Arc::new(CandidateComparatorByCompleteRoutingCosts),
        ));

        let phases: Vec<Box<dyn DispatchPhase>> = vec![
            Box::new(AssignNextDriveOrdersPhase::new(Arc::clone(&vehicle_service), Arc::clone(&order_service))),
            Box::new(AssignReservedOrdersPhase::new(
                Arc::clone(&vehicle_service),
                Arc::clone(&order_service),
                reservation_pool.clone(),
                Arc::clone(&order_assigner),
                candidate_filter,
            )),
            Box::new(AssignFreeOrdersPhase::new(order_assigner)),
        ];

        Self {
            vehicle_service,
            order_service,
            route_provider: Arc::clone(&route_provider),
            reservation_pool,
            phases,
            regular_rerouting: RegularReroutingStrategy::new(Arc::clone(&route_provider)),
            forced_rerouting: ForcedReroutingStrategy::new(route_provider),
        }
    }

    /// Dispatcher with no filter chains, used by tests and the demo binary.
    pub fn with_defaults(
        vehicle_service: Arc<dyn VehicleService>,
        order_service: Arc<dyn TransportOrderService>,
        route_provider: Arc<dyn RouteProvider>,
    ) -> Self {
        Self::new(
            vehicle_service,
            order_service,
            route_provider,
            CompositeVehicleSelectionFilter::default(),
            CompositeTransportOrderSelectionFilter::default(),
            CompositeAssignmentCandidateSelectionFilter::default(),
        )
    }

    pub fn reservation_pool(&self) -> &OrderReservationPool {
        &self.reservation_pool
    }

    /// One dispatch run.
    pub fn dispatch(&self) -> Result<()> {
        self.promote_activated_orders()?;
        for phase in &self.phases {
            log::debug!("Running dispatch phase {}.", phase.name());
            phase.run()?;
        }
        Ok(())
    }

    /// Marks a RAW order ACTIVE and, like every dispatch run, promotes it to
    /// DISPATCHABLE as soon as all its dependencies are finished.
    pub fn activate_order(&self, order_id: &TransportOrderId) -> Result<()> {
        self.order_service.update_order_state(order_id, TransportOrderState::Active)?;
        self.promote_activated_orders()
    }

    fn promote_activated_orders(&self) -> Result<()> {
        for order in self.order_service.fetch_orders_in_state(TransportOrderState::Active) {
            let dependencies_met = order.dependencies.iter().all(|dependency| {
                self.order_service
                    .fetch_order(dependency)
                    .map(|dep| dep.state == TransportOrderState::Finished)
                    .unwrap_or(false)
            });
            if dependencies_met {
                self.order_service.update_order_state(&order.id, TransportOrderState::Dispatchable)?;
            }
        }
        Ok(())
    }

    /// Withdraws an order. Unstarted orders are withdrawn immediately; an
    /// order being processed is withdrawn and its vehicle released back to
    /// idle, where a reserved or free order can reach it on the next run.
    pub fn withdraw_order(&self, order_id: &TransportOrderId) -> Result<()> {
        let order = self.order_service.fetch_order(order_id).ok_or_else(|| Error::UnknownTransportOrder(order_id.clone()))?;
        if order.state.is_final() {
            log::debug!("Transport order {} is already in final state {:?}, nothing to withdraw.", order_id, order.state);
            return Ok(());
        }
        self.order_service.update_order_state(order_id, TransportOrderState::Withdrawn)?;
        self.reservation_pool.remove_reservation_for_order(order_id);

        if let Some(vehicle_id) = &order.processing_vehicle {
            if let Some(mut vehicle) = self.vehicle_service.fetch_vehicle(vehicle_id) {
                if vehicle.transport_order.as_ref() == Some(order_id) {
                    vehicle.transport_order = None;
                    vehicle.proc_state = ProcState::Idle;
                    vehicle.route_progress_index = None;
                    self.vehicle_service.update_vehicle(vehicle)?;
                }
            }
        }
        Ok(())
    }

    /// Recomputes a moving vehicle's remaining route without touching its
    /// transport-order identity. The scheduler is consulted by the forced
    /// strategy's safety check.
    pub fn reroute_vehicle(&self, vehicle_id: &VehicleId, kind: ReroutingType, scheduler: &ResourceScheduler) -> Result<()> {
        let vehicle = self.vehicle_service.fetch_vehicle(vehicle_id).ok_or_else(|| Error::UnknownVehicle(vehicle_id.clone()))?;
        let order_id = match &vehicle.transport_order {
            Some(order_id) => order_id.clone(),
            None => {
                log::debug!("Vehicle {} has no transport order, nothing to reroute.", vehicle_id);
                return Ok(());
            }
        };
        let mut order = self.order_service.fetch_order(&order_id).ok_or_else(|| Error::UnknownTransportOrder(order_id.clone()))?;

        let strategy: &dyn ReroutingStrategy = match kind {
            ReroutingType::Regular => &self.regular_rerouting,
            ReroutingType::Forced => &self.forced_rerouting,
        };
        match strategy.reroute(&vehicle, &order, scheduler) {
            Some(new_drive_orders) => {
                let kept = order.current_drive_order_index.unwrap_or(0);
                order.drive_orders.truncate(kept);
                order.drive_orders.extend(new_drive_orders);
                log::info!("Vehicle {} rerouted ({:?}) on transport order {}.", vehicle_id, kind, order_id);
                self.order_service.update_order(order)
            }
            None => {
                log::warn!("Rerouting ({:?}) of vehicle {} produced no new route; keeping the current one.", kind, vehicle_id);
                Ok(())
            }
        }
    }

    /// Reacts to a change of the plant topology: informs the route provider
    /// and reroutes every vehicle currently processing an order.
    pub fn topology_changed(&self, changed_paths: &[PathId], scheduler: &ResourceScheduler) -> Result<()> {
        self.route_provider.update_routing_topology(changed_paths);
        for vehicle in self.vehicle_service.fetch_vehicles() {
            if vehicle.transport_order.is_some() && vehicle.proc_state == ProcState::ProcessingOrder {
                self.reroute_vehicle(&vehicle.id, ReroutingType::Regular, scheduler)?;
            }
        }
        Ok(())
    }
}
