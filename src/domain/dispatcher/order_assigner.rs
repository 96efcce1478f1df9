use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::domain::dispatcher::candidate::AssignmentCandidate;
use crate::domain::dispatcher::comparator::{CandidateComparator, OrderComparator, VehicleComparator};
use crate::domain::dispatcher::filter::{
    CompositeAssignmentCandidateSelectionFilter, CompositeTransportOrderSelectionFilter, CompositeVehicleSelectionFilter,
};
use crate::domain::dispatcher::reservation_pool::OrderReservationPool;
use crate::domain::model::id::{TransportOrderId, VehicleId};
use crate::domain::model::transport_order::{Rejection, TransportOrder, TransportOrderState};
use crate::domain::model::vehicle::{ProcState, Vehicle};
use crate::domain::routing::route_provider::RouteProvider;
use crate::domain::store::transport_order_service::TransportOrderService;
use crate::domain::store::vehicle_service::VehicleService;
use crate::error::Result;

/**
 * Pairs unassigned transport orders with vehicles within one dispatch pass.
 *
 * The pass gathers the vehicles available for any order and the dispatchable
 * orders, then iterates the smaller of the two sets: with fewer vehicles
 * than orders each vehicle searches all orders for its best admissible one,
 * otherwise each order searches all vehicles. Surviving candidates run
 * through the candidate filter chain and the best-ranked one is committed.
 *
 * A vehicle that is busy with a dispensable order does not get the new order
 * directly; the order is reserved for it and the current order's abort is
 * requested. The reservation is consumed once the vehicle reports idle.
 */
pub struct OrderAssigner {
    vehicle_service: Arc<dyn VehicleService>,
    order_service: Arc<dyn TransportOrderService>,
    route_provider: Arc<dyn RouteProvider>,
    reservation_pool: OrderReservationPool,
    vehicle_filter: CompositeVehicleSelectionFilter,
    order_filter: CompositeTransportOrderSelectionFilter,
    candidate_filter: CompositeAssignmentCandidateSelectionFilter,
    vehicle_comparator: Arc<dyn VehicleComparator>,
    order_comparator: Arc<dyn OrderComparator>,
    /// Ranks the candidates found for one vehicle across many orders.
    vehicle_centric_candidate_comparator: Arc<dyn CandidateComparator>,
    /// Ranks the candidates found for one order across many vehicles.
    order_centric_candidate_comparator: Arc<dyn CandidateComparator>,
}

/// Deferral reason for orders nobody could take in a pass, as opposed to
/// orders a filter rejected.
pub const NO_VEHICLE_AVAILABLE: &str = "No vehicle available in this pass";

/// How a vehicle may take part in the current pass.
enum Availability {
    /// Idle and free; an assignment is committed immediately.
    Free,
    /// Busy with a dispensable order; a new order is only reserved.
    ProcessingDispensable(TransportOrderId),
    No,
}

impl OrderAssigner {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        vehicle_service: Arc<dyn VehicleService>,
        order_service: Arc<dyn TransportOrderService>,
        route_provider: Arc<dyn RouteProvider>,
        reservation_pool: OrderReservationPool,
        vehicle_filter: CompositeVehicleSelectionFilter,
        order_filter: CompositeTransportOrderSelectionFilter,
        candidate_filter: CompositeAssignmentCandidateSelectionFilter,
        vehicle_comparator: Arc<dyn VehicleComparator>,
        order_comparator: Arc<dyn OrderComparator>,
        vehicle_centric_candidate_comparator: Arc<dyn CandidateComparator>,
        order_centric_candidate_comparator: Arc<dyn CandidateComparator>,
    ) -> Self {
        Self {
            vehicle_service,
            order_service,
            route_provider,
            reservation_pool,
            vehicle_filter,
            order_filter,
            candidate_filter,
            vehicle_comparator,
            order_comparator,
            vehicle_centric_candidate_comparator,
            order_centric_candidate_comparator,
        }
    }

    /// The free-orders pairing pass.
    pub fn assign_free_orders(&self) -> Result<()> {
        let mut vehicles: Vec<Vehicle> = self
            .vehicle_service
            .fetch_vehicles()
            .into_iter()
            .filter(|vehicle| !matches!(self.availability(vehicle), Availability::No))
            .filter(|vehicle| {
                let reasons = self.vehicle_filter.rejection_reasons(vehicle);
                if !reasons.is_empty() {
                    log::debug!("Vehicle {} not considered for dispatch: {:?}", vehicle.id, reasons);
                }
                reasons.is_empty()
            })
            .collect();

        if vehicles.is_empty() {
            // Fetching all orders can be expensive; skip it when nobody
            // could take one anyway.
            log::debug!("No vehicle available for any order, skipping order selection.");
            return Ok(());
        }

        let mut deferral_reasons: HashMap<TransportOrderId, Vec<String>> = HashMap::new();
        let mut considered: Vec<TransportOrder> = Vec::new();

        let mut orders: Vec<TransportOrder> = Vec::new();
        for order in self.order_service.fetch_orders_in_state(TransportOrderState::Dispatchable) {
            if let Some(binding) = &order.wrapping_sequence {
                if binding.owner.is_some() {
                    // The sequence is being processed; only its owner may
                    // take this order, and it does so via the sequence.
                    continue;
                }
            }
            if self.reservation_pool.is_reserved(&order.id) {
                continue;
            }
            let reasons = self.order_filter.rejection_reasons(&order);
            considered.push(order.clone());
            if reasons.is_empty() {
                orders.push(order);
            } else {
                deferral_reasons.insert(order.id.clone(), reasons);
            }
        }

        // Keep the per-pass search proportional to the smaller set.
        let mut taken_orders: HashSet<TransportOrderId> = HashSet::new();
        let mut engaged_vehicles: HashSet<VehicleId> = HashSet::new();
        if vehicles.len() < orders.len() {
            vehicles.sort_by(|a, b| self.vehicle_comparator.compare(a, b));
            for vehicle in &vehicles {
                self.try_assign_order(vehicle, &orders, &mut taken_orders, &mut engaged_vehicles, &mut deferral_reasons)?;
            }
        } else {
            orders.sort_by(|a, b| self.order_comparator.compare(a, b));
            for order in &orders {
                self.try_assign_vehicle(order, &vehicles, &mut taken_orders, &mut engaged_vehicles, &mut deferral_reasons)?;
            }
        }

        self.update_deferral_marks(&considered, &taken_orders, deferral_reasons)
    }

    /// Searches all eligible orders for the best admissible one for the
    /// given vehicle.
    fn try_assign_order(
        &self,
        vehicle: &Vehicle,
        orders: &[TransportOrder],
        taken_orders: &mut HashSet<TransportOrderId>,
        engaged_vehicles: &mut HashSet<VehicleId>,
        deferral_reasons: &mut HashMap<TransportOrderId, Vec<String>>,
    ) -> Result<()> {
        if engaged_vehicles.contains(&vehicle.id) {
            return Ok(());
        }
        let mut candidates: Vec<AssignmentCandidate> = Vec::new();
        for order in orders {
            if taken_orders.contains(&order.id) || !self.admissible(vehicle, order) {
                continue;
            }
            if let Some(candidate) = self.compute_candidate(vehicle, order)? {
                if let Some(candidate) = self.filter_candidate(candidate, deferral_reasons) {
                    candidates.push(candidate);
                }
            }
        }
        candidates.sort_by(|a, b| self.vehicle_centric_candidate_comparator.compare(a, b));
        if let Some(best) = candidates.into_iter().next() {
            taken_orders.insert(best.transport_order.id.clone());
            engaged_vehicles.insert(best.vehicle.id.clone());
            self.assign_or_reserve(best)?;
        }
        Ok(())
    }

    /// Searches all available vehicles for the best admissible one for the
    /// given order.
    fn try_assign_vehicle(
        &self,
        order: &TransportOrder,
        vehicles: &[Vehicle],
        taken_orders: &mut HashSet<TransportOrderId>,
        engaged_vehicles: &mut HashSet<VehicleId>,
        deferral_reasons: &mut HashMap<TransportOrderId, Vec<String>>,
    ) -> Result<()> {
        if taken_orders.contains(&order.id) {
            return Ok(());
        }
        let mut candidates: Vec<AssignmentCandidate> = Vec::new();
        for vehicle in vehicles {
            if engaged_vehicles.contains(&vehicle.id) || !self.admissible(vehicle, order) {
                continue;
            }
            if let Some(candidate) = self.compute_candidate(vehicle, order)? {
                if let Some(candidate) = self.filter_candidate(candidate, deferral_reasons) {
                    candidates.push(candidate);
                }
            }
        }
        candidates.sort_by(|a, b| self.order_centric_candidate_comparator.compare(a, b));
        if let Some(best) = candidates.into_iter().next() {
            taken_orders.insert(best.transport_order.id.clone());
            engaged_vehicles.insert(best.vehicle.id.clone());
            self.assign_or_reserve(best)?;
        }
        Ok(())
    }

    fn availability(&self, vehicle: &Vehicle) -> Availability {
        if vehicle.is_available_for_order() {
            return Availability::Free;
        }
        if vehicle.integrated && !vehicle.paused && vehicle.proc_state == ProcState::ProcessingOrder {
            if let Some(order_id) = &vehicle.transport_order {
                if let Some(order) = self.order_service.fetch_order(order_id) {
                    if order.dispensable {
                        return Availability::ProcessingDispensable(order_id.clone());
                    }
                }
            }
        }
        Availability::No
    }

    /// Cheap admissibility checks, evaluated before any route computation.
    fn admissible(&self, vehicle: &Vehicle, order: &TransportOrder) -> bool {
        self.vehicle_can_accept(vehicle, order) && self.order_assignable_to(order, vehicle)
    }

    /// A vehicle whose energy level is critical may only accept an order
    /// whose first destination is its own recharge operation.
    fn vehicle_can_accept(&self, vehicle: &Vehicle, order: &TransportOrder) -> bool {
        if !vehicle.is_energy_level_critical() {
            return true;
        }
        order
            .drive_orders
            .first()
            .map(|drive_order| drive_order.destination.operation == vehicle.recharge_operation)
            .unwrap_or(false)
    }

    fn order_assignable_to(&self, order: &TransportOrder, vehicle: &Vehicle) -> bool {
        let intended_ok = match &order.intended_vehicle {
            Some(intended) => intended == &vehicle.id,
            None => true,
        };
        intended_ok && vehicle.accepts_order_type(&order.order_type)
    }

    /// Routes the order for the vehicle. No route is not an error: the pair
    /// simply produces no candidate, and the failed attempt is recorded on
    /// the order's history.
    pub fn compute_candidate(&self, vehicle: &Vehicle, order: &TransportOrder) -> Result<Option<AssignmentCandidate>> {
        let position = match vehicle.future_or_current_position() {
            Some(position) => position,
            None => return Ok(None),
        };
        let mut sequences = self.route_provider.routes_for_order(vehicle, &position, order, 1);
        let routes = match sequences.pop() {
            Some(routes) => routes,
            None => {
                let mut updated = match self.order_service.fetch_order(&order.id) {
                    Some(updated) => updated,
                    None => return Ok(None),
                };
                // A persistently unroutable order is retried on every pass;
                // one history entry per vehicle is enough.
                if !updated.has_rejection(Some(&vehicle.id), "Unroutable") {
                    updated.add_rejection(Rejection::new(Some(vehicle.id.clone()), "Unroutable"));
                    self.order_service.update_order(updated)?;
                }
                return Ok(None);
            }
        };
        let drive_orders = order
            .remaining_drive_orders()
            .iter()
            .zip(routes)
            .map(|(drive_order, route)| crate::domain::model::transport_order::DriveOrder::with_route(drive_order.destination.clone(), route))
            .collect();
        Ok(Some(AssignmentCandidate::new(vehicle.clone(), order.clone(), drive_orders)))
    }

    /// Runs the candidate through the filter chain. Rejection reasons are
    /// recorded as deferral reasons for the order and the candidate is
    /// dropped; a passing candidate is handed back for ranking.
    fn filter_candidate(
        &self,
        candidate: AssignmentCandidate,
        deferral_reasons: &mut HashMap<TransportOrderId, Vec<String>>,
    ) -> Option<AssignmentCandidate> {
        let reasons = self.candidate_filter.rejection_reasons(&candidate);
        if reasons.is_empty() {
            return Some(candidate);
        }
        log::debug!("Candidate (vehicle {}, order {}) filtered: {:?}", candidate.vehicle.id, candidate.transport_order.id, reasons);
        deferral_reasons.entry(candidate.transport_order.id.clone()).or_default().extend(reasons);
        None
    }

    /// Commits the candidate: immediate assignment for a free vehicle, a
    /// reservation plus an abort request when the vehicle is busy with a
    /// dispensable order.
    pub fn assign_or_reserve(&self, candidate: AssignmentCandidate) -> Result<()> {
        match self.availability(&candidate.vehicle) {
            Availability::Free => self.assign_order(candidate),
            Availability::ProcessingDispensable(current_order) => {
                log::info!(
                    "Reserving order {} for vehicle {} and requesting abort of dispensable order {}.",
                    candidate.transport_order.id,
                    candidate.vehicle.id,
                    current_order
                );
                self.reservation_pool.add_reservation(candidate.transport_order.id.clone(), candidate.vehicle.id.clone());
                self.request_order_abort(&current_order)?;
                Ok(())
            }
            Availability::No => {
                log::warn!("Vehicle {} became unavailable mid-pass; order {} stays unassigned.", candidate.vehicle.id, candidate.transport_order.id);
                Ok(())
            }
        }
    }

    /// Commits a (vehicle, order) pairing: the order becomes
    /// BEING_PROCESSED with the computed drive orders and the vehicle
    /// starts executing the first one.
    pub fn assign_order(&self, candidate: AssignmentCandidate) -> Result<()> {
        log::info!("Assigning transport order {} to vehicle {}.", candidate.transport_order.id, candidate.vehicle.id);

        self.order_service.update_order_state(&candidate.transport_order.id, TransportOrderState::BeingProcessed)?;
        let mut order = self
            .order_service
            .fetch_order(&candidate.transport_order.id)
            .ok_or_else(|| crate::error::Error::UnknownTransportOrder(candidate.transport_order.id.clone()))?;
        order.processing_vehicle = Some(candidate.vehicle.id.clone());
        order.drive_orders = candidate.drive_orders;
        order.current_drive_order_index = Some(0);
        order.deferral_reasons.clear();
        self.order_service.update_order(order)?;

        let mut vehicle = self
            .vehicle_service
            .fetch_vehicle(&candidate.vehicle.id)
            .ok_or_else(|| crate::error::Error::UnknownVehicle(candidate.vehicle.id.clone()))?;
        vehicle.transport_order = Some(candidate.transport_order.id.clone());
        vehicle.proc_state = ProcState::ProcessingOrder;
        vehicle.route_progress_index = None;
        self.vehicle_service.update_vehicle(vehicle)
    }

    /// Requests the asynchronous abort of a dispensable order. The vehicle's
    /// transition back to idle is what later lets the reservation be
    /// consumed; there is no synchronous abort-and-reassign path.
    fn request_order_abort(&self, order_id: &TransportOrderId) -> Result<()> {
        self.order_service.update_order_state(order_id, TransportOrderState::Withdrawn)
    }

    /// (Re-)marks every considered order that stayed unassigned as deferred
    /// with its current reasons: the filter chain's reasons when it was
    /// rejected, `NO_VEHICLE_AVAILABLE` when the pass simply ran out of
    /// vehicles. Assignment is what clears the mark; an order whose reasons
    /// changed gets its mark replaced.
    fn update_deferral_marks(
        &self,
        considered: &[TransportOrder],
        taken_orders: &HashSet<TransportOrderId>,
        deferral_reasons: HashMap<TransportOrderId, Vec<String>>,
    ) -> Result<()> {
        for order in considered {
            if taken_orders.contains(&order.id) {
                continue;
            }
            let mut current = match self.order_service.fetch_order(&order.id) {
                Some(current) => current,
                None => continue,
            };
            if current.state != TransportOrderState::Dispatchable {
                continue;
            }
            let reasons = match deferral_reasons.get(&order.id) {
                Some(reasons) => reasons.clone(),
                None => vec![NO_VEHICLE_AVAILABLE.to_string()],
            };
            if current.deferral_reasons != reasons {
                log::info!("Transport order {} deferred: {:?}", order.id, reasons);
                current.deferral_reasons = reasons;
                self.order_service.update_order(current)?;
            }
        }
        Ok(())
    }
}
