use std::cmp::Ordering;

use crate::domain::dispatcher::candidate::AssignmentCandidate;
use crate::domain::model::transport_order::TransportOrder;
use crate::domain::model::vehicle::Vehicle;

/// Ranking of vehicles within a dispatch pass; lesser sorts first.
pub trait VehicleComparator: Send + Sync {
    fn compare(&self, a: &Vehicle, b: &Vehicle) -> Ordering;
}

/// Ranking of transport orders within a dispatch pass.
pub trait OrderComparator: Send + Sync {
    fn compare(&self, a: &TransportOrder, b: &TransportOrder) -> Ordering;
}

/// Ranking of assignment candidates; the best candidate (first in sort
/// order) is committed.
pub trait CandidateComparator: Send + Sync {
    fn compare(&self, a: &AssignmentCandidate, b: &AssignmentCandidate) -> Ordering;
}

/// Prefers vehicles with more energy left. Ties are broken by name so the
/// ordering is total and passes are reproducible.
pub struct VehicleComparatorByEnergyLevel;

impl VehicleComparator for VehicleComparatorByEnergyLevel {
    fn compare(&self, a: &Vehicle, b: &Vehicle) -> Ordering {
        b.energy_level.cmp(&a.energy_level).then_with(|| a.id.cmp(&b.id))
    }
}

/// Prefers orders with the earliest deadline, then the oldest, then by name.
pub struct OrderComparatorByDeadline;

impl OrderComparator for OrderComparatorByDeadline {
    fn compare(&self, a: &TransportOrder, b: &TransportOrder) -> Ordering {
        a.deadline
            .cmp(&b.deadline)
            .then_with(|| a.creation_time.cmp(&b.creation_time))
            .then_with(|| a.id.cmp(&b.id))
    }
}

/// Prefers candidates with the cheapest complete routing, breaking ties by
/// deadline and finally by order and vehicle name.
pub struct CandidateComparatorByCompleteRoutingCosts;

impl CandidateComparator for CandidateComparatorByCompleteRoutingCosts {
    fn compare(&self, a: &AssignmentCandidate, b: &AssignmentCandidate) -> Ordering {
        a.complete_routing_costs()
            .cmp(&b.complete_routing_costs())
            .then_with(|| a.transport_order.deadline.cmp(&b.transport_order.deadline))
            .then_with(|| a.transport_order.id.cmp(&b.transport_order.id))
            .then_with(|| a.vehicle.id.cmp(&b.vehicle.id))
    }
}

/// Prefers candidates whose order has the earliest deadline, then the
/// cheapest route. Used when iterating vehicles over many orders.
pub struct CandidateComparatorByDeadline;

impl CandidateComparator for CandidateComparatorByDeadline {
    fn compare(&self, a: &AssignmentCandidate, b: &AssignmentCandidate) -> Ordering {
        a.transport_order
            .deadline
            .cmp(&b.transport_order.deadline)
            .then_with(|| a.complete_routing_costs().cmp(&b.complete_routing_costs()))
            .then_with(|| a.transport_order.id.cmp(&b.transport_order.id))
            .then_with(|| a.vehicle.id.cmp(&b.vehicle.id))
    }
}
