use std::sync::Arc;

use crate::domain::dispatcher::candidate::AssignmentCandidate;
use crate::domain::model::transport_order::TransportOrder;
use crate::domain::model::vehicle::Vehicle;

/// Domain veto over vehicles considered for dispatch. Returns the reasons
/// for rejecting the vehicle; an empty list means the vehicle passes.
pub trait VehicleSelectionFilter: Send + Sync {
    fn rejection_reasons(&self, vehicle: &Vehicle) -> Vec<String>;
}

/// Domain veto over transport orders considered for dispatch.
pub trait TransportOrderSelectionFilter: Send + Sync {
    fn rejection_reasons(&self, order: &TransportOrder) -> Vec<String>;
}

/// Domain veto over surviving assignment candidates, e.g. capacity
/// constraints. Rejection reasons become the order's deferral reasons.
pub trait AssignmentCandidateSelectionFilter: Send + Sync {
    fn rejection_reasons(&self, candidate: &AssignmentCandidate) -> Vec<String>;
}

/// Ordered chain of vehicle filters; a vehicle passes only if every filter
/// accepts it. Reasons from all filters are collected.
#[derive(Clone, Default)]
pub struct CompositeVehicleSelectionFilter {
    filters: Vec<Arc<dyn VehicleSelectionFilter>>,
}

impl CompositeVehicleSelectionFilter {
    pub fn new(filters: Vec<Arc<dyn VehicleSelectionFilter>>) -> Self {
        Self { filters }
    }

    pub fn rejection_reasons(&self, vehicle: &Vehicle) -> Vec<String> {
        self.filters.iter().flat_map(|filter| filter.rejection_reasons(vehicle)).collect()
    }
}

#[derive(Clone, Default)]
pub struct CompositeTransportOrderSelectionFilter {
    filters: Vec<Arc<dyn TransportOrderSelectionFilter>>,
}

impl CompositeTransportOrderSelectionFilter {
    pub fn new(filters: Vec<Arc<dyn TransportOrderSelectionFilter>>) -> Self {
        Self { filters }
    }

    pub fn rejection_reasons(&self, order: &TransportOrder) -> Vec<String> {
        self.filters.iter().flat_map(|filter| filter.rejection_reasons(order)).collect()
    }
}

#[derive(Clone, Default)]
pub struct CompositeAssignmentCandidateSelectionFilter {
    filters: Vec<Arc<dyn AssignmentCandidateSelectionFilter>>,
}

impl CompositeAssignmentCandidateSelectionFilter {
    pub fn new(filters: Vec<Arc<dyn AssignmentCandidateSelectionFilter>>) -> Self {
        Self { filters }
    }

    pub fn rejection_reasons(&self, candidate: &AssignmentCandidate) -> Vec<String> {
        self.filters.iter().flat_map(|filter| filter.rejection_reasons(candidate)).collect()
    }
}
