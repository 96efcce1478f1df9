use serde::Serialize;

use crate::domain::model::id::{PathId, PointId};
use crate::domain::model::resource::{ResourceRef, ResourceSet};

/// The direction in which a vehicle traverses a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Orientation {
    Forward,
    Backward,
    Undefined,
}

/// Marks a step as the splice point of a rerouting operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ReroutingType {
    Regular,
    Forced,
}

/// One movement of a route: a path to traverse and the point it ends at.
///
/// `path` and `source_point` are absent for the initial step of a route that
/// starts at the vehicle's current position without movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Step {
    pub path: Option<PathId>,
    pub source_point: Option<PointId>,
    pub destination_point: PointId,
    pub orientation: Orientation,
    pub route_index: usize,
    pub execution_allowed: bool,
    pub rerouting_type: Option<ReroutingType>,
}

impl Step {
    pub fn new(path: Option<PathId>, source_point: Option<PointId>, destination_point: PointId, route_index: usize) -> Self {
        Self {
            path,
            source_point,
            destination_point,
            orientation: Orientation::Forward,
            route_index,
            execution_allowed: true,
            rerouting_type: None,
        }
    }

    /// The resources a vehicle must hold to execute this step: the step's
    /// destination point plus the path leading to it, if any.
    pub fn resources(&self) -> ResourceSet {
        let mut set = ResourceSet::new();
        set.insert(ResourceRef::Point(self.destination_point.clone()));
        if let Some(path) = &self.path {
            set.insert(ResourceRef::Path(path.clone()));
        }
        set
    }
}

/// An ordered, non-empty sequence of steps plus the total cost of
/// traversing them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Route {
    pub steps: Vec<Step>,
    pub costs: u64,
}

impl Route {
    pub fn new(steps: Vec<Step>, costs: u64) -> Self {
        debug_assert!(!steps.is_empty(), "a route must contain at least one step");
        Self { steps, costs }
    }

    pub fn final_destination(&self) -> &PointId {
        &self.steps.last().expect("routes are non-empty").destination_point
    }

    /// Rewrites the steps' route indices so they run contiguously from 0.
    /// Used after merging route fragments during rerouting.
    pub fn renumbered(mut self) -> Self {
        for (index, step) in self.steps.iter_mut().enumerate() {
            step.route_index = index;
        }
        self
    }
}
