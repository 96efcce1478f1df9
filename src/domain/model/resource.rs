use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

use crate::domain::model::id::{PathId, PointId};

/// An opaque handle into the driving-course topology. A resource is a
/// point or a path; it carries identity only. Allocation state is kept
/// externally by the scheduler, keyed by this handle.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum ResourceRef {
    Point(PointId),
    Path(PathId),
}

impl ResourceRef {
    pub fn point(name: impl Into<String>) -> Self {
        ResourceRef::Point(PointId::new(name))
    }

    pub fn path(name: impl Into<String>) -> Self {
        ResourceRef::Path(PathId::new(name))
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceRef::Point(id) => write!(f, "point:{}", id),
            ResourceRef::Path(id) => write!(f, "path:{}", id),
        }
    }
}

/// The unit of claiming and allocation: one set of resources a vehicle
/// needs at the same time, typically a point plus the path leading to it.
pub type ResourceSet = BTreeSet<ResourceRef>;

/// Convenience constructor used all over the scheduler and its tests.
pub fn resource_set(resources: impl IntoIterator<Item = ResourceRef>) -> ResourceSet {
    resources.into_iter().collect()
}
