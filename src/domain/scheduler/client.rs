use crate::domain::model::id::{ClientId, VehicleId};
use crate::domain::model::resource::ResourceSet;

/// A vehicle's scheduling identity as seen by the resource scheduler.
///
/// Implemented by the vehicle controller driving the vehicle through its
/// route. By convention a controller uses its vehicle's name as client id,
/// which lets the rerouting engine find the client for a vehicle.
pub trait SchedulerClient: Send + Sync {
    fn id(&self) -> ClientId;

    fn related_vehicle(&self) -> Option<VehicleId>;

    /// Called on the serialized kernel context when a requested allocation
    /// has been granted. Returning `false` rejects the grant; the resources
    /// are then released immediately, without restoring the claim.
    fn on_allocation(&self, resources: &ResourceSet) -> bool;
}
