use crate::domain::model::id::ClientId;
use crate::domain::model::resource::ResourceSet;

/**
 * One element of the scheduler's admission-control chain.
 *
 * Modules carry the collision/deadlock-avoidance policy. The scheduler core
 * only enforces claim-order discipline and exclusivity; everything beyond
 * that is decided here. An allocation is granted only when every module in
 * the chain both allows it and reports it fully prepared.
 *
 * The concrete avoidance algorithm is deliberately not part of this crate;
 * deployments inject their own modules.
 */
pub trait SchedulerModule: Send {
    /// Told the client's held resources and remaining claim after every
    /// state change, so the module can maintain its own bookkeeping.
    fn set_allocation_state(&mut self, client: &ClientId, allocated: &ResourceSet, remaining_claim: &[ResourceSet]) {
        let _ = (client, allocated, remaining_claim);
    }

    /// Veto power over a candidate grant. Returning `false` blocks it; the
    /// request stays pending and is re-evaluated on the next reschedule.
    fn may_allocate(&self, client: &ClientId, resources: &ResourceSet) -> bool;

    /// Starts an asynchronous out-of-band preparation step for a pending
    /// allocation (e.g. opening a gate). The module reports completion via
    /// `Scheduler::preparation_successful`.
    fn prepare_allocation(&mut self, client: &ClientId, resources: &ResourceSet) {
        let _ = (client, resources);
    }

    /// Whether the module's preparation for this allocation has completed.
    /// Modules without asynchronous preparation are always prepared.
    fn has_prepared_allocation(&self, client: &ClientId, resources: &ResourceSet) -> bool {
        let _ = (client, resources);
        true
    }

    /// Notified when a client releases resources.
    fn allocation_released(&mut self, client: &ClientId, resources: &ResourceSet) {
        let _ = (client, resources);
    }
}
