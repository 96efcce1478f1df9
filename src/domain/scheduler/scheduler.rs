use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use crate::domain::model::id::ClientId;
use crate::domain::model::resource::ResourceSet;
use crate::domain::scheduler::allocation_state::AllocationState;
use crate::domain::scheduler::client::SchedulerClient;
use crate::domain::scheduler::module::SchedulerModule;
use crate::error::{Error, Result};

/**
 * Arbitrates exclusive use of driving-course resources among vehicle
 * clients.
 *
 * Clients declare their future needs in travel order via `claim`, then
 * request the claim's head set via `allocate`. Requests that cannot be
 * granted yet stay pending; freeing resources triggers a reschedule that
 * re-attempts them. Grants are delivered through the client's
 * `on_allocation` callback.
 *
 * Admission control is delegated to an ordered chain of modules; a grant
 * requires every module to allow the allocation and to report it prepared.
 *
 * All methods must be called from the single serialized kernel context.
 */
pub struct ResourceScheduler {
    state: AllocationState,
    modules: Vec<Box<dyn SchedulerModule>>,
    pending_queue: VecDeque<PendingRequest>,
    /// Requests for which `prepare_allocation` has already been issued, so
    /// preparation is started at most once per request.
    preparations_started: HashSet<(ClientId, ResourceSet)>,
}

#[derive(Clone)]
struct PendingRequest {
    client: ClientId,
    resources: ResourceSet,
}

/// Outcome of checking one pending request against the current allocation
/// state and the module chain.
enum GrantCheck {
    Grantable,
    ResourcesTaken,
    Vetoed,
    Unprepared,
}

impl ResourceScheduler {
    pub fn new(modules: Vec<Box<dyn SchedulerModule>>) -> Self {
        Self { state: AllocationState::new(), modules, pending_queue: VecDeque::new(), preparations_started: HashSet::new() }
    }

    pub fn register_client(&mut self, client: Arc<dyn SchedulerClient>) {
        log::debug!("Registering scheduler client {}.", client.id());
        self.state.register(client);
    }

    /// Removes a client and everything it holds or has claimed. Freed
    /// resources are handed to waiting clients right away.
    pub fn unregister_client(&mut self, client: &ClientId) {
        self.pending_queue.retain(|request| &request.client != client);
        self.preparations_started.retain(|(owner, _)| owner != client);
        if let Some(entry) = self.state.unregister(client) {
            if !entry.allocated.is_empty() {
                for module in &mut self.modules {
                    module.allocation_released(client, &entry.allocated);
                }
            }
        }
        self.reschedule();
    }

    /// Replaces the client's claim with the given ordered resource-set
    /// sequence. An empty sequence clears the claim. Claiming records
    /// intent and order, not ownership; any number of clients may claim the
    /// same resource.
    pub fn claim(&mut self, client: &ClientId, sequence: Vec<ResourceSet>) -> Result<()> {
        if !self.state.contains(client) {
            return Err(Error::UnknownClient(client.clone()));
        }
        self.state.set_claim(client, sequence);
        self.notify_allocation_state(client);
        Ok(())
    }

    /// Requests allocation of `resources` for the client.
    ///
    /// Fails synchronously if `resources` is not exactly the head of the
    /// client's claim or if the client already has a request outstanding;
    /// both are contract violations of the caller. Otherwise the request is
    /// queued and the method returns; the grant arrives later via
    /// `on_allocation`.
    pub fn allocate(&mut self, client: &ClientId, resources: ResourceSet) -> Result<()> {
        let entry = self.state.entry(client).ok_or_else(|| Error::UnknownClient(client.clone()))?;
        if entry.pending.is_some() {
            return Err(Error::PendingAllocationExists(client.clone()));
        }
        match entry.claim.front() {
            Some(head) if *head == resources => {}
            _ => return Err(Error::ClaimOrderViolation(client.clone())),
        }

        log::debug!("Queueing allocation request of client {} for {:?}.", client, resources);
        if let Some(entry) = self.state.entry_mut(client) {
            entry.pending = Some(resources.clone());
        }
        self.pending_queue.push_back(PendingRequest { client: client.clone(), resources });
        self.reschedule();
        Ok(())
    }

    /// Non-mutating safety query: would granting `resources` to the client
    /// be safe right now? Does not consult or consume any claim.
    pub fn may_allocate_now(&self, client: &ClientId, resources: &ResourceSet) -> bool {
        self.state.available_for(client, resources) && self.modules.iter().all(|module| module.may_allocate(client, resources))
    }

    /// Urgent, synchronous allocation for out-of-band cases such as a
    /// manually corrected vehicle position. Bypasses claims entirely; the
    /// caller is responsible for reconciling its claim afterwards.
    pub fn allocate_now(&mut self, client: &ClientId, resources: ResourceSet) -> Result<()> {
        if !self.state.contains(client) {
            return Err(Error::UnknownClient(client.clone()));
        }
        if !self.may_allocate_now(client, &resources) {
            return Err(Error::AllocationRefused(client.clone()));
        }
        self.state.record_allocation(client, &resources);
        self.notify_allocation_state(client);
        Ok(())
    }

    /// Releases the given resources, ignoring any the client does not
    /// actually hold, then reschedules so waiting clients can take over.
    pub fn free(&mut self, client: &ClientId, resources: &ResourceSet) -> Result<()> {
        if !self.state.contains(client) {
            return Err(Error::UnknownClient(client.clone()));
        }
        self.release_and_notify(client, resources);
        self.reschedule();
        Ok(())
    }

    pub fn free_all(&mut self, client: &ClientId) -> Result<()> {
        if !self.state.contains(client) {
            return Err(Error::UnknownClient(client.clone()));
        }
        let held = self.state.entry(client).map(|entry| entry.allocated.clone()).unwrap_or_default();
        self.release_and_notify(client, &held);
        self.reschedule();
        Ok(())
    }

    /// Cancels the client's outstanding allocation request, if any, without
    /// affecting resources it already holds.
    pub fn clear_pending_allocations(&mut self, client: &ClientId) {
        self.pending_queue.retain(|request| &request.client != client);
        let dropped = self.state.entry_mut(client).and_then(|entry| entry.pending.take());
        if let Some(dropped) = dropped {
            log::debug!("Cleared pending allocation of client {} for {:?}.", client, dropped);
            // A later request for the same set must issue its preparations
            // afresh; a module's preparation may have lapsed in between.
            self.preparations_started.remove(&(client.clone(), dropped));
        }
    }

    /// Snapshot of client id -> currently held resources.
    pub fn allocations(&self) -> HashMap<ClientId, ResourceSet> {
        self.state.snapshot()
    }

    /// Informs the scheduler that a module's asynchronous preparation for a
    /// pending allocation has completed. The module's own bookkeeping makes
    /// `has_prepared_allocation` answer true now; all we do is re-attempt.
    pub fn preparation_successful(&mut self, module_index: usize, client: &ClientId, resources: &ResourceSet) {
        log::debug!("Module {} finished preparing {:?} for client {}.", module_index, resources, client);
        self.reschedule();
    }

    /// Re-attempts all pending allocation requests until no more progress
    /// is made. Within a single client, requests are granted strictly in
    /// claim order; across clients no fairness is guaranteed by the core.
    pub fn reschedule(&mut self) {
        loop {
            let grants = self.sweep_pending();
            if grants.is_empty() {
                return;
            }
            for (client, resources) in grants {
                let accepted = match self.state.entry(&client) {
                    Some(entry) => {
                        let callback = Arc::clone(&entry.client);
                        callback.on_allocation(&resources)
                    }
                    None => false,
                };
                if !accepted {
                    // The client turned the grant down; treat the resources
                    // as released immediately, without restoring the claim.
                    log::debug!("Client {} rejected allocation of {:?}, releasing.", client, resources);
                    self.release_and_notify(&client, &resources);
                }
            }
        }
    }

    /// One pass over the pending queue. Grants everything currently
    /// admissible, returns the granted (client, resources) pairs for
    /// callback delivery.
    fn sweep_pending(&mut self) -> Vec<(ClientId, ResourceSet)> {
        let mut grants = Vec::new();
        let mut still_pending = VecDeque::new();

        while let Some(request) = self.pending_queue.pop_front() {
            if !self.is_current_request(&request) {
                continue;
            }
            match self.check_grant(&request) {
                GrantCheck::Grantable => {
                    if self.commit_grant(&request) {
                        grants.push((request.client, request.resources));
                    }
                }
                GrantCheck::Unprepared => {
                    self.start_preparations(&request);
                    still_pending.push_back(request);
                }
                GrantCheck::ResourcesTaken | GrantCheck::Vetoed => {
                    still_pending.push_back(request);
                }
            }
        }
        self.pending_queue = still_pending;
        grants
    }

    /// A queued request is only acted upon while it is still the client's
    /// outstanding one; cleared or superseded requests are dropped here.
    fn is_current_request(&self, request: &PendingRequest) -> bool {
        match self.state.entry(&request.client) {
            Some(entry) => entry.pending.as_ref() == Some(&request.resources),
            None => false,
        }
    }

    fn check_grant(&self, request: &PendingRequest) -> GrantCheck {
        if !self.state.available_for(&request.client, &request.resources) {
            return GrantCheck::ResourcesTaken;
        }
        if !self.modules.iter().all(|module| module.may_allocate(&request.client, &request.resources)) {
            return GrantCheck::Vetoed;
        }
        if !self.modules.iter().all(|module| module.has_prepared_allocation(&request.client, &request.resources)) {
            return GrantCheck::Unprepared;
        }
        GrantCheck::Grantable
    }

    fn start_preparations(&mut self, request: &PendingRequest) {
        let key = (request.client.clone(), request.resources.clone());
        if !self.preparations_started.insert(key) {
            return;
        }
        for module in &mut self.modules {
            if !module.has_prepared_allocation(&request.client, &request.resources) {
                module.prepare_allocation(&request.client, &request.resources);
            }
        }
    }

    /// Atomically removes the granted set from the head of the claim and
    /// records the allocation. Returns false if the claim was replaced
    /// since the request was queued; such a request is stale and dropped.
    fn commit_grant(&mut self, request: &PendingRequest) -> bool {
        let head_matches = self
            .state
            .entry(&request.client)
            .and_then(|entry| entry.claim.front())
            .map(|head| *head == request.resources)
            .unwrap_or(false);
        if !head_matches {
            log::warn!("Dropping stale allocation request of client {} for {:?}: claim head changed.", request.client, request.resources);
            self.preparations_started.remove(&(request.client.clone(), request.resources.clone()));
            if let Some(entry) = self.state.entry_mut(&request.client) {
                entry.pending = None;
            }
            return false;
        }

        self.state.pop_claim_head(&request.client);
        self.state.record_allocation(&request.client, &request.resources);
        self.preparations_started.remove(&(request.client.clone(), request.resources.clone()));
        if let Some(entry) = self.state.entry_mut(&request.client) {
            entry.pending = None;
        }
        log::debug!("Granting {:?} to client {}.", request.resources, request.client);
        self.notify_allocation_state(&request.client);
        true
    }

    fn release_and_notify(&mut self, client: &ClientId, resources: &ResourceSet) {
        let released = self.state.release(client, resources);
        if released.is_empty() {
            return;
        }
        log::debug!("Client {} released {:?}.", client, released);
        for module in &mut self.modules {
            module.allocation_released(client, &released);
        }
        self.notify_allocation_state(client);
    }

    fn notify_allocation_state(&mut self, client: &ClientId) {
        let (allocated, remaining_claim) = match self.state.entry(client) {
            Some(entry) => (entry.allocated.clone(), entry.remaining_claim()),
            None => return,
        };
        for module in &mut self.modules {
            module.set_allocation_state(client, &allocated, &remaining_claim);
        }
    }
}
