use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use crate::domain::model::id::ClientId;
use crate::domain::model::resource::{ResourceRef, ResourceSet};
use crate::domain::scheduler::client::SchedulerClient;

/// Per-client scheduling state: the registered callback, the claim (ordered
/// future resource needs), the resources currently held, and the outstanding
/// allocation request, of which there may be at most one.
pub struct ClientEntry {
    pub client: Arc<dyn SchedulerClient>,
    pub claim: VecDeque<ResourceSet>,
    pub allocated: ResourceSet,
    pub pending: Option<ResourceSet>,
}

impl ClientEntry {
    fn new(client: Arc<dyn SchedulerClient>) -> Self {
        Self { client, claim: VecDeque::new(), allocated: ResourceSet::new(), pending: None }
    }

    pub fn remaining_claim(&self) -> Vec<ResourceSet> {
        self.claim.iter().cloned().collect()
    }
}

/// The scheduler's one piece of truly shared mutable state: who holds what,
/// and who has claimed what. Allocations are exclusive (0 or 1 holder per
/// resource); claims are shared (any number of claimants per resource).
#[derive(Default)]
pub struct AllocationState {
    clients: HashMap<ClientId, ClientEntry>,
    allocations: HashMap<ResourceRef, ClientId>,
    claimants: HashMap<ResourceRef, HashSet<ClientId>>,
}

impl AllocationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, client: Arc<dyn SchedulerClient>) {
        let id = client.id();
        if self.clients.contains_key(&id) {
            log::warn!("Client {} is already registered, keeping existing state.", id);
            return;
        }
        self.clients.insert(id, ClientEntry::new(client));
    }

    /// Removes a client entirely, dropping its claim and any held resources.
    /// Used when the vehicle disappears from the driving course.
    pub fn unregister(&mut self, client: &ClientId) -> Option<ClientEntry> {
        let entry = self.clients.remove(client)?;
        for resource in &entry.allocated {
            self.allocations.remove(resource);
        }
        for set in &entry.claim {
            self.remove_claimants(client, set);
        }
        Some(entry)
    }

    pub fn entry(&self, client: &ClientId) -> Option<&ClientEntry> {
        self.clients.get(client)
    }

    pub fn entry_mut(&mut self, client: &ClientId) -> Option<&mut ClientEntry> {
        self.clients.get_mut(client)
    }

    pub fn contains(&self, client: &ClientId) -> bool {
        self.clients.contains_key(client)
    }

    /// Replaces the client's claim. Also rebuilds the shared
    /// resource-to-claimants index for that client.
    pub fn set_claim(&mut self, client: &ClientId, sequence: Vec<ResourceSet>) {
        let old_claim: Vec<ResourceSet> = match self.clients.get(client) {
            Some(entry) => entry.claim.iter().cloned().collect(),
            None => return,
        };
        for set in &old_claim {
            self.remove_claimants(client, set);
        }
        for set in &sequence {
            for resource in set {
                self.claimants.entry(resource.clone()).or_default().insert(client.clone());
            }
        }
        if let Some(entry) = self.clients.get_mut(client) {
            entry.claim = sequence.into();
        }
    }

    /// Pops the head of the client's claim, keeping the claimants index in
    /// sync. Called when an allocation is granted.
    pub fn pop_claim_head(&mut self, client: &ClientId) -> Option<ResourceSet> {
        let head = self.clients.get_mut(client)?.claim.pop_front()?;
        self.remove_claimants(client, &head);
        Some(head)
    }

    fn remove_claimants(&mut self, client: &ClientId, set: &ResourceSet) {
        for resource in set {
            if let Some(claimants) = self.claimants.get_mut(resource) {
                claimants.remove(client);
                if claimants.is_empty() {
                    self.claimants.remove(resource);
                }
            }
        }
    }

    pub fn holder(&self, resource: &ResourceRef) -> Option<&ClientId> {
        self.allocations.get(resource)
    }

    /// Whether every resource in the set is free or already held by the
    /// given client.
    pub fn available_for(&self, client: &ClientId, resources: &ResourceSet) -> bool {
        resources.iter().all(|resource| match self.allocations.get(resource) {
            None => true,
            Some(holder) => holder == client,
        })
    }

    /// Records the resources as held by the client. Callers must have
    /// checked availability first.
    pub fn record_allocation(&mut self, client: &ClientId, resources: &ResourceSet) {
        for resource in resources {
            self.allocations.insert(resource.clone(), client.clone());
        }
        if let Some(entry) = self.clients.get_mut(client) {
            entry.allocated.extend(resources.iter().cloned());
        }
    }

    /// Releases the intersection of `resources` and the client's holdings,
    /// returning what was actually released. Requested resources the client
    /// does not hold are ignored.
    pub fn release(&mut self, client: &ClientId, resources: &ResourceSet) -> ResourceSet {
        let entry = match self.clients.get_mut(client) {
            Some(entry) => entry,
            None => return ResourceSet::new(),
        };
        let released: ResourceSet = resources.iter().filter(|r| entry.allocated.contains(*r)).cloned().collect();
        for resource in &released {
            entry.allocated.remove(resource);
            self.allocations.remove(resource);
        }
        released
    }

    pub fn release_all(&mut self, client: &ClientId) -> ResourceSet {
        let held = match self.clients.get(client) {
            Some(entry) => entry.allocated.clone(),
            None => return ResourceSet::new(),
        };
        self.release(client, &held)
    }

    /// Snapshot of client id -> held resources, for diagnostics and
    /// external services.
    pub fn snapshot(&self) -> HashMap<ClientId, ResourceSet> {
        self.clients.iter().map(|(id, entry)| (id.clone(), entry.allocated.clone())).collect()
    }
}
