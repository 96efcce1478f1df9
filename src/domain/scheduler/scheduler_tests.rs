/// Unit tests for the resource scheduler core: claim discipline,
/// exclusivity, pending-request handling and module-chain composition.
#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    use crate::domain::model::id::{ClientId, VehicleId};
    use crate::domain::model::resource::{ResourceRef, ResourceSet, resource_set};
    use crate::domain::scheduler::client::SchedulerClient;
    use crate::domain::scheduler::module::SchedulerModule;
    use crate::domain::scheduler::scheduler::ResourceScheduler;
    use crate::error::Error;

    // --- HELPER TYPES FOR TEST SETUP ---

    /// A client recording every grant it receives. `accepting` controls the
    /// value its on_allocation callback returns.
    struct MockClient {
        id: ClientId,
        granted: Mutex<Vec<ResourceSet>>,
        accepting: AtomicBool,
    }

    impl MockClient {
        fn new(id: &str) -> Arc<Self> {
            Arc::new(Self { id: ClientId::new(id), granted: Mutex::new(Vec::new()), accepting: AtomicBool::new(true) })
        }

        fn grant_count(&self) -> usize {
            self.granted.lock().unwrap().len()
        }
    }

    impl SchedulerClient for MockClient {
        fn id(&self) -> ClientId {
            self.id.clone()
        }

        fn related_vehicle(&self) -> Option<VehicleId> {
            Some(VehicleId::new(self.id.name.clone()))
        }

        fn on_allocation(&self, resources: &ResourceSet) -> bool {
            self.granted.lock().unwrap().push(resources.clone());
            self.accepting.load(Ordering::SeqCst)
        }
    }

    /// A module whose veto can be toggled from the test.
    struct VetoModule {
        allowing: Arc<AtomicBool>,
    }

    impl SchedulerModule for VetoModule {
        fn may_allocate(&self, _client: &ClientId, _resources: &ResourceSet) -> bool {
            self.allowing.load(Ordering::SeqCst)
        }
    }

    /// A module requiring an out-of-band preparation step before any grant.
    struct PreparationModule {
        prepared: Arc<AtomicBool>,
        preparations_started: Arc<Mutex<Vec<ResourceSet>>>,
    }

    impl SchedulerModule for PreparationModule {
        fn may_allocate(&self, _client: &ClientId, _resources: &ResourceSet) -> bool {
            true
        }

        fn prepare_allocation(&mut self, _client: &ClientId, resources: &ResourceSet) {
            self.preparations_started.lock().unwrap().push(resources.clone());
        }

        fn has_prepared_allocation(&self, _client: &ClientId, _resources: &ResourceSet) -> bool {
            self.prepared.load(Ordering::SeqCst)
        }
    }

    fn point_set(name: &str) -> ResourceSet {
        resource_set([ResourceRef::point(name)])
    }

    fn scheduler_without_modules() -> ResourceScheduler {
        ResourceScheduler::new(Vec::new())
    }

    // --- CLAIM DISCIPLINE ---

    #[test]
    fn test_allocate_rejects_set_not_at_claim_head() {
        let mut scheduler = scheduler_without_modules();
        let client = MockClient::new("AGV-01");
        scheduler.register_client(client.clone());
        scheduler.claim(&client.id(), vec![point_set("p1"), point_set("p2")]).unwrap();

        let result = scheduler.allocate(&client.id(), point_set("p2"));
        assert!(matches!(result, Err(Error::ClaimOrderViolation(_))));
        assert_eq!(client.grant_count(), 0);
    }

    #[test]
    fn test_allocate_rejects_with_empty_claim() {
        let mut scheduler = scheduler_without_modules();
        let client = MockClient::new("AGV-01");
        scheduler.register_client(client.clone());

        let result = scheduler.allocate(&client.id(), point_set("p1"));
        assert!(matches!(result, Err(Error::ClaimOrderViolation(_))));
    }

    #[test]
    fn test_successful_allocation_consumes_claim_head() {
        let mut scheduler = scheduler_without_modules();
        let client = MockClient::new("AGV-01");
        scheduler.register_client(client.clone());
        scheduler.claim(&client.id(), vec![point_set("p1"), point_set("p2")]).unwrap();

        scheduler.allocate(&client.id(), point_set("p1")).unwrap();
        assert_eq!(client.grant_count(), 1);

        // p1 is gone from the claim; p2 is now the head and allocatable.
        scheduler.allocate(&client.id(), point_set("p2")).unwrap();
        assert_eq!(client.grant_count(), 2);

        let held = scheduler.allocations().remove(&client.id()).unwrap();
        assert!(held.contains(&ResourceRef::point("p1")));
        assert!(held.contains(&ResourceRef::point("p2")));
    }

    // --- AT-MOST-ONE-PENDING ---

    #[test]
    fn test_second_allocate_while_pending_is_rejected() {
        let mut scheduler = scheduler_without_modules();
        let holder = MockClient::new("AGV-01");
        let waiter = MockClient::new("AGV-02");
        scheduler.register_client(holder.clone());
        scheduler.register_client(waiter.clone());

        scheduler.claim(&holder.id(), vec![point_set("p1")]).unwrap();
        scheduler.allocate(&holder.id(), point_set("p1")).unwrap();

        // The waiter's request for p1 stays pending because the holder has it.
        scheduler.claim(&waiter.id(), vec![point_set("p1"), point_set("p2")]).unwrap();
        scheduler.allocate(&waiter.id(), point_set("p1")).unwrap();
        assert_eq!(waiter.grant_count(), 0);

        let result = scheduler.allocate(&waiter.id(), point_set("p1"));
        assert!(matches!(result, Err(Error::PendingAllocationExists(_))));
    }

    #[test]
    fn test_clear_pending_allows_new_request_and_keeps_holdings() {
        let mut scheduler = scheduler_without_modules();
        let holder = MockClient::new("AGV-01");
        let waiter = MockClient::new("AGV-02");
        scheduler.register_client(holder.clone());
        scheduler.register_client(waiter.clone());

        scheduler.claim(&holder.id(), vec![point_set("p1")]).unwrap();
        scheduler.allocate(&holder.id(), point_set("p1")).unwrap();

        scheduler.claim(&waiter.id(), vec![point_set("p2")]).unwrap();
        scheduler.allocate(&waiter.id(), point_set("p2")).unwrap();
        assert_eq!(waiter.grant_count(), 1);

        scheduler.claim(&waiter.id(), vec![point_set("p1")]).unwrap();
        scheduler.allocate(&waiter.id(), point_set("p1")).unwrap();
        assert_eq!(waiter.grant_count(), 1);

        scheduler.clear_pending_allocations(&waiter.id());

        // Held resources survive the cancellation.
        let held = scheduler.allocations().remove(&waiter.id()).unwrap();
        assert!(held.contains(&ResourceRef::point("p2")));

        // Freeing p1 later must not grant the cancelled request.
        scheduler.free_all(&holder.id()).unwrap();
        assert_eq!(waiter.grant_count(), 1);
    }

    // --- EXCLUSIVITY ---

    #[test]
    fn test_resource_never_held_by_two_clients() {
        let mut scheduler = scheduler_without_modules();
        let first = MockClient::new("AGV-01");
        let second = MockClient::new("AGV-02");
        scheduler.register_client(first.clone());
        scheduler.register_client(second.clone());

        // Both claim the same point; claims are shared.
        scheduler.claim(&first.id(), vec![point_set("p1")]).unwrap();
        scheduler.claim(&second.id(), vec![point_set("p1")]).unwrap();

        scheduler.allocate(&first.id(), point_set("p1")).unwrap();
        scheduler.allocate(&second.id(), point_set("p1")).unwrap();

        assert_eq!(first.grant_count(), 1);
        assert_eq!(second.grant_count(), 0);

        // Once the holder frees, the waiter is served by the reschedule.
        scheduler.free_all(&first.id()).unwrap();
        assert_eq!(second.grant_count(), 1);

        let allocations = scheduler.allocations();
        assert!(allocations.get(&first.id()).unwrap().is_empty());
        assert!(allocations.get(&second.id()).unwrap().contains(&ResourceRef::point("p1")));
    }

    // --- MODULE CHAIN COMPOSITION ---

    #[test]
    fn test_module_veto_blocks_until_lifted() {
        let allowing = Arc::new(AtomicBool::new(false));
        let mut scheduler = ResourceScheduler::new(vec![Box::new(VetoModule { allowing: allowing.clone() })]);
        let client = MockClient::new("AGV-01");
        scheduler.register_client(client.clone());
        scheduler.claim(&client.id(), vec![point_set("p1")]).unwrap();

        scheduler.allocate(&client.id(), point_set("p1")).unwrap();
        assert_eq!(client.grant_count(), 0, "a vetoed allocation must not be granted");

        allowing.store(true, Ordering::SeqCst);
        scheduler.reschedule();
        assert_eq!(client.grant_count(), 1, "an allowed and prepared allocation must eventually be granted");
    }

    #[test]
    fn test_unprepared_module_blocks_until_preparation_succeeds() {
        let prepared = Arc::new(AtomicBool::new(false));
        let preparations_started = Arc::new(Mutex::new(Vec::new()));
        let module = PreparationModule { prepared: prepared.clone(), preparations_started: preparations_started.clone() };
        let mut scheduler = ResourceScheduler::new(vec![Box::new(module)]);

        let client = MockClient::new("AGV-01");
        scheduler.register_client(client.clone());
        scheduler.claim(&client.id(), vec![point_set("p1")]).unwrap();
        scheduler.allocate(&client.id(), point_set("p1")).unwrap();

        assert_eq!(client.grant_count(), 0);
        assert_eq!(preparations_started.lock().unwrap().len(), 1, "preparation is started exactly once");

        scheduler.reschedule();
        assert_eq!(preparations_started.lock().unwrap().len(), 1);

        prepared.store(true, Ordering::SeqCst);
        scheduler.preparation_successful(0, &client.id(), &point_set("p1"));
        assert_eq!(client.grant_count(), 1);
    }

    #[test]
    fn test_cancelled_request_restarts_preparation_when_reallocated() {
        let prepared = Arc::new(AtomicBool::new(false));
        let preparations_started = Arc::new(Mutex::new(Vec::new()));
        let module = PreparationModule { prepared: prepared.clone(), preparations_started: preparations_started.clone() };
        let mut scheduler = ResourceScheduler::new(vec![Box::new(module)]);

        let client = MockClient::new("AGV-01");
        scheduler.register_client(client.clone());
        scheduler.claim(&client.id(), vec![point_set("p1")]).unwrap();
        scheduler.allocate(&client.id(), point_set("p1")).unwrap();
        assert_eq!(preparations_started.lock().unwrap().len(), 1);

        // The request is cancelled and the module's preparation lapses
        // before the client asks for the same set again.
        scheduler.clear_pending_allocations(&client.id());

        scheduler.claim(&client.id(), vec![point_set("p1")]).unwrap();
        scheduler.allocate(&client.id(), point_set("p1")).unwrap();
        assert_eq!(preparations_started.lock().unwrap().len(), 2, "the fresh request must be prepared again");

        prepared.store(true, Ordering::SeqCst);
        scheduler.preparation_successful(0, &client.id(), &point_set("p1"));
        assert_eq!(client.grant_count(), 1);
    }

    #[test]
    fn test_any_vetoing_module_in_chain_blocks() {
        let first_allows = Arc::new(AtomicBool::new(true));
        let second_allows = Arc::new(AtomicBool::new(false));
        let mut scheduler = ResourceScheduler::new(vec![
            Box::new(VetoModule { allowing: first_allows }),
            Box::new(VetoModule { allowing: second_allows.clone() }),
        ]);

        let client = MockClient::new("AGV-01");
        scheduler.register_client(client.clone());
        scheduler.claim(&client.id(), vec![point_set("p1")]).unwrap();
        scheduler.allocate(&client.id(), point_set("p1")).unwrap();
        assert_eq!(client.grant_count(), 0);

        second_allows.store(true, Ordering::SeqCst);
        scheduler.reschedule();
        assert_eq!(client.grant_count(), 1);
    }

    // --- CALLBACK REJECTION ---

    #[test]
    fn test_rejected_grant_releases_resources_immediately() {
        let mut scheduler = scheduler_without_modules();
        let rejecting = MockClient::new("AGV-01");
        rejecting.accepting.store(false, Ordering::SeqCst);
        let other = MockClient::new("AGV-02");
        scheduler.register_client(rejecting.clone());
        scheduler.register_client(other.clone());

        scheduler.claim(&rejecting.id(), vec![point_set("p1")]).unwrap();
        scheduler.allocate(&rejecting.id(), point_set("p1")).unwrap();
        assert_eq!(rejecting.grant_count(), 1);

        // The grant was turned down, so p1 is free again for others.
        scheduler.claim(&other.id(), vec![point_set("p1")]).unwrap();
        scheduler.allocate(&other.id(), point_set("p1")).unwrap();
        assert_eq!(other.grant_count(), 1);

        // The claim head was consumed despite the rejection.
        let result = scheduler.allocate(&rejecting.id(), point_set("p1"));
        assert!(matches!(result, Err(Error::ClaimOrderViolation(_))));
    }

    // --- URGENT ALLOCATION ---

    #[test]
    fn test_allocate_now_ignores_claims_and_fails_when_unsafe() {
        let mut scheduler = scheduler_without_modules();
        let holder = MockClient::new("AGV-01");
        let urgent = MockClient::new("AGV-02");
        scheduler.register_client(holder.clone());
        scheduler.register_client(urgent.clone());

        scheduler.claim(&holder.id(), vec![point_set("p1")]).unwrap();
        scheduler.allocate(&holder.id(), point_set("p1")).unwrap();

        // No claim needed for the urgent path.
        scheduler.allocate_now(&urgent.id(), point_set("p2")).unwrap();
        assert!(scheduler.allocations().remove(&urgent.id()).unwrap().contains(&ResourceRef::point("p2")));

        // p1 is taken, so urgent allocation of it must be refused.
        let result = scheduler.allocate_now(&urgent.id(), point_set("p1"));
        assert!(matches!(result, Err(Error::AllocationRefused(_))));
    }

    #[test]
    fn test_may_allocate_now_does_not_mutate() {
        let mut scheduler = scheduler_without_modules();
        let client = MockClient::new("AGV-01");
        scheduler.register_client(client.clone());

        assert!(scheduler.may_allocate_now(&client.id(), &point_set("p1")));
        assert!(scheduler.allocations().remove(&client.id()).unwrap().is_empty());
    }

    // --- FREEING ---

    #[test]
    fn test_free_ignores_resources_not_held() {
        let mut scheduler = scheduler_without_modules();
        let client = MockClient::new("AGV-01");
        scheduler.register_client(client.clone());
        scheduler.claim(&client.id(), vec![point_set("p1")]).unwrap();
        scheduler.allocate(&client.id(), point_set("p1")).unwrap();

        let mut to_free = point_set("p1");
        to_free.extend(point_set("p9"));
        scheduler.free(&client.id(), &to_free).unwrap();

        assert!(scheduler.allocations().remove(&client.id()).unwrap().is_empty());
    }

    #[test]
    fn test_unregister_frees_holdings_for_waiters() {
        let mut scheduler = scheduler_without_modules();
        let leaving = MockClient::new("AGV-01");
        let waiter = MockClient::new("AGV-02");
        scheduler.register_client(leaving.clone());
        scheduler.register_client(waiter.clone());

        scheduler.claim(&leaving.id(), vec![point_set("p1")]).unwrap();
        scheduler.allocate(&leaving.id(), point_set("p1")).unwrap();

        scheduler.claim(&waiter.id(), vec![point_set("p1")]).unwrap();
        scheduler.allocate(&waiter.id(), point_set("p1")).unwrap();
        assert_eq!(waiter.grant_count(), 0);

        scheduler.unregister_client(&leaving.id());
        assert_eq!(waiter.grant_count(), 1);
    }
}
