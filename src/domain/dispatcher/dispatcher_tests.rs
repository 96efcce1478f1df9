/// Tests for the dispatcher as a whole: phase ordering, pairing, the
/// reservation flow and topology-change rerouting, run against the real
/// Dijkstra route provider on a small driving course.
#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::domain::dispatcher::dispatcher::Dispatcher;
    use crate::domain::dispatcher::filter::{
        CompositeAssignmentCandidateSelectionFilter, CompositeTransportOrderSelectionFilter, CompositeVehicleSelectionFilter,
        TransportOrderSelectionFilter,
    };
    use crate::domain::dispatcher::order_assigner::NO_VEHICLE_AVAILABLE;
    use crate::domain::model::id::{PathId, PointId, TransportOrderId, VehicleId};
    use crate::domain::model::plant_model::{Path, PlantModel, Point};
    use crate::domain::model::route::ReroutingType;
    use crate::domain::model::transport_order::{Destination, DriveOrder, TransportOrder, TransportOrderState};
    use crate::domain::model::vehicle::{ProcState, Vehicle};
    use crate::domain::routing::dijkstra_route_provider::DijkstraRouteProvider;
    use crate::domain::routing::edge_evaluator::EdgeEvaluatorByLength;
    use crate::domain::scheduler::scheduler::ResourceScheduler;
    use crate::domain::store::transport_order_service::{InMemoryTransportOrderService, TransportOrderService};
    use crate::domain::store::vehicle_service::{InMemoryVehicleService, VehicleService};

    // --- HELPER FUNCTIONS FOR TEST SETUP ---

    /// Line p1 -> p2 -> p3 -> p4 -> p5 (10 each) with a return path
    /// p5 -> p1, a longer shortcut p2 -> p4 (25) and a charging bay at
    /// p1 (5).
    fn mock_plant_model() -> PlantModel {
        let model = PlantModel::new();
        for name in ["p1", "p2", "p3", "p4", "p5", "charge-bay"] {
            model.add_point(Point::new(name));
        }
        for (name, source, destination, length) in [
            ("p1-p2", "p1", "p2", 10),
            ("p2-p3", "p2", "p3", 10),
            ("p3-p4", "p3", "p4", 10),
            ("p4-p5", "p4", "p5", 10),
            ("p5-p1", "p5", "p1", 10),
            ("p2-p4", "p2", "p4", 25),
            ("p1-charge", "p1", "charge-bay", 5),
        ] {
            model.add_path(Path::new(name, PointId::new(source), PointId::new(destination), length));
        }
        model
    }

    struct Fixture {
        vehicles: InMemoryVehicleService,
        orders: InMemoryTransportOrderService,
        plant_model: PlantModel,
        dispatcher: Dispatcher,
        scheduler: ResourceScheduler,
    }

    fn fixture() -> Fixture {
        fixture_with_order_filter(CompositeTransportOrderSelectionFilter::default())
    }

    fn fixture_with_order_filter(order_filter: CompositeTransportOrderSelectionFilter) -> Fixture {
        let vehicles = InMemoryVehicleService::new();
        let orders = InMemoryTransportOrderService::new();
        let plant_model = mock_plant_model();
        let route_provider = Arc::new(DijkstraRouteProvider::new(plant_model.clone(), Arc::new(EdgeEvaluatorByLength)));
        let dispatcher = Dispatcher::new(
            Arc::new(vehicles.clone()),
            Arc::new(orders.clone()),
            route_provider,
            CompositeVehicleSelectionFilter::default(),
            order_filter,
            CompositeAssignmentCandidateSelectionFilter::default(),
        );
        Fixture { vehicles, orders, plant_model, dispatcher, scheduler: ResourceScheduler::new(Vec::new()) }
    }

    fn mock_vehicle(name: &str, position: &str) -> Vehicle {
        Vehicle::new(VehicleId::new(name), PointId::new(position))
    }

    /// A dispatchable single-leg order to `destination`.
    fn mock_order(name: &str, destination: &str) -> TransportOrder {
        let mut order = TransportOrder::new(
            TransportOrderId::new(name),
            vec![DriveOrder::new(Destination::new(PointId::new(destination), "NOP"))],
        );
        order.state = TransportOrderState::Dispatchable;
        order
    }

    fn order_state(fixture: &Fixture, name: &str) -> TransportOrderState {
        fixture.orders.fetch_order(&TransportOrderId::new(name)).unwrap().state
    }

    // --- FREE ORDER ASSIGNMENT ---

    #[test]
    fn test_dispatch_assigns_free_order_to_idle_vehicle() {
        let fixture = fixture();
        fixture.vehicles.add_vehicle(mock_vehicle("AGV-01", "p1"));
        fixture.orders.add_order(mock_order("order-1", "p3"));

        fixture.dispatcher.dispatch().unwrap();

        let order = fixture.orders.fetch_order(&TransportOrderId::new("order-1")).unwrap();
        assert_eq!(order.state, TransportOrderState::BeingProcessed);
        assert_eq!(order.processing_vehicle, Some(VehicleId::new("AGV-01")));
        assert_eq!(order.current_drive_order_index, Some(0));
        let route = order.drive_orders[0].route.as_ref().expect("the assigned drive order is routed");
        assert_eq!(route.costs, 20);

        let vehicle = fixture.vehicles.fetch_vehicle(&VehicleId::new("AGV-01")).unwrap();
        assert_eq!(vehicle.proc_state, ProcState::ProcessingOrder);
        assert_eq!(vehicle.transport_order, Some(TransportOrderId::new("order-1")));
    }

    #[test]
    fn test_dispatch_never_reassigns_an_order_being_processed() {
        let fixture = fixture();
        let mut busy = mock_vehicle("AGV-01", "p1");
        busy.proc_state = ProcState::ProcessingOrder;
        busy.transport_order = Some(TransportOrderId::new("order-1"));
        fixture.vehicles.add_vehicle(busy);
        fixture.vehicles.add_vehicle(mock_vehicle("AGV-02", "p2"));

        let mut order = mock_order("order-1", "p3");
        order.state = TransportOrderState::BeingProcessed;
        order.processing_vehicle = Some(VehicleId::new("AGV-01"));
        order.current_drive_order_index = Some(0);
        fixture.orders.add_order(order);

        fixture.dispatcher.dispatch().unwrap();

        let order = fixture.orders.fetch_order(&TransportOrderId::new("order-1")).unwrap();
        assert_eq!(order.processing_vehicle, Some(VehicleId::new("AGV-01")));
        let idle = fixture.vehicles.fetch_vehicle(&VehicleId::new("AGV-02")).unwrap();
        assert_eq!(idle.proc_state, ProcState::Idle, "the idle vehicle must not steal a running order");
    }

    #[test]
    fn test_dispatch_with_fewer_vehicles_than_orders_assigns_each_vehicle_once() {
        let fixture = fixture();
        fixture.vehicles.add_vehicle(mock_vehicle("AGV-01", "p1"));
        fixture.vehicles.add_vehicle(mock_vehicle("AGV-02", "p2"));
        fixture.orders.add_order(mock_order("order-1", "p3"));
        fixture.orders.add_order(mock_order("order-2", "p4"));
        fixture.orders.add_order(mock_order("order-3", "p5"));

        fixture.dispatcher.dispatch().unwrap();

        let assigned = fixture.orders.fetch_orders_in_state(TransportOrderState::BeingProcessed);
        assert_eq!(assigned.len(), 2);
        let open = fixture.orders.fetch_orders_in_state(TransportOrderState::Dispatchable);
        assert_eq!(open.len(), 1, "the surplus order waits for the next run");
        assert!(open[0].is_deferred(), "the surplus order carries a deferral mark");
        assert_eq!(open[0].deferral_reasons, vec![NO_VEHICLE_AVAILABLE.to_string()]);

        // A vehicle joining the fleet lets the next run take the surplus
        // order and clear its mark.
        let surplus = open[0].id.clone();
        fixture.vehicles.add_vehicle(mock_vehicle("AGV-03", "p3"));
        fixture.dispatcher.dispatch().unwrap();

        let order = fixture.orders.fetch_order(&surplus).unwrap();
        assert_eq!(order.state, TransportOrderState::BeingProcessed);
        assert!(!order.is_deferred());
    }

    #[test]
    fn test_order_with_intended_vehicle_waits_for_it() {
        let fixture = fixture();
        fixture.vehicles.add_vehicle(mock_vehicle("AGV-01", "p1"));
        let mut paused = mock_vehicle("AGV-02", "p2");
        paused.paused = true;
        fixture.vehicles.add_vehicle(paused);

        let mut order = mock_order("order-1", "p3");
        order.intended_vehicle = Some(VehicleId::new("AGV-02"));
        fixture.orders.add_order(order);

        fixture.dispatcher.dispatch().unwrap();

        assert_eq!(order_state(&fixture, "order-1"), TransportOrderState::Dispatchable);
        let free = fixture.vehicles.fetch_vehicle(&VehicleId::new("AGV-01")).unwrap();
        assert_eq!(free.proc_state, ProcState::Idle, "the order is not given to a vehicle it was not intended for");
    }

    #[test]
    fn test_energy_critical_vehicle_only_accepts_recharge_orders() {
        let fixture = fixture();
        let mut vehicle = mock_vehicle("AGV-01", "p1");
        vehicle.energy_level = 10;
        fixture.vehicles.add_vehicle(vehicle);

        fixture.orders.add_order(mock_order("order-haul", "p5"));
        let mut recharge = TransportOrder::new(
            TransportOrderId::new("order-charge"),
            vec![DriveOrder::new(Destination::new(PointId::new("charge-bay"), "CHARGE"))],
        );
        recharge.state = TransportOrderState::Dispatchable;
        fixture.orders.add_order(recharge);

        fixture.dispatcher.dispatch().unwrap();

        assert_eq!(order_state(&fixture, "order-charge"), TransportOrderState::BeingProcessed);
        assert_eq!(order_state(&fixture, "order-haul"), TransportOrderState::Dispatchable);
    }

    // --- RESERVATIONS ---

    #[test]
    fn test_dispensable_order_is_reserved_and_consumed_once_vehicle_is_idle() {
        let fixture = fixture();
        let mut vehicle = mock_vehicle("AGV-01", "p1");
        vehicle.proc_state = ProcState::ProcessingOrder;
        vehicle.transport_order = Some(TransportOrderId::new("order-parking"));
        fixture.vehicles.add_vehicle(vehicle);

        let mut parking = mock_order("order-parking", "p2");
        parking.state = TransportOrderState::BeingProcessed;
        parking.processing_vehicle = Some(VehicleId::new("AGV-01"));
        parking.current_drive_order_index = Some(0);
        parking.dispensable = true;
        fixture.orders.add_order(parking);
        fixture.orders.add_order(mock_order("order-real", "p4"));

        fixture.dispatcher.dispatch().unwrap();

        // The new order is only reserved; the dispensable order's abort has
        // been requested but the vehicle has not reported idle yet.
        assert_eq!(fixture.dispatcher.reservation_pool().reserved_vehicle(&TransportOrderId::new("order-real")), Some(VehicleId::new("AGV-01")));
        assert_eq!(order_state(&fixture, "order-real"), TransportOrderState::Dispatchable);
        assert_eq!(order_state(&fixture, "order-parking"), TransportOrderState::Withdrawn);

        // The vehicle reports idle after aborting.
        let mut vehicle = fixture.vehicles.fetch_vehicle(&VehicleId::new("AGV-01")).unwrap();
        vehicle.proc_state = ProcState::Idle;
        vehicle.transport_order = None;
        fixture.vehicles.update_vehicle(vehicle).unwrap();

        fixture.dispatcher.dispatch().unwrap();

        let order = fixture.orders.fetch_order(&TransportOrderId::new("order-real")).unwrap();
        assert_eq!(order.state, TransportOrderState::BeingProcessed);
        assert_eq!(order.processing_vehicle, Some(VehicleId::new("AGV-01")));
        assert!(!fixture.dispatcher.reservation_pool().is_reserved(&TransportOrderId::new("order-real")));
    }

    #[test]
    fn test_reserved_order_beats_open_pairing_for_its_vehicle() {
        let fixture = fixture();
        fixture.vehicles.add_vehicle(mock_vehicle("AGV-01", "p1"));
        fixture.orders.add_order(mock_order("order-reserved", "p4"));
        // Closer and therefore the open pairing's favorite.
        fixture.orders.add_order(mock_order("order-near", "p2"));
        fixture.dispatcher.reservation_pool().add_reservation(TransportOrderId::new("order-reserved"), VehicleId::new("AGV-01"));

        fixture.dispatcher.dispatch().unwrap();

        assert_eq!(order_state(&fixture, "order-reserved"), TransportOrderState::BeingProcessed);
        assert_eq!(order_state(&fixture, "order-near"), TransportOrderState::Dispatchable);
    }

    #[test]
    fn test_stale_reservation_is_dropped() {
        let fixture = fixture();
        fixture.vehicles.add_vehicle(mock_vehicle("AGV-01", "p1"));
        let mut withdrawn = mock_order("order-gone", "p4");
        withdrawn.state = TransportOrderState::Withdrawn;
        fixture.orders.add_order(withdrawn);
        fixture.dispatcher.reservation_pool().add_reservation(TransportOrderId::new("order-gone"), VehicleId::new("AGV-01"));

        fixture.dispatcher.dispatch().unwrap();

        assert!(!fixture.dispatcher.reservation_pool().is_reserved(&TransportOrderId::new("order-gone")));
        let vehicle = fixture.vehicles.fetch_vehicle(&VehicleId::new("AGV-01")).unwrap();
        assert_eq!(vehicle.proc_state, ProcState::Idle);
    }

    // --- MULTI-LEG ADVANCEMENT ---

    fn mock_two_leg_assignment(fixture: &Fixture) {
        let mut vehicle = mock_vehicle("AGV-01", "p1");
        vehicle.proc_state = ProcState::Idle;
        fixture.vehicles.add_vehicle(vehicle);

        let mut order = TransportOrder::new(
            TransportOrderId::new("order-1"),
            vec![
                DriveOrder::new(Destination::new(PointId::new("p3"), "LOAD")),
                DriveOrder::new(Destination::new(PointId::new("p5"), "UNLOAD")),
            ],
        );
        order.state = TransportOrderState::Dispatchable;
        fixture.orders.add_order(order);
        fixture.dispatcher.dispatch().unwrap();
    }

    #[test]
    fn test_awaiting_vehicle_advances_to_next_drive_order() {
        let fixture = fixture();
        mock_two_leg_assignment(&fixture);

        // The vehicle finishes the first leg and reports in.
        let mut vehicle = fixture.vehicles.fetch_vehicle(&VehicleId::new("AGV-01")).unwrap();
        vehicle.current_position = Some(PointId::new("p3"));
        vehicle.proc_state = ProcState::AwaitingOrder;
        fixture.vehicles.update_vehicle(vehicle).unwrap();

        fixture.dispatcher.dispatch().unwrap();

        let order = fixture.orders.fetch_order(&TransportOrderId::new("order-1")).unwrap();
        assert_eq!(order.state, TransportOrderState::BeingProcessed);
        assert_eq!(order.current_drive_order_index, Some(1));
        let vehicle = fixture.vehicles.fetch_vehicle(&VehicleId::new("AGV-01")).unwrap();
        assert_eq!(vehicle.proc_state, ProcState::ProcessingOrder);
    }

    #[test]
    fn test_finishing_vehicle_is_reused_within_the_same_run() {
        let fixture = fixture();
        mock_two_leg_assignment(&fixture);

        // Fast-forward to the last leg.
        let mut order = fixture.orders.fetch_order(&TransportOrderId::new("order-1")).unwrap();
        order.current_drive_order_index = Some(1);
        fixture.orders.update_order(order).unwrap();
        let mut vehicle = fixture.vehicles.fetch_vehicle(&VehicleId::new("AGV-01")).unwrap();
        vehicle.current_position = Some(PointId::new("p5"));
        vehicle.proc_state = ProcState::AwaitingOrder;
        fixture.vehicles.update_vehicle(vehicle).unwrap();

        fixture.orders.add_order(mock_order("order-next", "p4"));

        fixture.dispatcher.dispatch().unwrap();

        assert_eq!(order_state(&fixture, "order-1"), TransportOrderState::Finished);
        // Finishing happens in the first phase, so the free-orders phase of
        // the very same run already sees the vehicle as idle.
        let order = fixture.orders.fetch_order(&TransportOrderId::new("order-next")).unwrap();
        assert_eq!(order.state, TransportOrderState::BeingProcessed);
        assert_eq!(order.processing_vehicle, Some(VehicleId::new("AGV-01")));
    }

    // --- ACTIVATION, DEPENDENCIES, WITHDRAWAL ---

    #[test]
    fn test_activation_waits_for_unfinished_dependencies() {
        let fixture = fixture();
        let mut dependency = mock_order("order-dep", "p2");
        dependency.state = TransportOrderState::BeingProcessed;
        fixture.orders.add_order(dependency);

        let mut order = mock_order("order-1", "p3");
        order.state = TransportOrderState::Raw;
        order.dependencies = vec![TransportOrderId::new("order-dep")];
        fixture.orders.add_order(order);

        fixture.dispatcher.activate_order(&TransportOrderId::new("order-1")).unwrap();
        assert_eq!(order_state(&fixture, "order-1"), TransportOrderState::Active);

        fixture.orders.update_order_state(&TransportOrderId::new("order-dep"), TransportOrderState::Finished).unwrap();
        fixture.dispatcher.dispatch().unwrap();
        assert_ne!(order_state(&fixture, "order-1"), TransportOrderState::Active, "a dispatch run promotes orders whose dependencies finished");
    }

    #[test]
    fn test_withdrawing_a_processed_order_frees_its_vehicle() {
        let fixture = fixture();
        fixture.vehicles.add_vehicle(mock_vehicle("AGV-01", "p1"));
        fixture.orders.add_order(mock_order("order-1", "p3"));
        fixture.dispatcher.dispatch().unwrap();

        fixture.dispatcher.withdraw_order(&TransportOrderId::new("order-1")).unwrap();

        assert_eq!(order_state(&fixture, "order-1"), TransportOrderState::Withdrawn);
        let vehicle = fixture.vehicles.fetch_vehicle(&VehicleId::new("AGV-01")).unwrap();
        assert_eq!(vehicle.proc_state, ProcState::Idle);
        assert_eq!(vehicle.transport_order, None);
    }

    // --- DEFERRAL ---

    struct RejectSpecialOrders;

    impl TransportOrderSelectionFilter for RejectSpecialOrders {
        fn rejection_reasons(&self, order: &TransportOrder) -> Vec<String> {
            if order.order_type == "special" { vec!["Special orders are blocked".to_string()] } else { Vec::new() }
        }
    }

    #[test]
    fn test_filtered_order_is_deferred_and_later_resumed() {
        let fixture = fixture_with_order_filter(CompositeTransportOrderSelectionFilter::new(vec![Arc::new(RejectSpecialOrders)]));
        fixture.vehicles.add_vehicle(mock_vehicle("AGV-01", "p1"));
        let mut order = mock_order("order-1", "p3");
        order.order_type = "special".to_string();
        fixture.orders.add_order(order);

        fixture.dispatcher.dispatch().unwrap();

        let order = fixture.orders.fetch_order(&TransportOrderId::new("order-1")).unwrap();
        assert!(order.is_deferred());
        assert_eq!(order.deferral_reasons, vec!["Special orders are blocked".to_string()]);
        assert_eq!(order.state, TransportOrderState::Dispatchable);

        // The operator reclassifies the order; the next run assigns it and
        // clears the deferral mark.
        let mut order = fixture.orders.fetch_order(&TransportOrderId::new("order-1")).unwrap();
        order.order_type = crate::domain::model::transport_order::ORDER_TYPE_ANY.to_string();
        fixture.orders.update_order(order).unwrap();

        fixture.dispatcher.dispatch().unwrap();

        let order = fixture.orders.fetch_order(&TransportOrderId::new("order-1")).unwrap();
        assert_eq!(order.state, TransportOrderState::BeingProcessed);
        assert!(!order.is_deferred());
    }

    // --- REJECTION HISTORY ---

    #[test]
    fn test_unroutable_order_records_one_rejection_per_vehicle() {
        let fixture = fixture();
        // The charging bay has no outgoing path, so nothing is routable
        // from there.
        fixture.vehicles.add_vehicle(mock_vehicle("AGV-01", "charge-bay"));
        fixture.orders.add_order(mock_order("order-1", "p3"));

        fixture.dispatcher.dispatch().unwrap();
        fixture.dispatcher.dispatch().unwrap();
        fixture.dispatcher.dispatch().unwrap();

        let order = fixture.orders.fetch_order(&TransportOrderId::new("order-1")).unwrap();
        assert_eq!(order.state, TransportOrderState::Dispatchable);
        assert_eq!(order.rejections.len(), 1, "repeated passes must not pile up identical rejections");
        assert_eq!(order.rejections[0].reason, "Unroutable");
        assert_eq!(order.rejections[0].vehicle, Some(VehicleId::new("AGV-01")));
    }

    // --- TOPOLOGY CHANGES ---

    #[test]
    fn test_topology_change_reroutes_processing_vehicles() {
        let fixture = fixture();
        fixture.vehicles.add_vehicle(mock_vehicle("AGV-01", "p1"));
        fixture.orders.add_order(mock_order("order-1", "p5"));
        fixture.dispatcher.dispatch().unwrap();

        // The vehicle has committed to the first step of the line route.
        let mut vehicle = fixture.vehicles.fetch_vehicle(&VehicleId::new("AGV-01")).unwrap();
        vehicle.next_position = Some(PointId::new("p2"));
        vehicle.route_progress_index = Some(0);
        fixture.vehicles.update_vehicle(vehicle).unwrap();

        // p2 -> p3 becomes unusable; only the shortcut remains.
        let blocked = PathId::new("p2-p3");
        assert!(fixture.plant_model.set_path_locked(&blocked, true));
        fixture.dispatcher.topology_changed(&[blocked], &fixture.scheduler).unwrap();

        let order = fixture.orders.fetch_order(&TransportOrderId::new("order-1")).unwrap();
        let route = order.drive_orders[0].route.as_ref().unwrap();
        let destinations: Vec<&str> = route.steps.iter().map(|step| step.destination_point.name.as_str()).collect();
        assert_eq!(destinations, vec!["p2", "p4", "p5"]);
        assert_eq!(route.steps[1].rerouting_type, Some(ReroutingType::Regular));
        assert_eq!(route.costs, 45);
    }
}
