use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::sync::Arc;

use crate::domain::model::id::{PathId, PointId, VehicleId};
use crate::domain::model::plant_model::PlantModel;
use crate::domain::model::resource::{ResourceRef, ResourceSet};
use crate::domain::model::route::{Route, Step};
use crate::domain::model::transport_order::TransportOrder;
use crate::domain::model::vehicle::Vehicle;
use crate::domain::routing::edge_evaluator::EdgeEvaluator;
use crate::domain::routing::route_provider::RouteProvider;

/// Shortest-path route provider over the plant model.
///
/// Plain Dijkstra with edge costs from the injected evaluator. Locked paths
/// and explicitly avoided resources are never traversed. Yields at most one
/// route per source/destination query, so route sequences come back as a
/// single alternative.
pub struct DijkstraRouteProvider {
    plant_model: PlantModel,
    evaluator: Arc<dyn EdgeEvaluator>,
}

impl DijkstraRouteProvider {
    pub fn new(plant_model: PlantModel, evaluator: Arc<dyn EdgeEvaluator>) -> Self {
        Self { plant_model, evaluator }
    }

    fn shortest_route(&self, vehicle: &Vehicle, source: &PointId, destination: &PointId, avoid: &ResourceSet) -> Option<Route> {
        if source == destination {
            // No movement required: a single positioning step at the
            // destination, free of charge.
            return Some(Route::new(vec![Step::new(None, None, destination.clone(), 0)], 0));
        }
        if !self.plant_model.contains_point(source) || !self.plant_model.contains_point(destination) {
            return None;
        }

        let mut distances: HashMap<PointId, u64> = HashMap::new();
        let mut predecessors: HashMap<PointId, (PathId, PointId)> = HashMap::new();
        let mut queue: BinaryHeap<Reverse<(u64, PointId)>> = BinaryHeap::new();

        distances.insert(source.clone(), 0);
        queue.push(Reverse((0, source.clone())));

        while let Some(Reverse((cost, point))) = queue.pop() {
            if &point == destination {
                break;
            }
            if cost > *distances.get(&point).unwrap_or(&u64::MAX) {
                continue;
            }
            for path in self.plant_model.outgoing_paths(&point) {
                if avoid.contains(&ResourceRef::Path(path.name.clone())) || avoid.contains(&ResourceRef::Point(path.destination.clone())) {
                    continue;
                }
                let next_cost = cost.saturating_add(self.evaluator.costs(vehicle, &path));
                if next_cost < *distances.get(&path.destination).unwrap_or(&u64::MAX) {
                    distances.insert(path.destination.clone(), next_cost);
                    predecessors.insert(path.destination.clone(), (path.name.clone(), point.clone()));
                    queue.push(Reverse((next_cost, path.destination.clone())));
                }
            }
        }

        let total = *distances.get(destination)?;

        // Walk the predecessor chain back to the source.
        let mut steps = Vec::new();
        let mut current = destination.clone();
        while &current != source {
            let (path, previous) = predecessors.get(&current)?.clone();
            steps.push(Step::new(Some(path), Some(previous.clone()), current.clone(), 0));
            current = previous;
        }
        steps.reverse();
        Some(Route::new(steps, total).renumbered())
    }
}

impl RouteProvider for DijkstraRouteProvider {
    fn routes_for_order(&self, vehicle: &Vehicle, source: &PointId, order: &TransportOrder, max_routes: usize) -> Vec<Vec<Route>> {
        if max_routes == 0 {
            return Vec::new();
        }
        let mut routes = Vec::new();
        let mut current = source.clone();
        for drive_order in order.remaining_drive_orders() {
            match self.shortest_route(vehicle, &current, &drive_order.destination.point, &ResourceSet::new()) {
                Some(route) => {
                    current = route.final_destination().clone();
                    routes.push(route);
                }
                None => {
                    log::debug!(
                        "No route for vehicle {} from {} to {} (order {}).",
                        vehicle.id,
                        current,
                        drive_order.destination.point,
                        order.id
                    );
                    return Vec::new();
                }
            }
        }
        vec![routes]
    }

    fn routes_between(
        &self,
        vehicle: &Vehicle,
        source: &PointId,
        destination: &PointId,
        resources_to_avoid: &ResourceSet,
        max_routes: usize,
    ) -> Vec<Route> {
        if max_routes == 0 {
            return Vec::new();
        }
        self.shortest_route(vehicle, source, destination, resources_to_avoid).into_iter().collect()
    }

    fn check_routability(&self, order: &TransportOrder, vehicles: &[Vehicle]) -> HashSet<VehicleId> {
        let mut routable = HashSet::new();
        for vehicle in vehicles {
            if let Some(position) = vehicle.future_or_current_position() {
                if !self.routes_for_order(vehicle, &position, order, 1).is_empty() {
                    routable.insert(vehicle.id.clone());
                }
            }
        }
        routable
    }

    fn update_routing_topology(&self, changed_paths: &[PathId]) {
        // Routes are computed on demand directly from the plant model, so
        // there is no derived state to rebuild.
        log::info!("Routing topology updated for {} path(s).", changed_paths.len());
    }

    fn cost_of(&self, vehicle: &Vehicle, steps: &[Step]) -> u64 {
        steps
            .iter()
            .filter_map(|step| step.path.as_ref())
            .filter_map(|name| self.plant_model.path(name))
            .map(|path| self.evaluator.costs(vehicle, &path))
            .sum()
    }
}
