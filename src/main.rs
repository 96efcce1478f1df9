use std::sync::Arc;

use clap::Parser;

use agv_fleet::domain::dispatcher::dispatcher::Dispatcher;
use agv_fleet::domain::model::id::PointId;
use agv_fleet::domain::model::transport_order::{Destination, DriveOrder, TransportOrder};
use agv_fleet::domain::routing::dijkstra_route_provider::DijkstraRouteProvider;
use agv_fleet::domain::routing::edge_evaluator::EdgeEvaluatorByLength;
use agv_fleet::domain::scheduler::scheduler::ResourceScheduler;
use agv_fleet::domain::store::transport_order_service::{InMemoryTransportOrderService, TransportOrderService};
use agv_fleet::domain::store::vehicle_service::{InMemoryVehicleService, VehicleService};
use agv_fleet::error::Result;
use agv_fleet::kernel::executor::KernelExecutor;
use agv_fleet::{generate_plant_model, logger};

/// Loads a plant model, creates one transport order per vehicle and runs a
/// dispatch cycle against it.
#[derive(Parser, Debug)]
#[command(name = "agv_fleet", about = "AGV fleet dispatch demo")]
struct Cli {
    /// Path to the plant model JSON file.
    #[arg(long, default_value = "data/demo_plant.json")]
    model: String,

    /// Destination point for the demo orders. Defaults to the last point of
    /// the plant model.
    #[arg(long)]
    destination: Option<String>,
}

fn main() {
    logger::init();

    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        log::error!("Dispatch demo failed: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let (plant_model, vehicles) = generate_plant_model(&cli.model)?;

    let destination = match &cli.destination {
        Some(name) => PointId::new(name.as_str()),
        None => plant_model.point_names().into_iter().last().ok_or_else(|| {
            agv_fleet::error::Error::ModelConstructionError("Plant model contains no points".to_string())
        })?,
    };

    let vehicle_service = InMemoryVehicleService::new();
    let order_service = InMemoryTransportOrderService::new();
    for vehicle in vehicles {
        log::info!("Fleet vehicle {} at {}.", vehicle.id, vehicle.current_position.as_ref().map(|p| p.name.as_str()).unwrap_or("?"));
        vehicle_service.add_vehicle(vehicle);
    }

    let route_provider = Arc::new(DijkstraRouteProvider::new(plant_model, Arc::new(EdgeEvaluatorByLength)));
    let dispatcher = Dispatcher::with_defaults(Arc::new(vehicle_service.clone()), Arc::new(order_service.clone()), route_provider);
    let scheduler = ResourceScheduler::new(Vec::new());
    let kernel = KernelExecutor::spawn(scheduler, dispatcher);

    for vehicle in vehicle_service.fetch_vehicles() {
        let order = TransportOrder::with_generated_id("TOrder", vec![DriveOrder::new(Destination::new(destination.clone(), "NOP"))]);
        let order_id = order.id.clone();
        order_service.add_order(order);
        kernel.activate_order(order_id.clone())?;
        log::info!("Created and activated transport order {} for destination {}.", order_id, destination);
    }

    kernel.dispatch()?;

    for order in order_service.fetch_orders() {
        match (&order.processing_vehicle, order.drive_orders.first().and_then(|d| d.route.as_ref())) {
            (Some(vehicle), Some(route)) => {
                log::info!("Order {} -> vehicle {} ({} steps, costs {}).", order.id, vehicle, route.steps.len(), route.costs)
            }
            _ => log::info!("Order {} is {:?}.", order.id, order.state),
        }
    }

    kernel.shutdown();
    Ok(())
}
