use crate::api::plant_model_dto::PlantModelDto;
use crate::domain::model::id::{PointId, VehicleId};
use crate::domain::model::plant_model::{Path, PlantModel, Point};
use crate::domain::model::vehicle::Vehicle;
use crate::error::{Error, Result};
use crate::loader::parser::parse_json_file;

pub mod api;
pub mod domain;
pub mod error;
pub mod kernel;
pub mod loader;
pub mod logger;

/// Loads a plant model file and builds the driving-course topology plus the
/// fleet described in it. Paths and vehicles referring to unknown points are
/// construction errors; a broken model must not come up half-way.
pub fn generate_plant_model(file_path: &str) -> Result<(PlantModel, Vec<Vehicle>)> {
    let dto: PlantModelDto = parse_json_file::<PlantModelDto>(file_path)?;
    log::info!("Plant model file parsed: {} points, {} paths, {} vehicles.", dto.points.len(), dto.paths.len(), dto.vehicles.len());

    let model = PlantModel::new();
    for point in &dto.points {
        if point.name.is_empty() {
            return Err(Error::ModelConstructionError("Point with empty name".to_string()));
        }
        model.add_point(Point::new(point.name.as_str()));
    }

    for path in &dto.paths {
        let source = PointId::new(path.source.as_str());
        let destination = PointId::new(path.destination.as_str());
        if !model.contains_point(&source) {
            return Err(Error::UnknownPoint(source));
        }
        if !model.contains_point(&destination) {
            return Err(Error::UnknownPoint(destination));
        }
        let mut built = Path::new(path.name.as_str(), source, destination, path.length);
        built.locked = path.locked;
        model.add_path(built);
    }

    let mut vehicles = Vec::new();
    for vehicle in &dto.vehicles {
        let position = PointId::new(vehicle.position.as_str());
        if !model.contains_point(&position) {
            return Err(Error::UnknownPoint(position));
        }
        let mut built = Vehicle::new(VehicleId::new(vehicle.name.as_str()), position);
        if let Some(energy_level) = vehicle.energy_level {
            built.energy_level = energy_level;
        }
        if !vehicle.acceptable_order_types.is_empty() {
            built.acceptable_order_types = vehicle.acceptable_order_types.iter().cloned().collect();
        }
        vehicles.push(built);
    }

    log::info!("Internal plant model constructed successfully.");
    Ok((model, vehicles))
}
