use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use crate::domain::model::id::VehicleId;
use crate::domain::model::vehicle::Vehicle;
use crate::error::{Error, Result};

/// Read/update access to the fleet's vehicles.
///
/// The dispatcher treats this as a transactional data store accessed
/// synchronously from the serialized context; it never embeds persistence
/// logic of its own.
pub trait VehicleService: Send + Sync {
    fn fetch_vehicles(&self) -> Vec<Vehicle>;

    fn fetch_vehicle(&self, id: &VehicleId) -> Option<Vehicle>;

    fn update_vehicle(&self, vehicle: Vehicle) -> Result<()>;
}

/// In-memory vehicle store for tests and the demo binary.
#[derive(Clone, Default)]
pub struct InMemoryVehicleService {
    inner: Arc<RwLock<HashMap<VehicleId, Vehicle>>>,
}

impl InMemoryVehicleService {
    pub fn new() -> Self {
        Self { inner: Arc::new(RwLock::new(HashMap::new())) }
    }

    pub fn add_vehicle(&self, vehicle: Vehicle) {
        let mut guard = self.inner.write().unwrap();
        guard.insert(vehicle.id.clone(), vehicle);
    }
}

impl VehicleService for InMemoryVehicleService {
    fn fetch_vehicles(&self) -> Vec<Vehicle> {
        let guard = self.inner.read().unwrap();
        let mut vehicles: Vec<Vehicle> = guard.values().cloned().collect();
        vehicles.sort_by(|a, b| a.id.cmp(&b.id));
        vehicles
    }

    fn fetch_vehicle(&self, id: &VehicleId) -> Option<Vehicle> {
        let guard = self.inner.read().unwrap();
        guard.get(id).cloned()
    }

    fn update_vehicle(&self, vehicle: Vehicle) -> Result<()> {
        let mut guard = self.inner.write().unwrap();
        if !guard.contains_key(&vehicle.id) {
            return Err(Error::UnknownVehicle(vehicle.id));
        }
        guard.insert(vehicle.id.clone(), vehicle);
        Ok(())
    }
}
