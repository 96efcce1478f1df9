use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use slotmap::{SlotMap, new_key_type};

use crate::domain::model::id::{PathId, PointId};

new_key_type! {
    pub struct PointKey;
    pub struct PathKey;
}

/// A named position of the driving course.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Point {
    pub name: PointId,
}

impl Point {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: PointId::new(name) }
    }
}

/// A directed connection between two points of the driving course.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path {
    pub name: PathId,
    pub source: PointId,
    pub destination: PointId,
    pub length: u64,
    pub locked: bool,
}

impl Path {
    pub fn new(name: impl Into<String>, source: PointId, destination: PointId, length: u64) -> Self {
        Self { name: PathId::new(name), source, destination, length, locked: false }
    }
}

/// The static driving-course topology shared by routing and the demo binary.
///
/// The store itself is read-mostly: the only mutation after construction is
/// locking/unlocking paths when the plant changes. Allocation state does not
/// live here; the scheduler tracks it separately, keyed by resource handles.
#[derive(Debug, Clone)]
pub struct PlantModel {
    inner: Arc<RwLock<ModelInner>>,
}

#[derive(Debug, Default)]
struct ModelInner {
    points: SlotMap<PointKey, Point>,
    paths: SlotMap<PathKey, Path>,

    point_index: HashMap<PointId, PointKey>,
    path_index: HashMap<PathId, PathKey>,
    outgoing: HashMap<PointId, Vec<PathKey>>,
}

impl PlantModel {
    pub fn new() -> Self {
        Self { inner: Arc::new(RwLock::new(ModelInner::default())) }
    }

    //---------------------
    // --- Point Methods ---
    //---------------------
    pub fn add_point(&self, point: Point) -> PointKey {
        let mut guard = self.inner.write().unwrap();
        let name = point.name.clone();
        let key = guard.points.insert(point);
        guard.point_index.insert(name, key);
        key
    }

    pub fn contains_point(&self, name: &PointId) -> bool {
        let guard = self.inner.read().unwrap();
        guard.point_index.contains_key(name)
    }

    pub fn point_names(&self) -> Vec<PointId> {
        let guard = self.inner.read().unwrap();
        guard.points.values().map(|p| p.name.clone()).collect()
    }

    pub fn point_count(&self) -> usize {
        let guard = self.inner.read().unwrap();
        guard.points.len()
    }

    //---------------------
    // --- Path Methods ---
    //---------------------
    pub fn add_path(&self, path: Path) -> PathKey {
        let mut guard = self.inner.write().unwrap();
        let name = path.name.clone();
        let source = path.source.clone();
        let key = guard.paths.insert(path);
        guard.path_index.insert(name, key);
        guard.outgoing.entry(source).or_default().push(key);
        key
    }

    pub fn path(&self, name: &PathId) -> Option<Path> {
        let guard = self.inner.read().unwrap();
        guard.path_index.get(name).and_then(|key| guard.paths.get(*key)).cloned()
    }

    pub fn path_count(&self) -> usize {
        let guard = self.inner.read().unwrap();
        guard.paths.len()
    }

    /// All non-locked paths leaving the given point.
    pub fn outgoing_paths(&self, point: &PointId) -> Vec<Path> {
        let guard = self.inner.read().unwrap();
        match guard.outgoing.get(point) {
            Some(keys) => keys.iter().filter_map(|key| guard.paths.get(*key)).filter(|path| !path.locked).cloned().collect(),
            None => Vec::new(),
        }
    }

    pub fn set_path_locked(&self, name: &PathId, locked: bool) -> bool {
        let mut guard = self.inner.write().unwrap();
        if let Some(key) = guard.path_index.get(name).copied() {
            if let Some(path) = guard.paths.get_mut(key) {
                path.locked = locked;
                return true;
            }
        }
        false
    }
}

impl Default for PlantModel {
    fn default() -> Self {
        Self::new()
    }
}
