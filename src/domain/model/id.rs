use serde::Serialize;
use std::fmt;
use std::marker::PhantomData;

/// A typed name for a model object. The string is the object's stable,
/// human-readable identity; the tag parameter keeps ids of different
/// object kinds from being mixed up at compile time.
#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Hash, Serialize)]
pub struct Id<T> {
    pub name: String,
    _marker: PhantomData<T>,
}

impl<T> Id<T> {
    pub fn new(name: impl Into<String>) -> Self {
        Id { name: name.into(), _marker: PhantomData }
    }
}

impl<T> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl<T> From<Id<T>> for String {
    fn from(id: Id<T>) -> Self {
        id.name
    }
}

impl<T> fmt::Debug for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let full_name = std::any::type_name::<T>();
        let clean_name = full_name.split("::").last().unwrap_or(full_name);
        let display_name = clean_name.replace("Tag", "Id");

        write!(f, "{}: {:?}", display_name, self.name)
    }
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Hash, Copy)]
pub struct PointTag;
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Hash, Copy)]
pub struct PathTag;
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Hash, Copy)]
pub struct VehicleTag;
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Hash, Copy)]
pub struct TransportOrderTag;
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Hash, Copy)]
pub struct OrderSequenceTag;
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Hash, Copy)]
pub struct ClientTag;

pub type PointId = Id<PointTag>;
pub type PathId = Id<PathTag>;
pub type VehicleId = Id<VehicleTag>;
pub type TransportOrderId = Id<TransportOrderTag>;
pub type OrderSequenceId = Id<OrderSequenceTag>;
pub type ClientId = Id<ClientTag>;
