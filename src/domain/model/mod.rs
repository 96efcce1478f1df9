pub mod id;
pub mod plant_model;
pub mod resource;
pub mod route;
pub mod transport_order;
pub mod vehicle;
