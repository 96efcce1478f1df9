pub mod transport_order_service;
pub mod vehicle_service;
