pub mod dispatcher;
pub mod model;
pub mod rerouting;
pub mod routing;
pub mod scheduler;
pub mod store;
