pub mod executor;
pub mod message;
pub mod proxy;
pub mod ticker;
