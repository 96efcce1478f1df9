pub mod candidate;
pub mod comparator;
pub mod dispatcher;
pub mod filter;
pub mod order_assigner;
pub mod phases;
pub mod reservation_pool;

mod dispatcher_tests;
