pub mod allocation_state;
pub mod client;
pub mod module;
pub mod scheduler;

mod scheduler_tests;
