pub mod drive_order_merger;
pub mod strategy;
