use std::sync::Arc;

use crate::domain::dispatcher::order_assigner::OrderAssigner;
use crate::domain::dispatcher::phases::DispatchPhase;
use crate::error::Result;

/// Open pairing of dispatchable orders and available vehicles; the actual
/// algorithm lives in the order assigner.
pub struct AssignFreeOrdersPhase {
    order_assigner: Arc<OrderAssigner>,
}

impl AssignFreeOrdersPhase {
    pub fn new(order_assigner: Arc<OrderAssigner>) -> Self {
        Self { order_assigner }
    }
}

impl DispatchPhase for AssignFreeOrdersPhase {
    fn name(&self) -> &'static str {
        "AssignFreeOrdersPhase"
    }

    fn run(&self) -> Result<()> {
        self.order_assigner.assign_free_orders()
    }
}
