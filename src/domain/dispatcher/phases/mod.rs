pub mod assign_free_orders_phase;
pub mod assign_next_drive_orders_phase;
pub mod assign_reserved_orders_phase;

use crate::error::Result;

/// One step of a dispatch run. Phases are executed in a fixed order by the
/// dispatcher; each runs to completion within the serialized context.
pub trait DispatchPhase: Send {
    fn name(&self) -> &'static str;

    fn run(&self) -> Result<()>;
}
