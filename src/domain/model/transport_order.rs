use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::model::id::{OrderSequenceId, PointId, TransportOrderId, VehicleId};
use crate::domain::model::route::Route;

/// The order type every vehicle accepts, regardless of its configured
/// acceptable order types.
pub const ORDER_TYPE_ANY: &str = "*";

/// Lifecycle of a transport order.
///
/// RAW -> ACTIVE -> DISPATCHABLE on activation, DISPATCHABLE ->
/// BEING_PROCESSED on assignment, then FINISHED when all drive orders are
/// done or FAILED/WITHDRAWN on abort. Final states are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TransportOrderState {
    Raw,
    Active,
    Dispatchable,
    BeingProcessed,
    Withdrawn,
    Finished,
    Failed,
}

impl TransportOrderState {
    pub fn is_final(&self) -> bool {
        matches!(self, TransportOrderState::Finished | TransportOrderState::Failed | TransportOrderState::Withdrawn)
    }

    /// Whether the order may move from this state to `to`. Orders are never
    /// resurrected once in a final state.
    pub fn may_transition_to(&self, to: TransportOrderState) -> bool {
        use TransportOrderState::*;
        match (self, to) {
            (Raw, Active) => true,
            (Active, Dispatchable) => true,
            (Dispatchable, BeingProcessed) => true,
            (BeingProcessed, Finished) => true,
            (BeingProcessed, Failed) | (BeingProcessed, Withdrawn) => true,
            (Raw, Withdrawn) | (Active, Withdrawn) | (Dispatchable, Withdrawn) => true,
            (Dispatchable, Failed) => true,
            _ => false,
        }
    }
}

/// Where a drive order takes the vehicle and what it does there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Destination {
    pub point: PointId,
    pub operation: String,
}

impl Destination {
    pub fn new(point: PointId, operation: impl Into<String>) -> Self {
        Self { point, operation: operation.into() }
    }
}

/// One leg of a transport order: a destination plus the route computed for
/// it. The route is absent until the dispatcher has routed the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DriveOrder {
    pub destination: Destination,
    pub route: Option<Route>,
}

impl DriveOrder {
    pub fn new(destination: Destination) -> Self {
        Self { destination, route: None }
    }

    pub fn with_route(destination: Destination, route: Route) -> Self {
        Self { destination, route: Some(route) }
    }
}

/// A note that a vehicle could not or would not take this order, kept on
/// the order for operability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rejection {
    pub vehicle: Option<VehicleId>,
    pub reason: String,
    pub time: DateTime<Utc>,
}

impl Rejection {
    pub fn new(vehicle: Option<VehicleId>, reason: impl Into<String>) -> Self {
        Self { vehicle, reason: reason.into(), time: Utc::now() }
    }
}

/// Binding of an order into an order sequence. An order wrapped in a
/// sequence owned by some vehicle may only ever be processed by that
/// vehicle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SequenceBinding {
    pub sequence: OrderSequenceId,
    pub owner: Option<VehicleId>,
}

/// A unit of fleet work: an ordered sequence of drive orders plus the
/// bookkeeping the dispatcher needs to pick a vehicle for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransportOrder {
    pub id: TransportOrderId,
    pub drive_orders: Vec<DriveOrder>,
    /// Index into `drive_orders` of the leg currently being processed.
    pub current_drive_order_index: Option<usize>,
    pub intended_vehicle: Option<VehicleId>,
    pub processing_vehicle: Option<VehicleId>,
    pub dependencies: Vec<TransportOrderId>,
    pub deadline: DateTime<Utc>,
    pub dispensable: bool,
    pub order_type: String,
    pub wrapping_sequence: Option<SequenceBinding>,
    pub state: TransportOrderState,
    pub rejections: Vec<Rejection>,
    /// Reasons the order is currently deferred; empty if it is not.
    pub deferral_reasons: Vec<String>,
    pub creation_time: DateTime<Utc>,
}

impl TransportOrder {
    pub fn new(id: TransportOrderId, drive_orders: Vec<DriveOrder>) -> Self {
        Self {
            id,
            drive_orders,
            current_drive_order_index: None,
            intended_vehicle: None,
            processing_vehicle: None,
            dependencies: Vec::new(),
            deadline: Utc::now() + chrono::Duration::hours(1),
            dispensable: false,
            order_type: ORDER_TYPE_ANY.to_string(),
            wrapping_sequence: None,
            state: TransportOrderState::Raw,
            rejections: Vec::new(),
            deferral_reasons: Vec::new(),
            creation_time: Utc::now(),
        }
    }

    /// Creates an order with a generated unique name sharing the given prefix.
    pub fn with_generated_id(prefix: &str, drive_orders: Vec<DriveOrder>) -> Self {
        Self::new(TransportOrderId::new(format!("{}-{}", prefix, uuid::Uuid::new_v4())), drive_orders)
    }

    pub fn current_drive_order(&self) -> Option<&DriveOrder> {
        self.current_drive_order_index.and_then(|index| self.drive_orders.get(index))
    }

    /// The drive orders not yet completed, starting with the current one.
    /// For an unassigned order this is all of them.
    pub fn remaining_drive_orders(&self) -> &[DriveOrder] {
        let start = self.current_drive_order_index.unwrap_or(0);
        &self.drive_orders[start.min(self.drive_orders.len())..]
    }

    pub fn add_rejection(&mut self, rejection: Rejection) {
        log::debug!("Transport order {} rejected: {} (vehicle: {:?})", self.id, rejection.reason, rejection.vehicle);
        self.rejections.push(rejection);
    }

    /// Whether a rejection with the same vehicle and reason was already
    /// recorded, regardless of its time.
    pub fn has_rejection(&self, vehicle: Option<&VehicleId>, reason: &str) -> bool {
        self.rejections.iter().any(|rejection| rejection.vehicle.as_ref() == vehicle && rejection.reason == reason)
    }

    pub fn is_deferred(&self) -> bool {
        !self.deferral_reasons.is_empty()
    }
}
