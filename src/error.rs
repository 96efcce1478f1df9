use thiserror::Error;

use crate::domain::model::id::{ClientId, PointId, TransportOrderId, VehicleId};
use crate::domain::model::transport_order::TransportOrderState;

#[derive(Debug, Error)]
pub enum Error {
    #[error("File not found or could not be read: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse plant model JSON: {0}")]
    DeserializationError(#[from] serde_json::Error),

    #[error("Failed to build internal plant model: {0}")]
    ModelConstructionError(String),

    #[error("Scheduler client '{0}' is not registered")]
    UnknownClient(ClientId),

    #[error("Vehicle '{0}' is not known")]
    UnknownVehicle(VehicleId),

    #[error("Transport order '{0}' is not known")]
    UnknownTransportOrder(TransportOrderId),

    #[error("Point '{0}' is not known")]
    UnknownPoint(PointId),

    #[error("Client '{0}' requested resources that are not at the head of its claim")]
    ClaimOrderViolation(ClientId),

    #[error("Client '{0}' already has an outstanding allocation request")]
    PendingAllocationExists(ClientId),

    #[error("Urgent allocation for client '{0}' refused: granting would be unsafe")]
    AllocationRefused(ClientId),

    #[error("Transport order '{order}' may not move from {from:?} to {to:?}")]
    InvalidStateTransition { order: TransportOrderId, from: TransportOrderState, to: TransportOrderState },

    #[error("Persisted state contradicts in-memory assumption: {0}")]
    StateInconsistency(String),
}

pub type Result<T> = std::result::Result<T, Error>;
