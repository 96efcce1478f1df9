use std::collections::HashMap;
use std::sync::mpsc;
use std::sync::Arc;

use crate::domain::model::id::{ClientId, PathId, TransportOrderId, VehicleId};
use crate::domain::model::resource::ResourceSet;
use crate::domain::model::route::ReroutingType;
use crate::domain::scheduler::client::SchedulerClient;
use crate::error::Result;

/// Message protocol of the kernel thread. Every request carries the sender
/// for its reply, so callers block until the kernel has processed it.
pub enum KernelMessage {
    RegisterClient {
        client: Arc<dyn SchedulerClient>,
        reply_to: mpsc::Sender<()>,
    },
    UnregisterClient {
        client: ClientId,
        reply_to: mpsc::Sender<()>,
    },
    Claim {
        client: ClientId,
        sequence: Vec<ResourceSet>,
        reply_to: mpsc::Sender<Result<()>>,
    },
    Allocate {
        client: ClientId,
        resources: ResourceSet,
        reply_to: mpsc::Sender<Result<()>>,
    },
    MayAllocateNow {
        client: ClientId,
        resources: ResourceSet,
        reply_to: mpsc::Sender<bool>,
    },
    AllocateNow {
        client: ClientId,
        resources: ResourceSet,
        reply_to: mpsc::Sender<Result<()>>,
    },
    Free {
        client: ClientId,
        resources: ResourceSet,
        reply_to: mpsc::Sender<Result<()>>,
    },
    FreeAll {
        client: ClientId,
        reply_to: mpsc::Sender<Result<()>>,
    },
    ClearPendingAllocations {
        client: ClientId,
        reply_to: mpsc::Sender<()>,
    },
    Reschedule(mpsc::Sender<()>),
    Allocations(mpsc::Sender<HashMap<ClientId, ResourceSet>>),
    PreparationSuccessful {
        module_index: usize,
        client: ClientId,
        resources: ResourceSet,
        reply_to: mpsc::Sender<()>,
    },
    Dispatch(mpsc::Sender<Result<()>>),
    ActivateOrder {
        order: TransportOrderId,
        reply_to: mpsc::Sender<Result<()>>,
    },
    WithdrawOrder {
        order: TransportOrderId,
        reply_to: mpsc::Sender<Result<()>>,
    },
    Reroute {
        vehicle: VehicleId,
        kind: ReroutingType,
        reply_to: mpsc::Sender<Result<()>>,
    },
    TopologyChanged {
        paths: Vec<PathId>,
        reply_to: mpsc::Sender<Result<()>>,
    },
    Shutdown,
}
