use std::collections::HashMap;
use std::sync::mpsc;
use std::sync::Arc;

use crate::domain::model::id::{ClientId, PathId, TransportOrderId, VehicleId};
use crate::domain::model::resource::ResourceSet;
use crate::domain::model::route::ReroutingType;
use crate::domain::scheduler::client::SchedulerClient;
use crate::error::Result;
use crate::kernel::message::KernelMessage;

/// Proxy forwards everything to the kernel thread and blocks for the reply.
/// Cheap to clone; every vehicle driver and operator surface holds one.
#[derive(Clone)]
pub struct KernelProxy {
    pub tx: mpsc::Sender<KernelMessage>,
}

impl KernelProxy {
    fn call<R, F>(&self, msg_builder: F) -> R
    where
        F: FnOnce(mpsc::Sender<R>) -> KernelMessage,
    {
        let (reply_tx, reply_rx) = mpsc::channel();
        let msg = msg_builder(reply_tx);

        match self.tx.send(msg) {
            Ok(_) => reply_rx.recv().expect("Kernel thread died unexpectedly"),
            Err(_) => panic!("Failed to send message to the kernel thread"),
        }
    }

    //---------------------------
    // --- Scheduler requests ---
    //---------------------------

    pub fn register_client(&self, client: Arc<dyn SchedulerClient>) {
        self.call(|tx| KernelMessage::RegisterClient { client, reply_to: tx })
    }

    pub fn unregister_client(&self, client: ClientId) {
        self.call(|tx| KernelMessage::UnregisterClient { client, reply_to: tx })
    }

    pub fn claim(&self, client: ClientId, sequence: Vec<ResourceSet>) -> Result<()> {
        self.call(|tx| KernelMessage::Claim { client, sequence, reply_to: tx })
    }

    pub fn allocate(&self, client: ClientId, resources: ResourceSet) -> Result<()> {
        self.call(|tx| KernelMessage::Allocate { client, resources, reply_to: tx })
    }

    pub fn may_allocate_now(&self, client: ClientId, resources: ResourceSet) -> bool {
        self.call(|tx| KernelMessage::MayAllocateNow { client, resources, reply_to: tx })
    }

    pub fn allocate_now(&self, client: ClientId, resources: ResourceSet) -> Result<()> {
        self.call(|tx| KernelMessage::AllocateNow { client, resources, reply_to: tx })
    }

    pub fn free(&self, client: ClientId, resources: ResourceSet) -> Result<()> {
        self.call(|tx| KernelMessage::Free { client, resources, reply_to: tx })
    }

    pub fn free_all(&self, client: ClientId) -> Result<()> {
        self.call(|tx| KernelMessage::FreeAll { client, reply_to: tx })
    }

    pub fn clear_pending_allocations(&self, client: ClientId) {
        self.call(|tx| KernelMessage::ClearPendingAllocations { client, reply_to: tx })
    }

    pub fn reschedule(&self) {
        self.call(KernelMessage::Reschedule)
    }

    pub fn allocations(&self) -> HashMap<ClientId, ResourceSet> {
        self.call(KernelMessage::Allocations)
    }

    pub fn preparation_successful(&self, module_index: usize, client: ClientId, resources: ResourceSet) {
        self.call(|tx| KernelMessage::PreparationSuccessful { module_index, client, resources, reply_to: tx })
    }

    //----------------------------
    // --- Dispatcher requests ---
    //----------------------------

    pub fn dispatch(&self) -> Result<()> {
        self.call(KernelMessage::Dispatch)
    }

    pub fn activate_order(&self, order: TransportOrderId) -> Result<()> {
        self.call(|tx| KernelMessage::ActivateOrder { order, reply_to: tx })
    }

    pub fn withdraw_order(&self, order: TransportOrderId) -> Result<()> {
        self.call(|tx| KernelMessage::WithdrawOrder { order, reply_to: tx })
    }

    pub fn reroute(&self, vehicle: VehicleId, kind: ReroutingType) -> Result<()> {
        self.call(|tx| KernelMessage::Reroute { vehicle, kind, reply_to: tx })
    }

    pub fn topology_changed(&self, paths: Vec<PathId>) -> Result<()> {
        self.call(|tx| KernelMessage::TopologyChanged { paths, reply_to: tx })
    }

    /// Fire-and-forget; the kernel thread exits after draining its queue.
    pub fn shutdown(&self) {
        let _ = self.tx.send(KernelMessage::Shutdown);
    }
}
