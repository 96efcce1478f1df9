use std::sync::mpsc;
use std::thread;

use crate::domain::dispatcher::dispatcher::Dispatcher;
use crate::domain::scheduler::scheduler::ResourceScheduler;
use crate::kernel::message::KernelMessage;
use crate::kernel::proxy::KernelProxy;

/**
 * The serialized execution context of the fleet.
 *
 * Scheduler and dispatcher are not thread-safe by themselves; the executor
 * owns both on a single named thread and processes requests strictly one at
 * a time, which is what makes the scheduler's invariants hold without any
 * further locking. Everybody else talks to them through a `KernelProxy`.
 */
pub struct KernelExecutor;

impl KernelExecutor {
    /// Moves scheduler and dispatcher onto the kernel thread and returns the
    /// proxy handle. The thread runs until a `Shutdown` message arrives or
    /// the last proxy is dropped.
    pub fn spawn(scheduler: ResourceScheduler, dispatcher: Dispatcher) -> KernelProxy {
        let (tx, rx) = mpsc::channel::<KernelMessage>();

        thread::Builder::new()
            .name("fleet-kernel".to_string())
            .spawn(move || {
                log::info!("Kernel thread started.");
                Self::run_loop(scheduler, dispatcher, rx);
                log::info!("Kernel thread terminated.");
            })
            .expect("Failed to spawn kernel thread");

        KernelProxy { tx }
    }

    fn run_loop(mut scheduler: ResourceScheduler, dispatcher: Dispatcher, rx: mpsc::Receiver<KernelMessage>) {
        while let Ok(msg) = rx.recv() {
            match msg {
                KernelMessage::RegisterClient { client, reply_to } => {
                    scheduler.register_client(client);
                    let _ = reply_to.send(());
                }
                KernelMessage::UnregisterClient { client, reply_to } => {
                    scheduler.unregister_client(&client);
                    let _ = reply_to.send(());
                }
                KernelMessage::Claim { client, sequence, reply_to } => {
                    let _ = reply_to.send(scheduler.claim(&client, sequence));
                }
                KernelMessage::Allocate { client, resources, reply_to } => {
                    let _ = reply_to.send(scheduler.allocate(&client, resources));
                }
                KernelMessage::MayAllocateNow { client, resources, reply_to } => {
                    let _ = reply_to.send(scheduler.may_allocate_now(&client, &resources));
                }
                KernelMessage::AllocateNow { client, resources, reply_to } => {
                    let _ = reply_to.send(scheduler.allocate_now(&client, resources));
                }
                KernelMessage::Free { client, resources, reply_to } => {
                    let _ = reply_to.send(scheduler.free(&client, &resources));
                }
                KernelMessage::FreeAll { client, reply_to } => {
                    let _ = reply_to.send(scheduler.free_all(&client));
                }
                KernelMessage::ClearPendingAllocations { client, reply_to } => {
                    scheduler.clear_pending_allocations(&client);
                    let _ = reply_to.send(());
                }
                KernelMessage::Reschedule(reply_to) => {
                    scheduler.reschedule();
                    let _ = reply_to.send(());
                }
                KernelMessage::Allocations(reply_to) => {
                    let _ = reply_to.send(scheduler.allocations());
                }
                KernelMessage::PreparationSuccessful { module_index, client, resources, reply_to } => {
                    scheduler.preparation_successful(module_index, &client, &resources);
                    let _ = reply_to.send(());
                }
                KernelMessage::Dispatch(reply_to) => {
                    let _ = reply_to.send(dispatcher.dispatch());
                }
                KernelMessage::ActivateOrder { order, reply_to } => {
                    let _ = reply_to.send(dispatcher.activate_order(&order));
                }
                KernelMessage::WithdrawOrder { order, reply_to } => {
                    let _ = reply_to.send(dispatcher.withdraw_order(&order));
                }
                KernelMessage::Reroute { vehicle, kind, reply_to } => {
                    let _ = reply_to.send(dispatcher.reroute_vehicle(&vehicle, kind, &scheduler));
                }
                KernelMessage::TopologyChanged { paths, reply_to } => {
                    let _ = reply_to.send(dispatcher.topology_changed(&paths, &scheduler));
                }
                KernelMessage::Shutdown => break,
            }
        }
    }
}
