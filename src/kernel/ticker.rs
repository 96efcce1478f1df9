use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::kernel::proxy::KernelProxy;

/// Periodic dispatch trigger.
///
/// Event-driven dispatch covers order activation and vehicles turning idle;
/// the ticker is the safety net that picks up work those events miss, e.g.
/// orders deferred in an earlier pass whose situation has changed.
pub struct DispatchTicker {
    running: Arc<AtomicBool>,
}

impl DispatchTicker {
    pub fn spawn(kernel: KernelProxy, interval: Duration) -> Self {
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);

        thread::Builder::new()
            .name("dispatch-ticker".to_string())
            .spawn(move || {
                log::info!("Dispatch ticker started (interval {:?}).", interval);
                while flag.load(Ordering::Relaxed) {
                    thread::sleep(interval);
                    if !flag.load(Ordering::Relaxed) {
                        break;
                    }
                    if let Err(e) = kernel.dispatch() {
                        log::error!("Periodic dispatch failed: {}", e);
                    }
                }
                log::info!("Dispatch ticker stopped.");
            })
            .expect("Failed to spawn dispatch ticker thread");

        Self { running }
    }

    /// Stops the ticker after at most one more interval.
    pub fn stop(&self) {
        self.running.store(false, Ordering::Relaxed);
    }
}

impl Drop for DispatchTicker {
    fn drop(&mut self) {
        self.stop();
    }
}
