//! Simulated surface provider.
//!
//! Stands in for the platform's window callbacks: it attaches a window,
//! keeps it for a while, detaches it, and finally asks the app to quit.
//! Events arrive on the control thread over a channel, the way OS
//! lifecycle callbacks would.

use crate::config::LifecycleConfig;
use crossbeam_channel::Sender;
use std::ffi::c_void;
use std::ptr::NonNull;
use std::thread;
use tracing::debug;

/// Window lifecycle events delivered to the control thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceEvent {
    Attached(NativeWindowId),
    Detached,
    Quit,
}

/// Index into the provider's window table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeWindowId(pub usize);

/// Stand-in native windows. Their addresses are the handles given to the
/// renderer, so they must outlive it.
pub struct NativeWindows {
    slots: Vec<Box<u64>>,
}

impl NativeWindows {
    pub fn new(count: usize) -> Self {
        Self {
            slots: (0..count as u64).map(Box::new).collect(),
        }
    }

    pub fn pointer(&self, id: NativeWindowId) -> Option<NonNull<c_void>> {
        self.slots
            .get(id.0)
            .map(|slot| NonNull::from(slot.as_ref()).cast::<c_void>())
    }
}

/// Spawn the provider thread. It sends `cycles` attach/detach pairs and
/// then `Quit`.
pub fn spawn_provider(
    lifecycle: LifecycleConfig,
    tx: Sender<SurfaceEvent>,
) -> std::io::Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("surface-provider".to_string())
        .spawn(move || {
            for cycle in 0..lifecycle.cycles as usize {
                debug!("Attaching window {}", cycle);
                if tx.send(SurfaceEvent::Attached(NativeWindowId(cycle))).is_err() {
                    return;
                }
                thread::sleep(lifecycle.visible());

                debug!("Detaching window {}", cycle);
                if tx.send(SurfaceEvent::Detached).is_err() {
                    return;
                }
                thread::sleep(lifecycle.hidden());
            }
            let _ = tx.send(SurfaceEvent::Quit);
        })
}
