//! Render thread implementation.

use crate::RendererConfig;
use crate::device::{Device, Graphics, initialize};
use crate::frame::draw_frame;
use crate::mailbox::{PendingMessage, Shared};
use oxisurf_gfx::{DisplayBackend, RenderEngine};
use parking_lot::MutexGuard;
use std::io;
use std::sync::Arc;
use std::thread;
use tracing::{debug, error, info, warn};

/// Spawn the render thread. It hands the backends back when it exits.
pub(crate) fn spawn_render_thread<D, E>(
    shared: Arc<Shared>,
    gfx: Graphics<D, E>,
    config: Arc<RendererConfig>,
) -> io::Result<thread::JoinHandle<Graphics<D, E>>>
where
    D: DisplayBackend + 'static,
    E: RenderEngine + 'static,
{
    thread::Builder::new()
        .name(config.thread_name.clone())
        .spawn(move || {
            info!("Render thread started");
            let gfx = run_render_loop(&shared, gfx, &config);
            info!("Render loop exits");
            gfx
        })
}

/// Clears any bound flag when the loop is left, including by unwinding, so
/// a waiting window clear is never stranded.
struct Unbind<'a>(&'a Shared);

impl Drop for Unbind<'_> {
    fn drop(&mut self) {
        self.0.unbind();
    }
}

/// Main render loop.
///
/// Each iteration holds the mailbox lock while it handles the pending
/// message and draws, so a teardown can never overlap a frame. The loop
/// only free-runs, paced by the present, while a device is bound. With no
/// device there is nothing to draw and the thread sleeps on the mailbox
/// until a message arrives.
///
/// After handling a message the loop acknowledges it, which is what a
/// blocked window clear waits for.
pub(crate) fn run_render_loop<D, E>(
    shared: &Shared,
    mut gfx: Graphics<D, E>,
    config: &RendererConfig,
) -> Graphics<D, E>
where
    D: DisplayBackend,
    E: RenderEngine,
{
    let mut device: Option<Device<D>> = None;
    let mut rendering = true;
    let mut frames: u64 = 0;
    let _unbind = Unbind(shared);

    while rendering {
        let mut mailbox = shared.lock();
        if device.is_none() {
            shared.wait_for_message(&mut mailbox);
        }

        let ticket = mailbox.release_ticket();
        let message = mailbox.take();
        match message {
            PendingMessage::WindowSet => {
                if let Some(old) = device.take() {
                    debug!("Window replaced, rebuilding context");
                    old.destroy(&mut gfx);
                }
                device = match mailbox.window() {
                    Some(window) => match initialize(&mut gfx, &window, config) {
                        Ok(dev) => {
                            let (width, height) = dev.size();
                            info!("Context ready ({}x{})", width, height);
                            Some(dev)
                        }
                        Err(e) => {
                            error!("Context initialization failed: {}", e);
                            None
                        }
                    },
                    None => {
                        warn!("Window set without a window handle");
                        None
                    }
                };
            }

            PendingMessage::WindowCleared => {
                debug!("Window cleared");
                if let Some(old) = device.take() {
                    old.destroy(&mut gfx);
                }
            }

            PendingMessage::Exit => {
                debug!("Exit requested after {} frames", frames);
                rendering = false;
                if let Some(old) = device.take() {
                    old.destroy(&mut gfx);
                }
            }

            PendingMessage::None => {}
        }

        if message != PendingMessage::None {
            shared.acknowledge(&mut mailbox, ticket, device.is_some());
        }

        // Checked after teardown so a destroyed device is never drawn
        if let Some(dev) = &device {
            draw_frame(&mut gfx, dev, config);
            frames += 1;
        }

        MutexGuard::unlock_fair(mailbox);
    }

    gfx
}
