//! Renderer facade - what the platform's control thread talks to.

use crate::RendererConfig;
use crate::device::Graphics;
use crate::mailbox::Shared;
use crate::render_loop::spawn_render_thread;
use oxisurf_gfx::{DisplayBackend, RenderEngine, WindowHandle};
use std::any::Any;
use std::sync::Arc;
use std::thread::JoinHandle;
use thiserror::Error;
use tracing::{error, info};

/// Misuse of the renderer lifecycle. Backend failures never surface here;
/// they are logged by the render thread.
#[derive(Debug, Error)]
pub enum RendererError {
    #[error("Render thread is already running")]
    AlreadyRunning,

    #[error("Render thread is not running")]
    NotRunning,

    #[error("Graphics backends were lost with a failed render thread")]
    BackendLost,

    #[error("Failed to spawn render thread: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("Render thread panicked: {0}")]
    RenderThreadPanicked(String),
}

/// Cloneable, thread-safe handle for posting window changes.
///
/// `set_window` never waits on the render thread beyond taking the mailbox
/// lock. `clear_window` waits until the old window is released.
#[derive(Clone)]
pub struct RendererHandle {
    shared: Arc<Shared>,
}

impl RendererHandle {
    /// Report a newly attached window.
    pub fn set_window(&self, window: WindowHandle) {
        self.shared.post_window_set(window);
    }

    /// Report that the current window is being detached. Returns once the
    /// render thread holds no surface on any previously posted window, after
    /// which the native window may be freed.
    pub fn clear_window(&self) {
        self.shared.post_window_cleared();
    }
}

/// Owns the mailbox and the render thread.
pub struct Renderer<D, E>
where
    D: DisplayBackend + 'static,
    E: RenderEngine + 'static,
{
    shared: Arc<Shared>,
    config: Arc<RendererConfig>,
    /// Backends while no render thread holds them
    graphics: Option<Graphics<D, E>>,
    thread: Option<JoinHandle<Graphics<D, E>>>,
}

impl<D, E> Renderer<D, E>
where
    D: DisplayBackend + 'static,
    E: RenderEngine + 'static,
{
    /// Create a renderer. No thread runs until [`Renderer::start`].
    pub fn new(config: RendererConfig, display: D, engine: E) -> Self {
        info!("Renderer instance created");
        Self {
            shared: Arc::new(Shared::new()),
            config: Arc::new(config),
            graphics: Some(Graphics { display, engine }),
            thread: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.thread.is_some()
    }

    /// Handle for posting from other threads.
    pub fn handle(&self) -> RendererHandle {
        RendererHandle {
            shared: self.shared.clone(),
        }
    }

    /// Spawn the render thread. A window posted before this is picked up
    /// on the first iteration.
    pub fn start(&mut self) -> Result<(), RendererError> {
        if self.thread.is_some() {
            return Err(RendererError::AlreadyRunning);
        }
        let gfx = self.graphics.take().ok_or(RendererError::BackendLost)?;

        info!("Creating renderer thread");
        let thread = spawn_render_thread(self.shared.clone(), gfx, self.config.clone())
            .map_err(RendererError::Spawn)?;
        self.thread = Some(thread);
        Ok(())
    }

    /// Ask the render thread to tear down and exit, and wait for it.
    pub fn stop(&mut self) -> Result<(), RendererError> {
        let thread = self.thread.take().ok_or(RendererError::NotRunning)?;

        info!("Stopping renderer thread");
        self.shared.post_exit();

        match thread.join() {
            Ok(gfx) => {
                self.graphics = Some(gfx);
                info!("Renderer thread stopped");
                Ok(())
            }
            Err(panic_info) => {
                let message = panic_message(panic_info.as_ref());
                error!("Render thread panicked: {}", message);
                Err(RendererError::RenderThreadPanicked(message))
            }
        }
    }

    /// Report a newly attached window.
    pub fn set_window(&self, window: WindowHandle) {
        info!("Setting window {}", window);
        self.shared.post_window_set(window);
    }

    /// Report that the current window is being detached and wait until the
    /// render thread has released it. See [`RendererHandle::clear_window`].
    pub fn clear_window(&self) {
        info!("Clearing window");
        self.shared.post_window_cleared();
    }
}

impl<D, E> Drop for Renderer<D, E>
where
    D: DisplayBackend + 'static,
    E: RenderEngine + 'static,
{
    fn drop(&mut self) {
        if self.thread.is_some() {
            if let Err(e) = self.stop() {
                error!("Failed to stop renderer: {}", e);
            }
        }
        info!("Renderer instance destroyed");
    }
}

fn panic_message(panic_info: &(dyn Any + Send)) -> String {
    if let Some(s) = panic_info.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic_info.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxisurf_gfx::headless::{self, HeadlessConfig, HeadlessDisplay, HeadlessEngine, Op, Probe};
    use std::ffi::c_void;
    use std::ptr::NonNull;
    use std::time::Duration;

    fn renderer() -> (Renderer<HeadlessDisplay, HeadlessEngine>, Probe) {
        let (display, engine, probe) = headless::headless(HeadlessConfig {
            present_interval_ms: 1,
            ..HeadlessConfig::new(800, 480)
        });
        (Renderer::new(RendererConfig::default(), display, engine), probe)
    }

    fn window() -> WindowHandle {
        unsafe { WindowHandle::from_android(NonNull::new(0x1000 as *mut c_void).unwrap()) }
    }

    #[test]
    fn test_start_twice() {
        let (mut renderer, _probe) = renderer();
        renderer.start().unwrap();
        assert!(renderer.is_running());
        assert!(matches!(renderer.start(), Err(RendererError::AlreadyRunning)));
        renderer.stop().unwrap();
        assert!(!renderer.is_running());
    }

    #[test]
    fn test_stop_without_start() {
        let (mut renderer, _probe) = renderer();
        assert!(matches!(renderer.stop(), Err(RendererError::NotRunning)));
    }

    #[test]
    fn test_restart_after_stop() {
        let (mut renderer, probe) = renderer();
        renderer.start().unwrap();
        renderer.stop().unwrap();

        renderer.set_window(window());
        renderer.start().unwrap();
        assert!(probe.wait_until(Duration::from_secs(5), |c| headless::count_in(c, Op::Frame) >= 1));
        renderer.stop().unwrap();

        assert_eq!(probe.count(Op::GetDisplay), 1);
        assert_eq!(probe.count(Op::TerminateDisplay), 1);
    }

    #[test]
    fn test_drop_stops_thread() {
        let (mut renderer, probe) = renderer();
        renderer.set_window(window());
        renderer.start().unwrap();
        assert!(probe.wait_until(Duration::from_secs(5), |c| headless::count_in(c, Op::Frame) >= 1));

        drop(renderer);

        assert_eq!(probe.count(Op::TerminateDisplay), 1);
        assert_eq!(probe.count(Op::EngineShutdown), 1);
    }

    #[test]
    fn test_clear_window_before_start_returns() {
        let (renderer, probe) = renderer();
        renderer.set_window(window());
        renderer.clear_window();
        assert!(probe.calls().is_empty());
    }

    #[test]
    fn test_clear_window_after_stop_returns() {
        let (mut renderer, probe) = renderer();
        renderer.set_window(window());
        renderer.start().unwrap();
        assert!(probe.wait_until(Duration::from_secs(5), |c| headless::count_in(c, Op::Frame) >= 1));
        renderer.stop().unwrap();

        renderer.clear_window();
        assert_eq!(probe.count(Op::DestroySurface), 1);
    }

    #[test]
    fn test_panic_message() {
        let boxed: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(boxed.as_ref()), "boom");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(boxed.as_ref()), "bang");
        let boxed: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(boxed.as_ref()), "Unknown panic");
    }
}
