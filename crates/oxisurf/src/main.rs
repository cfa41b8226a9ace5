//! oxisurf: render-thread surface demo
//!
//! Main entry point. Sets up logging, loads the optional TOML config given
//! as the first argument, and drives a renderer on the headless backend
//! through a simulated window attach/detach lifecycle.

mod config;
mod provider;

use anyhow::{Context, Result};
use config::AppConfig;
use crossbeam_channel::unbounded;
use oxisurf_gfx::headless::{self, Op};
use oxisurf_renderer::{Renderer, WindowHandle};
use provider::{NativeWindows, SurfaceEvent, spawn_provider};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

// Use mimalloc as the global allocator for reduced memory fragmentation
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn main() -> Result<()> {
    // Initialize logging
    FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();

    let path = std::env::args_os().nth(1).map(PathBuf::from);
    let config = AppConfig::load(path.as_deref())?;

    info!("oxisurf starting...");
    info!(
        "Headless surface {}x{}, {} lifecycle cycles",
        config.headless.width, config.headless.height, config.lifecycle.cycles
    );

    let (display, engine, probe) = headless::headless(config.headless.clone());
    let mut renderer = Renderer::new(config.renderer.clone(), display, engine);
    let windows = NativeWindows::new(config.lifecycle.cycles as usize);

    renderer.start()?;

    let (tx, rx) = unbounded();
    let provider = spawn_provider(config.lifecycle.clone(), tx).context("spawning surface provider")?;

    // This thread plays the platform's control thread
    for event in rx.iter() {
        match event {
            SurfaceEvent::Attached(id) => match windows.pointer(id) {
                Some(ptr) => {
                    // SAFETY: `windows` is dropped only after `stop()` has
                    // returned, and `clear_window` blocks until the render
                    // thread released the window it detaches.
                    let window = unsafe { WindowHandle::from_android(ptr) };
                    renderer.set_window(window);
                }
                None => warn!("Provider attached unknown window {:?}", id),
            },
            SurfaceEvent::Detached => renderer.clear_window(),
            SurfaceEvent::Quit => break,
        }
    }

    renderer.stop()?;
    if provider.join().is_err() {
        warn!("Surface provider thread panicked");
    }

    info!(
        "Presented {} frames across {} contexts ({} torn down)",
        probe.count(Op::SwapBuffers),
        probe.count(Op::EngineInit),
        probe.count(Op::TerminateDisplay),
    );

    drop(renderer);
    drop(windows);

    info!("oxisurf shutting down");
    Ok(())
}
