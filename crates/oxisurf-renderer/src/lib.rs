//! oxisurf Renderer
//!
//! Bridges a window handle delivered by the platform's surface callbacks to
//! a dedicated render thread:
//! - Single-slot mailbox for window/exit requests from the control thread
//! - Render thread that owns the display, surface and context exclusively
//! - Ordered context initialization with partial teardown on failure
//! - Per-frame view setup, debug overlay and buffer present

mod config;
mod device;
mod frame;
mod mailbox;
mod render_loop;
mod renderer;

pub use config::{ConfigError, OverlayLine, RendererConfig};
pub use device::{InitError, InitStep};
pub use renderer::{Renderer, RendererError, RendererHandle};

pub use oxisurf_gfx::WindowHandle;
