//! oxisurf Graphics - Backend capability interfaces
//!
//! The render thread talks to two black-box collaborators:
//! - a display backend (display connection, window surface, context)
//! - a render engine (views, debug text, frame submission)
//!
//! Both are traits so the frame loop can run against the headless
//! recording backend as easily as against a real driver.

mod color;
mod display;
mod engine;
mod error;
mod flags;
pub mod headless;
mod window;

#[cfg(feature = "egl")]
pub mod egl;

pub use color::Rgba;
pub use display::{DisplayBackend, PlatformData, SurfaceAttribs};
pub use engine::{RenderEngine, ViewId};
pub use error::BackendError;
pub use flags::{ClearFlags, DebugFlags, ResetFlags};
pub use window::WindowHandle;
