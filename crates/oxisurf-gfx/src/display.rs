//! Display backend - display connection, window surface and context
//!
//! Mirrors the EGL call sequence: acquire and initialize a display, pick a
//! config, bind a window surface and a context, then present by swapping
//! buffers. Each call may fail with a platform error code.

use crate::{BackendError, WindowHandle};
use serde::{Deserialize, Serialize};
use std::ffi::c_void;
use std::fmt::Debug;

/// Pixel format constraints for config selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceAttribs {
    pub red_bits: u8,
    pub green_bits: u8,
    pub blue_bits: u8,
}

impl Default for SurfaceAttribs {
    fn default() -> Self {
        Self {
            red_bits: 8,
            green_bits: 8,
            blue_bits: 8,
        }
    }
}

/// Native handles handed to the render engine's platform binding.
#[derive(Debug, Clone, Copy)]
pub struct PlatformData {
    /// Native display type
    pub display: *mut c_void,
    /// Native window
    pub window: WindowHandle,
    /// Current rendering context
    pub context: *mut c_void,
    /// Engine-managed back buffer (null when the backend owns it)
    pub back_buffer: *mut c_void,
}

/// Display, surface and context management.
///
/// Implementations are moved onto the render thread and only ever called
/// from there.
pub trait DisplayBackend: Send {
    type Display: Copy + Debug;
    type Config: Copy + Debug;
    type Surface: Copy + Debug;
    type Context: Copy + Debug;

    /// Acquire the display for the default output.
    fn get_display(&mut self) -> Result<Self::Display, BackendError>;

    /// Initialize the display connection.
    fn initialize_display(&mut self, display: Self::Display) -> Result<(), BackendError>;

    /// Choose a window-drawable config matching `attribs`.
    fn choose_config(
        &mut self,
        display: Self::Display,
        attribs: &SurfaceAttribs,
    ) -> Result<Self::Config, BackendError>;

    /// Native visual format implied by `config`.
    fn get_config_attrib(
        &mut self,
        display: Self::Display,
        config: Self::Config,
    ) -> Result<i32, BackendError>;

    /// Negotiate buffer geometry and format with the native window.
    fn set_buffers_geometry(
        &mut self,
        window: &WindowHandle,
        format: i32,
    ) -> Result<(), BackendError>;

    fn create_window_surface(
        &mut self,
        display: Self::Display,
        config: Self::Config,
        window: &WindowHandle,
    ) -> Result<Self::Surface, BackendError>;

    fn create_context(
        &mut self,
        display: Self::Display,
        config: Self::Config,
    ) -> Result<Self::Context, BackendError>;

    /// Bind surface and context as the current rendering target.
    fn make_current(
        &mut self,
        display: Self::Display,
        surface: Self::Surface,
        context: Self::Context,
    ) -> Result<(), BackendError>;

    /// Unbind whatever is current on `display`.
    fn release_current(&mut self, display: Self::Display);

    /// Drawable width and height in pixels.
    fn query_surface_size(
        &mut self,
        display: Self::Display,
        surface: Self::Surface,
    ) -> Result<(u32, u32), BackendError>;

    /// Present the back buffer. May block for vsync.
    fn swap_buffers(
        &mut self,
        display: Self::Display,
        surface: Self::Surface,
    ) -> Result<(), BackendError>;

    fn destroy_context(&mut self, display: Self::Display, context: Self::Context);

    fn destroy_surface(&mut self, display: Self::Display, surface: Self::Surface);

    /// Terminate the display connection. Safe on a display that was
    /// acquired but never initialized.
    fn terminate_display(&mut self, display: Self::Display);

    /// Native handles for the render engine's platform binding.
    fn platform_data(
        &self,
        display: Self::Display,
        context: Self::Context,
        window: &WindowHandle,
    ) -> PlatformData;
}
