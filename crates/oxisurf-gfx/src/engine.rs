//! Render engine - view setup, debug text and frame submission.

use crate::{BackendError, ClearFlags, DebugFlags, PlatformData, ResetFlags, Rgba};

/// Render engine view index.
pub type ViewId = u16;

/// Submission engine driven once per frame by the render thread.
///
/// `frame` hands the recorded work to the engine's own submission thread;
/// presentation is left to the display backend.
pub trait RenderEngine: Send {
    fn set_platform_data(&mut self, data: &PlatformData);

    fn init(&mut self) -> Result<(), BackendError>;

    fn reset(&mut self, width: u32, height: u32, flags: ResetFlags);

    fn set_debug(&mut self, flags: DebugFlags);

    fn set_view_clear(
        &mut self,
        view: ViewId,
        flags: ClearFlags,
        color: Rgba,
        depth: f32,
        stencil: u8,
    );

    fn set_view_rect(&mut self, view: ViewId, x: u16, y: u16, width: u16, height: u16);

    /// Submit the (possibly empty) draw list for `view`.
    fn submit(&mut self, view: ViewId);

    fn debug_text_clear(&mut self);

    fn debug_text_print(&mut self, x: u16, y: u16, attr: u8, text: &str);

    /// Advance to the next frame. Returns the engine's frame number.
    fn frame(&mut self) -> u32;

    fn shutdown(&mut self);
}
