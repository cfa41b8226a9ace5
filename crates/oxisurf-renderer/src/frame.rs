//! Per-frame draw step.

use crate::RendererConfig;
use crate::device::{Device, Graphics};
use oxisurf_gfx::{DisplayBackend, RenderEngine};
use tracing::{trace, warn};

/// Draw one frame on view 0 and present it.
///
/// A failed present is logged; the caller keeps looping.
pub(crate) fn draw_frame<D, E>(gfx: &mut Graphics<D, E>, device: &Device<D>, config: &RendererConfig)
where
    D: DisplayBackend,
    E: RenderEngine,
{
    let (width, height) = device.size();
    let engine = &mut gfx.engine;

    engine.set_view_rect(0, 0, 0, clamp_u16(width), clamp_u16(height));

    // Nothing else is drawn; this keeps view 0 cleared every frame.
    engine.submit(0);

    if config.debug_text {
        engine.debug_text_clear();
        for line in &config.overlay {
            engine.debug_text_print(line.x, line.y, line.attr, &line.text);
        }
    }

    // Kicks the engine's submission thread
    let frame = engine.frame();
    trace!("Submitted frame {}", frame);

    if let Err(e) = gfx.display.swap_buffers(device.display(), device.surface()) {
        warn!("Present failed: {}", e);
    }
}

fn clamp_u16(value: u32) -> u16 {
    u16::try_from(value).unwrap_or(u16::MAX)
}
