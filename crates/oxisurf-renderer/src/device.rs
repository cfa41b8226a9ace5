//! Graphics device state and its ordered initialization.
//!
//! A [`Device`] only exists once every step succeeded, so display, surface
//! and context are present together or not at all. On failure whatever was
//! built so far is torn down in reverse order before the error is returned.

use crate::RendererConfig;
use oxisurf_gfx::{
    BackendError, ClearFlags, DebugFlags, DisplayBackend, RenderEngine, ResetFlags, WindowHandle,
};
use std::fmt;
use thiserror::Error;
use tracing::{debug, info};

/// The display backend and render engine, owned by whichever thread
/// currently drives them.
pub(crate) struct Graphics<D, E> {
    pub display: D,
    pub engine: E,
}

/// Initialization steps, in the order they run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InitStep {
    GetDisplay,
    InitializeDisplay,
    ChooseConfig,
    GetConfigAttrib,
    SetBuffersGeometry,
    CreateWindowSurface,
    CreateContext,
    MakeCurrent,
    QuerySurface,
    EngineInit,
}

impl InitStep {
    pub const ALL: [InitStep; 10] = [
        Self::GetDisplay,
        Self::InitializeDisplay,
        Self::ChooseConfig,
        Self::GetConfigAttrib,
        Self::SetBuffersGeometry,
        Self::CreateWindowSurface,
        Self::CreateContext,
        Self::MakeCurrent,
        Self::QuerySurface,
        Self::EngineInit,
    ];
}

impl fmt::Display for InitStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::GetDisplay => "get display",
            Self::InitializeDisplay => "initialize display",
            Self::ChooseConfig => "choose config",
            Self::GetConfigAttrib => "query native visual",
            Self::SetBuffersGeometry => "set window buffers geometry",
            Self::CreateWindowSurface => "create window surface",
            Self::CreateContext => "create context",
            Self::MakeCurrent => "make current",
            Self::QuerySurface => "query surface size",
            Self::EngineInit => "engine init",
        };
        f.write_str(name)
    }
}

/// Context initialization failed at `step`.
#[derive(Debug, Error)]
#[error("{step} failed: {source}")]
pub struct InitError {
    pub step: InitStep,
    #[source]
    pub source: BackendError,
}

fn at(step: InitStep) -> impl FnOnce(BackendError) -> InitError {
    move |source| InitError { step, source }
}

/// Bound display, surface and context plus the drawable size.
pub(crate) struct Device<D: DisplayBackend> {
    display: D::Display,
    surface: D::Surface,
    context: D::Context,
    width: u32,
    height: u32,
}

impl<D: DisplayBackend> Device<D> {
    pub fn display(&self) -> D::Display {
        self.display
    }

    pub fn surface(&self) -> D::Surface {
        self.surface
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Shut the engine down and release every display resource.
    pub fn destroy<E: RenderEngine>(self, gfx: &mut Graphics<D, E>) {
        info!("Destroying context");
        Partial {
            display: Some(self.display),
            initialized: true,
            surface: Some(self.surface),
            context: Some(self.context),
            current: true,
            engine_live: true,
        }
        .teardown(gfx);
    }
}

/// Resources acquired so far by an initialization attempt.
struct Partial<D: DisplayBackend> {
    display: Option<D::Display>,
    initialized: bool,
    surface: Option<D::Surface>,
    context: Option<D::Context>,
    current: bool,
    engine_live: bool,
}

impl<D: DisplayBackend> Partial<D> {
    fn new() -> Self {
        Self {
            display: None,
            initialized: false,
            surface: None,
            context: None,
            current: false,
            engine_live: false,
        }
    }

    fn teardown<E: RenderEngine>(self, gfx: &mut Graphics<D, E>) {
        if self.engine_live {
            gfx.engine.shutdown();
        }

        let Some(display) = self.display else {
            return;
        };
        if self.current {
            gfx.display.release_current(display);
        }
        if let Some(context) = self.context {
            gfx.display.destroy_context(display, context);
        }
        if let Some(surface) = self.surface {
            gfx.display.destroy_surface(display, surface);
        }
        debug!(
            "Terminating display (initialized: {})",
            self.initialized
        );
        gfx.display.terminate_display(display);
    }
}

/// Build a device for `window`. On failure everything acquired along the
/// way has already been released.
pub(crate) fn initialize<D, E>(
    gfx: &mut Graphics<D, E>,
    window: &WindowHandle,
    config: &RendererConfig,
) -> Result<Device<D>, InitError>
where
    D: DisplayBackend,
    E: RenderEngine,
{
    info!("Initializing context for {}", window);

    let mut partial = Partial::new();
    match build(gfx, window, config, &mut partial) {
        Ok(device) => Ok(device),
        Err(err) => {
            partial.teardown(gfx);
            Err(err)
        }
    }
}

fn build<D, E>(
    gfx: &mut Graphics<D, E>,
    window: &WindowHandle,
    config: &RendererConfig,
    partial: &mut Partial<D>,
) -> Result<Device<D>, InitError>
where
    D: DisplayBackend,
    E: RenderEngine,
{
    let backend = &mut gfx.display;

    let display = backend.get_display().map_err(at(InitStep::GetDisplay))?;
    partial.display = Some(display);

    backend
        .initialize_display(display)
        .map_err(at(InitStep::InitializeDisplay))?;
    partial.initialized = true;

    let surface_config = backend
        .choose_config(display, &config.surface)
        .map_err(at(InitStep::ChooseConfig))?;

    let format = backend
        .get_config_attrib(display, surface_config)
        .map_err(at(InitStep::GetConfigAttrib))?;

    backend
        .set_buffers_geometry(window, format)
        .map_err(at(InitStep::SetBuffersGeometry))?;

    let surface = backend
        .create_window_surface(display, surface_config, window)
        .map_err(at(InitStep::CreateWindowSurface))?;
    partial.surface = Some(surface);

    let context = backend
        .create_context(display, surface_config)
        .map_err(at(InitStep::CreateContext))?;
    partial.context = Some(context);

    backend
        .make_current(display, surface, context)
        .map_err(at(InitStep::MakeCurrent))?;
    partial.current = true;

    let (width, height) = backend
        .query_surface_size(display, surface)
        .map_err(at(InitStep::QuerySurface))?;
    debug!("Surface size {}x{}, native format {}", width, height, format);

    let platform = backend.platform_data(display, context, window);
    let engine = &mut gfx.engine;
    engine.set_platform_data(&platform);
    engine.init().map_err(at(InitStep::EngineInit))?;
    partial.engine_live = true;

    let reset = if config.vsync {
        ResetFlags::VSYNC
    } else {
        ResetFlags::empty()
    };
    engine.reset(width, height, reset);

    let debug = if config.debug_text {
        DebugFlags::TEXT
    } else {
        DebugFlags::empty()
    };
    engine.set_debug(debug);

    engine.set_view_clear(
        0,
        ClearFlags::COLOR | ClearFlags::DEPTH,
        config.clear_color,
        config.clear_depth,
        config.clear_stencil,
    );

    Ok(Device {
        display,
        surface,
        context,
        width,
        height,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxisurf_gfx::headless::{self, Call, HeadlessConfig, Op, Probe, count_in};
    use oxisurf_gfx::headless::{HeadlessDisplay, HeadlessEngine};
    use std::ffi::c_void;
    use std::ptr::NonNull;

    fn setup() -> (Graphics<HeadlessDisplay, HeadlessEngine>, Probe) {
        let (display, engine, probe) = headless::headless(HeadlessConfig::new(800, 480));
        (Graphics { display, engine }, probe)
    }

    fn window() -> WindowHandle {
        unsafe { WindowHandle::from_android(NonNull::new(0x1000 as *mut c_void).unwrap()) }
    }

    fn op_for(step: InitStep) -> Op {
        match step {
            InitStep::GetDisplay => Op::GetDisplay,
            InitStep::InitializeDisplay => Op::InitializeDisplay,
            InitStep::ChooseConfig => Op::ChooseConfig,
            InitStep::GetConfigAttrib => Op::GetConfigAttrib,
            InitStep::SetBuffersGeometry => Op::SetBuffersGeometry,
            InitStep::CreateWindowSurface => Op::CreateWindowSurface,
            InitStep::CreateContext => Op::CreateContext,
            InitStep::MakeCurrent => Op::MakeCurrent,
            InitStep::QuerySurface => Op::QuerySurface,
            InitStep::EngineInit => Op::EngineInit,
        }
    }

    #[test]
    fn test_successful_init_sequence() {
        let (mut gfx, probe) = setup();
        let device = initialize(&mut gfx, &window(), &RendererConfig::default()).unwrap();

        assert_eq!(device.size(), (800, 480));
        let ops: Vec<Op> = probe.calls().iter().map(Call::op).collect();
        assert_eq!(
            ops,
            vec![
                Op::GetDisplay,
                Op::InitializeDisplay,
                Op::ChooseConfig,
                Op::GetConfigAttrib,
                Op::SetBuffersGeometry,
                Op::CreateWindowSurface,
                Op::CreateContext,
                Op::MakeCurrent,
                Op::QuerySurface,
                Op::SetPlatformData,
                Op::EngineInit,
                Op::EngineReset,
                Op::SetDebug,
                Op::SetViewClear,
            ]
        );

        let calls = probe.calls();
        assert!(calls.contains(&Call::SetBuffersGeometry {
            window: 0x1000,
            format: headless::VISUAL_ID,
        }));
        assert!(calls.contains(&Call::EngineReset {
            width: 800,
            height: 480,
            flags: ResetFlags::VSYNC,
        }));
        assert!(calls.contains(&Call::SetDebug(DebugFlags::TEXT)));
        assert!(calls.contains(&Call::SetViewClear {
            view: 0,
            flags: ClearFlags::COLOR | ClearFlags::DEPTH,
            color: oxisurf_gfx::Rgba::PLUM,
            depth: 1.0,
            stencil: 0,
        }));
    }

    #[test]
    fn test_config_flags_respected() {
        let (mut gfx, probe) = setup();
        let config = RendererConfig {
            vsync: false,
            debug_text: false,
            ..Default::default()
        };
        initialize(&mut gfx, &window(), &config).unwrap();

        let calls = probe.calls();
        assert!(calls.contains(&Call::EngineReset {
            width: 800,
            height: 480,
            flags: ResetFlags::empty(),
        }));
        assert!(calls.contains(&Call::SetDebug(DebugFlags::empty())));
    }

    #[test]
    fn test_failure_at_each_step_tears_down_what_exists() {
        for step in InitStep::ALL {
            let (mut gfx, probe) = setup();
            probe.fail_once(op_for(step));

            let err = initialize(&mut gfx, &window(), &RendererConfig::default())
                .err()
                .expect("injected failure must surface");
            assert_eq!(err.step, step);
            assert_eq!(err.source.code(), Some(headless::FAULT_CODE));

            let calls = probe.calls();
            let display_acquired = step != InitStep::GetDisplay;
            let surface_created = matches!(
                step,
                InitStep::CreateContext
                    | InitStep::MakeCurrent
                    | InitStep::QuerySurface
                    | InitStep::EngineInit
            );
            let context_created = matches!(
                step,
                InitStep::MakeCurrent | InitStep::QuerySurface | InitStep::EngineInit
            );
            let made_current = matches!(step, InitStep::QuerySurface | InitStep::EngineInit);

            assert_eq!(
                count_in(&calls, Op::TerminateDisplay),
                display_acquired as usize,
                "terminate after {step}"
            );
            assert_eq!(count_in(&calls, Op::DestroySurface), surface_created as usize, "{step}");
            assert_eq!(count_in(&calls, Op::DestroyContext), context_created as usize, "{step}");
            assert_eq!(count_in(&calls, Op::ReleaseCurrent), made_current as usize, "{step}");
            // Engine never reached a live state
            assert_eq!(count_in(&calls, Op::EngineShutdown), 0, "{step}");
            assert_eq!(count_in(&calls, Op::EngineReset), 0, "{step}");
        }
    }

    #[test]
    fn test_destroy_order() {
        let (mut gfx, probe) = setup();
        let device = initialize(&mut gfx, &window(), &RendererConfig::default()).unwrap();
        probe.clear();

        device.destroy(&mut gfx);

        assert_eq!(
            probe.calls(),
            vec![
                Call::EngineShutdown,
                Call::ReleaseCurrent,
                Call::DestroyContext,
                Call::DestroySurface,
                Call::TerminateDisplay,
            ]
        );
    }

    #[test]
    fn test_retry_after_failure() {
        let (mut gfx, probe) = setup();
        probe.fail_once(Op::CreateWindowSurface);

        assert!(initialize(&mut gfx, &window(), &RendererConfig::default()).is_err());
        assert!(initialize(&mut gfx, &window(), &RendererConfig::default()).is_ok());
        assert_eq!(probe.count(Op::GetDisplay), 2);
    }

    #[test]
    fn test_init_error_display() {
        let err = InitError {
            step: InitStep::CreateContext,
            source: BackendError::call("eglCreateContext", 0x3005),
        };
        assert_eq!(
            err.to_string(),
            "create context failed: eglCreateContext() returned error 0x3005"
        );
    }
}
