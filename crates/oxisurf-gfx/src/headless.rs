//! Headless backend - records every call, presents nowhere
//!
//! Used by the demo binary on hosts without a GPU and by the renderer's
//! tests. Both halves share a [`Probe`] that keeps the ordered call log
//! and lets a caller inject one-shot failures.

use crate::{
    BackendError, ClearFlags, DebugFlags, DisplayBackend, PlatformData, RenderEngine, ResetFlags,
    Rgba, SurfaceAttribs, ViewId, WindowHandle,
};
use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};
use std::ffi::c_void;
use std::ptr;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Error code reported by injected failures (EGL_BAD_ALLOC).
pub const FAULT_CODE: i32 = 0x3003;

/// Native visual id reported for every config.
pub const VISUAL_ID: i32 = 1; // WINDOW_FORMAT_RGBA_8888

/// Headless surface configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HeadlessConfig {
    /// Reported drawable width
    pub width: u32,
    /// Reported drawable height
    pub height: u32,
    /// Time `swap_buffers` blocks, standing in for the vsync wait
    pub present_interval_ms: u64,
}

impl HeadlessConfig {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            present_interval_ms: 0,
        }
    }

    pub fn present_interval(&self) -> Duration {
        Duration::from_millis(self.present_interval_ms)
    }
}

impl Default for HeadlessConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 480,
            present_interval_ms: 16,
        }
    }
}

/// Backend entry points, without arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    GetDisplay,
    InitializeDisplay,
    ChooseConfig,
    GetConfigAttrib,
    SetBuffersGeometry,
    CreateWindowSurface,
    CreateContext,
    MakeCurrent,
    ReleaseCurrent,
    QuerySurface,
    SwapBuffers,
    DestroyContext,
    DestroySurface,
    TerminateDisplay,
    SetPlatformData,
    EngineInit,
    EngineReset,
    SetDebug,
    SetViewClear,
    SetViewRect,
    Submit,
    DebugTextClear,
    DebugTextPrint,
    Frame,
    EngineShutdown,
}

impl Op {
    /// Driver-style name used in error messages.
    pub fn call_name(self) -> &'static str {
        match self {
            Self::GetDisplay => "eglGetDisplay",
            Self::InitializeDisplay => "eglInitialize",
            Self::ChooseConfig => "eglChooseConfig",
            Self::GetConfigAttrib => "eglGetConfigAttrib",
            Self::SetBuffersGeometry => "ANativeWindow_setBuffersGeometry",
            Self::CreateWindowSurface => "eglCreateWindowSurface",
            Self::CreateContext => "eglCreateContext",
            Self::MakeCurrent | Self::ReleaseCurrent => "eglMakeCurrent",
            Self::QuerySurface => "eglQuerySurface",
            Self::SwapBuffers => "eglSwapBuffers",
            Self::DestroyContext => "eglDestroyContext",
            Self::DestroySurface => "eglDestroySurface",
            Self::TerminateDisplay => "eglTerminate",
            Self::SetPlatformData => "setPlatformData",
            Self::EngineInit => "init",
            Self::EngineReset => "reset",
            Self::SetDebug => "setDebug",
            Self::SetViewClear => "setViewClear",
            Self::SetViewRect => "setViewRect",
            Self::Submit => "submit",
            Self::DebugTextClear => "dbgTextClear",
            Self::DebugTextPrint => "dbgTextPrintf",
            Self::Frame => "frame",
            Self::EngineShutdown => "shutdown",
        }
    }
}

/// One recorded backend call.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    GetDisplay,
    InitializeDisplay,
    ChooseConfig(SurfaceAttribs),
    GetConfigAttrib,
    SetBuffersGeometry { window: usize, format: i32 },
    CreateWindowSurface { window: usize },
    CreateContext,
    MakeCurrent,
    ReleaseCurrent,
    QuerySurface,
    SwapBuffers,
    DestroyContext,
    DestroySurface,
    TerminateDisplay,
    SetPlatformData { window: usize },
    EngineInit,
    EngineReset { width: u32, height: u32, flags: ResetFlags },
    SetDebug(DebugFlags),
    SetViewClear { view: ViewId, flags: ClearFlags, color: Rgba, depth: f32, stencil: u8 },
    SetViewRect { view: ViewId, x: u16, y: u16, width: u16, height: u16 },
    Submit(ViewId),
    DebugTextClear,
    DebugTextPrint { x: u16, y: u16, attr: u8, text: String },
    Frame,
    EngineShutdown,
}

impl Call {
    pub fn op(&self) -> Op {
        match self {
            Self::GetDisplay => Op::GetDisplay,
            Self::InitializeDisplay => Op::InitializeDisplay,
            Self::ChooseConfig(_) => Op::ChooseConfig,
            Self::GetConfigAttrib => Op::GetConfigAttrib,
            Self::SetBuffersGeometry { .. } => Op::SetBuffersGeometry,
            Self::CreateWindowSurface { .. } => Op::CreateWindowSurface,
            Self::CreateContext => Op::CreateContext,
            Self::MakeCurrent => Op::MakeCurrent,
            Self::ReleaseCurrent => Op::ReleaseCurrent,
            Self::QuerySurface => Op::QuerySurface,
            Self::SwapBuffers => Op::SwapBuffers,
            Self::DestroyContext => Op::DestroyContext,
            Self::DestroySurface => Op::DestroySurface,
            Self::TerminateDisplay => Op::TerminateDisplay,
            Self::SetPlatformData { .. } => Op::SetPlatformData,
            Self::EngineInit => Op::EngineInit,
            Self::EngineReset { .. } => Op::EngineReset,
            Self::SetDebug(_) => Op::SetDebug,
            Self::SetViewClear { .. } => Op::SetViewClear,
            Self::SetViewRect { .. } => Op::SetViewRect,
            Self::Submit(_) => Op::Submit,
            Self::DebugTextClear => Op::DebugTextClear,
            Self::DebugTextPrint { .. } => Op::DebugTextPrint,
            Self::Frame => Op::Frame,
            Self::EngineShutdown => Op::EngineShutdown,
        }
    }
}

#[derive(Default)]
struct ProbeState {
    calls: Vec<Call>,
    faults: Vec<Op>,
}

#[derive(Default)]
struct ProbeInner {
    state: Mutex<ProbeState>,
    changed: Condvar,
}

/// Shared view of what the headless backend has been asked to do.
#[derive(Clone, Default)]
pub struct Probe {
    inner: Arc<ProbeInner>,
}

impl Probe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every call so far, in order.
    pub fn calls(&self) -> Vec<Call> {
        self.inner.state.lock().calls.clone()
    }

    /// Number of recorded calls to `op`.
    pub fn count(&self, op: Op) -> usize {
        count_in(&self.inner.state.lock().calls, op)
    }

    /// Make the next call to `op` fail with [`FAULT_CODE`].
    pub fn fail_once(&self, op: Op) {
        self.inner.state.lock().faults.push(op);
    }

    /// Forget recorded calls and pending faults.
    pub fn clear(&self) {
        let mut state = self.inner.state.lock();
        state.calls.clear();
        state.faults.clear();
    }

    /// Block until `pred` holds for the call log or `timeout` passes.
    /// Returns whether the predicate held.
    pub fn wait_until<F>(&self, timeout: Duration, mut pred: F) -> bool
    where
        F: FnMut(&[Call]) -> bool,
    {
        let deadline = Instant::now() + timeout;
        let mut state = self.inner.state.lock();
        while !pred(&state.calls) {
            if self.inner.changed.wait_until(&mut state, deadline).timed_out() {
                return pred(&state.calls);
            }
        }
        true
    }

    fn record(&self, call: Call) {
        trace!("headless call: {:?}", call);
        self.inner.state.lock().calls.push(call);
        self.inner.changed.notify_all();
    }

    /// Record `call`, then consume a pending fault for its op if any.
    fn record_fallible(&self, call: Call) -> Result<(), BackendError> {
        let op = call.op();
        let fault = {
            let mut state = self.inner.state.lock();
            state.calls.push(call);
            match state.faults.iter().position(|f| *f == op) {
                Some(index) => {
                    state.faults.remove(index);
                    true
                }
                None => false,
            }
        };
        self.inner.changed.notify_all();

        if fault {
            debug!("headless: injected failure for {:?}", op);
            Err(BackendError::call(op.call_name(), FAULT_CODE))
        } else {
            Ok(())
        }
    }
}

/// Count calls to `op` in a call log.
pub fn count_in(calls: &[Call], op: Op) -> usize {
    calls.iter().filter(|c| c.op() == op).count()
}

/// Opaque headless handle; each allocation gets a fresh id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HeadlessHandle(pub u32);

impl HeadlessHandle {
    fn as_ptr(self) -> *mut c_void {
        ptr::without_provenance_mut(self.0 as usize)
    }
}

/// Display backend half of the headless pair.
pub struct HeadlessDisplay {
    config: HeadlessConfig,
    probe: Probe,
    next_handle: u32,
}

impl HeadlessDisplay {
    fn alloc(&mut self) -> HeadlessHandle {
        self.next_handle += 1;
        HeadlessHandle(self.next_handle)
    }
}

impl DisplayBackend for HeadlessDisplay {
    type Display = HeadlessHandle;
    type Config = HeadlessHandle;
    type Surface = HeadlessHandle;
    type Context = HeadlessHandle;

    fn get_display(&mut self) -> Result<HeadlessHandle, BackendError> {
        self.probe.record_fallible(Call::GetDisplay)?;
        Ok(self.alloc())
    }

    fn initialize_display(&mut self, _display: HeadlessHandle) -> Result<(), BackendError> {
        self.probe.record_fallible(Call::InitializeDisplay)
    }

    fn choose_config(
        &mut self,
        _display: HeadlessHandle,
        attribs: &SurfaceAttribs,
    ) -> Result<HeadlessHandle, BackendError> {
        self.probe.record_fallible(Call::ChooseConfig(*attribs))?;
        Ok(self.alloc())
    }

    fn get_config_attrib(
        &mut self,
        _display: HeadlessHandle,
        _config: HeadlessHandle,
    ) -> Result<i32, BackendError> {
        self.probe.record_fallible(Call::GetConfigAttrib)?;
        Ok(VISUAL_ID)
    }

    fn set_buffers_geometry(&mut self, window: &WindowHandle, format: i32) -> Result<(), BackendError> {
        self.probe.record_fallible(Call::SetBuffersGeometry {
            window: window.id(),
            format,
        })
    }

    fn create_window_surface(
        &mut self,
        _display: HeadlessHandle,
        _config: HeadlessHandle,
        window: &WindowHandle,
    ) -> Result<HeadlessHandle, BackendError> {
        self.probe
            .record_fallible(Call::CreateWindowSurface { window: window.id() })?;
        Ok(self.alloc())
    }

    fn create_context(
        &mut self,
        _display: HeadlessHandle,
        _config: HeadlessHandle,
    ) -> Result<HeadlessHandle, BackendError> {
        self.probe.record_fallible(Call::CreateContext)?;
        Ok(self.alloc())
    }

    fn make_current(
        &mut self,
        _display: HeadlessHandle,
        _surface: HeadlessHandle,
        _context: HeadlessHandle,
    ) -> Result<(), BackendError> {
        self.probe.record_fallible(Call::MakeCurrent)
    }

    fn release_current(&mut self, _display: HeadlessHandle) {
        self.probe.record(Call::ReleaseCurrent);
    }

    fn query_surface_size(
        &mut self,
        _display: HeadlessHandle,
        _surface: HeadlessHandle,
    ) -> Result<(u32, u32), BackendError> {
        self.probe.record_fallible(Call::QuerySurface)?;
        Ok((self.config.width, self.config.height))
    }

    fn swap_buffers(&mut self, _display: HeadlessHandle, _surface: HeadlessHandle) -> Result<(), BackendError> {
        let result = self.probe.record_fallible(Call::SwapBuffers);
        let interval = self.config.present_interval();
        if !interval.is_zero() {
            thread::sleep(interval);
        }
        result
    }

    fn destroy_context(&mut self, _display: HeadlessHandle, _context: HeadlessHandle) {
        self.probe.record(Call::DestroyContext);
    }

    fn destroy_surface(&mut self, _display: HeadlessHandle, _surface: HeadlessHandle) {
        self.probe.record(Call::DestroySurface);
    }

    fn terminate_display(&mut self, _display: HeadlessHandle) {
        self.probe.record(Call::TerminateDisplay);
    }

    fn platform_data(
        &self,
        display: HeadlessHandle,
        context: HeadlessHandle,
        window: &WindowHandle,
    ) -> PlatformData {
        PlatformData {
            display: display.as_ptr(),
            window: *window,
            context: context.as_ptr(),
            back_buffer: ptr::null_mut(),
        }
    }
}

/// Render engine half of the headless pair.
pub struct HeadlessEngine {
    probe: Probe,
    frame: u32,
}

impl RenderEngine for HeadlessEngine {
    fn set_platform_data(&mut self, data: &PlatformData) {
        self.probe.record(Call::SetPlatformData {
            window: data.window.id(),
        });
    }

    fn init(&mut self) -> Result<(), BackendError> {
        self.probe.record_fallible(Call::EngineInit)?;
        self.frame = 0;
        Ok(())
    }

    fn reset(&mut self, width: u32, height: u32, flags: ResetFlags) {
        self.probe.record(Call::EngineReset { width, height, flags });
    }

    fn set_debug(&mut self, flags: DebugFlags) {
        self.probe.record(Call::SetDebug(flags));
    }

    fn set_view_clear(&mut self, view: ViewId, flags: ClearFlags, color: Rgba, depth: f32, stencil: u8) {
        self.probe.record(Call::SetViewClear {
            view,
            flags,
            color,
            depth,
            stencil,
        });
    }

    fn set_view_rect(&mut self, view: ViewId, x: u16, y: u16, width: u16, height: u16) {
        self.probe.record(Call::SetViewRect {
            view,
            x,
            y,
            width,
            height,
        });
    }

    fn submit(&mut self, view: ViewId) {
        self.probe.record(Call::Submit(view));
    }

    fn debug_text_clear(&mut self) {
        self.probe.record(Call::DebugTextClear);
    }

    fn debug_text_print(&mut self, x: u16, y: u16, attr: u8, text: &str) {
        self.probe.record(Call::DebugTextPrint {
            x,
            y,
            attr,
            text: text.to_string(),
        });
    }

    fn frame(&mut self) -> u32 {
        self.probe.record(Call::Frame);
        self.frame = self.frame.wrapping_add(1);
        self.frame
    }

    fn shutdown(&mut self) {
        self.probe.record(Call::EngineShutdown);
    }
}

/// Build a headless display/engine pair sharing one probe.
pub fn headless(config: HeadlessConfig) -> (HeadlessDisplay, HeadlessEngine, Probe) {
    debug!(
        "Creating headless backend ({}x{}, present every {}ms)",
        config.width, config.height, config.present_interval_ms
    );
    let probe = Probe::new();
    let display = HeadlessDisplay {
        config,
        probe: probe.clone(),
        next_handle: 0,
    };
    let engine = HeadlessEngine {
        probe: probe.clone(),
        frame: 0,
    };
    (display, engine, probe)
}
