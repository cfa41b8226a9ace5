//! EGL display backend
//!
//! Loads libEGL at runtime through `khronos-egl` and drives the standard
//! EGL 1.4 window-surface sequence. On Android the chosen config's native
//! visual id is also applied to the `ANativeWindow`.

use crate::{BackendError, DisplayBackend, PlatformData, SurfaceAttribs, WindowHandle};
use khronos_egl as egl;
#[cfg(target_os = "android")]
use std::ffi::c_void;
use std::ffi::OsStr;
use std::ptr;
use tracing::{debug, info, warn};

type EglInstance = egl::DynamicInstance<egl::EGL1_4>;

#[cfg(target_os = "android")]
#[link(name = "android")]
unsafe extern "C" {
    fn ANativeWindow_setBuffersGeometry(
        window: *mut c_void,
        width: i32,
        height: i32,
        format: i32,
    ) -> i32;
}

fn egl_error(call: &'static str, err: egl::Error) -> BackendError {
    BackendError::call(call, err.native())
}

/// Display backend over a dynamically loaded libEGL.
pub struct EglDisplay {
    egl: EglInstance,
}

impl EglDisplay {
    /// Load the system libEGL and resolve the EGL 1.4 entry points.
    pub fn load() -> Result<Self, BackendError> {
        Self::load_from("libEGL.so.1").or_else(|_| Self::load_from("libEGL.so"))
    }

    /// Load libEGL from `library`, a file name or path.
    pub fn load_from(library: impl AsRef<OsStr>) -> Result<Self, BackendError> {
        let library = library.as_ref();
        // SAFETY: the library is resolved against the EGL 1.4 signatures
        // khronos-egl declares; nothing is called until the instance exists.
        let egl = unsafe { EglInstance::load_required_from_filename(library) }
            .map_err(|e| BackendError::Unavailable(format!("{}: {:?}", library.to_string_lossy(), e)))?;
        info!("Loaded {}", library.to_string_lossy());
        Ok(Self { egl })
    }
}

impl DisplayBackend for EglDisplay {
    type Display = egl::Display;
    type Config = egl::Config;
    type Surface = egl::Surface;
    type Context = egl::Context;

    fn get_display(&mut self) -> Result<egl::Display, BackendError> {
        // SAFETY: DEFAULT_DISPLAY is always a valid display id.
        unsafe { self.egl.get_display(egl::DEFAULT_DISPLAY) }.ok_or_else(|| match self.egl.get_error() {
            Some(err) => egl_error("eglGetDisplay", err),
            None => BackendError::NoDisplay { call: "eglGetDisplay" },
        })
    }

    fn initialize_display(&mut self, display: egl::Display) -> Result<(), BackendError> {
        let (major, minor) = self
            .egl
            .initialize(display)
            .map_err(|e| egl_error("eglInitialize", e))?;
        debug!("EGL display initialized ({}.{})", major, minor);
        Ok(())
    }

    fn choose_config(
        &mut self,
        display: egl::Display,
        attribs: &SurfaceAttribs,
    ) -> Result<egl::Config, BackendError> {
        let attrib_list = [
            egl::SURFACE_TYPE,
            egl::WINDOW_BIT,
            egl::BLUE_SIZE,
            egl::Int::from(attribs.blue_bits),
            egl::GREEN_SIZE,
            egl::Int::from(attribs.green_bits),
            egl::RED_SIZE,
            egl::Int::from(attribs.red_bits),
            egl::NONE,
        ];

        self.egl
            .choose_first_config(display, &attrib_list)
            .map_err(|e| egl_error("eglChooseConfig", e))?
            .ok_or(BackendError::NoMatchingConfig {
                call: "eglChooseConfig",
            })
    }

    fn get_config_attrib(
        &mut self,
        display: egl::Display,
        config: egl::Config,
    ) -> Result<i32, BackendError> {
        self.egl
            .get_config_attrib(display, config, egl::NATIVE_VISUAL_ID)
            .map_err(|e| egl_error("eglGetConfigAttrib", e))
    }

    #[cfg(target_os = "android")]
    fn set_buffers_geometry(&mut self, window: &WindowHandle, format: i32) -> Result<(), BackendError> {
        let native = window.native_ptr()?;
        // SAFETY: `WindowHandle` guarantees the ANativeWindow is alive.
        let status = unsafe { ANativeWindow_setBuffersGeometry(native, 0, 0, format) };
        if status < 0 {
            return Err(BackendError::call("ANativeWindow_setBuffersGeometry", status));
        }
        Ok(())
    }

    #[cfg(not(target_os = "android"))]
    fn set_buffers_geometry(&mut self, window: &WindowHandle, format: i32) -> Result<(), BackendError> {
        debug!("No buffer geometry negotiation for {} (format {})", window, format);
        Ok(())
    }

    fn create_window_surface(
        &mut self,
        display: egl::Display,
        config: egl::Config,
        window: &WindowHandle,
    ) -> Result<egl::Surface, BackendError> {
        let native = window.native_ptr()?;
        // SAFETY: `WindowHandle` guarantees the native window is alive.
        unsafe { self.egl.create_window_surface(display, config, native, None) }
            .map_err(|e| egl_error("eglCreateWindowSurface", e))
    }

    fn create_context(
        &mut self,
        display: egl::Display,
        config: egl::Config,
    ) -> Result<egl::Context, BackendError> {
        self.egl
            .create_context(display, config, None, &[egl::NONE])
            .map_err(|e| egl_error("eglCreateContext", e))
    }

    fn make_current(
        &mut self,
        display: egl::Display,
        surface: egl::Surface,
        context: egl::Context,
    ) -> Result<(), BackendError> {
        self.egl
            .make_current(display, Some(surface), Some(surface), Some(context))
            .map_err(|e| egl_error("eglMakeCurrent", e))
    }

    fn release_current(&mut self, display: egl::Display) {
        if let Err(e) = self.egl.make_current(display, None, None, None) {
            warn!("{}", egl_error("eglMakeCurrent", e));
        }
    }

    fn query_surface_size(
        &mut self,
        display: egl::Display,
        surface: egl::Surface,
    ) -> Result<(u32, u32), BackendError> {
        let width = self
            .egl
            .query_surface(display, surface, egl::WIDTH)
            .map_err(|e| egl_error("eglQuerySurface", e))?;
        let height = self
            .egl
            .query_surface(display, surface, egl::HEIGHT)
            .map_err(|e| egl_error("eglQuerySurface", e))?;
        Ok((width.max(0) as u32, height.max(0) as u32))
    }

    fn swap_buffers(&mut self, display: egl::Display, surface: egl::Surface) -> Result<(), BackendError> {
        self.egl
            .swap_buffers(display, surface)
            .map_err(|e| egl_error("eglSwapBuffers", e))
    }

    fn destroy_context(&mut self, display: egl::Display, context: egl::Context) {
        if let Err(e) = self.egl.destroy_context(display, context) {
            warn!("{}", egl_error("eglDestroyContext", e));
        }
    }

    fn destroy_surface(&mut self, display: egl::Display, surface: egl::Surface) {
        if let Err(e) = self.egl.destroy_surface(display, surface) {
            warn!("{}", egl_error("eglDestroySurface", e));
        }
    }

    fn terminate_display(&mut self, display: egl::Display) {
        if let Err(e) = self.egl.terminate(display) {
            warn!("{}", egl_error("eglTerminate", e));
        }
    }

    fn platform_data(
        &self,
        display: egl::Display,
        context: egl::Context,
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
