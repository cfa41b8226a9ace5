//! Native window handles delivered by the surface provider.

use crate::BackendError;
use raw_window_handle::{AndroidNdkWindowHandle, RawWindowHandle};
use std::ffi::c_void;
use std::fmt;
use std::ptr::NonNull;

/// Opaque reference to an OS-owned drawable window.
///
/// The handle is borrowed: this crate never releases it. The owner keeps the
/// native object alive until the renderer has acknowledged the detach.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowHandle {
    raw: RawWindowHandle,
}

// SAFETY: the handle is an inert pointer value. The render thread is the
// only place it is handed to a backend, and `WindowHandle::new` requires the
// caller to keep the native window alive until its release is acknowledged.
unsafe impl Send for WindowHandle {}

impl WindowHandle {
    /// Wrap a raw window handle.
    ///
    /// # Safety
    ///
    /// `raw` must refer to a live native window, and it must stay live until
    /// a later `clear_window` or `stop` on the renderer it was posted to has
    /// returned. Both block until the render thread has destroyed every
    /// surface built on it. Posting another window does not release this
    /// one: `set_window` returns before the old surface is torn down.
    pub unsafe fn new(raw: RawWindowHandle) -> Self {
        Self { raw }
    }

    /// Wrap an `ANativeWindow*`.
    ///
    /// # Safety
    ///
    /// Same contract as [`WindowHandle::new`].
    pub unsafe fn from_android(a_native_window: NonNull<c_void>) -> Self {
        let raw = RawWindowHandle::AndroidNdk(AndroidNdkWindowHandle::new(a_native_window));
        // SAFETY: forwarded to the caller.
        unsafe { Self::new(raw) }
    }

    /// Native window pointer for the platforms that have one.
    pub fn native_ptr(&self) -> Result<*mut c_void, BackendError> {
        match self.raw {
            RawWindowHandle::AndroidNdk(h) => Ok(h.a_native_window.as_ptr()),
            RawWindowHandle::Wayland(h) => Ok(h.surface.as_ptr()),
            RawWindowHandle::Xlib(h) => Ok(h.window as *mut c_void),
            other => Err(BackendError::UnsupportedWindow(format!("{:?}", other))),
        }
    }

    /// Numeric identity used in log lines.
    pub fn id(&self) -> usize {
        self.native_ptr().map(|p| p as usize).unwrap_or(0)
    }
}

impl fmt::Debug for WindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WindowHandle({:#x})", self.id())
    }
}

impl fmt::Display for WindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "window@{:#x}", self.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use raw_window_handle::WebWindowHandle;

    fn fake(addr: usize) -> WindowHandle {
        let ptr = NonNull::new(addr as *mut c_void).unwrap();
        unsafe { WindowHandle::from_android(ptr) }
    }

    #[test]
    fn test_identity() {
        let a = fake(0x1000);
        let b = fake(0x2000);
        assert_eq!(a.id(), 0x1000);
        assert_ne!(a, b);
        assert_eq!(a, fake(0x1000));
        assert_eq!(format!("{:?}", a), "WindowHandle(0x1000)");
    }

    #[test]
    fn test_unsupported_platform() {
        let handle = unsafe { WindowHandle::new(RawWindowHandle::Web(WebWindowHandle::new(7))) };
        assert!(matches!(
            handle.native_ptr(),
            Err(BackendError::UnsupportedWindow(_))
        ));
        assert_eq!(handle.id(), 0);
    }
}
