//! Backend call errors

use thiserror::Error;

/// A failed call into a display backend or render engine.
///
/// Every variant carries the name of the backend entry point so log lines
/// read like the driver call that failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("{call}() returned error {code:#06x}")]
    Call { call: &'static str, code: i32 },

    #[error("{call}() found no display for the default output")]
    NoDisplay { call: &'static str },

    #[error("{call}() found no config matching the requested attributes")]
    NoMatchingConfig { call: &'static str },

    #[error("unsupported window handle: {0}")]
    UnsupportedWindow(String),

    #[error("backend library unavailable: {0}")]
    Unavailable(String),
}

impl BackendError {
    /// Error for a call that reported a platform error code.
    pub fn call(call: &'static str, code: i32) -> Self {
        Self::Call { call, code }
    }

    /// Platform error code, when the backend reported one.
    pub fn code(&self) -> Option<i32> {
        match self {
            Self::Call { code, .. } => Some(*code),
            _ => None,
        }
    }
}
