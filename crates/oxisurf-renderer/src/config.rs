//! Renderer Configuration
//!
//! Controls the render thread, the view 0 clear state and the debug
//! overlay. Loadable from TOML; every field has a default.

use oxisurf_gfx::{Rgba, SurfaceAttribs};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One line of debug overlay text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlayLine {
    /// Column in debug-font cells
    pub x: u16,
    /// Row in debug-font cells
    pub y: u16,
    /// VGA-style attribute byte (background << 4 | foreground)
    pub attr: u8,
    pub text: String,
}

impl OverlayLine {
    pub fn new(x: u16, y: u16, attr: u8, text: impl Into<String>) -> Self {
        Self {
            x,
            y,
            attr,
            text: text.into(),
        }
    }
}

/// Complete renderer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Name given to the render thread
    pub thread_name: String,

    /// Reset the back buffer with vsync
    pub vsync: bool,

    /// Enable the engine's debug text overlay
    pub debug_text: bool,

    /// View 0 clear color
    pub clear_color: Rgba,

    /// View 0 clear depth (0.0 - 1.0)
    pub clear_depth: f32,

    /// View 0 clear stencil value
    pub clear_stencil: u8,

    /// Config selection constraints
    pub surface: SurfaceAttribs,

    /// Debug overlay lines printed every frame
    pub overlay: Vec<OverlayLine>,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            thread_name: String::from("oxisurf-render"),
            vsync: true,
            debug_text: true,
            clear_color: Rgba::PLUM,
            clear_depth: 1.0,
            clear_stencil: 0,
            surface: SurfaceAttribs::default(),
            overlay: vec![
                OverlayLine::new(0, 1, 0x4f, "oxisurf/hello-surface"),
                OverlayLine::new(0, 2, 0x6f, "Description: Initialization and debug text."),
            ],
        }
    }
}

impl RendererConfig {
    /// Parse a TOML document and validate it.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.thread_name.trim().is_empty() {
            return Err(ConfigError::EmptyThreadName);
        }
        for (channel, bits) in [
            ("red", self.surface.red_bits),
            ("green", self.surface.green_bits),
            ("blue", self.surface.blue_bits),
        ] {
            if bits == 0 || bits > 8 {
                return Err(ConfigError::ChannelBits { channel, bits });
            }
        }
        if !(0.0..=1.0).contains(&self.clear_depth) {
            return Err(ConfigError::ClearDepth(self.clear_depth));
        }
        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid renderer config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Render thread name is empty")]
    EmptyThreadName,

    #[error("Unsupported {channel} channel size: {bits} bits (expected 1-8)")]
    ChannelBits { channel: &'static str, bits: u8 },

    #[error("Clear depth {0} outside 0.0-1.0")]
    ClearDepth(f32),
}
