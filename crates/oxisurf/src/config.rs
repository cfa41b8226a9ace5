//! Demo configuration file.

use anyhow::{Context, Result};
use oxisurf_gfx::headless::HeadlessConfig;
use oxisurf_renderer::RendererConfig;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Simulated window lifecycle
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// How long each window stays attached
    pub visible_ms: u64,
    /// Gap between a detach and the next attach
    pub hidden_ms: u64,
    /// Number of attach/detach cycles before shutdown
    pub cycles: u32,
}

impl LifecycleConfig {
    pub fn visible(&self) -> Duration {
        Duration::from_millis(self.visible_ms)
    }

    pub fn hidden(&self) -> Duration {
        Duration::from_millis(self.hidden_ms)
    }
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            visible_ms: 500,
            hidden_ms: 100,
            cycles: 2,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub renderer: RendererConfig,
    pub headless: HeadlessConfig,
    pub lifecycle: LifecycleConfig,
}

impl AppConfig {
    /// Load from `path`, or use defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config: Self = match path {
            Some(path) => {
                let source = std::fs::read_to_string(path)
                    .with_context(|| format!("reading {}", path.display()))?;
                toml::from_str(&source).with_context(|| format!("parsing {}", path.display()))?
            }
            None => Self::default(),
        };
        config.renderer.validate()?;
        Ok(config)
    }
}
