//! Error types for glyphtrail.
//!
//! Engine operations themselves never fail: a missing surface or a malformed
//! value degrades to a skipped draw. These types cover the fallible edges
//! around the engine: loading configuration, bringing up the GPU and the
//! window, and exporting frames.

use std::path::PathBuf;

/// Errors raised while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid color '{0}', expected #rgb, #rrggbb or #rrggbbaa")]
    InvalidColor(String),
    #[error("Invalid config value for {field}: {reason}")]
    Invalid {
        field: &'static str,
        reason: String,
    },
    #[error("Failed to load font {path}: {reason}")]
    Font { path: PathBuf, reason: String },
}

/// Errors that can occur during GPU initialization.
#[derive(Debug, thiserror::Error)]
pub enum GpuError {
    #[error("Failed to create GPU surface: {0}")]
    SurfaceCreation(#[from] wgpu::CreateSurfaceError),
    #[error("No compatible GPU adapter found: {0}")]
    NoAdapter(#[from] wgpu::RequestAdapterError),
    #[error("Failed to create GPU device: {0}")]
    DeviceCreation(#[from] wgpu::RequestDeviceError),
}

/// Errors that can occur when running the effects.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("Failed to create event loop: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
    #[error("Failed to create window: {0}")]
    Window(#[from] winit::error::OsError),
    #[error("GPU error: {0}")]
    Gpu(#[from] GpuError),
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("Failed to write frame to {path}: {source}")]
    Export {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}
