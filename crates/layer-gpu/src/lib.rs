pub mod context;
pub mod format;
pub mod layer_compute;
pub mod layer_pipeline;
pub mod readback;
pub mod renderer;
pub mod texture_array;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GpuError {
    #[error("no suitable GPU adapter found")]
    NoAdapter,

    #[error("failed to create GPU device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),

    #[error("{format:?} needs device features {missing:?}")]
    MissingFeatures {
        format: wgpu::TextureFormat,
        missing: wgpu::Features,
    },

    #[error("{width}x{height} is not a whole number of {format:?} blocks")]
    UnalignedExtent {
        format: wgpu::TextureFormat,
        width: u32,
        height: u32,
    },

    #[error(
        "{width}x{height}x{layers} array exceeds device limits \
         (max {max_dimension} per side, {max_layers} layers)"
    )]
    ExceedsLimits {
        width: u32,
        height: u32,
        layers: u32,
        max_dimension: u32,
        max_layers: u32,
    },

    #[error("{levels} mip levels requested, a {width}x{height} texture has at most {max}")]
    TooManyMips {
        width: u32,
        height: u32,
        levels: u32,
        max: u32,
    },

    #[error("render target must be non-empty (got {width}x{height})")]
    EmptyTarget { width: u32, height: u32 },

    #[error("compute output must be storage-bindable Rgba8Unorm (got {format:?}, {usage:?})")]
    InvalidOutput {
        format: wgpu::TextureFormat,
        usage: wgpu::TextureUsages,
    },

    #[error("compute pass is already running; wait for it before dispatching again")]
    AlreadyRunning,

    #[error("mip level {level}: expected {expected} bytes per layer, got {actual}")]
    LevelSize {
        level: u32,
        expected: usize,
        actual: usize,
    },

    #[error("failed to map readback buffer: {0}")]
    BufferMap(#[from] wgpu::BufferAsyncError),

    #[error("readback buffer callback was dropped")]
    MapCallbackDropped,

    #[error(transparent)]
    Ktx(#[from] layer_core::ktx::KtxError),

    #[error(transparent)]
    Texture(#[from] layer_core::TextureError),
}
