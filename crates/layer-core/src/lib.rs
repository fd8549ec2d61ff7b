pub mod ktx;
pub mod patterns;
pub mod sampler;
pub mod texture;
pub mod view;

pub use sampler::{AddressMode, FilterMode, LayerSampler, SamplerConfig};
pub use texture::{MipImage, TextureArray, TextureError};

// ---------------------------------------------------------------------------
// DebugParams: the per-draw parameter block read by the layer sampler
// ---------------------------------------------------------------------------

/// Parameters for one debug draw.
///
/// `layer` is an array index carried as a float, the same way the GPU uniform
/// block stores it. It is converted to an index only at fetch time.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DebugParams {
    pub layer: f32,
}

impl DebugParams {
    pub fn new(layer: f32) -> Self {
        Self { layer }
    }

    pub fn for_layer(index: u32) -> Self {
        Self {
            layer: index as f32,
        }
    }
}
