//! CPU reference model of the layer sampler and the sampling rules it relies
//! on (layer resolution, addressing, filtering).
//!
//! The GPU rendition lives in `layer-gpu/shaders/layer_debug.wgsl`; both must
//! produce the same texel for the same inputs when point sampling.

use glam::{Vec2, Vec4};

use crate::texture::{MipImage, TextureArray};
use crate::DebugParams;

// ---------------------------------------------------------------------------
// Sampler configuration
// ---------------------------------------------------------------------------

/// Texture coordinate wrapping for one axis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AddressMode {
    #[default]
    ClampToEdge,
    Repeat,
    MirrorRepeat,
}

impl AddressMode {
    /// Map a possibly out-of-range texel index into `0..size`.
    pub fn resolve(self, index: i64, size: u32) -> u32 {
        let size = i64::from(size.max(1));
        let i = match self {
            AddressMode::ClampToEdge => index.clamp(0, size - 1),
            AddressMode::Repeat => index.rem_euclid(size),
            AddressMode::MirrorRepeat => {
                let t = index.rem_euclid(2 * size);
                if t >= size {
                    2 * size - 1 - t
                } else {
                    t
                }
            }
        };
        i as u32
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FilterMode {
    /// Point sampling.
    #[default]
    Nearest,
    /// Bilinear blend of the four surrounding texels.
    Linear,
}

/// Addressing and filtering rules, fixed by the host when the sampler is
/// created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SamplerConfig {
    pub address_mode_u: AddressMode,
    pub address_mode_v: AddressMode,
    pub mag_filter: FilterMode,
    pub min_filter: FilterMode,
}

impl SamplerConfig {
    pub fn new(address_mode: AddressMode, filter: FilterMode) -> Self {
        Self {
            address_mode_u: address_mode,
            address_mode_v: address_mode,
            mag_filter: filter,
            min_filter: filter,
        }
    }

    /// Point sampling, clamp-to-edge on both axes.
    pub fn nearest_clamp() -> Self {
        Self::default()
    }

    pub fn linear_clamp() -> Self {
        Self::new(AddressMode::ClampToEdge, FilterMode::Linear)
    }
}

// ---------------------------------------------------------------------------
// Sampling primitives (pure, testable)
// ---------------------------------------------------------------------------

/// Convert the float layer parameter to an array index the way the sampling
/// hardware does: round half to even, then clamp into the array.
pub fn resolve_layer(layer: f32, layer_count: u32) -> u32 {
    if layer.is_nan() {
        return 0;
    }
    let last = layer_count.saturating_sub(1) as f32;
    layer.round_ties_even().clamp(0.0, last) as u32
}

fn fetch(image: &MipImage, sampler: &SamplerConfig, uv: Vec2, filter: FilterMode) -> Vec4 {
    let (w, h) = (image.width(), image.height());
    let (au, av) = (sampler.address_mode_u, sampler.address_mode_v);

    match filter {
        FilterMode::Nearest => {
            let x = (uv.x * w as f32).floor() as i64;
            let y = (uv.y * h as f32).floor() as i64;
            image.texel(au.resolve(x, w), av.resolve(y, h))
        }
        FilterMode::Linear => {
            let s = uv.x * w as f32 - 0.5;
            let t = uv.y * h as f32 - 0.5;
            let (sx, ty) = (s.floor(), t.floor());
            let (fx, fy) = (s - sx, t - ty);
            let (x0, y0) = (sx as i64, ty as i64);

            let x0r = au.resolve(x0, w);
            let x1r = au.resolve(x0 + 1, w);
            let y0r = av.resolve(y0, h);
            let y1r = av.resolve(y0 + 1, h);

            let top = image.texel(x0r, y0r).lerp(image.texel(x1r, y0r), fx);
            let bottom = image.texel(x0r, y1r).lerp(image.texel(x1r, y1r), fx);
            top.lerp(bottom, fy)
        }
    }
}

/// Sample `(uv, layer)` at an explicit mip `level`.
///
/// Levels past the end of the chain clamp to the smallest level.
pub fn sample_level(
    texture: &TextureArray,
    sampler: &SamplerConfig,
    uv: Vec2,
    layer: f32,
    level: u32,
) -> Vec4 {
    let layer = resolve_layer(layer, texture.layer_count());
    let level = level.min(texture.mip_level_count() - 1);
    let filter = if level == 0 {
        sampler.mag_filter
    } else {
        sampler.min_filter
    };
    match texture.level(layer, level) {
        Some(image) => fetch(image, sampler, uv, filter),
        None => Vec4::ZERO,
    }
}

/// Level of detail implied by the screen-space UV derivatives.
pub fn implicit_lod(texture: &TextureArray, duv_dx: Vec2, duv_dy: Vec2) -> f32 {
    let size = Vec2::new(texture.width() as f32, texture.height() as f32);
    let footprint = (duv_dx * size).length().max((duv_dy * size).length());
    footprint.log2()
}

/// Sample with the level chosen from derivatives, like an implicit-LOD fetch
/// with a nearest mipmap filter.
pub fn sample_grad(
    texture: &TextureArray,
    sampler: &SamplerConfig,
    uv: Vec2,
    layer: f32,
    duv_dx: Vec2,
    duv_dy: Vec2,
) -> Vec4 {
    let lod = implicit_lod(texture, duv_dx, duv_dy);
    let max_level = (texture.mip_level_count() - 1) as f32;
    let level = if lod.is_nan() {
        0
    } else {
        lod.round().clamp(0.0, max_level) as u32
    };
    sample_level(texture, sampler, uv, layer, level)
}

// ---------------------------------------------------------------------------
// LayerSampler
// ---------------------------------------------------------------------------

/// The debug fragment routine: one explicit-LOD-0 fetch per invocation,
/// returned unmodified.
#[derive(Debug, Clone, Copy)]
pub struct LayerSampler<'a> {
    texture: &'a TextureArray,
    sampler: SamplerConfig,
}

impl<'a> LayerSampler<'a> {
    pub fn new(texture: &'a TextureArray, sampler: SamplerConfig) -> Self {
        Self { texture, sampler }
    }

    pub fn texture(&self) -> &'a TextureArray {
        self.texture
    }

    pub fn sampler(&self) -> &SamplerConfig {
        &self.sampler
    }

    pub fn shade(&self, uv: Vec2, params: &DebugParams) -> Vec4 {
        sample_level(self.texture, &self.sampler, uv, params.layer, 0)
    }

    /// Shade every pixel of a `width` x `height` full-screen quad, row 0 at
    /// the top, sampling at pixel centers.
    pub fn render(&self, width: u32, height: u32, params: &DebugParams) -> Vec<Vec4> {
        let mut out = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                let uv = Vec2::new(
                    (x as f32 + 0.5) / width as f32,
                    (y as f32 + 0.5) / height as f32,
                );
                out.push(self.shade(uv, params));
            }
        }
        out
    }
}
