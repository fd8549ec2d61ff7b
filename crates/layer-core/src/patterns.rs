use glam::Vec4;

use crate::texture::{TextureArray, TextureError};

const RED: Vec4 = Vec4::new(1.0, 0.0, 0.0, 1.0);
const GREEN: Vec4 = Vec4::new(0.0, 1.0, 0.0, 1.0);
const BLUE: Vec4 = Vec4::new(0.0, 0.0, 1.0, 1.0);
const WHITE: Vec4 = Vec4::ONE;

/// Built-in texture arrays for exercising the layer view without a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pattern {
    /// Red, green, blue, white, one solid color per layer.
    Primaries,
    /// Per-layer tinted checkerboards.
    Checker,
    /// Texel-center UV in red/green; layer 1 is mirrored.
    UvGradient,
    /// Solid layers whose lower mips are painted a different tint.
    MipTint,
}

impl Pattern {
    pub const ALL: [Pattern; 4] = [
        Pattern::Primaries,
        Pattern::Checker,
        Pattern::UvGradient,
        Pattern::MipTint,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Pattern::Primaries => "primaries",
            Pattern::Checker => "checker",
            Pattern::UvGradient => "uv-gradient",
            Pattern::MipTint => "mip-tint",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }

    pub fn layer_count(self) -> u32 {
        match self {
            Pattern::Primaries | Pattern::Checker => 4,
            Pattern::UvGradient => 2,
            Pattern::MipTint => 3,
        }
    }

    pub fn build(self, width: u32, height: u32) -> Result<TextureArray, TextureError> {
        match self {
            Pattern::Primaries => {
                TextureArray::from_solid_layers(width, height, &[RED, GREEN, BLUE, WHITE])
            }
            Pattern::Checker => {
                let tints = [RED, GREEN, BLUE, WHITE];
                let mut array = TextureArray::new(width, height, 4)?;
                let cell_w = (width / 8).max(1);
                let cell_h = (height / 8).max(1);
                for (layer, tint) in tints.into_iter().enumerate() {
                    if let Some(base) = array.level_mut(layer as u32, 0) {
                        for y in 0..height {
                            for x in 0..width {
                                let dark = ((x / cell_w) + (y / cell_h)) % 2 == 1;
                                let color = if dark { tint * 0.25 } else { tint };
                                base.set_texel(x, y, color.truncate().extend(1.0));
                            }
                        }
                    }
                }
                Ok(array)
            }
            Pattern::UvGradient => {
                let mut array = TextureArray::new(width, height, 2)?;
                for layer in 0..2u32 {
                    if let Some(base) = array.level_mut(layer, 0) {
                        for y in 0..height {
                            for x in 0..width {
                                let u = (x as f32 + 0.5) / width as f32;
                                let v = (y as f32 + 0.5) / height as f32;
                                let (u, v) = if layer == 0 { (u, v) } else { (1.0 - u, 1.0 - v) };
                                base.set_texel(x, y, Vec4::new(u, v, 0.0, 1.0));
                            }
                        }
                    }
                }
                Ok(array)
            }
            Pattern::MipTint => {
                let mut array = TextureArray::from_solid_layers(width, height, &[RED, GREEN, BLUE])?;
                array.generate_mips();
                let tint = Vec4::new(1.0, 0.0, 1.0, 1.0);
                for layer in 0..array.layer_count() {
                    for level in 1..array.mip_level_count() {
                        if let Some(image) = array.level_mut(layer, level) {
                            image.fill(tint);
                        }
                    }
                }
                Ok(array)
            }
        }
    }
}
