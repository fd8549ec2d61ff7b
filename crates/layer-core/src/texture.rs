use glam::Vec4;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum TextureError {
    #[error("texture extent must be non-zero (got {width}x{height})")]
    ZeroExtent { width: u32, height: u32 },

    #[error("a texture array needs at least one layer")]
    NoLayers,

    #[error("layer {layer}: expected {expected} bytes of RGBA8 data, got {actual}")]
    DataLength {
        layer: usize,
        expected: usize,
        actual: usize,
    },

    #[error("mip level {level} is {actual_width}x{actual_height}, expected {width}x{height}")]
    LevelExtent {
        level: u32,
        width: u32,
        height: u32,
        actual_width: u32,
        actual_height: u32,
    },

    #[error("got {actual} images for a {expected}-layer array")]
    LayerCount { expected: u32, actual: usize },
}

/// Extent of mip `level` for a base dimension of `size`.
pub fn mip_extent(size: u32, level: u32) -> u32 {
    size.checked_shr(level).unwrap_or(0).max(1)
}

// ---------------------------------------------------------------------------
// MipImage: one level of one layer, row-major RGBA f32
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct MipImage {
    width: u32,
    height: u32,
    texels: Vec<Vec4>,
}

impl MipImage {
    pub fn new(width: u32, height: u32, fill: Vec4) -> Self {
        Self {
            width,
            height,
            texels: vec![fill; width as usize * height as usize],
        }
    }

    /// Build an image from 8-bit RGBA bytes (`width * height * 4` of them).
    pub fn from_rgba8(width: u32, height: u32, bytes: &[u8]) -> Option<Self> {
        if bytes.len() != width as usize * height as usize * 4 {
            return None;
        }
        let texels = bytes
            .chunks_exact(4)
            .map(|px| {
                Vec4::new(
                    px[0] as f32 / 255.0,
                    px[1] as f32 / 255.0,
                    px[2] as f32 / 255.0,
                    px[3] as f32 / 255.0,
                )
            })
            .collect();
        Some(Self {
            width,
            height,
            texels,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Texel at integer coordinates. Callers resolve addressing first.
    pub fn texel(&self, x: u32, y: u32) -> Vec4 {
        self.texels[(y * self.width + x) as usize]
    }

    pub fn set_texel(&mut self, x: u32, y: u32, value: Vec4) {
        if x < self.width && y < self.height {
            self.texels[(y * self.width + x) as usize] = value;
        }
    }

    pub fn fill(&mut self, value: Vec4) {
        self.texels.fill(value);
    }

    pub fn texels(&self) -> &[Vec4] {
        &self.texels
    }

    /// Quantize to tightly packed 8-bit RGBA, rounding to nearest.
    pub fn to_rgba8(&self) -> Vec<u8> {
        self.texels
            .iter()
            .flat_map(|t| t.to_array())
            .map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8)
            .collect()
    }

    /// 2x2 box-filtered half-size copy.
    fn downsample(&self) -> Self {
        let w = (self.width / 2).max(1);
        let h = (self.height / 2).max(1);
        let mut out = Self::new(w, h, Vec4::ZERO);
        for y in 0..h {
            for x in 0..w {
                let mut sum = Vec4::ZERO;
                for (dx, dy) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
                    let sx = (x * 2 + dx).min(self.width - 1);
                    let sy = (y * 2 + dy).min(self.height - 1);
                    sum += self.texel(sx, sy);
                }
                out.set_texel(x, y, sum * 0.25);
            }
        }
        out
    }
}

// ---------------------------------------------------------------------------
// TextureArray
// ---------------------------------------------------------------------------

/// CPU-side 2D texture array: `layers[layer][level]`.
///
/// Every layer has the same extent and the same number of mip levels.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureArray {
    width: u32,
    height: u32,
    layers: Vec<Vec<MipImage>>,
}

impl TextureArray {
    /// A transparent-black array with only the base level.
    pub fn new(width: u32, height: u32, layer_count: u32) -> Result<Self, TextureError> {
        if width == 0 || height == 0 {
            return Err(TextureError::ZeroExtent { width, height });
        }
        if layer_count == 0 {
            return Err(TextureError::NoLayers);
        }
        let layers = (0..layer_count)
            .map(|_| vec![MipImage::new(width, height, Vec4::ZERO)])
            .collect();
        Ok(Self {
            width,
            height,
            layers,
        })
    }

    /// One layer per color, each filled solid.
    pub fn from_solid_layers(
        width: u32,
        height: u32,
        colors: &[Vec4],
    ) -> Result<Self, TextureError> {
        let mut array = Self::new(width, height, colors.len() as u32)?;
        for (layer, color) in array.layers.iter_mut().zip(colors) {
            layer[0].fill(*color);
        }
        Ok(array)
    }

    /// Base-level data from 8-bit RGBA bytes, one slice per layer.
    pub fn from_rgba8_layers(
        width: u32,
        height: u32,
        layers: &[&[u8]],
    ) -> Result<Self, TextureError> {
        let mut array = Self::new(width, height, layers.len() as u32)?;
        let expected = width as usize * height as usize * 4;
        for (i, bytes) in layers.iter().enumerate() {
            array.layers[i][0] =
                MipImage::from_rgba8(width, height, bytes).ok_or(TextureError::DataLength {
                    layer: i,
                    expected,
                    actual: bytes.len(),
                })?;
        }
        Ok(array)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn layer_count(&self) -> u32 {
        self.layers.len() as u32
    }

    pub fn mip_level_count(&self) -> u32 {
        self.layers[0].len() as u32
    }

    pub fn level(&self, layer: u32, level: u32) -> Option<&MipImage> {
        self.layers.get(layer as usize)?.get(level as usize)
    }

    pub fn level_mut(&mut self, layer: u32, level: u32) -> Option<&mut MipImage> {
        self.layers.get_mut(layer as usize)?.get_mut(level as usize)
    }

    /// Append the next mip level, one image per layer.
    pub fn push_level(&mut self, images: Vec<MipImage>) -> Result<(), TextureError> {
        if images.len() != self.layers.len() {
            return Err(TextureError::LayerCount {
                expected: self.layer_count(),
                actual: images.len(),
            });
        }
        let level = self.mip_level_count();
        let (width, height) = (mip_extent(self.width, level), mip_extent(self.height, level));
        if let Some(bad) = images
            .iter()
            .find(|img| img.width != width || img.height != height)
        {
            return Err(TextureError::LevelExtent {
                level,
                width,
                height,
                actual_width: bad.width,
                actual_height: bad.height,
            });
        }
        for (layer, image) in self.layers.iter_mut().zip(images) {
            layer.push(image);
        }
        Ok(())
    }

    /// Rebuild the full mip chain of every layer from its base level.
    pub fn generate_mips(&mut self) {
        for layer in &mut self.layers {
            layer.truncate(1);
            while let Some(last) = layer.last() {
                if last.width == 1 && last.height == 1 {
                    break;
                }
                let next = last.downsample();
                layer.push(next);
            }
        }
        log::debug!(
            "generated {} mip levels for {}x{}x{} texture array",
            self.mip_level_count(),
            self.width,
            self.height,
            self.layer_count()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_rejects_zero_extent() {
        assert_eq!(
            TextureArray::new(0, 4, 1),
            Err(TextureError::ZeroExtent {
                width: 0,
                height: 4
            })
        );
    }

    #[test]
    fn new_rejects_zero_layers() {
        assert_eq!(TextureArray::new(4, 4, 0), Err(TextureError::NoLayers));
    }

    #[test]
    fn solid_layers_fill_base_level() {
        let colors = [Vec4::new(1.0, 0.0, 0.0, 1.0), Vec4::new(0.0, 1.0, 0.0, 1.0)];
        let array = TextureArray::from_solid_layers(3, 2, &colors).unwrap();
        assert_eq!(array.layer_count(), 2);
        assert_eq!(array.mip_level_count(), 1);
        assert_eq!(array.level(1, 0).unwrap().texel(2, 1), colors[1]);
    }

    #[test]
    fn mip_extent_never_reaches_zero() {
        assert_eq!(mip_extent(8, 0), 8);
        assert_eq!(mip_extent(8, 3), 1);
        assert_eq!(mip_extent(8, 5), 1);
        assert_eq!(mip_extent(5, 1), 2);
        assert_eq!(mip_extent(5, 40), 1);
    }

    #[test]
    fn generate_mips_builds_chain_to_one_texel() {
        let mut array = TextureArray::new(8, 4, 2).unwrap();
        array.generate_mips();
        assert_eq!(array.mip_level_count(), 4);
        let last = array.level(1, 3).unwrap();
        assert_eq!((last.width(), last.height()), (1, 1));
    }

    #[test]
    fn generate_mips_averages_two_by_two() {
        let mut array = TextureArray::new(2, 2, 1).unwrap();
        let base = array.level_mut(0, 0).unwrap();
        base.set_texel(0, 0, Vec4::splat(1.0));
        base.set_texel(1, 1, Vec4::splat(1.0));
        array.generate_mips();
        let top = array.level(0, 1).unwrap().texel(0, 0);
        assert!((top - Vec4::splat(0.5)).abs().max_element() < 1e-6, "got {top}");
    }

    #[test]
    fn rgba8_layers_check_length() {
        let short = [0u8; 7];
        let err = TextureArray::from_rgba8_layers(2, 1, &[&short]).unwrap_err();
        assert_eq!(
            err,
            TextureError::DataLength {
                layer: 0,
                expected: 8,
                actual: 7
            }
        );
    }

    #[test]
    fn rgba8_quantization_is_exact_for_unit_values() {
        let bytes = [255u8, 0, 128, 255];
        let array = TextureArray::from_rgba8_layers(1, 1, &[&bytes]).unwrap();
        assert_eq!(array.level(0, 0).unwrap().to_rgba8(), bytes.to_vec());
    }

    #[test]
    fn push_level_checks_extent() {
        let mut array = TextureArray::new(4, 4, 1).unwrap();
        let wrong = MipImage::new(4, 4, Vec4::ZERO);
        assert!(matches!(
            array.push_level(vec![wrong]),
            Err(TextureError::LevelExtent { level: 1, .. })
        ));
        array
            .push_level(vec![MipImage::new(2, 2, Vec4::ONE)])
            .unwrap();
        assert_eq!(array.mip_level_count(), 2);
    }

    #[test]
    fn push_level_checks_layer_count() {
        let mut array = TextureArray::new(4, 4, 2).unwrap();
        assert_eq!(
            array.push_level(vec![MipImage::new(2, 2, Vec4::ZERO)]),
            Err(TextureError::LayerCount {
                expected: 2,
                actual: 1
            })
        );
    }
}
