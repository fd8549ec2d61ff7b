use layer_core::ktx::KtxFile;
use layer_core::TextureArray;
use wgpu::{Device, Queue, TextureFormat};

use crate::format::wgpu_format;
use crate::GpuError;

/// A texture array resident on the GPU, always viewed as `D2Array` (even with
/// a single layer) so it matches the `texture_2d_array` binding.
pub struct GpuTextureArray {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub format: TextureFormat,
    pub width: u32,
    pub height: u32,
    pub layer_count: u32,
    pub mip_level_count: u32,
}

/// Reject arrays the device cannot hold before wgpu's validation does.
pub fn check_limits(
    limits: &wgpu::Limits,
    width: u32,
    height: u32,
    layers: u32,
) -> Result<(), GpuError> {
    let max_dimension = limits.max_texture_dimension_2d;
    let max_layers = limits.max_texture_array_layers;
    if width > max_dimension || height > max_dimension || layers > max_layers {
        return Err(GpuError::ExceedsLimits {
            width,
            height,
            layers,
            max_dimension,
            max_layers,
        });
    }
    Ok(())
}

/// Longest mip chain a `width` x `height` texture can have.
pub fn max_mip_levels(width: u32, height: u32) -> u32 {
    32 - width.max(height).max(1).leading_zeros()
}

impl GpuTextureArray {
    fn create(
        device: &Device,
        label: &str,
        format: TextureFormat,
        width: u32,
        height: u32,
        layer_count: u32,
        mip_level_count: u32,
    ) -> Result<Self, GpuError> {
        check_limits(&device.limits(), width, height, layer_count)?;
        let max = max_mip_levels(width, height);
        if mip_level_count > max {
            return Err(GpuError::TooManyMips {
                width,
                height,
                levels: mip_level_count,
                max,
            });
        }
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: layer_count,
            },
            mip_level_count,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some(label),
            dimension: Some(wgpu::TextureViewDimension::D2Array),
            ..Default::default()
        });
        Ok(Self {
            texture,
            view,
            format,
            width,
            height,
            layer_count,
            mip_level_count,
        })
    }

    /// Write one layer of one mip level. `data` must hold exactly the level's
    /// blocks, tightly packed.
    fn write_layer(&self, queue: &Queue, level: u32, layer: u32, data: &[u8]) {
        let size = wgpu::Extent3d {
            width: (self.width >> level).max(1),
            height: (self.height >> level).max(1),
            depth_or_array_layers: 1,
        }
        .physical_size(self.format);
        let (block_w, block_h) = self.format.block_dimensions();
        let block_bytes = self.format.block_copy_size(None).unwrap_or(4);

        queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &self.texture,
                mip_level: level,
                origin: wgpu::Origin3d {
                    x: 0,
                    y: 0,
                    z: layer,
                },
                aspect: wgpu::TextureAspect::All,
            },
            data,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(size.width / block_w * block_bytes),
                rows_per_image: Some(size.height / block_h),
            },
            size,
        );
    }

    /// Upload a CPU texture array as 8-bit RGBA, every layer and level.
    pub fn from_cpu(
        device: &Device,
        queue: &Queue,
        array: &TextureArray,
        srgb: bool,
    ) -> Result<Self, GpuError> {
        let format = if srgb {
            TextureFormat::Rgba8UnormSrgb
        } else {
            TextureFormat::Rgba8Unorm
        };
        let gpu = Self::create(
            device,
            "layer_array",
            format,
            array.width(),
            array.height(),
            array.layer_count(),
            array.mip_level_count(),
        )?;
        for level in 0..array.mip_level_count() {
            for layer in 0..array.layer_count() {
                if let Some(image) = array.level(layer, level) {
                    gpu.write_layer(queue, level, layer, &image.to_rgba8());
                }
            }
        }
        log::debug!(
            "uploaded {}x{} array: {} layers, {} levels, {:?}",
            gpu.width,
            gpu.height,
            gpu.layer_count,
            gpu.mip_level_count,
            format
        );
        Ok(gpu)
    }

    /// Upload a KTX file's level data as-is, in the file's own format.
    pub fn from_ktx(device: &Device, queue: &Queue, file: &KtxFile) -> Result<Self, GpuError> {
        let format = wgpu_format(file.format);
        let missing = format.required_features() - device.features();
        if !missing.is_empty() {
            return Err(GpuError::MissingFeatures { format, missing });
        }
        let (block_w, block_h) = format.block_dimensions();
        if file.width % block_w != 0 || file.height % block_h != 0 {
            return Err(GpuError::UnalignedExtent {
                format,
                width: file.width,
                height: file.height,
            });
        }

        let gpu = Self::create(
            device,
            "ktx_array",
            format,
            file.width,
            file.height,
            file.layer_count,
            file.mip_levels,
        )?;
        let block_bytes = format.block_copy_size(None).unwrap_or(4) as usize;
        for (level, info) in file.levels.iter().enumerate() {
            let level = level as u32;
            let blocks_x = info.width.div_ceil(block_w) as usize;
            let blocks_y = info.height.div_ceil(block_h) as usize;
            let expected = blocks_x * blocks_y * block_bytes;
            for layer in 0..file.layer_count {
                let data = file.layer_data(level, layer).unwrap_or_default();
                if data.len() != expected {
                    return Err(GpuError::LevelSize {
                        level,
                        expected,
                        actual: data.len(),
                    });
                }
                gpu.write_layer(queue, level, layer, data);
            }
        }
        log::debug!(
            "uploaded KTX {}x{} array: {} layers, {} levels, {:?}",
            gpu.width,
            gpu.height,
            gpu.layer_count,
            gpu.mip_level_count,
            format
        );
        Ok(gpu)
    }
}
