use layer_core::DebugParams;

use crate::context::GpuContext;
use crate::layer_compute::LayerComputePass;
use crate::layer_pipeline::LayerDebugPass;
use crate::texture_array::GpuTextureArray;
use crate::GpuError;

/// Format of the offscreen target; `pass` must have been built for it.
pub const READBACK_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Row stride of the staging buffer: 4 bytes per pixel, padded to wgpu's
/// copy alignment.
pub fn padded_bytes_per_row(width: u32) -> u32 {
    let unpadded = width * 4;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    unpadded.div_ceil(align) * align
}

/// Draw `layer` of `texture` into a `width` x `height` offscreen target and
/// read the pixels back, row 0 at the top, tightly packed.
pub fn render_layer(
    ctx: &GpuContext,
    pass: &LayerDebugPass,
    texture: &GpuTextureArray,
    params: &DebugParams,
    width: u32,
    height: u32,
) -> Result<Vec<[u8; 4]>, GpuError> {
    let device = &ctx.device;
    let target = create_target(
        device,
        "readback_target",
        width,
        height,
        wgpu::TextureUsages::RENDER_ATTACHMENT,
    )?;
    let target_view = target.create_view(&Default::default());

    pass.set_layer(&ctx.queue, params);
    let bind_group = pass.bind(device, texture);

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("readback-encoder"),
    });
    pass.draw(&mut encoder, &target_view, &bind_group);
    let pixels = read_target(ctx, encoder, &target)?;

    log::debug!(
        "read back {}x{} frame of layer {}",
        width,
        height,
        params.layer
    );
    Ok(pixels)
}

/// Same as [`render_layer`] but through the compute pass.
pub fn compute_layer(
    ctx: &GpuContext,
    pass: &mut LayerComputePass,
    texture: &GpuTextureArray,
    params: &DebugParams,
    width: u32,
    height: u32,
) -> Result<Vec<[u8; 4]>, GpuError> {
    let target = create_target(
        &ctx.device,
        "compute_target",
        width,
        height,
        wgpu::TextureUsages::STORAGE_BINDING,
    )?;
    pass.run(&ctx.device, &ctx.queue, texture, params, &target)?;
    pass.wait(&ctx.device);

    let encoder = ctx
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("compute-readback-encoder"),
        });
    read_target(ctx, encoder, &target)
}

/// An `Rgba8Unorm` 2D texture that can be copied out, plus `usage`.
pub(crate) fn create_target(
    device: &wgpu::Device,
    label: &str,
    width: u32,
    height: u32,
    usage: wgpu::TextureUsages,
) -> Result<wgpu::Texture, GpuError> {
    if width == 0 || height == 0 {
        return Err(GpuError::EmptyTarget { width, height });
    }
    let max = device.limits().max_texture_dimension_2d;
    if width > max || height > max {
        return Err(GpuError::ExceedsLimits {
            width,
            height,
            layers: 1,
            max_dimension: max,
            max_layers: device.limits().max_texture_array_layers,
        });
    }
    Ok(device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: READBACK_FORMAT,
        usage: usage | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    }))
}

/// Append a copy of `target` to `encoder`, submit it, and block until the
/// pixels are mapped. Rows come back top first, tightly packed.
pub(crate) fn read_target(
    ctx: &GpuContext,
    mut encoder: wgpu::CommandEncoder,
    target: &wgpu::Texture,
) -> Result<Vec<[u8; 4]>, GpuError> {
    let (width, height) = (target.width(), target.height());
    let stride = padded_bytes_per_row(width);
    let staging = ctx.device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("readback_staging"),
        size: u64::from(stride) * u64::from(height),
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    encoder.copy_texture_to_buffer(
        wgpu::ImageCopyTexture {
            texture: target,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::ImageCopyBuffer {
            buffer: &staging,
            layout: wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(stride),
                rows_per_image: Some(height),
            },
        },
        target.size(),
    );
    ctx.queue.submit(std::iter::once(encoder.finish()));

    let slice = staging.slice(..);
    let (tx, rx) = std::sync::mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    ctx.device.poll(wgpu::Maintain::Wait);
    rx.recv().map_err(|_| GpuError::MapCallbackDropped)??;

    let pixels = {
        let mapped = slice.get_mapped_range();
        mapped
            .chunks_exact(stride as usize)
            .flat_map(|row| {
                row[..width as usize * 4]
                    .chunks_exact(4)
                    .map(|px| [px[0], px[1], px[2], px[3]])
            })
            .collect()
    };
    staging.unmap();
    Ok(pixels)
}
