//! Headless render tests. Each test skips (with a message) when the machine
//! has no usable GPU adapter.

use glam::Vec4;
use layer_core::ktx::{self, KtxFile};
use layer_core::patterns::Pattern;
use layer_core::{DebugParams, LayerSampler, SamplerConfig, TextureArray};
use layer_gpu::context::GpuContext;
use layer_gpu::layer_compute::{LayerComputePass, OUTPUT_FORMAT};
use layer_gpu::layer_pipeline::LayerDebugPass;
use layer_gpu::readback::{compute_layer, render_layer, READBACK_FORMAT};
use layer_gpu::texture_array::GpuTextureArray;
use layer_gpu::GpuError;

fn context() -> Option<GpuContext> {
    match pollster::block_on(GpuContext::new_headless()) {
        Ok(ctx) => Some(ctx),
        Err(e) => {
            eprintln!("skipping GPU test: {e}");
            None
        }
    }
}

fn to_rgba8(c: Vec4) -> [u8; 4] {
    c.to_array().map(|v| (v.clamp(0.0, 1.0) * 255.0).round() as u8)
}

#[test]
fn layer_two_of_primaries_is_blue() {
    let Some(ctx) = context() else { return };
    let array = Pattern::Primaries.build(4, 4).unwrap();
    let texture = GpuTextureArray::from_cpu(&ctx.device, &ctx.queue, &array, false).unwrap();
    let pass = LayerDebugPass::new(&ctx.device, READBACK_FORMAT, &SamplerConfig::nearest_clamp());

    let pixels = render_layer(&ctx, &pass, &texture, &DebugParams::new(2.0), 8, 8).unwrap();
    assert_eq!(pixels.len(), 64);
    assert!(pixels.iter().all(|p| *p == [0, 0, 255, 255]), "{pixels:?}");
}

#[test]
fn every_layer_shows_its_own_color() {
    let Some(ctx) = context() else { return };
    let array = Pattern::Primaries.build(4, 4).unwrap();
    let texture = GpuTextureArray::from_cpu(&ctx.device, &ctx.queue, &array, false).unwrap();
    let pass = LayerDebugPass::new(&ctx.device, READBACK_FORMAT, &SamplerConfig::nearest_clamp());

    let expected = [
        [255, 0, 0, 255],
        [0, 255, 0, 255],
        [0, 0, 255, 255],
        [255, 255, 255, 255],
    ];
    for (k, color) in expected.into_iter().enumerate() {
        let pixels =
            render_layer(&ctx, &pass, &texture, &DebugParams::for_layer(k as u32), 4, 4).unwrap();
        assert!(pixels.iter().all(|p| *p == color), "layer {k}: {pixels:?}");
    }
}

#[test]
fn fractional_layer_rounds_like_the_cpu_model() {
    let Some(ctx) = context() else { return };
    let array = Pattern::Primaries.build(4, 4).unwrap();
    let texture = GpuTextureArray::from_cpu(&ctx.device, &ctx.queue, &array, false).unwrap();
    let pass = LayerDebugPass::new(&ctx.device, READBACK_FORMAT, &SamplerConfig::nearest_clamp());

    let pixels = render_layer(&ctx, &pass, &texture, &DebugParams::new(1.4), 2, 2).unwrap();
    assert!(pixels.iter().all(|p| *p == [0, 255, 0, 255]), "{pixels:?}");
}

#[test]
fn half_layer_ties_round_to_even_like_the_cpu_model() {
    let Some(ctx) = context() else { return };
    let array = Pattern::Primaries.build(4, 4).unwrap();
    let texture = GpuTextureArray::from_cpu(&ctx.device, &ctx.queue, &array, false).unwrap();
    let sampler = SamplerConfig::nearest_clamp();
    let pass = LayerDebugPass::new(&ctx.device, READBACK_FORMAT, &sampler);
    let reference = LayerSampler::new(&array, sampler);

    // 0.5 -> 0, 1.5 -> 2, 2.5 -> 2
    for (layer, color) in [
        (0.5, [255, 0, 0, 255]),
        (1.5, [0, 0, 255, 255]),
        (2.5, [0, 0, 255, 255]),
    ] {
        let params = DebugParams::new(layer);
        let gpu = render_layer(&ctx, &pass, &texture, &params, 2, 2).unwrap();
        let cpu: Vec<_> = reference
            .render(2, 2, &params)
            .into_iter()
            .map(to_rgba8)
            .collect();
        assert!(gpu.iter().all(|p| *p == color), "layer {layer}: {gpu:?}");
        assert_eq!(gpu, cpu, "layer {layer}");
    }
}

#[test]
fn arrays_beyond_device_limits_are_an_error() {
    let Some(ctx) = context() else { return };
    let layers = ctx.device.limits().max_texture_array_layers + 1;
    let array = TextureArray::new(1, 1, layers).unwrap();
    let err = GpuTextureArray::from_cpu(&ctx.device, &ctx.queue, &array, false)
        .err()
        .expect("oversized array should be rejected");
    assert!(matches!(err, GpuError::ExceedsLimits { .. }), "{err}");
}

#[test]
fn overlong_mip_chains_are_an_error() {
    let Some(ctx) = context() else { return };
    let mut array = TextureArray::new(1, 1, 1).unwrap();
    array
        .push_level(vec![layer_core::MipImage::new(1, 1, Vec4::ONE)])
        .unwrap();
    let err = GpuTextureArray::from_cpu(&ctx.device, &ctx.queue, &array, false)
        .err()
        .expect("two levels on a 1x1 texture should be rejected");
    assert!(
        matches!(err, GpuError::TooManyMips { levels: 2, max: 1, .. }),
        "{err}"
    );
}

#[test]
fn zero_sized_readback_is_an_error() {
    let Some(ctx) = context() else { return };
    let array = Pattern::Primaries.build(4, 4).unwrap();
    let texture = GpuTextureArray::from_cpu(&ctx.device, &ctx.queue, &array, false).unwrap();
    let pass = LayerDebugPass::new(&ctx.device, READBACK_FORMAT, &SamplerConfig::nearest_clamp());

    let err = render_layer(&ctx, &pass, &texture, &DebugParams::new(0.0), 0, 4).unwrap_err();
    assert!(matches!(err, GpuError::EmptyTarget { width: 0, height: 4 }), "{err}");
}

#[test]
fn gpu_matches_cpu_reference_texel_for_texel() {
    let Some(ctx) = context() else { return };
    let array = Pattern::UvGradient.build(16, 16).unwrap();
    let texture = GpuTextureArray::from_cpu(&ctx.device, &ctx.queue, &array, false).unwrap();
    let sampler = SamplerConfig::nearest_clamp();
    let pass = LayerDebugPass::new(&ctx.device, READBACK_FORMAT, &sampler);
    let reference = LayerSampler::new(&array, sampler);

    for layer in 0..array.layer_count() {
        let params = DebugParams::for_layer(layer);
        let gpu = render_layer(&ctx, &pass, &texture, &params, 16, 16).unwrap();
        let cpu: Vec<_> = reference
            .render(16, 16, &params)
            .into_iter()
            .map(to_rgba8)
            .collect();
        assert_eq!(gpu, cpu, "layer {layer}");
    }
}

#[test]
fn minified_draw_still_shows_level_zero() {
    let Some(ctx) = context() else { return };
    let array = Pattern::MipTint.build(64, 64).unwrap();
    let texture = GpuTextureArray::from_cpu(&ctx.device, &ctx.queue, &array, false).unwrap();
    let pass = LayerDebugPass::new(&ctx.device, READBACK_FORMAT, &SamplerConfig::linear_clamp());

    // 64x64 texture on a 4x4 target: derivative-based LOD would pick level 4.
    let pixels = render_layer(&ctx, &pass, &texture, &DebugParams::new(1.0), 4, 4).unwrap();
    assert!(pixels.iter().all(|p| *p == [0, 255, 0, 255]), "{pixels:?}");
}

#[test]
fn ktx_round_trip_uploads_and_renders() {
    let Some(ctx) = context() else { return };
    let colors = [
        Vec4::new(1.0, 0.0, 0.0, 1.0),
        Vec4::new(0.0, 1.0, 0.0, 1.0),
    ];
    let mut array = TextureArray::from_solid_layers(8, 8, &colors).unwrap();
    array.generate_mips();
    let file = KtxFile::parse(&ktx::write_rgba8(&array, false)).unwrap();

    let texture = GpuTextureArray::from_ktx(&ctx.device, &ctx.queue, &file).unwrap();
    assert_eq!(texture.layer_count, 2);
    assert_eq!(texture.mip_level_count, 4);

    let pass = LayerDebugPass::new(&ctx.device, READBACK_FORMAT, &SamplerConfig::nearest_clamp());
    let pixels = render_layer(&ctx, &pass, &texture, &DebugParams::new(1.0), 4, 4).unwrap();
    assert!(pixels.iter().all(|p| *p == [0, 255, 0, 255]), "{pixels:?}");
}

#[test]
fn compute_pass_matches_render_pass() {
    let Some(ctx) = context() else { return };
    let array = Pattern::UvGradient.build(16, 16).unwrap();
    let texture = GpuTextureArray::from_cpu(&ctx.device, &ctx.queue, &array, false).unwrap();
    let sampler = SamplerConfig::nearest_clamp();
    let render = LayerDebugPass::new(&ctx.device, READBACK_FORMAT, &sampler);
    let mut compute = LayerComputePass::new(&ctx.device, &sampler);

    // 12x12 is not a whole number of 8x8 workgroups.
    for layer in 0..array.layer_count() {
        let params = DebugParams::for_layer(layer);
        let drawn = render_layer(&ctx, &render, &texture, &params, 12, 12).unwrap();
        let computed = compute_layer(&ctx, &mut compute, &texture, &params, 12, 12).unwrap();
        assert_eq!(computed, drawn, "layer {layer}");
    }
    assert!(!compute.is_running());
}

#[test]
fn compute_pass_rejects_a_second_run_until_waited() {
    let Some(ctx) = context() else { return };
    let array = Pattern::Primaries.build(4, 4).unwrap();
    let texture = GpuTextureArray::from_cpu(&ctx.device, &ctx.queue, &array, false).unwrap();
    let mut pass = LayerComputePass::new(&ctx.device, &SamplerConfig::nearest_clamp());
    let output = ctx.device.create_texture(&wgpu::TextureDescriptor {
        label: Some("compute_output"),
        size: wgpu::Extent3d {
            width: 4,
            height: 4,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: OUTPUT_FORMAT,
        usage: wgpu::TextureUsages::STORAGE_BINDING,
        view_formats: &[],
    });
    let params = DebugParams::new(2.0);

    pass.run(&ctx.device, &ctx.queue, &texture, &params, &output).unwrap();
    assert!(pass.is_running());
    assert!(matches!(
        pass.run(&ctx.device, &ctx.queue, &texture, &params, &output),
        Err(GpuError::AlreadyRunning)
    ));

    pass.wait(&ctx.device);
    assert!(!pass.is_running());
    pass.run(&ctx.device, &ctx.queue, &texture, &params, &output).unwrap();
    pass.wait(&ctx.device);
}

#[test]
fn compute_pass_rejects_non_storage_output() {
    let Some(ctx) = context() else { return };
    let array = Pattern::Primaries.build(4, 4).unwrap();
    let texture = GpuTextureArray::from_cpu(&ctx.device, &ctx.queue, &array, false).unwrap();
    let mut pass = LayerComputePass::new(&ctx.device, &SamplerConfig::nearest_clamp());
    let output = ctx.device.create_texture(&wgpu::TextureDescriptor {
        label: Some("not_storage"),
        size: wgpu::Extent3d {
            width: 4,
            height: 4,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: OUTPUT_FORMAT,
        usage: wgpu::TextureUsages::TEXTURE_BINDING,
        view_formats: &[],
    });

    let err = pass
        .run(&ctx.device, &ctx.queue, &texture, &DebugParams::new(0.0), &output)
        .unwrap_err();
    assert!(matches!(err, GpuError::InvalidOutput { .. }), "{err}");
    assert!(!pass.is_running());
}
