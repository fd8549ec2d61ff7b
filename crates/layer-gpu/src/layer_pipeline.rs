use layer_core::{AddressMode, DebugParams, FilterMode, SamplerConfig};
use wgpu::{BindGroup, BindGroupLayout, Buffer, Device, Queue, RenderPipeline, Sampler};

use crate::context::DebugUniforms;
use crate::renderer::{bindings, FRAGMENT_ENTRY, LAYER_DEBUG_WGSL, QUAD_VERTICES, VERTEX_ENTRY};
use crate::texture_array::GpuTextureArray;

fn address_mode(mode: AddressMode) -> wgpu::AddressMode {
    match mode {
        AddressMode::ClampToEdge => wgpu::AddressMode::ClampToEdge,
        AddressMode::Repeat => wgpu::AddressMode::Repeat,
        AddressMode::MirrorRepeat => wgpu::AddressMode::MirrorRepeat,
    }
}

fn filter_mode(mode: FilterMode) -> wgpu::FilterMode {
    match mode {
        FilterMode::Nearest => wgpu::FilterMode::Nearest,
        FilterMode::Linear => wgpu::FilterMode::Linear,
    }
}

/// Layout of the three source slots shared by the render and compute passes:
/// - binding 1 : texture_2d_array<f32>
/// - binding 2 : DebugParams uniform buffer
/// - binding 3 : sampler
pub(crate) fn source_layout_entries(
    visibility: wgpu::ShaderStages,
) -> [wgpu::BindGroupLayoutEntry; 3] {
    [
        wgpu::BindGroupLayoutEntry {
            binding: bindings::TEXTURE_ARRAY,
            visibility,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2Array,
                multisampled: false,
            },
            count: None,
        },
        wgpu::BindGroupLayoutEntry {
            binding: bindings::PARAMS,
            visibility,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        },
        wgpu::BindGroupLayoutEntry {
            binding: bindings::SAMPLER,
            visibility,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        },
    ]
}

pub(crate) fn source_entries<'a>(
    texture: &'a GpuTextureArray,
    uniform_buf: &'a Buffer,
    sampler: &'a Sampler,
) -> [wgpu::BindGroupEntry<'a>; 3] {
    [
        wgpu::BindGroupEntry {
            binding: bindings::TEXTURE_ARRAY,
            resource: wgpu::BindingResource::TextureView(&texture.view),
        },
        wgpu::BindGroupEntry {
            binding: bindings::PARAMS,
            resource: uniform_buf.as_entire_binding(),
        },
        wgpu::BindGroupEntry {
            binding: bindings::SAMPLER,
            resource: wgpu::BindingResource::Sampler(sampler),
        },
    ]
}

pub(crate) fn create_uniform_buffer(device: &Device, label: &str) -> Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size: std::mem::size_of::<DebugUniforms>() as u64,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

pub(crate) fn create_sampler(device: &Device, config: &SamplerConfig) -> Sampler {
    // Mip filtering is irrelevant: both passes fetch level 0 only.
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("layer_sampler"),
        address_mode_u: address_mode(config.address_mode_u),
        address_mode_v: address_mode(config.address_mode_v),
        mag_filter: filter_mode(config.mag_filter),
        min_filter: filter_mode(config.min_filter),
        mipmap_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    })
}

/// Render pipeline for the layer debug view plus the resources it owns: the
/// bind group layout, the parameter uniform buffer, and the sampler.
///
/// The texture array itself is supplied per draw through [`Self::bind`].
pub struct LayerDebugPass {
    pipeline: RenderPipeline,
    bind_group_layout: BindGroupLayout,
    uniform_buf: Buffer,
    sampler: Sampler,
    pub target_format: wgpu::TextureFormat,
}

impl LayerDebugPass {
    pub fn new(
        device: &Device,
        target_format: wgpu::TextureFormat,
        sampler_config: &SamplerConfig,
    ) -> Self {
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("layer_debug_bgl"),
            entries: &source_layout_entries(wgpu::ShaderStages::FRAGMENT),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("layer_debug_pl"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let uniform_buf = create_uniform_buffer(device, "layer_debug_uniforms");
        let sampler = create_sampler(device, sampler_config);

        // --- pipeline ----------------------------------------------------------
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("layer_debug"),
            source: wgpu::ShaderSource::Wgsl(LAYER_DEBUG_WGSL.into()),
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("layer_debug_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: VERTEX_ENTRY,
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: FRAGMENT_ENTRY,
                targets: &[Some(wgpu::ColorTargetState {
                    format: target_format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        log::debug!(
            "layer debug pipeline created for {:?} ({:?})",
            target_format,
            sampler_config
        );

        Self {
            pipeline,
            bind_group_layout,
            uniform_buf,
            sampler,
            target_format,
        }
    }

    /// Upload the parameter block. Call between draws only.
    pub fn set_layer(&self, queue: &Queue, params: &DebugParams) {
        let uniforms = DebugUniforms::from(params);
        queue.write_buffer(&self.uniform_buf, 0, bytemuck::bytes_of(&uniforms));
    }

    pub fn bind(&self, device: &Device, texture: &GpuTextureArray) -> BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("layer_debug_bg"),
            layout: &self.bind_group_layout,
            entries: &source_entries(texture, &self.uniform_buf, &self.sampler),
        })
    }

    /// Record one full-screen pass drawing the selected layer into `target`.
    pub fn draw(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        bind_group: &BindGroup,
    ) {
        let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("layer_debug_pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        rpass.set_pipeline(&self.pipeline);
        rpass.set_bind_group(0, bind_group, &[]);
        rpass.draw(0..QUAD_VERTICES, 0..1);
    }
}
