use layer_core::{DebugParams, SamplerConfig};
use wgpu::{BindGroupLayout, Buffer, ComputePipeline, Device, Queue, Sampler};

use crate::context::DebugUniforms;
use crate::layer_pipeline::{
    create_sampler, create_uniform_buffer, source_entries, source_layout_entries,
};
use crate::renderer::{bindings, COMPUTE_ENTRY, LAYER_COMPUTE_WGSL, WORKGROUP_SIZE};
use crate::texture_array::GpuTextureArray;
use crate::GpuError;

/// Storage format the compute shader writes.
pub const OUTPUT_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Workgroups needed to cover a `width` x `height` image.
pub fn workgroup_count(width: u32, height: u32) -> (u32, u32) {
    (
        width.div_ceil(WORKGROUP_SIZE),
        height.div_ceil(WORKGROUP_SIZE),
    )
}

/// Compute pipeline that writes the selected layer into a storage image.
///
/// Owns its uniform buffer, so at most one dispatch may be in flight: `run`
/// refuses to record another until `wait` has seen the previous one finish.
pub struct LayerComputePass {
    pipeline: ComputePipeline,
    bind_group_layout: BindGroupLayout,
    uniform_buf: Buffer,
    sampler: Sampler,
    in_flight: Option<wgpu::SubmissionIndex>,
}

impl LayerComputePass {
    pub fn new(device: &Device, sampler_config: &SamplerConfig) -> Self {
        let [texture, params, sampler_entry] = source_layout_entries(wgpu::ShaderStages::COMPUTE);
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("layer_compute_bgl"),
            entries: &[
                texture,
                params,
                sampler_entry,
                wgpu::BindGroupLayoutEntry {
                    binding: bindings::OUTPUT,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::StorageTexture {
                        access: wgpu::StorageTextureAccess::WriteOnly,
                        format: OUTPUT_FORMAT,
                        view_dimension: wgpu::TextureViewDimension::D2,
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("layer_compute_pl"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("layer_debug_compute"),
            source: wgpu::ShaderSource::Wgsl(LAYER_COMPUTE_WGSL.into()),
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("layer_compute_pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: COMPUTE_ENTRY,
            compilation_options: Default::default(),
            cache: None,
        });

        log::debug!("layer compute pipeline created ({:?})", sampler_config);

        Self {
            pipeline,
            bind_group_layout,
            uniform_buf: create_uniform_buffer(device, "layer_compute_uniforms"),
            sampler: create_sampler(device, sampler_config),
            in_flight: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Record and submit one dispatch covering all of `output`.
    ///
    /// `output` must be an `Rgba8Unorm` texture with `STORAGE_BINDING` usage.
    pub fn run(
        &mut self,
        device: &Device,
        queue: &Queue,
        texture: &GpuTextureArray,
        params: &DebugParams,
        output: &wgpu::Texture,
    ) -> Result<(), GpuError> {
        if self.in_flight.is_some() {
            return Err(GpuError::AlreadyRunning);
        }
        if output.format() != OUTPUT_FORMAT
            || !output.usage().contains(wgpu::TextureUsages::STORAGE_BINDING)
        {
            return Err(GpuError::InvalidOutput {
                format: output.format(),
                usage: output.usage(),
            });
        }

        let uniforms = DebugUniforms::from(params);
        queue.write_buffer(&self.uniform_buf, 0, bytemuck::bytes_of(&uniforms));

        let output_view = output.create_view(&Default::default());
        let [t, p, s] = source_entries(texture, &self.uniform_buf, &self.sampler);
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("layer_compute_bg"),
            layout: &self.bind_group_layout,
            entries: &[
                t,
                p,
                s,
                wgpu::BindGroupEntry {
                    binding: bindings::OUTPUT,
                    resource: wgpu::BindingResource::TextureView(&output_view),
                },
            ],
        });

        let (groups_x, groups_y) = workgroup_count(output.width(), output.height());
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("layer-compute-encoder"),
        });
        {
            let mut cpass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("layer_compute_pass"),
                timestamp_writes: None,
            });
            cpass.set_pipeline(&self.pipeline);
            cpass.set_bind_group(0, &bind_group, &[]);
            cpass.dispatch_workgroups(groups_x, groups_y, 1);
        }
        self.in_flight = Some(queue.submit(std::iter::once(encoder.finish())));

        log::debug!(
            "dispatched {}x{} workgroups for layer {}",
            groups_x,
            groups_y,
            params.layer
        );
        Ok(())
    }

    /// Block until the last dispatch has finished. No-op when idle.
    pub fn wait(&mut self, device: &Device) {
        if let Some(index) = self.in_flight.take() {
            device.poll(wgpu::Maintain::wait_for(index));
        }
    }
}
