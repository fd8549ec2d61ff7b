use layer_core::DebugParams;
use wgpu::{Adapter, Device, Instance, Queue};

use crate::GpuError;

pub struct GpuContext {
    pub instance: Instance,
    pub adapter: Adapter,
    pub device: Device,
    pub queue: Queue,
}

impl GpuContext {
    /// Create a headless GPU context (no surface). Used for offscreen
    /// rendering and testing. The windowed variant is created by `layer-app`.
    ///
    /// BC texture compression is enabled when the adapter supports it so
    /// compressed KTX arrays can be uploaded.
    pub async fn new_headless() -> Result<Self, GpuError> {
        let instance = Instance::default();

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or(GpuError::NoAdapter)?;

        log::info!("GPU adapter: {}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("layer-gpu device"),
                    required_features: adapter.features() & wgpu::Features::TEXTURE_COMPRESSION_BC,
                    required_limits: wgpu::Limits::default(),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await?;

        Ok(Self {
            instance,
            adapter,
            device,
            queue,
        })
    }
}

/// The debug parameter block as uploaded to the GPU.
/// Must match the `DebugParams` struct in `layer_debug.wgsl`.
/// `repr(C)` + `bytemuck` ensures safe casting to `&[u8]`.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DebugUniforms {
    pub layer: f32,
    pub _pad: [f32; 3], // uniform buffers are sized in 16-byte steps
}

impl From<&DebugParams> for DebugUniforms {
    fn from(params: &DebugParams) -> Self {
        Self {
            layer: params.layer,
            _pad: [0.0; 3],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniforms_are_sixteen_bytes() {
        assert_eq!(std::mem::size_of::<DebugUniforms>(), 16);
    }

    #[test]
    fn layer_is_first_float() {
        let uniforms = DebugUniforms::from(&DebugParams::new(3.0));
        let bytes = bytemuck::bytes_of(&uniforms);
        assert_eq!(&bytes[..4], &3.0f32.to_ne_bytes());
        assert!(bytes[4..].iter().all(|b| *b == 0));
    }
}
