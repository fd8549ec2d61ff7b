/// Layer debug shader: a full-screen quad vertex stage (`vs_main`) and the
/// layer sampler fragment stage (`fs_main`).
///
/// The vertex shader generates the quad from vertex indices (no vertex
/// buffer needed). The fragment shader fetches the selected layer at mip
/// level 0 and returns it unmodified.
pub const LAYER_DEBUG_WGSL: &str = include_str!("../shaders/layer_debug.wgsl");

pub const VERTEX_ENTRY: &str = "vs_main";
pub const FRAGMENT_ENTRY: &str = "fs_main";

/// Compute form of the same lookup, writing straight into a storage image.
pub const LAYER_COMPUTE_WGSL: &str = include_str!("../shaders/layer_debug_compute.wgsl");

pub const COMPUTE_ENTRY: &str = "cs_main";

/// Workgroup edge in `layer_debug_compute.wgsl` (8x8 invocations).
pub const WORKGROUP_SIZE: u32 = 8;

/// Vertices per full-screen draw (two triangles).
pub const QUAD_VERTICES: u32 = 6;

/// Bind group 0 slots used by the shader.
pub mod bindings {
    pub const TEXTURE_ARRAY: u32 = 1;
    pub const PARAMS: u32 = 2;
    pub const SAMPLER: u32 = 3;
    /// Compute pass only: `texture_storage_2d<rgba8unorm, write>`.
    pub const OUTPUT: u32 = 4;
}
