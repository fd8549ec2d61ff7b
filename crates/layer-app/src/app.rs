use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use layer_core::view::LayerView;
use layer_gpu::layer_pipeline::LayerDebugPass;
use layer_gpu::texture_array::GpuTextureArray;
use winit::window::Window;

use crate::cli::{Args, Source};
use crate::input::{InputAction, InputState, Key};

// ---------------------------------------------------------------------------
// Simple FPS counter: logs to console once per second
// ---------------------------------------------------------------------------

struct FpsCounter {
    frames: u32,
    last_report: Instant,
}

impl FpsCounter {
    fn new() -> Self {
        Self {
            frames: 0,
            last_report: Instant::now(),
        }
    }

    /// Increment the frame count.  Returns the FPS value if a full second has
    /// elapsed since the last report (so the caller can log it).
    fn tick(&mut self) -> Option<f32> {
        self.frames += 1;
        let elapsed = self.last_report.elapsed().as_secs_f32();
        if elapsed >= 1.0 {
            let fps = self.frames as f32 / elapsed;
            self.frames = 0;
            self.last_report = Instant::now();
            Some(fps)
        } else {
            None
        }
    }
}

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

pub struct App {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface_config: wgpu::SurfaceConfiguration,

    pass: LayerDebugPass,
    texture: GpuTextureArray,
    bind_group: wgpu::BindGroup,

    view: LayerView,
    cycle_period: f32,
    source_name: String,
    input: InputState,

    // Frame timing
    last_frame: Instant,
    fps: FpsCounter,
}

impl App {
    /// Initialise wgpu for a given window and upload the texture array.
    /// The window is wrapped in `Arc` so that the surface can safely hold a
    /// `'static` reference to it.
    pub fn new(window: Arc<Window>, source: &Source, args: &Args) -> anyhow::Result<Self> {
        let size = window.inner_size();
        let width = size.width.max(1);
        let height = size.height.max(1);

        // ---- Instance & surface --------------------------------------------
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance
            .create_surface(Arc::clone(&window))
            .context("failed to create wgpu surface")?;

        // ---- Adapter --------------------------------------------------------
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .context("no suitable GPU adapter found")?;

        log::info!("GPU adapter: {}", adapter.get_info().name);

        // ---- Device & Queue -------------------------------------------------
        let required_features = if source.needs_bc_compression() {
            wgpu::Features::TEXTURE_COMPRESSION_BC
        } else {
            wgpu::Features::empty()
        };
        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("layer-app device"),
                required_features,
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
            },
            None,
        ))
        .context("failed to create GPU device")?;

        // ---- Surface configuration ------------------------------------------
        // Prefer a linear format: texels are shown as stored, with no
        // color-space conversion on write.
        let surface_caps = surface.get_capabilities(&adapter);
        let format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| !f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .context("surface reports no formats")?;

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width,
            height,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);
        log::info!(
            "Surface configured: {}×{} {:?} Fifo",
            surface_config.width,
            surface_config.height,
            format
        );

        // ---- Texture array & pass -------------------------------------------
        let texture = match source {
            Source::Pattern(_, array) => {
                GpuTextureArray::from_cpu(&device, &queue, array, false)?
            }
            Source::Ktx(_, file) => GpuTextureArray::from_ktx(&device, &queue, file)?,
        };
        let pass = LayerDebugPass::new(&device, format, &args.sampler_config());
        let bind_group = pass.bind(&device, &texture);

        let mut view = LayerView::new(texture.layer_count);
        view.select(args.layer);
        if args.autoplay {
            view.set_cycle(Some(args.cycle));
        }

        log::info!(
            "Showing {} ({}×{}, {} layers, {} mip levels)",
            source.describe(),
            texture.width,
            texture.height,
            texture.layer_count,
            texture.mip_level_count
        );

        Ok(Self {
            window,
            surface,
            device,
            queue,
            surface_config,
            pass,
            texture,
            bind_group,
            view,
            cycle_period: args.cycle,
            source_name: source.describe(),
            input: InputState::new(),
            last_frame: Instant::now(),
            fps: FpsCounter::new(),
        })
    }

    // -------------------------------------------------------------------------
    // Resize
    // -------------------------------------------------------------------------

    /// Reconfigure the surface. The pipeline and texture are resolution
    /// independent.
    pub fn resize(&mut self, new_width: u32, new_height: u32) {
        if new_width == 0 || new_height == 0 {
            return;
        }
        self.surface_config.width = new_width;
        self.surface_config.height = new_height;
        self.surface.configure(&self.device, &self.surface_config);
        log::debug!("Surface resized to {}×{}", new_width, new_height);
    }

    // -------------------------------------------------------------------------
    // Input: called by main.rs window_event handler
    // -------------------------------------------------------------------------

    pub fn on_key_pressed(&self, key: Key) -> Option<InputAction> {
        self.input.on_key(key)
    }

    /// Apply an action to the view state.
    ///
    /// Returns `true` if the app should exit (i.e. action was `Quit`).
    pub fn handle_action(&mut self, action: InputAction) -> bool {
        match action {
            InputAction::SelectLayer(index) => self.view.select(index),
            InputAction::NextLayer => self.view.next(),
            InputAction::PrevLayer => self.view.prev(),
            InputAction::FirstLayer => self.view.first(),
            InputAction::LastLayer => self.view.last(),
            InputAction::ToggleCycle => {
                let cycle = match self.view.cycle() {
                    Some(_) => None,
                    None => Some(self.cycle_period),
                };
                self.view.set_cycle(cycle);
                log::info!("Cycling {}", if cycle.is_some() { "on" } else { "off" });
            }
            InputAction::Quit => return true,
        }
        false
    }

    // -------------------------------------------------------------------------
    // Render
    // -------------------------------------------------------------------------

    /// Run one frame: advance the view, upload the layer if it changed, draw.
    pub fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        let now = Instant::now();
        let dt = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;
        self.view.tick(dt);

        if let Some(fps) = self.fps.tick() {
            log::debug!(
                "FPS: {:.1}  layer: {}/{}  array: {}×{} {:?}",
                fps,
                self.view.layer(),
                self.view.layer_count(),
                self.texture.width,
                self.texture.height,
                self.texture.format
            );
        }

        // The parameter block only changes between draws.
        if self.view.params_dirty() {
            self.pass.set_layer(&self.queue, &self.view.params());
            self.window.set_title(&format!(
                "layer-view: {} (layer {}/{})",
                self.source_name,
                self.view.layer(),
                self.view.layer_count() - 1
            ));
            log::debug!("layer → {}", self.view.layer());
        }

        let output = self.surface.get_current_texture()?;
        let surface_view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame-encoder"),
            });
        self.pass.draw(&mut encoder, &surface_view, &self.bind_group);

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}
