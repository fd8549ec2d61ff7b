use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use winit::{
    application::ApplicationHandler,
    event::{ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

mod app;
mod cli;
mod input;

use app::App;
use cli::{Args, Source};
use input::Key;

/// Map a winit key code to the app's own key type.
fn map_key(code: KeyCode) -> Option<Key> {
    let key = match code {
        KeyCode::Digit0 => Key::Digit(0),
        KeyCode::Digit1 => Key::Digit(1),
        KeyCode::Digit2 => Key::Digit(2),
        KeyCode::Digit3 => Key::Digit(3),
        KeyCode::Digit4 => Key::Digit(4),
        KeyCode::Digit5 => Key::Digit(5),
        KeyCode::Digit6 => Key::Digit(6),
        KeyCode::Digit7 => Key::Digit(7),
        KeyCode::Digit8 => Key::Digit(8),
        KeyCode::Digit9 => Key::Digit(9),
        KeyCode::ArrowLeft => Key::Left,
        KeyCode::ArrowRight => Key::Right,
        KeyCode::Home => Key::Home,
        KeyCode::End => Key::End,
        KeyCode::Space => Key::Space,
        KeyCode::KeyQ => Key::Q,
        KeyCode::Escape => Key::Escape,
        _ => return None,
    };
    Some(key)
}

// ---------------------------------------------------------------------------
// Handler: winit ApplicationHandler
// ---------------------------------------------------------------------------

struct Handler {
    args: Args,
    source: Source,
    window: Option<Arc<Window>>,
    app: Option<App>,
}

impl ApplicationHandler for Handler {
    /// Called once on desktop when the event loop starts.
    /// Creates the window then initialises the wgpu surface.
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        let window_attrs = Window::default_attributes()
            .with_title("layer-view")
            .with_inner_size(winit::dpi::LogicalSize::new(800u32, 800u32));

        let window = match event_loop.create_window(window_attrs) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("failed to create window: {e}");
                event_loop.exit();
                return;
            }
        };
        log::info!("Window created (800×800)");

        match App::new(Arc::clone(&window), &self.source, &self.args) {
            Ok(app) => self.app = Some(app),
            Err(e) => {
                log::error!("failed to initialise renderer: {e:#}");
                event_loop.exit();
            }
        }
        self.window = Some(window);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested — exiting");
                event_loop.exit();
            }

            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => {
                let Some(app) = &mut self.app else { return };
                let action = map_key(code).and_then(|key| app.on_key_pressed(key));
                if let Some(action) = action {
                    if app.handle_action(action) {
                        log::info!("Quit requested — exiting");
                        event_loop.exit();
                    }
                }
            }

            WindowEvent::Resized(new_size) => {
                if let Some(app) = &mut self.app {
                    app.resize(new_size.width, new_size.height);
                }
            }

            WindowEvent::RedrawRequested => {
                if let Some(app) = &mut self.app {
                    match app.render() {
                        Ok(()) => {}
                        // Surface lost / outdated: reconfigure and try again next frame.
                        Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                            if let Some(window) = &self.window {
                                let size = window.inner_size();
                                app.resize(size.width, size.height);
                            }
                        }
                        Err(wgpu::SurfaceError::OutOfMemory) => {
                            log::error!("GPU out of memory — exiting");
                            event_loop.exit();
                        }
                        Err(e) => log::warn!("render error: {e:?}"),
                    }
                }
            }

            _ => {}
        }
    }

    /// Drive continuous redraws so cycling advances without input.
    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = Args::parse();
    let source = Source::load(&args)?;

    if let Some(path) = &args.dump {
        let array = source.to_texture_array()?;
        let bytes = layer_core::ktx::write_rgba8(&array, false);
        std::fs::write(path, &bytes).with_context(|| format!("writing {}", path.display()))?;
        log::info!(
            "Wrote {} ({} layers, {} bytes)",
            path.display(),
            array.layer_count(),
            bytes.len()
        );
        return Ok(());
    }

    log::info!("Loaded {} with {} layers", source.describe(), source.layer_count());

    let event_loop = EventLoop::new().context("failed to create event loop")?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut handler = Handler {
        args,
        source,
        window: None,
        app: None,
    };
    event_loop.run_app(&mut handler).context("event loop error")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_row_maps_to_digits() {
        assert_eq!(map_key(KeyCode::Digit3), Some(Key::Digit(3)));
        assert_eq!(map_key(KeyCode::Digit0), Some(Key::Digit(0)));
    }

    #[test]
    fn unmapped_keys_are_ignored() {
        assert_eq!(map_key(KeyCode::KeyZ), None);
    }
}
