//! Platform layer: windowing & event loop for the model viewer.
//! winit = 0.30.x (ApplicationHandler)

use std::{path::PathBuf, sync::Arc, time::Instant};

use anyhow::{Context, Result};
use asset::{LoadOptions, Model, ModelLoader};
use corelib::{Mat4, camera::Camera};
use renderer::ModelRenderer;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{Key, NamedKey},
    window::{Window, WindowId},
};

const FOV_Y_DEG: f32 = 45.0;
const SPIN_RADIANS_PER_SEC: f32 = 0.5;

/// Everything the viewer needs to open a window and load one model.
#[derive(Clone, Debug)]
pub struct ViewerConfig {
    pub model_path: PathBuf,
    pub backends: wgpu::Backends,
    pub width: u32,
    pub height: u32,
    pub load_options: LoadOptions,
}

impl ViewerConfig {
    pub fn new(model_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
            backends: wgpu::Backends::all(),
            width: 1280,
            height: 720,
            load_options: LoadOptions::default(),
        }
    }
}

/// Open a window, load the configured model and spin it until closed.
/// Returns the first load or render error that stopped the loop.
pub fn run_viewer(config: ViewerConfig) -> Result<()> {
    let event_loop = EventLoop::new().context("Failed to create event loop")?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut viewer = Viewer::new(config);
    event_loop
        .run_app(&mut viewer)
        .map_err(|e| anyhow::anyhow!("Event loop error: {e:?}"))?;

    match viewer.error.take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

struct Scene {
    window: Arc<Window>,
    renderer: ModelRenderer,
    model: Model,
    camera: Camera,
}

struct Viewer {
    config: ViewerConfig,
    scene: Option<Scene>,
    started: Instant,
    error: Option<anyhow::Error>,
}

impl Viewer {
    fn new(config: ViewerConfig) -> Self {
        Self {
            config,
            scene: None,
            started: Instant::now(),
            error: None,
        }
    }

    fn init_scene(&self, event_loop: &ActiveEventLoop) -> Result<Scene> {
        let attributes = Window::default_attributes()
            .with_title("Model Viewer")
            .with_inner_size(PhysicalSize::new(self.config.width, self.config.height));
        let window = Arc::new(
            event_loop
                .create_window(attributes)
                .context("Failed to create window")?,
        );
        log::info!(
            "Window created: {}x{}",
            window.inner_size().width,
            window.inner_size().height
        );

        let mut renderer =
            pollster::block_on(ModelRenderer::new(window.clone(), self.config.backends))?;

        let loader = ModelLoader::new(self.config.load_options.clone());
        let model = loader.load(&self.config.model_path, renderer.gpu())?;
        log::info!(
            "Loaded {} ({} meshes, {} textures)",
            self.config.model_path.display(),
            model.mesh_count(),
            model.textures().len()
        );

        let fov = FOV_Y_DEG.to_radians();
        let camera = match model.bounds() {
            Some(bounds) => Camera::framing(&bounds, fov, renderer.aspect()),
            None => Camera::new_perspective(
                corelib::vec3(0.0, 0.0, 3.0),
                corelib::Vec3::ZERO,
                fov,
                renderer.aspect(),
            ),
        };

        Ok(Scene {
            window,
            renderer,
            model,
            camera,
        })
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        log::error!("{err:#}");
        self.error.get_or_insert(err);
        event_loop.exit();
    }
}

impl ApplicationHandler for Viewer {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.scene.is_some() {
            return;
        }
        match self.init_scene(event_loop) {
            Ok(scene) => {
                scene.window.request_redraw();
                self.scene = Some(scene);
            }
            Err(err) => self.fail(event_loop, err),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let Some(scene) = self.scene.as_mut() else {
            return;
        };

        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested. Exiting event loop.");
                event_loop.exit();
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        logical_key: Key::Named(NamedKey::Escape),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => {
                log::info!("Escape pressed. Exiting event loop.");
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                log::debug!("Resized: {}x{}", size.width, size.height);
                scene.renderer.resize(size.width, size.height);
                scene.camera = scene.camera.with_aspect(scene.renderer.aspect());
            }
            WindowEvent::RedrawRequested => {
                let angle = self.started.elapsed().as_secs_f32() * SPIN_RADIANS_PER_SEC;
                let transform = Mat4::from_rotation_y(angle);
                match scene.renderer.render(&scene.model, &scene.camera, transform) {
                    Ok(()) => {}
                    Err(err) if ModelRenderer::is_surface_lost(&err) => {
                        log::warn!("Surface lost, reconfiguring");
                        scene.renderer.recreate_surface();
                    }
                    Err(err) => {
                        self.fail(event_loop, err);
                        return;
                    }
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(scene) = &self.scene {
            scene.window.request_redraw();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(Scene {
            mut renderer,
            model,
            ..
        }) = self.scene.take()
        {
            model.dispose(renderer.gpu());
            log::info!("Released model resources");
        }
    }
}
