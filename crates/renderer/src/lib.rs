//! Renderer: wgpu backend for loaded models.
//! wgpu = 23.x, winit = 0.30.x

use std::sync::Arc;

use anyhow::{Context, Result};
use asset::Model;
use corelib::{ShaderProgram, camera::Camera};
use glam::Mat4;
use winit::{dpi::PhysicalSize, window::Window};

pub mod device;
pub mod shader;

pub use device::{DrawCall, WgpuDevice};
pub use shader::MaterialShader;

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Surface, depth buffer and the model pipeline for one window.
pub struct ModelRenderer {
    // Surface
    surface: wgpu::Surface<'static>,
    surface_config: wgpu::SurfaceConfiguration,

    gpu: WgpuDevice,
    shader: MaterialShader,

    // Depth
    depth_view: wgpu::TextureView,

    // Size cache
    width: u32,
    height: u32,
}

impl ModelRenderer {
    /// Create GPU state bound to an Arc<Window>.
    pub async fn new(window: Arc<Window>, backends: wgpu::Backends) -> Result<Self> {
        let PhysicalSize { width, height } = window.inner_size();
        let width = width.max(1);
        let height = height.max(1);

        // Instance & surface
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends,
            ..Default::default()
        });
        let surface: wgpu::Surface<'static> = instance
            .create_surface(window.clone())
            .context("create_surface failed")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("No suitable GPU adapter")?;
        log::info!("Using adapter: {:?}", adapter.get_info());

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Model Viewer Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::downlevel_webgl2_defaults()
                        .using_resolution(adapter.limits()),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await
            .context("request_device failed")?;

        // Surface format (prefer sRGB)
        let caps = surface.get_capabilities(&adapter);
        let surface_format = caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .context("Surface reports no formats")?;

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width,
            height,
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        let gpu = WgpuDevice::new(device, queue);
        surface.configure(gpu.device(), &surface_config);
        let depth_view = create_depth_view(gpu.device(), &surface_config);
        let shader = MaterialShader::new(&gpu, surface_format, DEPTH_FORMAT);

        Ok(Self {
            surface,
            surface_config,
            gpu,
            shader,
            depth_view,
            width,
            height,
        })
    }

    /// Device models must be loaded onto before they can be rendered here.
    pub fn gpu(&mut self) -> &mut WgpuDevice {
        &mut self.gpu
    }

    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    /// Resize: reconfigure surface & recreate depth view.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width.max(1);
        self.height = height.max(1);
        self.surface_config.width = self.width;
        self.surface_config.height = self.height;
        self.surface.configure(self.gpu.device(), &self.surface_config);
        self.depth_view = create_depth_view(self.gpu.device(), &self.surface_config);
    }

    pub fn recreate_surface(&mut self) {
        self.resize(self.width, self.height);
    }

    pub fn is_surface_lost(err: &anyhow::Error) -> bool {
        matches!(
            err.downcast_ref::<wgpu::SurfaceError>(),
            Some(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated)
        )
    }

    /// Render one frame: record the model's draws, then clear and replay them.
    pub fn render(&mut self, model: &Model, camera: &Camera, transform: Mat4) -> Result<()> {
        self.shader.set_mat4("projection", &camera.proj());
        self.shader.set_mat4("view", &camera.view());
        self.shader.set_mat4("model", &transform);
        self.shader.set_vec3("viewPos", camera.eye);

        model.draw(&mut self.gpu, &mut self.shader)?;
        let draws = self.gpu.take_draws();
        self.gpu.prepare(&draws);
        self.shader.flush(self.gpu.queue());

        let frame = self.surface.get_current_texture()?;
        let view = frame.texture.create_view(&Default::default());

        let mut encoder = self
            .gpu
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("MainEncoder"),
            });

        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("MainPass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: 0.05,
                            g: 0.05,
                            b: 0.08,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            rpass.set_pipeline(self.shader.pipeline());
            rpass.set_bind_group(0, self.shader.uniform_bind_group(), &[]);
            self.gpu.encode(&mut rpass, &draws);
        }

        self.gpu.queue().submit(Some(encoder.finish()));
        frame.present();
        Ok(())
    }
}

/// Create a depth texture view matching the surface config.
fn create_depth_view(
    device: &wgpu::Device,
    sc: &wgpu::SurfaceConfiguration,
) -> wgpu::TextureView {
    let tex = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("DepthTex"),
        size: wgpu::Extent3d {
            width: sc.width.max(1),
            height: sc.height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    tex.create_view(&wgpu::TextureViewDescriptor::default())
}
