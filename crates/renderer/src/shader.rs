//! [`ShaderProgram`] backed by the model pipeline.

use std::collections::HashMap;

use bytemuck::{Pod, Zeroable};
use corelib::{ShaderProgram, TextureRole};
use glam::{Mat4, Vec3};

use crate::device::{VERTEX_LAYOUT, WgpuDevice};

/// Scene UBO (16-byte aligned).
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct SceneUniform {
    model: [[f32; 4]; 4],
    view: [[f32; 4]; 4],
    projection: [[f32; 4]; 4],
    view_pos: [f32; 4],
    light_dir: [f32; 4],
    // x = shininess
    params: [f32; 4],
}

/// The model pipeline and its uniform state.
///
/// Uniform names follow the usual model shader: `model`, `view`,
/// `projection`, `viewPos`, `light.direction`, `material.shininess`.
/// Sampler uniforms name texture units; the WGSL module declares
/// `material.texture_diffuse1` and `material.texture_specular1` at fixed
/// units and any other assignment is only checked, never remapped.
pub struct MaterialShader {
    pipeline: wgpu::RenderPipeline,
    uniform_buf: wgpu::Buffer,
    uniform_bg: wgpu::BindGroup,

    model: Mat4,
    view: Mat4,
    projection: Mat4,
    view_pos: Vec3,
    light_dir: Vec3,
    shininess: f32,

    declared_samplers: HashMap<String, i32>,
}

impl MaterialShader {
    pub fn new(
        gpu: &WgpuDevice,
        color_format: wgpu::TextureFormat,
        depth_format: wgpu::TextureFormat,
    ) -> Self {
        let device = gpu.device();
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Model WGSL"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/model.wgsl").into()),
        });

        let uniform_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Scene BGL"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: wgpu::BufferSize::new(
                        std::mem::size_of::<SceneUniform>() as u64,
                    ),
                },
                count: None,
            }],
        });
        let uniform_buf = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Scene UBO"),
            size: std::mem::size_of::<SceneUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let uniform_bg = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Scene BG"),
            layout: &uniform_bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buf.as_entire_binding(),
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Model PipelineLayout"),
            bind_group_layouts: &[&uniform_bgl, gpu.texture_layout()],
            push_constant_ranges: &[],
        });
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Model Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[VERTEX_LAYOUT],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: color_format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: depth_format,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::LessEqual,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        Self {
            pipeline,
            uniform_buf,
            uniform_bg,
            model: Mat4::IDENTITY,
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            view_pos: Vec3::ZERO,
            light_dir: Vec3::new(-0.3, -1.0, -0.5),
            shininess: 32.0,
            declared_samplers: declared_samplers(),
        }
    }

    pub fn pipeline(&self) -> &wgpu::RenderPipeline {
        &self.pipeline
    }

    pub fn uniform_bind_group(&self) -> &wgpu::BindGroup {
        &self.uniform_bg
    }

    /// Write the current uniform values for the next frame.
    pub fn flush(&self, queue: &wgpu::Queue) {
        let uniform = SceneUniform {
            model: self.model.to_cols_array_2d(),
            view: self.view.to_cols_array_2d(),
            projection: self.projection.to_cols_array_2d(),
            view_pos: self.view_pos.extend(1.0).to_array(),
            light_dir: self.light_dir.extend(0.0).to_array(),
            params: [self.shininess, 0.0, 0.0, 0.0],
        };
        queue.write_buffer(&self.uniform_buf, 0, bytemuck::bytes_of(&uniform));
    }
}

impl ShaderProgram for MaterialShader {
    fn set_int(&mut self, name: &str, value: i32) {
        match self.declared_samplers.get(name) {
            Some(&unit) if unit != value => log::warn!(
                "Sampler {} set to unit {} but the shader samples unit {}",
                name,
                value,
                unit
            ),
            Some(_) => {}
            None => log::trace!("Sampler {} is not used by the model shader", name),
        }
    }

    fn set_float(&mut self, name: &str, value: f32) {
        match name {
            "material.shininess" => self.shininess = value,
            _ => log::trace!("Ignoring float uniform {}", name),
        }
    }

    fn set_vec3(&mut self, name: &str, value: Vec3) {
        match name {
            "viewPos" => self.view_pos = value,
            "light.direction" => self.light_dir = value,
            _ => log::trace!("Ignoring vec3 uniform {}", name),
        }
    }

    fn set_mat4(&mut self, name: &str, value: &Mat4) {
        match name {
            "model" => self.model = *value,
            "view" => self.view = *value,
            "projection" => self.projection = *value,
            _ => log::trace!("Ignoring mat4 uniform {}", name),
        }
    }
}

/// Samplers `model.wgsl` reads, with the unit each one is bound at.
fn declared_samplers() -> HashMap<String, i32> {
    [TextureRole::Diffuse, TextureRole::Specular]
        .into_iter()
        .filter_map(|role| {
            role.texture_unit(1)
                .map(|unit| (role.sampler_name(1), unit as i32))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declared_samplers_match_wgsl_bindings() {
        let samplers = declared_samplers();
        assert_eq!(samplers["material.texture_diffuse1"], 0);
        assert_eq!(samplers["material.texture_specular1"], 4);

        let wgsl = include_str!("shaders/model.wgsl");
        // binding = unit + 1
        assert!(wgsl.contains("@binding(1) var texture_diffuse1"));
        assert!(wgsl.contains("@binding(5) var texture_specular1"));
    }

    #[test]
    fn uniform_block_is_16_byte_aligned() {
        assert_eq!(std::mem::size_of::<SceneUniform>() % 16, 0);
    }
}
