//! Primitive groups: CPU data and their GPU-resident counterpart.

use corelib::{
    GeometryId, GpuDevice, GpuError, RoleCounters, ShaderProgram, TextureBinding, Vertex,
};

/// One primitive group as extracted from a scene: vertices, triangle-list
/// indices into them, and the textures of its material.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshData {
    pub name: String,
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    pub textures: Vec<TextureBinding>,
}

impl MeshData {
    pub fn new(
        name: impl Into<String>,
        vertices: Vec<Vertex>,
        indices: Vec<u32>,
        textures: Vec<TextureBinding>,
    ) -> Self {
        Self {
            name: name.into(),
            vertices,
            indices,
            textures,
        }
    }

    /// Returns `true` if both vertex and index buffers are non-empty.
    pub fn is_valid(&self) -> bool {
        !self.vertices.is_empty() && !self.indices.is_empty()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// A primitive group uploaded to the GPU.
///
/// Vertex and index data are uploaded exactly once, in [`Mesh::upload`]. The
/// GPU handle is released by [`Mesh::dispose`].
#[derive(Debug)]
pub struct Mesh {
    data: MeshData,
    geometry: GeometryId,
    index_count: u32,
}

impl Mesh {
    pub fn upload<G: GpuDevice + ?Sized>(gpu: &mut G, data: MeshData) -> Result<Self, GpuError> {
        let index_count = u32::try_from(data.indices.len())
            .map_err(|_| GpuError::OutOfMemory(format!("index buffer for '{}'", data.name)))?;
        let geometry = gpu.create_geometry(&data.name, &data.vertices, &data.indices)?;
        Ok(Self {
            data,
            geometry,
            index_count,
        })
    }

    /// Bind this group's textures and issue one indexed draw.
    ///
    /// The `n`-th texture of a role (1-based, counted per role) is bound to
    /// that role's `n`-th unit and announced to the shader as
    /// `material.<prefix><n>`. The shader must declare matching sampler
    /// names; a mismatch renders wrong without failing.
    ///
    /// Texture units are reset afterwards whether or not the draw succeeded.
    pub fn draw<G, S>(&self, gpu: &mut G, shader: &mut S) -> Result<(), GpuError>
    where
        G: GpuDevice + ?Sized,
        S: ShaderProgram + ?Sized,
    {
        let result = self.bind_and_draw(gpu, shader);
        gpu.reset_texture_units();
        result
    }

    fn bind_and_draw<G, S>(&self, gpu: &mut G, shader: &mut S) -> Result<(), GpuError>
    where
        G: GpuDevice + ?Sized,
        S: ShaderProgram + ?Sized,
    {
        let mut counters = RoleCounters::default();
        for binding in &self.data.textures {
            let index = counters.next(binding.role);
            let unit = binding
                .role
                .texture_unit(index)
                .ok_or(GpuError::TextureUnitsExhausted {
                    role: binding.role,
                    index,
                })?;
            shader.set_int(&binding.role.sampler_name(index), unit as i32);
            gpu.bind_texture(unit, binding.texture)?;
        }

        gpu.draw_indexed(self.geometry, self.index_count)
    }

    pub fn name(&self) -> &str {
        &self.data.name
    }

    pub fn geometry(&self) -> GeometryId {
        self.geometry
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.data.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.data.indices
    }

    pub fn textures(&self) -> &[TextureBinding] {
        &self.data.textures
    }

    /// Release the GPU buffers. Textures belong to the owning model.
    pub fn dispose<G: GpuDevice + ?Sized>(self, gpu: &mut G) {
        gpu.destroy_geometry(self.geometry);
    }
}
