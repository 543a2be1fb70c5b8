//! Instrumented collaborators shared by the loader tests.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow, bail};
use corelib::{
    GeometryId, GpuDevice, GpuError, Mat4, PixelFormat, ShaderProgram, TextureId, TextureUpload,
    Vec3, Vertex,
};

use crate::scene::{Face, ImportedScene, SceneImporter, SceneMesh};
use crate::texture::{ImageDecoder, TextureData};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GpuCall {
    CreateGeometry {
        id: GeometryId,
        label: String,
        vertices: usize,
        indices: usize,
    },
    CreateTexture {
        id: TextureId,
        label: String,
    },
    GenerateMipmaps(TextureId),
    BindTexture {
        unit: u32,
        texture: TextureId,
    },
    DrawIndexed {
        geometry: GeometryId,
        index_count: u32,
    },
    ResetTextureUnits,
    DestroyGeometry(GeometryId),
    DestroyTexture(TextureId),
}

/// GPU mock that records every call in order and tracks live handles.
#[derive(Default)]
pub struct RecordingGpu {
    pub calls: Vec<GpuCall>,
    pub live_geometries: HashSet<GeometryId>,
    pub live_textures: HashSet<TextureId>,
    /// Fail geometry creation once this many geometries exist.
    pub geometry_limit: Option<usize>,
    pub context_lost: bool,
    next_id: u32,
    created_geometries: usize,
}

impl RecordingGpu {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_geometry_limit(limit: usize) -> Self {
        Self {
            geometry_limit: Some(limit),
            ..Self::default()
        }
    }

    fn next_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    pub fn draws(&self) -> Vec<(GeometryId, u32)> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                GpuCall::DrawIndexed {
                    geometry,
                    index_count,
                } => Some((*geometry, *index_count)),
                _ => None,
            })
            .collect()
    }

    pub fn texture_creations(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, GpuCall::CreateTexture { .. }))
            .count()
    }

    pub fn geometry_labels(&self) -> Vec<String> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                GpuCall::CreateGeometry { label, .. } => Some(label.clone()),
                _ => None,
            })
            .collect()
    }
}

impl GpuDevice for RecordingGpu {
    fn create_geometry(
        &mut self,
        label: &str,
        vertices: &[Vertex],
        indices: &[u32],
    ) -> Result<GeometryId, GpuError> {
        if self
            .geometry_limit
            .is_some_and(|limit| self.created_geometries >= limit)
        {
            return Err(GpuError::OutOfMemory(label.to_string()));
        }
        self.created_geometries += 1;
        let id = GeometryId(self.next_id());
        self.live_geometries.insert(id);
        self.calls.push(GpuCall::CreateGeometry {
            id,
            label: label.to_string(),
            vertices: vertices.len(),
            indices: indices.len(),
        });
        Ok(id)
    }

    fn create_texture(&mut self, upload: &TextureUpload<'_>) -> Result<TextureId, GpuError> {
        let id = TextureId(self.next_id());
        self.live_textures.insert(id);
        self.calls.push(GpuCall::CreateTexture {
            id,
            label: upload.label.to_string(),
        });
        Ok(id)
    }

    fn generate_mipmaps(&mut self, texture: TextureId) -> Result<(), GpuError> {
        self.calls.push(GpuCall::GenerateMipmaps(texture));
        Ok(())
    }

    fn bind_texture(&mut self, unit: u32, texture: TextureId) -> Result<(), GpuError> {
        if self.context_lost {
            return Err(GpuError::ContextLost);
        }
        self.calls.push(GpuCall::BindTexture { unit, texture });
        Ok(())
    }

    fn draw_indexed(&mut self, geometry: GeometryId, index_count: u32) -> Result<(), GpuError> {
        if self.context_lost {
            return Err(GpuError::ContextLost);
        }
        self.calls.push(GpuCall::DrawIndexed {
            geometry,
            index_count,
        });
        Ok(())
    }

    fn reset_texture_units(&mut self) {
        self.calls.push(GpuCall::ResetTextureUnits);
    }

    fn destroy_geometry(&mut self, geometry: GeometryId) {
        self.live_geometries.remove(&geometry);
        self.calls.push(GpuCall::DestroyGeometry(geometry));
    }

    fn destroy_texture(&mut self, texture: TextureId) {
        self.live_textures.remove(&texture);
        self.calls.push(GpuCall::DestroyTexture(texture));
    }
}

/// Shader mock that keeps sampler assignments in order. Other uniforms are
/// never set by the loader and are ignored.
#[derive(Default)]
pub struct RecordingShader {
    pub ints: Vec<(String, i32)>,
}

impl ShaderProgram for RecordingShader {
    fn set_int(&mut self, name: &str, value: i32) {
        self.ints.push((name.to_string(), value));
    }

    fn set_float(&mut self, _name: &str, _value: f32) {}

    fn set_vec3(&mut self, _name: &str, _value: Vec3) {}

    fn set_mat4(&mut self, _name: &str, _value: &Mat4) {}
}

/// Decoder that counts calls per path and fails for configured paths.
#[derive(Default)]
pub struct CountingDecoder {
    counts: RefCell<HashMap<PathBuf, usize>>,
    failing: HashSet<PathBuf>,
}

impl CountingDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(mut self, path: impl Into<PathBuf>) -> Self {
        self.failing.insert(path.into());
        self
    }

    pub fn count(&self, path: impl AsRef<Path>) -> usize {
        self.counts
            .borrow()
            .get(path.as_ref())
            .copied()
            .unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.counts.borrow().values().sum()
    }
}

impl ImageDecoder for CountingDecoder {
    fn decode(&self, path: &Path, _flip_vertically: bool) -> Result<TextureData> {
        *self
            .counts
            .borrow_mut()
            .entry(path.to_path_buf())
            .or_default() += 1;
        if self.failing.contains(path) {
            bail!("corrupt image data");
        }
        TextureData::new(2, 2, PixelFormat::Rgba8, vec![255; 16])
    }
}

/// Importer returning a fixed scene, or a fixed diagnostic.
pub struct StaticImporter {
    scene: Option<ImportedScene>,
    pub requested: RefCell<Vec<PathBuf>>,
}

impl StaticImporter {
    pub fn new(scene: ImportedScene) -> Self {
        Self {
            scene: Some(scene),
            requested: RefCell::default(),
        }
    }

    pub fn failing() -> Self {
        Self {
            scene: None,
            requested: RefCell::default(),
        }
    }
}

impl SceneImporter for StaticImporter {
    fn import(&self, path: &Path) -> Result<ImportedScene> {
        self.requested.borrow_mut().push(path.to_path_buf());
        self.scene
            .clone()
            .ok_or_else(|| anyhow!("Unable to open file \"{}\"", path.display()))
    }
}

/// Single triangle `[(0,0,0), (1,0,0), (0,1,0)]` with no normals or uvs.
pub fn triangle(name: &str, material: Option<usize>) -> SceneMesh {
    SceneMesh {
        name: name.to_string(),
        positions: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
        normals: Vec::new(),
        tex_coords: Vec::new(),
        faces: vec![Face(vec![0, 1, 2])],
        material,
    }
}
