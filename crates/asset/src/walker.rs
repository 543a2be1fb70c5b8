//! Flattens an imported scene graph into primitive groups.

use std::path::{Path, PathBuf};

use corelib::{
    AssetError, AssetResult, GpuDevice, TextureBinding, TextureRole, UNITS_PER_ROLE, Vertex,
};

use crate::cache::TextureCache;
use crate::mesh::MeshData;
use crate::scene::{ImportedScene, SceneMesh, SceneNode};

/// Walks nodes depth-first, pre-order: a node's own primitive groups come
/// before those of its children, children in listed order.
pub struct AssetGraphWalker<'a> {
    scene: &'a ImportedScene,
    source: &'a Path,
}

impl<'a> AssetGraphWalker<'a> {
    /// `source` is only used to name the asset in errors.
    pub fn new(scene: &'a ImportedScene, source: &'a Path) -> Self {
        Self { scene, source }
    }

    /// One [`MeshData`] per primitive-group reference, in encounter order,
    /// with material textures resolved through `cache`.
    pub fn walk<G: GpuDevice + ?Sized>(
        &self,
        gpu: &mut G,
        cache: &mut TextureCache<'_>,
    ) -> AssetResult<Vec<MeshData>> {
        let mut groups = Vec::with_capacity(self.scene.mesh_reference_count());
        let mut stack: Vec<&SceneNode> = vec![&self.scene.root];

        while let Some(node) = stack.pop() {
            for &mesh_index in &node.meshes {
                let mesh = self.scene.meshes.get(mesh_index).ok_or_else(|| {
                    self.load_error(format!(
                        "node '{}' references missing mesh {}",
                        node.name, mesh_index
                    ))
                })?;
                groups.push(self.process_mesh(mesh, gpu, cache)?);
            }
            stack.extend(node.children.iter().rev());
        }

        Ok(groups)
    }

    fn process_mesh<G: GpuDevice + ?Sized>(
        &self,
        mesh: &SceneMesh,
        gpu: &mut G,
        cache: &mut TextureCache<'_>,
    ) -> AssetResult<MeshData> {
        let (vertices, indices) = self.extract_geometry(mesh)?;
        let textures = self.material_textures(mesh, gpu, cache)?;
        let data = MeshData::new(mesh.name.clone(), vertices, indices, textures);
        log::debug!(
            "Mesh '{}': {} vertices, {} triangles, {} textures",
            data.name,
            data.vertices.len(),
            data.triangle_count(),
            data.textures.len()
        );
        Ok(data)
    }

    fn extract_geometry(&self, mesh: &SceneMesh) -> AssetResult<(Vec<Vertex>, Vec<u32>)> {
        let count = mesh.positions.len();
        if !mesh.normals.is_empty() && mesh.normals.len() != count {
            return Err(self.unsupported(
                mesh,
                format!("{} normals for {} positions", mesh.normals.len(), count),
            ));
        }
        if !mesh.tex_coords.is_empty() && mesh.tex_coords.len() != count {
            return Err(self.unsupported(
                mesh,
                format!(
                    "{} texture coordinates for {} positions",
                    mesh.tex_coords.len(),
                    count
                ),
            ));
        }

        let vertices = mesh
            .positions
            .iter()
            .enumerate()
            .map(|(i, &position)| {
                let normal = mesh.normals.get(i).copied().unwrap_or([0.0; 3]);
                let tex_coords = mesh.tex_coords.get(i).copied().unwrap_or([0.0; 2]);
                Vertex::new(position, normal, tex_coords)
            })
            .collect();

        let mut indices = Vec::with_capacity(mesh.faces.len() * 3);
        for (face_no, face) in mesh.faces.iter().enumerate() {
            if face.0.len() != 3 {
                return Err(self.unsupported(
                    mesh,
                    format!(
                        "face {} has {} vertices; only triangles are supported",
                        face_no,
                        face.0.len()
                    ),
                ));
            }
            for &index in &face.0 {
                if index as usize >= count {
                    return Err(self.unsupported(
                        mesh,
                        format!("face {face_no} uses index {index} but there are {count} vertices"),
                    ));
                }
                indices.push(index);
            }
        }

        Ok((vertices, indices))
    }

    fn material_textures<G: GpuDevice + ?Sized>(
        &self,
        mesh: &SceneMesh,
        gpu: &mut G,
        cache: &mut TextureCache<'_>,
    ) -> AssetResult<Vec<TextureBinding>> {
        let Some(material_index) = mesh.material else {
            return Ok(Vec::new());
        };
        let material = self.scene.materials.get(material_index).ok_or_else(|| {
            self.load_error(format!(
                "mesh '{}' references missing material {}",
                mesh.name, material_index
            ))
        })?;

        for role in TextureRole::ALL {
            let count = material.textures_of(role).count();
            if count > UNITS_PER_ROLE as usize {
                return Err(self.unsupported(
                    mesh,
                    format!(
                        "material '{}' has {} {} textures, at most {} are supported",
                        material.name, count, role, UNITS_PER_ROLE
                    ),
                ));
            }
        }

        let mut textures = Vec::with_capacity(material.textures.len());
        for role in TextureRole::ALL {
            for path in material.textures_of(role) {
                textures.push(cache.resolve(gpu, path, role)?);
            }
        }
        Ok(textures)
    }

    fn unsupported(&self, mesh: &SceneMesh, reason: String) -> AssetError {
        AssetError::UnsupportedGeometry {
            path: PathBuf::from(self.source),
            mesh: mesh.name.clone(),
            reason,
        }
    }

    fn load_error(&self, reason: String) -> AssetError {
        AssetError::AssetLoad {
            path: PathBuf::from(self.source),
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::LoadOptions;
    use crate::scene::{Face, SceneMaterial};
    use crate::test_support::{CountingDecoder, RecordingGpu, triangle};

    fn walk(scene: &ImportedScene) -> AssetResult<Vec<MeshData>> {
        let decoder = CountingDecoder::new();
        let mut gpu = RecordingGpu::new();
        let mut cache = TextureCache::new(&decoder, Path::new("."), &LoadOptions::default());
        AssetGraphWalker::new(scene, Path::new("scene.obj")).walk(&mut gpu, &mut cache)
    }

    #[test]
    fn visits_own_groups_before_children() {
        let scene = ImportedScene {
            root: SceneNode::new("root")
                .with_meshes([0])
                .with_child(
                    SceneNode::new("a")
                        .with_meshes([1])
                        .with_child(SceneNode::new("a1").with_meshes([2])),
                )
                .with_child(SceneNode::new("b").with_meshes([3, 4])),
            meshes: ["r", "a", "a1", "b0", "b1"]
                .into_iter()
                .map(|n| triangle(n, None))
                .collect(),
            materials: Vec::new(),
        };
        let names: Vec<_> = walk(&scene).unwrap().into_iter().map(|m| m.name).collect();
        assert_eq!(names, ["r", "a", "a1", "b0", "b1"]);
    }

    #[test]
    fn shared_mesh_references_yield_one_group_each() {
        let scene = ImportedScene {
            root: SceneNode::new("root")
                .with_child(SceneNode::new("left").with_meshes([0]))
                .with_child(SceneNode::new("right").with_meshes([0])),
            meshes: vec![triangle("wheel", None)],
            materials: Vec::new(),
        };
        assert_eq!(walk(&scene).unwrap().len(), 2);
    }

    #[test]
    fn missing_normals_and_uvs_are_zero_filled() {
        let scene = ImportedScene {
            root: SceneNode::new("root").with_meshes([0]),
            meshes: vec![triangle("t", None)],
            materials: Vec::new(),
        };
        let groups = walk(&scene).unwrap();
        let v = groups[0].vertices[1];
        assert_eq!(v.position, [1.0, 0.0, 0.0]);
        assert_eq!(v.normal, [0.0; 3]);
        assert_eq!(v.tex_coords, [0.0; 2]);
        assert_eq!(groups[0].indices, [0, 1, 2]);
        assert!(groups[0].textures.is_empty());
    }

    #[test]
    fn quads_are_rejected_as_unsupported() {
        let mut quad = triangle("quad", None);
        quad.positions.push([1.0, 1.0, 0.0]);
        quad.faces = vec![Face(vec![0, 1, 3, 2])];
        let scene = ImportedScene {
            root: SceneNode::new("root").with_meshes([0]),
            meshes: vec![quad],
            materials: Vec::new(),
        };
        let err = walk(&scene).unwrap_err();
        assert!(
            matches!(err, AssetError::UnsupportedGeometry { ref mesh, .. } if mesh == "quad"),
            "{err:?}"
        );
    }

    #[test]
    fn out_of_range_index_is_rejected() {
        let mut bad = triangle("bad", None);
        bad.faces = vec![Face(vec![0, 1, 7])];
        let scene = ImportedScene {
            root: SceneNode::new("root").with_meshes([0]),
            meshes: vec![bad],
            materials: Vec::new(),
        };
        assert!(matches!(
            walk(&scene).unwrap_err(),
            AssetError::UnsupportedGeometry { .. }
        ));
    }

    #[test]
    fn mismatched_normal_count_is_rejected() {
        let mut bad = triangle("bad", None);
        bad.normals = vec![[0.0, 0.0, 1.0]];
        let scene = ImportedScene {
            root: SceneNode::new("root").with_meshes([0]),
            meshes: vec![bad],
            materials: Vec::new(),
        };
        assert!(matches!(
            walk(&scene).unwrap_err(),
            AssetError::UnsupportedGeometry { .. }
        ));
    }

    #[test]
    fn empty_group_still_yields_a_group() {
        let empty = SceneMesh {
            name: "empty".into(),
            positions: Vec::new(),
            normals: Vec::new(),
            tex_coords: Vec::new(),
            faces: Vec::new(),
            material: None,
        };
        let scene = ImportedScene {
            root: SceneNode::new("root").with_meshes([0, 1]),
            meshes: vec![empty, triangle("t", None)],
            materials: Vec::new(),
        };
        let groups = walk(&scene).unwrap();
        assert_eq!(groups.len(), 2);
        assert!(groups[0].vertices.is_empty());
        assert!(groups[0].indices.is_empty());
        assert_eq!(groups[1].triangle_count(), 1);
    }

    #[test]
    fn too_many_textures_of_one_role_fail_before_decoding() {
        let material = (0..=UNITS_PER_ROLE).fold(SceneMaterial::new("busy"), |m, i| {
            m.with_texture(TextureRole::Specular, format!("spec{i}.png"))
        });
        let scene = ImportedScene {
            root: SceneNode::new("root").with_meshes([0]),
            meshes: vec![triangle("t", Some(0))],
            materials: vec![material],
        };
        let decoder = CountingDecoder::new();
        let mut gpu = RecordingGpu::new();
        let mut cache = TextureCache::new(&decoder, Path::new("."), &LoadOptions::default());
        let err = AssetGraphWalker::new(&scene, Path::new("scene.obj"))
            .walk(&mut gpu, &mut cache)
            .unwrap_err();

        assert!(
            matches!(err, AssetError::UnsupportedGeometry { ref mesh, .. } if mesh == "t"),
            "{err:?}"
        );
        assert_eq!(decoder.total(), 0);
        assert!(gpu.calls.is_empty());
    }

    #[test]
    fn a_full_unit_block_per_role_is_accepted() {
        let material = (0..UNITS_PER_ROLE).fold(SceneMaterial::new("full"), |m, i| {
            m.with_texture(TextureRole::Normal, format!("n{i}.png"))
        });
        let scene = ImportedScene {
            root: SceneNode::new("root").with_meshes([0]),
            meshes: vec![triangle("t", Some(0))],
            materials: vec![material],
        };
        assert_eq!(walk(&scene).unwrap()[0].textures.len(), UNITS_PER_ROLE as usize);
    }

    #[test]
    fn dangling_mesh_reference_is_a_load_error() {
        let scene = ImportedScene {
            root: SceneNode::new("root").with_meshes([3]),
            meshes: vec![triangle("only", None)],
            materials: Vec::new(),
        };
        assert!(matches!(walk(&scene).unwrap_err(), AssetError::AssetLoad { .. }));
    }

    #[test]
    fn material_textures_are_collected_role_by_role() {
        let material = SceneMaterial::new("mat")
            .with_texture(TextureRole::Specular, "spec.png")
            .with_texture(TextureRole::Diffuse, "diff.png")
            .with_texture(TextureRole::Height, "height.png");
        let scene = ImportedScene {
            root: SceneNode::new("root").with_meshes([0]),
            meshes: vec![triangle("t", Some(0))],
            materials: vec![material],
        };
        let groups = walk(&scene).unwrap();
        let roles: Vec<_> = groups[0].textures.iter().map(|t| t.role).collect();
        assert_eq!(
            roles,
            [TextureRole::Diffuse, TextureRole::Specular, TextureRole::Height]
        );
    }
}
