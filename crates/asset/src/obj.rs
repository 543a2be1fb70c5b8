//! Wavefront OBJ/MTL import through `tobj`.

use std::path::Path;

use anyhow::{Context, Result};
use corelib::TextureRole;

use crate::options::LoadOptions;
use crate::scene::{Face, ImportedScene, SceneImporter, SceneMaterial, SceneMesh, SceneNode};

/// Imports OBJ files into a two-level scene: a root node named after the
/// file with one child node per OBJ object/group.
#[derive(Clone, Copy, Debug)]
pub struct ObjImporter {
    triangulate: bool,
    flip_uvs: bool,
}

impl ObjImporter {
    pub fn new(options: &LoadOptions) -> Self {
        Self {
            triangulate: options.triangulate,
            flip_uvs: options.flip_uvs,
        }
    }
}

impl Default for ObjImporter {
    fn default() -> Self {
        Self::new(&LoadOptions::default())
    }
}

impl SceneImporter for ObjImporter {
    fn import(&self, path: &Path) -> Result<ImportedScene> {
        let load_options = tobj::LoadOptions {
            single_index: true,
            triangulate: self.triangulate,
            ignore_points: true,
            ignore_lines: true,
            ..Default::default()
        };
        let (models, materials) = tobj::load_obj(path, &load_options)
            .with_context(|| format!("Failed to import OBJ file: {}", path.display()))?;

        let materials = match materials {
            Ok(materials) => materials.iter().map(convert_material).collect(),
            Err(err) => {
                log::warn!("No materials for {}: {}", path.display(), err);
                Vec::new()
            }
        };

        let mut root = SceneNode::new(
            path.file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default(),
        );
        let mut meshes = Vec::with_capacity(models.len());
        for (i, model) in models.iter().enumerate() {
            let mut mesh = self.convert_mesh(model);
            if mesh.material.is_some_and(|m| m >= materials.len()) {
                log::warn!("Object '{}' uses an unknown material", model.name);
                mesh.material = None;
            }
            meshes.push(mesh);
            root.children.push(SceneNode::new(model.name.clone()).with_meshes([i]));
        }

        Ok(ImportedScene {
            root,
            meshes,
            materials,
        })
    }
}

impl ObjImporter {
    fn convert_mesh(&self, model: &tobj::Model) -> SceneMesh {
        let mesh = &model.mesh;

        let positions = mesh
            .positions
            .chunks_exact(3)
            .map(|p| [p[0], p[1], p[2]])
            .collect();
        let normals = mesh
            .normals
            .chunks_exact(3)
            .map(|n| [n[0], n[1], n[2]])
            .collect();
        let tex_coords = mesh
            .texcoords
            .chunks_exact(2)
            .map(|t| {
                if self.flip_uvs {
                    [t[0], 1.0 - t[1]]
                } else {
                    [t[0], t[1]]
                }
            })
            .collect();

        // Empty arities mean every face is a triangle.
        let faces = if mesh.face_arities.is_empty() {
            mesh.indices.chunks(3).map(|f| Face(f.to_vec())).collect()
        } else {
            let mut faces = Vec::with_capacity(mesh.face_arities.len());
            let mut start = 0usize;
            for &arity in &mesh.face_arities {
                let end = (start + arity as usize).min(mesh.indices.len());
                faces.push(Face(mesh.indices[start..end].to_vec()));
                start = end;
            }
            faces
        };

        SceneMesh {
            name: model.name.clone(),
            positions,
            normals,
            tex_coords,
            faces,
            material: mesh.material_id,
        }
    }
}

/// `map_Kd` → diffuse, `map_Ks` → specular, `map_Bump`/`bump`/`norm` →
/// normal, `map_Ka` → height.
fn convert_material(material: &tobj::Material) -> SceneMaterial {
    let slots = [
        (TextureRole::Diffuse, &material.diffuse_texture),
        (TextureRole::Specular, &material.specular_texture),
        (TextureRole::Normal, &material.normal_texture),
        (TextureRole::Height, &material.ambient_texture),
    ];
    slots
        .into_iter()
        .filter_map(|(role, path)| path.as_deref().map(|p| (role, p)))
        .fold(SceneMaterial::new(material.name.clone()), |m, (role, path)| {
            m.with_texture(role, path)
        })
}
