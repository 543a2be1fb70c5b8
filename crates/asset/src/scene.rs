//! Scene graph handed over by an importer.
//!
//! Mirrors what the import collaborator produces: a node hierarchy that refers
//! to primitive groups by index, each group referring to one material by index.

use std::path::Path;

use corelib::TextureRole;

/// Fully parsed scene. Indices in nodes and meshes point into `meshes` and
/// `materials` respectively.
#[derive(Clone, Debug, Default)]
pub struct ImportedScene {
    pub root: SceneNode,
    pub meshes: Vec<SceneMesh>,
    pub materials: Vec<SceneMaterial>,
}

impl ImportedScene {
    /// Number of primitive-group references across the whole node tree.
    pub fn mesh_reference_count(&self) -> usize {
        fn count(node: &SceneNode) -> usize {
            node.meshes.len() + node.children.iter().map(count).sum::<usize>()
        }
        count(&self.root)
    }
}

#[derive(Clone, Debug, Default)]
pub struct SceneNode {
    pub name: String,
    pub meshes: Vec<usize>,
    pub children: Vec<SceneNode>,
}

impl SceneNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_meshes(mut self, meshes: impl IntoIterator<Item = usize>) -> Self {
        self.meshes.extend(meshes);
        self
    }

    pub fn with_child(mut self, child: SceneNode) -> Self {
        self.children.push(child);
        self
    }
}

/// One polygon; a triangle once the importer has triangulated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Face(pub Vec<u32>);

/// Raw primitive group. `normals` and `tex_coords` are either empty or as
/// long as `positions`.
#[derive(Clone, Debug, Default)]
pub struct SceneMesh {
    pub name: String,
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub tex_coords: Vec<[f32; 2]>,
    pub faces: Vec<Face>,
    pub material: Option<usize>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MaterialTexture {
    pub role: TextureRole,
    pub path: String,
}

#[derive(Clone, Debug, Default)]
pub struct SceneMaterial {
    pub name: String,
    pub textures: Vec<MaterialTexture>,
}

impl SceneMaterial {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            textures: Vec::new(),
        }
    }

    pub fn with_texture(mut self, role: TextureRole, path: impl Into<String>) -> Self {
        self.textures.push(MaterialTexture {
            role,
            path: path.into(),
        });
        self
    }

    /// Texture paths in the slot for `role`, in declaration order.
    pub fn textures_of(&self, role: TextureRole) -> impl Iterator<Item = &str> {
        self.textures
            .iter()
            .filter(move |t| t.role == role)
            .map(|t| t.path.as_str())
    }
}

/// Import collaborator: opens and parses a file into an [`ImportedScene`].
///
/// Implementations must triangulate polygons when asked to; the error carries
/// the importer's own diagnostic.
pub trait SceneImporter {
    fn import(&self, path: &Path) -> anyhow::Result<ImportedScene>;
}
