//! Loaded assets: every primitive group of one file plus the textures they use.

use std::path::{Path, PathBuf};

use corelib::{
    AssetError, AssetResult, Bounds, GpuDevice, GpuError, ShaderProgram, TextureId,
};

use crate::cache::TextureCache;
use crate::mesh::Mesh;
use crate::obj::ObjImporter;
use crate::options::LoadOptions;
use crate::scene::SceneImporter;
use crate::texture::{FileImageDecoder, ImageDecoder};
use crate::walker::AssetGraphWalker;

/// A model file uploaded to the GPU.
///
/// Meshes are kept in the order the scene walk produced them; that is also
/// the order [`Model::draw`] submits them in. GPU handles are released with
/// [`Model::dispose`].
#[derive(Debug)]
pub struct Model {
    meshes: Vec<Mesh>,
    textures: Vec<TextureId>,
    directory: PathBuf,
}

impl Model {
    /// Load an OBJ file with default options.
    pub fn load<G: GpuDevice + ?Sized>(path: impl AsRef<Path>, gpu: &mut G) -> AssetResult<Self> {
        ModelLoader::new(LoadOptions::default()).load(path, gpu)
    }

    /// Draw every mesh in load order.
    pub fn draw<G, S>(&self, gpu: &mut G, shader: &mut S) -> Result<(), GpuError>
    where
        G: GpuDevice + ?Sized,
        S: ShaderProgram + ?Sized,
    {
        for mesh in &self.meshes {
            mesh.draw(gpu, shader)?;
        }
        Ok(())
    }

    pub fn meshes(&self) -> &[Mesh] {
        &self.meshes
    }

    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    /// Distinct textures in first-use order.
    pub fn textures(&self) -> &[TextureId] {
        &self.textures
    }

    /// Directory texture paths were resolved against.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn bounds(&self) -> Option<Bounds> {
        self.meshes
            .iter()
            .filter_map(|m| Bounds::from_vertices(m.vertices()))
            .reduce(Bounds::union)
    }

    /// Release every geometry and texture owned by this model.
    pub fn dispose<G: GpuDevice + ?Sized>(self, gpu: &mut G) {
        for mesh in self.meshes {
            mesh.dispose(gpu);
        }
        for texture in self.textures {
            gpu.destroy_texture(texture);
        }
    }
}

/// Drives one import collaborator and one image decoder to build [`Model`]s.
pub struct ModelLoader<I = ObjImporter, D = FileImageDecoder> {
    importer: I,
    decoder: D,
    options: LoadOptions,
}

impl ModelLoader {
    /// OBJ importer and on-disk image decoding.
    pub fn new(options: LoadOptions) -> Self {
        Self {
            importer: ObjImporter::new(&options),
            decoder: FileImageDecoder,
            options,
        }
    }
}

impl<I: SceneImporter, D: ImageDecoder> ModelLoader<I, D> {
    pub fn with_collaborators(importer: I, decoder: D, options: LoadOptions) -> Self {
        Self {
            importer,
            decoder,
            options,
        }
    }

    pub fn importer(&self) -> &I {
        &self.importer
    }

    pub fn decoder(&self) -> &D {
        &self.decoder
    }

    pub fn options(&self) -> &LoadOptions {
        &self.options
    }

    /// Import, walk and upload `path` as a whole.
    ///
    /// Any failure aborts the load; every GPU resource created up to that
    /// point is released before the error is returned.
    pub fn load<G: GpuDevice + ?Sized>(
        &self,
        path: impl AsRef<Path>,
        gpu: &mut G,
    ) -> AssetResult<Model> {
        let path = path.as_ref();
        log::info!("Loading model {}", path.display());

        let directory = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let scene = self
            .importer
            .import(path)
            .map_err(|err| AssetError::AssetLoad {
                path: path.to_path_buf(),
                reason: format!("{err:#}"),
            })?;

        let mut cache = TextureCache::new(&self.decoder, &directory, &self.options);
        let groups = match AssetGraphWalker::new(&scene, path).walk(gpu, &mut cache) {
            Ok(groups) => groups,
            Err(err) => {
                cache.release(gpu);
                return Err(err);
            }
        };

        let mut meshes = Vec::with_capacity(groups.len());
        for data in groups {
            match Mesh::upload(gpu, data) {
                Ok(mesh) => meshes.push(mesh),
                Err(err) => {
                    for mesh in meshes {
                        mesh.dispose(gpu);
                    }
                    cache.release(gpu);
                    return Err(err.into());
                }
            }
        }

        let textures = cache.into_textures();
        log::info!(
            "Loaded model {}: {} meshes, {} textures",
            path.display(),
            meshes.len(),
            textures.len()
        );

        Ok(Model {
            meshes,
            textures,
            directory,
        })
    }
}
