//! Model loading: scene import, texture deduplication and GPU upload.
//!
//! A load runs [`SceneImporter`] on a file, walks the resulting scene graph
//! with [`AssetGraphWalker`], resolves material textures through a per-load
//! [`TextureCache`] and uploads each primitive group as a [`Mesh`]. The
//! result is a [`Model`] that draws its meshes in load order.

pub mod cache;
pub mod mesh;
pub mod model;
pub mod obj;
pub mod options;
pub mod scene;
pub mod texture;
pub mod walker;

#[cfg(test)]
mod test_support;

pub use cache::TextureCache;
pub use mesh::{Mesh, MeshData};
pub use model::{Model, ModelLoader};
pub use obj::ObjImporter;
pub use options::{LoadOptions, MissingTexturePolicy};
pub use scene::{ImportedScene, SceneImporter};
pub use texture::{FileImageDecoder, ImageDecoder, TextureData};
pub use walker::AssetGraphWalker;
