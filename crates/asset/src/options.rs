//! Load-time configuration.

/// What to do when a material texture cannot be decoded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MissingTexturePolicy {
    /// Fail the whole load with `AssetError::TextureLoad`.
    #[default]
    Abort,
    /// Upload a checkerboard for that path and keep loading.
    Placeholder,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadOptions {
    /// Ask the importer to fan-triangulate polygons.
    pub triangulate: bool,
    /// Replace `v` with `1 - v` in imported texture coordinates.
    pub flip_uvs: bool,
    /// Passed to the image decoder.
    pub flip_textures_vertically: bool,
    pub generate_mipmaps: bool,
    pub missing_textures: MissingTexturePolicy,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            triangulate: true,
            flip_uvs: false,
            flip_textures_vertically: true,
            generate_mipmaps: true,
            missing_textures: MissingTexturePolicy::Abort,
        }
    }
}
