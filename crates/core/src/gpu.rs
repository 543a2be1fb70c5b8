//! Collaborator seams between the loader and a graphics backend.
//!
//! The loader only ever talks to the GPU and to shader programs through these
//! traits. Backends (wgpu in `renderer`, recording mocks in tests) implement
//! them; the graphics context they wrap is single-owner and single-threaded.

use glam::{Mat4, Vec3};

use crate::error::GpuError;
use crate::vertex::Vertex;

/// Handle to an uploaded vertex/index buffer pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GeometryId(pub u32);

/// Handle to an uploaded texture.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureId(pub u32);

/// Pixel layout of decoded image data, one byte per channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    R8,
    Rg8,
    Rgb8,
    Rgba8,
}

impl PixelFormat {
    /// Greyscale/RGB/RGBA mapping for the channel counts image decoders report.
    pub fn from_channels(channels: u8) -> Option<Self> {
        match channels {
            1 => Some(Self::R8),
            2 => Some(Self::Rg8),
            3 => Some(Self::Rgb8),
            4 => Some(Self::Rgba8),
            _ => None,
        }
    }

    pub fn channels(self) -> u32 {
        match self {
            Self::R8 => 1,
            Self::Rg8 => 2,
            Self::Rgb8 => 3,
            Self::Rgba8 => 4,
        }
    }
}

/// Borrowed pixel data for a single texture upload.
#[derive(Clone, Copy, Debug)]
pub struct TextureUpload<'a> {
    pub label: &'a str,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub pixels: &'a [u8],
}

/// Resource creation and draw submission.
pub trait GpuDevice {
    /// Upload vertices and indices once and configure the position/normal/uv
    /// attribute slots for them.
    fn create_geometry(
        &mut self,
        label: &str,
        vertices: &[Vertex],
        indices: &[u32],
    ) -> Result<GeometryId, GpuError>;

    fn create_texture(&mut self, upload: &TextureUpload<'_>) -> Result<TextureId, GpuError>;

    fn generate_mipmaps(&mut self, texture: TextureId) -> Result<(), GpuError>;

    fn bind_texture(&mut self, unit: u32, texture: TextureId) -> Result<(), GpuError>;

    /// Triangle-list draw of the first `index_count` indices of `geometry`.
    fn draw_indexed(&mut self, geometry: GeometryId, index_count: u32) -> Result<(), GpuError>;

    /// Restore default texture-unit state after a draw.
    fn reset_texture_units(&mut self);

    fn destroy_geometry(&mut self, geometry: GeometryId);

    fn destroy_texture(&mut self, texture: TextureId);
}

/// Named-uniform sink of a compiled shader program.
pub trait ShaderProgram {
    /// Also used for sampler uniforms, where `value` is a texture unit.
    fn set_int(&mut self, name: &str, value: i32);

    fn set_float(&mut self, name: &str, value: f32);

    fn set_vec3(&mut self, name: &str, value: Vec3);

    fn set_mat4(&mut self, name: &str, value: &Mat4);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_counts_map_to_formats() {
        assert_eq!(PixelFormat::from_channels(1), Some(PixelFormat::R8));
        assert_eq!(PixelFormat::from_channels(3), Some(PixelFormat::Rgb8));
        assert_eq!(PixelFormat::from_channels(4), Some(PixelFormat::Rgba8));
        assert_eq!(PixelFormat::from_channels(5), None);
        assert_eq!(PixelFormat::Rg8.channels(), 2);
    }
}
