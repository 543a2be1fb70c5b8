//! Texture loading and data structures.

use std::path::Path;

use anyhow::{Context, Result, ensure};
use corelib::{PixelFormat, TextureUpload};
use image::{DynamicImage, GenericImageView};

/// Texture data in CPU-friendly format before GPU upload.
#[derive(Clone, Debug)]
pub struct TextureData {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
}

impl TextureData {
    pub fn new(width: u32, height: u32, format: PixelFormat, data: Vec<u8>) -> Result<Self> {
        let texture = Self {
            data,
            width,
            height,
            format,
        };
        ensure!(
            texture.is_valid(),
            "{} bytes do not match a {}x{} {:?} image",
            texture.data.len(),
            width,
            height,
            format
        );
        Ok(texture)
    }

    /// Decode an image file. 8-bit greyscale/RGB/RGBA (and grey+alpha) keep
    /// their channel layout; any other pixel type is converted to RGBA8.
    pub fn load(path: &Path, flip_vertically: bool) -> Result<Self> {
        log::debug!("Decoding texture {:?}", path);

        let img = image::open(path).with_context(|| format!("Failed to open image {:?}", path))?;
        let img = if flip_vertically { img.flipv() } else { img };
        let (width, height) = img.dimensions();

        let (format, data) = match img {
            DynamicImage::ImageLuma8(buf) => (PixelFormat::R8, buf.into_raw()),
            DynamicImage::ImageLumaA8(buf) => (PixelFormat::Rg8, buf.into_raw()),
            DynamicImage::ImageRgb8(buf) => (PixelFormat::Rgb8, buf.into_raw()),
            DynamicImage::ImageRgba8(buf) => (PixelFormat::Rgba8, buf.into_raw()),
            other => (PixelFormat::Rgba8, other.to_rgba8().into_raw()),
        };

        log::debug!("Decoded texture {}x{} {:?}", width, height, format);
        Self::new(width, height, format, data)
    }

    /// Checkerboard used in place of textures that fail to decode.
    pub fn checkerboard(size: u32) -> Self {
        let mut data = Vec::with_capacity((size * size * 4) as usize);

        for y in 0..size {
            for x in 0..size {
                let checker = ((x / 8) + (y / 8)) % 2;
                if checker == 0 {
                    data.extend_from_slice(&[255, 0, 255, 255]);
                } else {
                    data.extend_from_slice(&[32, 32, 32, 255]);
                }
            }
        }

        Self {
            data,
            width: size,
            height: size,
            format: PixelFormat::Rgba8,
        }
    }

    pub fn bytes_per_pixel(&self) -> u32 {
        self.format.channels()
    }

    pub fn is_valid(&self) -> bool {
        let expected_size = (self.width * self.height * self.bytes_per_pixel()) as usize;
        self.data.len() == expected_size && self.width > 0 && self.height > 0
    }

    pub fn as_upload<'a>(&'a self, label: &'a str) -> TextureUpload<'a> {
        TextureUpload {
            label,
            width: self.width,
            height: self.height,
            format: self.format,
            pixels: &self.data,
        }
    }
}

/// Image-decode collaborator.
pub trait ImageDecoder {
    fn decode(&self, path: &Path, flip_vertically: bool) -> Result<TextureData>;
}

/// Decodes image files from disk with the `image` crate.
#[derive(Clone, Copy, Debug, Default)]
pub struct FileImageDecoder;

impl ImageDecoder for FileImageDecoder {
    fn decode(&self, path: &Path, flip_vertically: bool) -> Result<TextureData> {
        TextureData::load(path, flip_vertically)
    }
}
