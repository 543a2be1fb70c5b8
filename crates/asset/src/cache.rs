//! Per-load texture deduplication.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use corelib::{AssetError, AssetResult, GpuDevice, TextureBinding, TextureId, TextureRole};

use crate::options::{LoadOptions, MissingTexturePolicy};
use crate::texture::{ImageDecoder, TextureData};

const PLACEHOLDER_SIZE: u32 = 64;

/// Maps texture paths to GPU textures for the duration of one asset load.
///
/// Each distinct path is decoded and uploaded at most once. The cache is
/// never shared between loads, so two assets that happen to use the same
/// relative path never see each other's images.
pub struct TextureCache<'a> {
    decoder: &'a dyn ImageDecoder,
    directory: PathBuf,
    flip_vertically: bool,
    generate_mipmaps: bool,
    policy: MissingTexturePolicy,
    entries: HashMap<String, TextureBinding>,
    // first-use order
    loaded: Vec<TextureId>,
}

impl<'a> TextureCache<'a> {
    /// `directory` is the base that relative texture paths are resolved against.
    pub fn new(decoder: &'a dyn ImageDecoder, directory: &Path, options: &LoadOptions) -> Self {
        Self {
            decoder,
            directory: directory.to_path_buf(),
            flip_vertically: options.flip_textures_vertically,
            generate_mipmaps: options.generate_mipmaps,
            policy: options.missing_textures,
            entries: HashMap::new(),
            loaded: Vec::new(),
        }
    }

    /// Return the binding for `path`, decoding and uploading it on first use.
    ///
    /// A path already resolved under a different role keeps its first role;
    /// the conflict is logged.
    pub fn resolve<G: GpuDevice + ?Sized>(
        &mut self,
        gpu: &mut G,
        path: &str,
        role: TextureRole,
    ) -> AssetResult<TextureBinding> {
        if let Some(existing) = self.entries.get(path) {
            if existing.role != role {
                log::warn!(
                    "Texture {} is used as {} and {}; keeping {}",
                    path,
                    existing.role,
                    role,
                    existing.role
                );
            }
            log::debug!("Texture cache hit: {}", path);
            return Ok(existing.clone());
        }

        log::debug!("Texture cache miss: {}", path);
        let full_path = self.full_path(path);
        let data = match self.decoder.decode(&full_path, self.flip_vertically) {
            Ok(data) => data,
            Err(err) => match self.policy {
                MissingTexturePolicy::Abort => {
                    return Err(AssetError::TextureLoad {
                        path: full_path,
                        reason: format!("{err:#}"),
                    });
                }
                MissingTexturePolicy::Placeholder => {
                    log::warn!(
                        "Substituting placeholder for texture {}: {err:#}",
                        full_path.display()
                    );
                    TextureData::checkerboard(PLACEHOLDER_SIZE)
                }
            },
        };

        let texture = gpu.create_texture(&data.as_upload(path))?;
        self.loaded.push(texture);
        if self.generate_mipmaps {
            gpu.generate_mipmaps(texture)?;
        }

        let binding = TextureBinding {
            texture,
            role,
            path: path.to_string(),
        };
        self.entries.insert(path.to_string(), binding.clone());
        Ok(binding)
    }

    pub fn len(&self) -> usize {
        self.loaded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loaded.is_empty()
    }

    /// Every uploaded texture, in first-use order.
    pub fn into_textures(self) -> Vec<TextureId> {
        self.loaded
    }

    /// Destroy every texture this cache uploaded.
    pub fn release<G: GpuDevice + ?Sized>(self, gpu: &mut G) {
        for texture in self.loaded {
            gpu.destroy_texture(texture);
        }
    }

    fn full_path(&self, path: &str) -> PathBuf {
        // MTL files written on Windows use backslashes
        self.directory.join(path.replace('\\', "/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{CountingDecoder, GpuCall, RecordingGpu};

    #[test]
    fn same_path_is_decoded_and_uploaded_once() {
        let decoder = CountingDecoder::new();
        let mut gpu = RecordingGpu::new();
        let mut cache = TextureCache::new(&decoder, Path::new("models"), &LoadOptions::default());

        let a = cache.resolve(&mut gpu, "wood.png", TextureRole::Diffuse).unwrap();
        let b = cache.resolve(&mut gpu, "wood.png", TextureRole::Diffuse).unwrap();

        assert_eq!(a, b);
        assert_eq!(decoder.count("models/wood.png"), 1);
        assert_eq!(gpu.texture_creations(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn first_seen_role_wins() {
        let decoder = CountingDecoder::new();
        let mut gpu = RecordingGpu::new();
        let mut cache = TextureCache::new(&decoder, Path::new("."), &LoadOptions::default());

        cache.resolve(&mut gpu, "shared.png", TextureRole::Specular).unwrap();
        let again = cache.resolve(&mut gpu, "shared.png", TextureRole::Diffuse).unwrap();
        assert_eq!(again.role, TextureRole::Specular);
    }

    #[test]
    fn uploads_generate_mipmaps_when_enabled() {
        let decoder = CountingDecoder::new();
        let mut gpu = RecordingGpu::new();
        let mut cache = TextureCache::new(&decoder, Path::new("."), &LoadOptions::default());
        let binding = cache.resolve(&mut gpu, "a.png", TextureRole::Diffuse).unwrap();
        assert!(gpu.calls.contains(&GpuCall::GenerateMipmaps(binding.texture)));

        let options = LoadOptions {
            generate_mipmaps: false,
            ..LoadOptions::default()
        };
        let mut gpu = RecordingGpu::new();
        let mut cache = TextureCache::new(&decoder, Path::new("."), &options);
        cache.resolve(&mut gpu, "a.png", TextureRole::Diffuse).unwrap();
        assert!(!gpu.calls.iter().any(|c| matches!(c, GpuCall::GenerateMipmaps(_))));
    }

    #[test]
    fn decode_failure_aborts_by_default() {
        let decoder = CountingDecoder::new().failing_on("assets/broken.png");
        let mut gpu = RecordingGpu::new();
        let mut cache = TextureCache::new(&decoder, Path::new("assets"), &LoadOptions::default());

        let err = cache
            .resolve(&mut gpu, "broken.png", TextureRole::Diffuse)
            .unwrap_err();
        match err {
            AssetError::TextureLoad { path, reason } => {
                assert_eq!(path, Path::new("assets/broken.png"));
                assert!(reason.contains("corrupt"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(gpu.texture_creations(), 0);
    }

    #[test]
    fn placeholder_policy_substitutes_and_caches() {
        let decoder = CountingDecoder::new().failing_on("broken.png");
        let mut gpu = RecordingGpu::new();
        let options = LoadOptions {
            missing_textures: MissingTexturePolicy::Placeholder,
            ..LoadOptions::default()
        };
        let mut cache = TextureCache::new(&decoder, Path::new(""), &options);

        let first = cache.resolve(&mut gpu, "broken.png", TextureRole::Diffuse).unwrap();
        let second = cache.resolve(&mut gpu, "broken.png", TextureRole::Diffuse).unwrap();
        assert_eq!(first.texture, second.texture);
        assert_eq!(decoder.count("broken.png"), 1);
        assert_eq!(gpu.texture_creations(), 1);
    }

    #[test]
    fn release_destroys_every_upload() {
        let decoder = CountingDecoder::new();
        let mut gpu = RecordingGpu::new();
        let mut cache = TextureCache::new(&decoder, Path::new("."), &LoadOptions::default());
        cache.resolve(&mut gpu, "a.png", TextureRole::Diffuse).unwrap();
        cache.resolve(&mut gpu, "b.png", TextureRole::Specular).unwrap();
        assert_eq!(gpu.live_textures.len(), 2);

        cache.release(&mut gpu);
        assert!(gpu.live_textures.is_empty());
    }
}
