//! Entry point for the model viewer.

use std::path::PathBuf;

use anyhow::Result;
use asset::{LoadOptions, MissingTexturePolicy};
use clap::{Parser, ValueEnum};
use platform::ViewerConfig;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
enum GpuBackend {
    #[default]
    Auto,
    #[value(alias = "vk")]
    Vulkan,
    #[value(alias = "d3d12")]
    Dx12,
    #[value(alias = "mtl")]
    Metal,
    #[value(alias = "opengl", alias = "gles")]
    Gl,
}

impl GpuBackend {
    fn backends(self) -> wgpu::Backends {
        match self {
            GpuBackend::Auto => wgpu::Backends::all(),
            GpuBackend::Vulkan => wgpu::Backends::VULKAN,
            GpuBackend::Dx12 => wgpu::Backends::DX12,
            GpuBackend::Metal => wgpu::Backends::METAL,
            GpuBackend::Gl => wgpu::Backends::GL,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
enum MissingTextures {
    /// Fail the whole load on the first unreadable texture.
    #[default]
    Abort,
    /// Substitute a checkerboard and keep going.
    Placeholder,
}

/// Load an OBJ model with its materials and spin it in a window.
#[derive(Debug, Parser)]
#[command(name = "model-viewer", version, about)]
struct Args {
    /// Path to the model file (textures resolve relative to its directory).
    model: PathBuf,

    #[arg(long, value_enum, default_value_t = GpuBackend::Auto)]
    gpu_backend: GpuBackend,

    /// Window size as WIDTHxHEIGHT.
    #[arg(long, value_parser = parse_size, default_value = "1280x720")]
    size: (u32, u32),

    /// Flip texture coordinates vertically at import time.
    #[arg(long)]
    flip_uvs: bool,

    /// Keep decoded images in file row order instead of flipping them.
    #[arg(long)]
    no_texture_flip: bool,

    /// Skip mipmap generation for loaded textures.
    #[arg(long)]
    no_mipmaps: bool,

    #[arg(long, value_enum, default_value_t = MissingTextures::Abort)]
    missing_textures: MissingTextures,
}

impl Args {
    fn load_options(&self) -> LoadOptions {
        LoadOptions {
            flip_uvs: self.flip_uvs,
            flip_textures_vertically: !self.no_texture_flip,
            generate_mipmaps: !self.no_mipmaps,
            missing_textures: match self.missing_textures {
                MissingTextures::Abort => MissingTexturePolicy::Abort,
                MissingTextures::Placeholder => MissingTexturePolicy::Placeholder,
            },
            ..LoadOptions::default()
        }
    }
}

fn parse_size(value: &str) -> Result<(u32, u32), String> {
    let (w, h) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{value}'"))?;
    let w: u32 = w.parse().map_err(|e| format!("bad width '{w}': {e}"))?;
    let h: u32 = h.parse().map_err(|e| format!("bad height '{h}': {e}"))?;
    Ok((w.max(1), h.max(1)))
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let (width, height) = args.size;
    log::info!(
        "Starting model viewer. Backend: {:?}, window_size={}x{}",
        args.gpu_backend,
        width,
        height
    );

    let config = ViewerConfig {
        model_path: args.model.clone(),
        backends: args.gpu_backend.backends(),
        width,
        height,
        load_options: args.load_options(),
    };
    platform::run_viewer(config)?;

    log::info!("Graceful shutdown. Bye!");
    Ok(())
}
