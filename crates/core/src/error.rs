use std::path::PathBuf;

use thiserror::Error;

use crate::gpu::{GeometryId, TextureId};
use crate::material::TextureRole;

/// Failures raised while loading or drawing an asset.
///
/// Every variant names the path it concerns so callers can report it
/// directly and decide whether to abort or skip the asset.
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("failed to load asset {}: {reason}", path.display())]
    AssetLoad { path: PathBuf, reason: String },

    #[error("unsupported geometry in {} (mesh '{mesh}'): {reason}", path.display())]
    UnsupportedGeometry {
        path: PathBuf,
        mesh: String,
        reason: String,
    },

    #[error("failed to load texture {}: {reason}", path.display())]
    TextureLoad { path: PathBuf, reason: String },

    #[error("GPU resource error: {0}")]
    GpuResource(#[from] GpuError),
}

pub type AssetResult<T> = Result<T, AssetError>;

/// GPU-side failures. None of these are retried.
#[derive(Debug, Error)]
pub enum GpuError {
    #[error("out of GPU memory while creating {0}")]
    OutOfMemory(String),

    #[error("unknown geometry handle {0:?}")]
    UnknownGeometry(GeometryId),

    #[error("unknown texture handle {0:?}")]
    UnknownTexture(TextureId),

    #[error("texture unit {unit} is out of range (max {max})")]
    InvalidTextureUnit { unit: u32, max: u32 },

    #[error("no texture unit left for {role} texture #{index}")]
    TextureUnitsExhausted { role: TextureRole, index: u32 },

    #[error("invalid data for {label}: {reason}")]
    InvalidData { label: String, reason: String },

    #[error("graphics context lost")]
    ContextLost,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_path() {
        let err = AssetError::TextureLoad {
            path: PathBuf::from("models/crate/diffuse.png"),
            reason: "no such file".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("models/crate/diffuse.png"));
        assert!(msg.contains("no such file"));
    }

    #[test]
    fn gpu_errors_convert_into_asset_errors() {
        let err: AssetError = GpuError::ContextLost.into();
        assert!(matches!(err, AssetError::GpuResource(GpuError::ContextLost)));
    }
}
