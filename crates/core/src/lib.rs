//! Core shared types and errors (renderer-agnostic).
//!
//! Holds the vertex layout, texture roles, the typed error kinds and the two
//! collaborator seams ([`GpuDevice`], [`ShaderProgram`]) that loaders and
//! backends meet at.

pub use glam::{Mat4, Vec3, vec3};

pub mod camera;
pub mod error;
pub mod gpu;
pub mod material;
pub mod vertex;

pub use error::{AssetError, AssetResult, GpuError};
pub use gpu::{GeometryId, GpuDevice, PixelFormat, ShaderProgram, TextureId, TextureUpload};
pub use material::{RoleCounters, TextureBinding, TextureRole, UNITS_PER_ROLE};
pub use vertex::{Bounds, Vertex};
