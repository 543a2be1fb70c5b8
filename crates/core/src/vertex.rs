//! Fixed vertex layout shared by loaders and GPU backends.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

/// Position, normal and texture coordinate, tightly packed.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub tex_coords: [f32; 2],
}

impl Vertex {
    /// Byte stride between consecutive vertices.
    pub const STRIDE: usize = std::mem::size_of::<Vertex>();
    pub const NORMAL_OFFSET: usize = std::mem::offset_of!(Vertex, normal);
    pub const TEX_COORDS_OFFSET: usize = std::mem::offset_of!(Vertex, tex_coords);

    pub fn new(position: [f32; 3], normal: [f32; 3], tex_coords: [f32; 2]) -> Self {
        Self {
            position,
            normal,
            tex_coords,
        }
    }
}

/// Axis-aligned bounding box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    pub min: Vec3,
    pub max: Vec3,
}

impl Bounds {
    /// Smallest box containing every vertex, or `None` for no vertices.
    pub fn from_vertices<'a>(vertices: impl IntoIterator<Item = &'a Vertex>) -> Option<Self> {
        vertices.into_iter().fold(None, |acc, v| {
            let p = Vec3::from(v.position);
            Some(match acc {
                None => Bounds { min: p, max: p },
                Some(b) => Bounds {
                    min: b.min.min(p),
                    max: b.max.max(p),
                },
            })
        })
    }

    pub fn union(self, other: Bounds) -> Bounds {
        Bounds {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    #[inline]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    #[inline]
    pub fn radius(&self) -> f32 {
        (self.max - self.min).length() * 0.5
    }
}
