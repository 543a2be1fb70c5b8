//! Texture roles and the per-role sampler/unit naming convention.

use std::fmt;

use crate::gpu::TextureId;

/// Texture units reserved for each role. Role `r` owns units
/// `r.slot() * UNITS_PER_ROLE .. (r.slot() + 1) * UNITS_PER_ROLE`.
pub const UNITS_PER_ROLE: u32 = 4;

/// What a texture is used for during shading.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum TextureRole {
    Diffuse,
    Specular,
    Normal,
    Height,
}

impl TextureRole {
    /// Every role, in the order material textures are collected.
    pub const ALL: [TextureRole; 4] = [
        TextureRole::Diffuse,
        TextureRole::Specular,
        TextureRole::Normal,
        TextureRole::Height,
    ];

    pub const COUNT: usize = Self::ALL.len();

    #[inline]
    pub fn slot(self) -> usize {
        match self {
            Self::Diffuse => 0,
            Self::Specular => 1,
            Self::Normal => 2,
            Self::Height => 3,
        }
    }

    pub fn uniform_prefix(self) -> &'static str {
        match self {
            Self::Diffuse => "texture_diffuse",
            Self::Specular => "texture_specular",
            Self::Normal => "texture_normal",
            Self::Height => "texture_height",
        }
    }

    /// Sampler uniform for the `index`-th (1-based) texture of this role,
    /// e.g. `material.texture_diffuse1`.
    pub fn sampler_name(self, index: u32) -> String {
        format!("material.{}{}", self.uniform_prefix(), index)
    }

    /// Texture unit for the `index`-th (1-based) texture of this role, or
    /// `None` once the role's block of units is used up.
    pub fn texture_unit(self, index: u32) -> Option<u32> {
        if index == 0 || index > UNITS_PER_ROLE {
            return None;
        }
        Some(self.slot() as u32 * UNITS_PER_ROLE + index - 1)
    }
}

impl fmt::Display for TextureRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Diffuse => "diffuse",
            Self::Specular => "specular",
            Self::Normal => "normal",
            Self::Height => "height",
        };
        f.write_str(name)
    }
}

/// A GPU texture attached to a primitive group.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextureBinding {
    pub texture: TextureId,
    pub role: TextureRole,
    /// Path as written in the source material; the texture cache key.
    pub path: String,
}

/// Independent 1-based counters, one per role.
#[derive(Clone, Copy, Debug, Default)]
pub struct RoleCounters([u32; TextureRole::COUNT]);

impl RoleCounters {
    /// Advance the counter for `role` and return its new value.
    pub fn next(&mut self, role: TextureRole) -> u32 {
        let counter = &mut self.0[role.slot()];
        *counter += 1;
        *counter
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sampler_names_are_one_based() {
        assert_eq!(TextureRole::Diffuse.sampler_name(1), "material.texture_diffuse1");
        assert_eq!(TextureRole::Specular.sampler_name(2), "material.texture_specular2");
    }

    #[test]
    fn roles_own_disjoint_unit_blocks() {
        assert_eq!(TextureRole::Diffuse.texture_unit(1), Some(0));
        assert_eq!(TextureRole::Diffuse.texture_unit(2), Some(1));
        assert_eq!(TextureRole::Specular.texture_unit(1), Some(UNITS_PER_ROLE));
        assert_eq!(TextureRole::Height.texture_unit(UNITS_PER_ROLE), Some(15));
        assert_eq!(TextureRole::Diffuse.texture_unit(0), None);
        assert_eq!(TextureRole::Normal.texture_unit(UNITS_PER_ROLE + 1), None);
    }

    #[test]
    fn counters_are_independent_per_role() {
        let mut counters = RoleCounters::default();
        assert_eq!(counters.next(TextureRole::Diffuse), 1);
        assert_eq!(counters.next(TextureRole::Specular), 1);
        assert_eq!(counters.next(TextureRole::Diffuse), 2);
    }
}
