use glam::{Mat4, Vec3};

use crate::vertex::Bounds;

/// Simple perspective camera (right-handed).
#[derive(Clone, Copy, Debug)]
pub struct Camera {
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub fov_y_rad: f32,
    pub z_near: f32,
    pub z_far: f32,
    pub aspect: f32,
}

impl Camera {
    pub fn new_perspective(eye: Vec3, target: Vec3, fov_y_rad: f32, aspect: f32) -> Self {
        Self {
            eye,
            target,
            up: Vec3::Y,
            fov_y_rad,
            z_near: 0.1,
            z_far: 100.0,
            aspect,
        }
    }

    /// Place the camera on +Z so the whole box fits the vertical field of view.
    pub fn framing(bounds: &Bounds, fov_y_rad: f32, aspect: f32) -> Self {
        let radius = bounds.radius().max(1e-3);
        let distance = radius / (fov_y_rad * 0.5).sin();
        let target = bounds.center();
        Self {
            eye: target + Vec3::Z * distance,
            target,
            up: Vec3::Y,
            fov_y_rad,
            z_near: (distance - radius).max(distance * 1e-3),
            z_far: distance + radius * 2.0,
            aspect,
        }
    }

    #[inline]
    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.target, self.up)
    }

    /// Depth range [0, 1], as wgpu expects.
    #[inline]
    pub fn proj(&self) -> Mat4 {
        Mat4::perspective_rh(
            self.fov_y_rad,
            self.aspect.max(1e-6),
            self.z_near,
            self.z_far,
        )
    }

    #[inline]
    pub fn with_aspect(mut self, aspect: f32) -> Self {
        self.aspect = aspect;
        self
    }
}
