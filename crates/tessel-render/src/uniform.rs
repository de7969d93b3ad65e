// SPDX-License-Identifier: CEPL-1.0
use std::f32::consts::FRAC_PI_2;
use std::time::Duration;

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

use crate::RenderSize;

/// Per-frame state written into the acquired image's uniform buffer.
///
/// Layout matches `layout(set = 0, binding = 0) uniform Transform { mat4 }`.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct FrameUniform {
    pub transform: [[f32; 4]; 4],
}

impl FrameUniform {
    /// Quarter turn per second.
    pub const SPIN_RATE: f32 = FRAC_PI_2;

    /// Spins the mesh around Z and squashes the long axis so it keeps its
    /// proportions on non-square surfaces.
    pub fn at(elapsed: Duration, extent: RenderSize) -> Self {
        let angle = elapsed.as_secs_f32() * Self::SPIN_RATE;
        let aspect = extent.aspect();
        let scale = if aspect >= 1.0 {
            Vec3::new(1.0 / aspect, 1.0, 1.0)
        } else {
            Vec3::new(1.0, aspect, 1.0)
        };
        let transform = Mat4::from_scale(scale) * Mat4::from_rotation_z(angle);
        Self {
            transform: transform.to_cols_array_2d(),
        }
    }

    pub fn identity() -> Self {
        Self {
            transform: Mat4::IDENTITY.to_cols_array_2d(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    fn apply(u: &FrameUniform, p: Vec4) -> Vec4 {
        Mat4::from_cols_array_2d(&u.transform) * p
    }

    #[test]
    fn square_surface_at_time_zero_is_identity() {
        let u = FrameUniform::at(Duration::ZERO, RenderSize::new(600, 600));
        assert_eq!(u, FrameUniform::identity());
    }

    #[test]
    fn one_second_is_a_quarter_turn() {
        let u = FrameUniform::at(Duration::from_secs(1), RenderSize::new(600, 600));
        let p = apply(&u, Vec4::new(1.0, 0.0, 0.0, 1.0));
        assert!((p.x - 0.0).abs() < 1e-5, "{p:?}");
        assert!((p.y - 1.0).abs() < 1e-5, "{p:?}");
    }

    #[test]
    fn wide_surface_squashes_x() {
        let u = FrameUniform::at(Duration::ZERO, RenderSize::new(800, 400));
        let p = apply(&u, Vec4::new(1.0, 1.0, 0.0, 1.0));
        assert!((p.x - 0.5).abs() < 1e-6);
        assert!((p.y - 1.0).abs() < 1e-6);
    }

    #[test]
    fn uniform_is_one_mat4() {
        assert_eq!(FrameUniform::identity().as_bytes().len(), 64);
    }
}
