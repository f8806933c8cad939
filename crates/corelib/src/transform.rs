use crate::{EulerRot, Mat4, Quat, Vec3};

/// Translation / Euler rotation / scale triple that produces a model matrix.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    /// Radians, XYZ order.
    pub rotation_euler: Vec3,
    pub scale: Vec3,
}

impl Transform {
    #[inline]
    pub const fn identity() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation_euler: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }

    #[inline]
    pub fn from_trs(translation: Vec3, rotation_euler: Vec3, scale: Vec3) -> Self {
        Self {
            translation,
            rotation_euler,
            scale,
        }
    }

    #[inline]
    pub fn rotated(mut self, delta_euler: Vec3) -> Self {
        self.rotation_euler += delta_euler;
        self
    }

    /// T * R * S, column-major as glam stores it.
    #[inline]
    pub fn matrix(&self) -> Mat4 {
        let q = Quat::from_euler(
            EulerRot::XYZ,
            self.rotation_euler.x,
            self.rotation_euler.y,
            self.rotation_euler.z,
        );
        Mat4::from_scale_rotation_translation(self.scale, q, self.translation)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl From<Transform> for Mat4 {
    fn from(t: Transform) -> Mat4 {
        t.matrix()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vec3;

    #[test]
    fn rotated_accumulates_angles() {
        let t = Transform::identity()
            .rotated(vec3(0.1, 0.0, 0.0))
            .rotated(vec3(0.1, 0.2, 0.0));
        assert!((t.rotation_euler.x - 0.2).abs() < 1e-6);
        assert!((t.rotation_euler.y - 0.2).abs() < 1e-6);
        assert_eq!(t.translation, Vec3::ZERO);
    }
}
