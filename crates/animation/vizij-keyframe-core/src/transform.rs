use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

/// Local bone transform: translation, rotation and non-uniform scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub translation: Vector3<f32>,
    pub rotation: UnitQuaternion<f32>,
    pub scale: Vector3<f32>,
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform {
    pub fn new(
        translation: Vector3<f32>,
        rotation: UnitQuaternion<f32>,
        scale: Vector3<f32>,
    ) -> Self {
        Self {
            translation,
            rotation,
            scale,
        }
    }

    pub fn identity() -> Self {
        Self {
            translation: Vector3::zeros(),
            rotation: UnitQuaternion::identity(),
            scale: Vector3::repeat(1.0),
        }
    }

    pub fn from_translation(translation: Vector3<f32>) -> Self {
        Self {
            translation,
            ..Self::identity()
        }
    }

    pub fn from_rotation(rotation: UnitQuaternion<f32>) -> Self {
        Self {
            rotation,
            ..Self::identity()
        }
    }

    /// Exact comparison against the identity, as used when simplifying tracks.
    pub fn is_identity(&self) -> bool {
        self.translation == Vector3::zeros()
            && self.rotation == UnitQuaternion::identity()
            && self.scale == Vector3::repeat(1.0)
    }

    /// Blend toward `other`: lerp for translation and scale, slerp for rotation.
    pub fn blend(&self, other: &Transform, weight: f32) -> Transform {
        Transform {
            translation: self.translation.lerp(&other.translation, weight),
            rotation: self
                .rotation
                .try_slerp(&other.rotation, weight, 1.0e-6)
                .unwrap_or(self.rotation),
            scale: self.scale.lerp(&other.scale, weight),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn identity_checks() {
        assert!(Transform::identity().is_identity());
        assert!(Transform::default().is_identity());
        assert!(!Transform::from_translation(Vector3::new(0.0, 1.0, 0.0)).is_identity());
    }

    #[test]
    fn blend_halfway() {
        let a = Transform::identity();
        let b = Transform::new(
            Vector3::new(2.0, 0.0, 0.0),
            UnitQuaternion::from_euler_angles(0.0, 0.0, std::f32::consts::FRAC_PI_2),
            Vector3::new(3.0, 1.0, 1.0),
        );
        let mid = a.blend(&b, 0.5);
        assert_relative_eq!(mid.translation, Vector3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(mid.scale, Vector3::new(2.0, 1.0, 1.0));
        assert_relative_eq!(
            mid.rotation.angle(),
            std::f32::consts::FRAC_PI_4,
            epsilon = 1e-5
        );
    }
}
