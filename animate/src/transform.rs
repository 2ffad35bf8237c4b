use {
    nalgebra as na,
    serde::{Deserialize, Serialize},
};

/// Decomposed translation, rotation and scale of a node.
///
/// Composes as `T * R * S`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub translation: na::Vector3<f32>,
    pub rotation: na::UnitQuaternion<f32>,
    pub scale: na::Vector3<f32>,
}

impl Default for Transform {
    fn default() -> Self {
        Transform::identity()
    }
}

impl Transform {
    pub fn identity() -> Self {
        Transform {
            translation: na::Vector3::zeros(),
            rotation: na::UnitQuaternion::identity(),
            scale: na::Vector3::new(1.0, 1.0, 1.0),
        }
    }

    pub fn from_translation(translation: na::Vector3<f32>) -> Self {
        Transform {
            translation,
            ..Transform::identity()
        }
    }

    pub fn from_rotation(rotation: na::UnitQuaternion<f32>) -> Self {
        Transform {
            rotation,
            ..Transform::identity()
        }
    }

    pub fn from_parts(
        translation: na::Vector3<f32>,
        rotation: na::UnitQuaternion<f32>,
    ) -> Self {
        Transform {
            translation,
            rotation,
            scale: na::Vector3::new(1.0, 1.0, 1.0),
        }
    }

    pub fn with_scale(mut self, scale: na::Vector3<f32>) -> Self {
        self.scale = scale;
        self
    }

    pub fn to_homogeneous(&self) -> na::Matrix4<f32> {
        na::Matrix4::new_translation(&self.translation)
            * self.rotation.to_homogeneous()
            * na::Matrix4::new_nonuniform_scaling(&self.scale)
    }

    /// Splits an affine matrix back into translation, rotation and scale.
    ///
    /// A mirrored basis is reported as negative x scale. Skew cannot be
    /// represented and is folded into the rotation.
    pub fn from_homogeneous(matrix: &na::Matrix4<f32>) -> Self {
        let translation = matrix.fixed_view::<3, 1>(0, 3).into_owned();
        let mut linear = matrix.fixed_view::<3, 3>(0, 0).into_owned();

        let mut scale = na::Vector3::new(
            linear.column(0).norm(),
            linear.column(1).norm(),
            linear.column(2).norm(),
        );
        if linear.determinant() < 0.0 {
            scale.x = -scale.x;
        }

        for axis in 0..3 {
            // Collapsed axis, leave as is rather than produce NaN.
            if scale[axis] != 0.0 {
                let column = linear.column(axis) / scale[axis];
                linear.set_column(axis, &column);
            }
        }

        let rotation = na::UnitQuaternion::from_rotation_matrix(
            &na::Rotation3::from_matrix_unchecked(linear),
        );

        Transform {
            translation,
            rotation,
            scale,
        }
    }

    /// Inverse matrix of this transform, `None` if any scale is zero.
    pub fn inverse_homogeneous(&self) -> Option<na::Matrix4<f32>> {
        self.to_homogeneous().try_inverse()
    }

    pub fn inverse(&self) -> Option<Transform> {
        self.inverse_homogeneous()
            .map(|inverse| Transform::from_homogeneous(&inverse))
    }
}
