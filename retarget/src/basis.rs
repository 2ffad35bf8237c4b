use {
    crate::{bone_map::BoneMap, snapshot::SkeletonSnapshot},
    nalgebra as na,
};

/// Pair of rotations sandwiching a source local rotation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoneBasis {
    pub left: na::UnitQuaternion<f32>,
    pub right: na::UnitQuaternion<f32>,
}

impl BoneBasis {
    /// Converts source local rotation into target local rotation.
    pub fn apply(
        &self,
        rotation: &na::UnitQuaternion<f32>,
    ) -> na::UnitQuaternion<f32> {
        self.left * rotation * self.right
    }
}

/// Precomputed per-bone rotation bases plus root translation offset.
///
/// Indexed by source bone. Unmapped bones have no basis.
#[derive(Clone, Debug, PartialEq)]
pub struct RetargetBasis {
    bones: Box<[Option<BoneBasis>]>,
    root_offset: Option<na::Vector3<f32>>,
}

impl RetargetBasis {
    pub fn compute(
        source: &SkeletonSnapshot,
        target: &SkeletonSnapshot,
        map: &BoneMap,
    ) -> Self {
        let source_embedded = source.embedded();
        let target_embedded = target.embedded();

        let bones = (0..source.len())
            .map(|index| {
                let target_index = map
                    .target_index(index)
                    .filter(|&target_index| target_index < target.len())?;
                let source_bone = source.bone(index);
                let target_bone = target.bone(target_index);

                // Inverse source world, back out of the source container,
                // into the target container and its world.
                let mut right = target_bone.world().rotation;
                if let Some(embedded) = target_embedded {
                    right = embedded.forward.rotation * right;
                }
                if let Some(embedded) = source_embedded {
                    right = embedded.inverse.rotation * right;
                }
                right = source_bone.world_inverse().rotation * right;

                let mut left = na::UnitQuaternion::identity();
                if let Some(parent) = source_bone.parent() {
                    left = source.bone(parent).world().rotation * left;
                }
                if let Some(embedded) = source_embedded {
                    left = embedded.forward.rotation * left;
                }
                if let Some(embedded) = target_embedded {
                    left = embedded.inverse.rotation * left;
                }
                if let Some(parent) = target_bone.parent() {
                    left = target.bone(parent).world_inverse().rotation * left;
                }

                Some(BoneBasis { left, right })
            })
            .collect();

        let root_offset = match map.target_index(0) {
            Some(target_root) if !source.is_empty() && target_root < target.len() => {
                Some(
                    target.world_position(target_root)
                        - source.world_position(0),
                )
            }
            _ => None,
        };

        RetargetBasis { bones, root_offset }
    }

    pub fn get(&self, source: usize) -> Option<&BoneBasis> {
        self.bones.get(source).and_then(Option::as_ref)
    }

    pub fn len(&self) -> usize {
        self.bones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    /// Target root bind position minus source root bind position. `None`
    /// when the source root is not mapped.
    pub fn root_offset(&self) -> Option<&na::Vector3<f32>> {
        self.root_offset.as_ref()
    }
}
