use {
    crate::{
        chain::LimbChains,
        error::RetargetError,
        normalize::{normalize_bind_pose, NormalizeConfig, NormalizeReport},
    },
    animate::{Hierarchy, Skeleton, Transform},
    nalgebra as na,
    serde::{Deserialize, Serialize},
    smallvec::SmallVec,
};

/// How a snapshot is taken from a live skeleton.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotOptions {
    /// Capture the current pose instead of resetting to the authored bind
    /// pose first.
    pub use_current_pose: bool,

    /// Freeze the container transform into the snapshot so later edits of
    /// the container do not affect retargeting.
    pub embed_world_transform: bool,
}

/// World transform of the skeleton's container, captured once.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EmbeddedTransform {
    pub forward: Transform,
    pub inverse: Transform,
}

#[derive(Clone, Debug)]
pub struct SnapshotBone {
    name: String,
    parent: Option<usize>,
    children: SmallVec<[usize; 4]>,
    local: Transform,
    world: Transform,
    world_inverse: Transform,
}

impl SnapshotBone {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<usize> {
        self.parent
    }

    pub fn children(&self) -> &[usize] {
        &self.children
    }

    pub fn local(&self) -> &Transform {
        &self.local
    }

    /// Transform in skeleton root space.
    pub fn world(&self) -> &Transform {
        &self.world
    }

    pub fn world_inverse(&self) -> &Transform {
        &self.world_inverse
    }
}

/// Immutable, normalized bind pose of a skeleton.
///
/// Owns all of its data. Nothing done to the live skeleton afterwards is
/// visible here.
#[derive(Clone, Debug)]
pub struct SkeletonSnapshot {
    bones: Box<[SnapshotBone]>,
    embedded: Option<EmbeddedTransform>,
}

impl SkeletonSnapshot {
    /// Resets (unless told to use the current pose) and normalizes the live
    /// skeleton, then captures it.
    ///
    /// Authored inverse bind matrices are reused only for the authored bind
    /// pose and only if normalization rotated nothing. Otherwise inverses
    /// are computed from the captured world matrices.
    pub fn capture(
        skeleton: &mut Skeleton,
        chains: &LimbChains,
        options: &SnapshotOptions,
        normalize: &NormalizeConfig,
    ) -> Result<(Self, NormalizeReport), RetargetError> {
        if options.use_current_pose {
            skeleton.update_world();
        } else {
            skeleton.reset_to_bind_pose();
        }

        let report = normalize_bind_pose(skeleton, chains, normalize)?;
        skeleton.update_world();

        let authored = match skeleton.inverse_binds() {
            Some(inverse_binds)
                if !options.use_current_pose && report.is_unchanged() =>
            {
                Some(inverse_binds)
            }
            _ => None,
        };

        let mut bones = Vec::with_capacity(skeleton.len());
        for (index, bone) in skeleton.bones().iter().enumerate() {
            let world = skeleton.world(index);
            let world_inverse = match authored {
                Some(inverse_binds) => inverse_binds[index],
                None => world.try_inverse().ok_or_else(|| {
                    RetargetError::DegenerateTransform {
                        bone: bone.name().to_owned(),
                    }
                })?,
            };

            bones.push(SnapshotBone {
                name: bone.name().to_owned(),
                parent: bone.parent(),
                children: SmallVec::from_slice(bone.children()),
                local: *bone.local(),
                world: Transform::from_homogeneous(world),
                world_inverse: Transform::from_homogeneous(&world_inverse),
            });
        }

        let embedded = match skeleton.container() {
            Some(container) if options.embed_world_transform => {
                let inverse = container.inverse().ok_or_else(|| {
                    RetargetError::DegenerateTransform {
                        bone: skeleton
                            .bones()
                            .first()
                            .map_or_else(String::new, |root| {
                                root.name().to_owned()
                            }),
                    }
                })?;
                Some(EmbeddedTransform {
                    forward: *container,
                    inverse,
                })
            }
            _ => None,
        };

        tracing::debug!(
            "Captured {} bones, authored inverses: {}, embedded: {}",
            bones.len(),
            authored.is_some(),
            embedded.is_some()
        );

        let snapshot = SkeletonSnapshot {
            bones: bones.into_boxed_slice(),
            embedded,
        };
        Ok((snapshot, report))
    }

    pub fn bones(&self) -> &[SnapshotBone] {
        &self.bones
    }

    pub fn bone(&self, index: usize) -> &SnapshotBone {
        &self.bones[index]
    }

    pub fn len(&self) -> usize {
        self.bones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    pub fn embedded(&self) -> Option<&EmbeddedTransform> {
        self.embedded.as_ref()
    }

    pub fn world_position(&self, index: usize) -> na::Vector3<f32> {
        self.bones[index].world.translation
    }
}

impl Hierarchy for SkeletonSnapshot {
    fn bone_count(&self) -> usize {
        self.bones.len()
    }

    fn bone_name(&self, index: usize) -> &str {
        &self.bones[index].name
    }

    fn parent_index(&self, index: usize) -> Option<usize> {
        self.bones[index].parent
    }
}
