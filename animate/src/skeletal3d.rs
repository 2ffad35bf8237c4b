use {
    crate::transform::Transform,
    nalgebra as na,
    smallvec::SmallVec,
};

/// Name and parent lookup shared by live skeletons and their snapshots.
pub trait Hierarchy {
    fn bone_count(&self) -> usize;

    fn bone_name(&self, index: usize) -> &str;

    fn parent_index(&self, index: usize) -> Option<usize>;

    /// Index of the first bone named exactly `name`.
    fn find_bone(&self, name: &str) -> Option<usize> {
        (0..self.bone_count()).find(|&index| self.bone_name(index) == name)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SkeletonError {
    #[error("Bone {bone} references parent {parent} which is out of range")]
    ParentOutOfRange { bone: usize, parent: usize },

    #[error("Bone {bone} is its own parent")]
    SelfParent { bone: usize },

    #[error("Skeleton has no root bone")]
    NoRoot,

    #[error("Skeleton has more than one root ({first} and {second})")]
    MultipleRoots { first: usize, second: usize },

    #[error("Root bone must come first, found at {root}")]
    RootNotFirst { root: usize },

    #[error("Bone {bone} is part of a parent cycle")]
    Cycle { bone: usize },

    #[error("Expected {expected} inverse bind matrices, got {got}")]
    InverseBindCount { expected: usize, got: usize },
}

/// Single joint of the skeleton.
#[derive(Clone, Debug)]
pub struct Bone {
    name: String,
    parent: Option<usize>,
    children: SmallVec<[usize; 4]>,
    local: Transform,
}

impl Bone {
    pub fn new(
        name: impl Into<String>,
        parent: Option<usize>,
        local: Transform,
    ) -> Self {
        Bone {
            name: name.into(),
            parent,
            children: SmallVec::new(),
            local,
        }
    }

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
}

/// Tree-like structure of bones/joints.
///
/// Owned and animated by the application. World matrices are cached and
/// only refreshed by [`Skeleton::update_world`] and
/// [`Skeleton::update_subtree`].
#[derive(Clone, Debug)]
pub struct Skeleton {
    bones: Box<[Bone]>,
    bind: Box<[Transform]>,
    inverse_binds: Option<Box<[na::Matrix4<f32>]>>,
    world: Box<[na::Matrix4<f32>]>,
    container: Option<Transform>,
}

impl Skeleton {
    /// Builds skeleton from bones listed root first.
    ///
    /// Current local transforms become the authored bind pose.
    pub fn new(bones: Vec<Bone>) -> Result<Self, SkeletonError> {
        let mut bones = bones.into_boxed_slice();
        validate(&bones)?;

        for bone in bones.iter_mut() {
            bone.children.clear();
        }
        for index in 0..bones.len() {
            if let Some(parent) = bones[index].parent {
                bones[parent].children.push(index);
            }
        }

        let bind = bones.iter().map(|bone| bone.local).collect();
        let world = bones.iter().map(|_| na::Matrix4::identity()).collect();

        let mut skeleton = Skeleton {
            bones,
            bind,
            inverse_binds: None,
            world,
            container: None,
        };
        skeleton.update_world();
        Ok(skeleton)
    }

    /// Attaches authored inverse bind matrices, one per bone, in skeleton
    /// root space.
    pub fn with_inverse_binds(
        mut self,
        inverse_binds: Vec<na::Matrix4<f32>>,
    ) -> Result<Self, SkeletonError> {
        if inverse_binds.len() != self.bones.len() {
            return Err(SkeletonError::InverseBindCount {
                expected: self.bones.len(),
                got: inverse_binds.len(),
            });
        }
        self.inverse_binds = Some(inverse_binds.into_boxed_slice());
        Ok(self)
    }

    /// Places the skeleton under an external node with given world
    /// transform.
    pub fn with_container(mut self, container: Transform) -> Self {
        self.container = Some(container);
        self
    }

    pub fn set_container(&mut self, container: Option<Transform>) {
        self.container = container;
    }

    pub fn container(&self) -> Option<&Transform> {
        self.container.as_ref()
    }

    pub fn bones(&self) -> &[Bone] {
        &self.bones
    }

    pub fn bone(&self, index: usize) -> &Bone {
        &self.bones[index]
    }

    pub fn len(&self) -> usize {
        self.bones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    pub fn bind_pose(&self) -> &[Transform] {
        &self.bind
    }

    pub fn inverse_binds(&self) -> Option<&[na::Matrix4<f32>]> {
        self.inverse_binds.as_deref()
    }

    pub fn local(&self, index: usize) -> &Transform {
        &self.bones[index].local
    }

    pub fn set_local(&mut self, index: usize, local: Transform) {
        self.bones[index].local = local;
    }

    pub fn set_local_rotation(
        &mut self,
        index: usize,
        rotation: na::UnitQuaternion<f32>,
    ) {
        self.bones[index].local.rotation = rotation;
    }

    /// Bone's matrix in skeleton root space, as of the last refresh.
    pub fn world(&self, index: usize) -> &na::Matrix4<f32> {
        &self.world[index]
    }

    /// Bone's matrix with the container transform applied.
    pub fn global(&self, index: usize) -> na::Matrix4<f32> {
        match &self.container {
            Some(container) => container.to_homogeneous() * self.world[index],
            None => self.world[index],
        }
    }

    pub fn global_position(&self, index: usize) -> na::Vector3<f32> {
        self.global(index).fixed_view::<3, 1>(0, 3).into_owned()
    }

    pub fn global_rotation(&self, index: usize) -> na::UnitQuaternion<f32> {
        Transform::from_homogeneous(&self.global(index)).rotation
    }

    /// Rotation of whatever the bone is attached to. Container for the
    /// root.
    pub fn parent_global_rotation(
        &self,
        index: usize,
    ) -> na::UnitQuaternion<f32> {
        match self.bones[index].parent {
            Some(parent) => self.global_rotation(parent),
            None => self
                .container
                .map_or_else(na::UnitQuaternion::identity, |c| c.rotation),
        }
    }

    pub fn update_world(&mut self) {
        if !self.bones.is_empty() {
            self.update_subtree(0);
        }
    }

    /// Refreshes world matrices of the bone and all its descendants.
    /// Parent's world matrix must be up to date.
    pub fn update_subtree(&mut self, index: usize) {
        let mut stack: SmallVec<[usize; 16]> = SmallVec::new();
        stack.push(index);

        while let Some(bone) = stack.pop() {
            let local = self.bones[bone].local.to_homogeneous();
            self.world[bone] = match self.bones[bone].parent {
                Some(parent) => self.world[parent] * local,
                None => local,
            };
            stack.extend(self.bones[bone].children.iter().copied());
        }
    }

    /// Returns bones to the authored bind pose.
    ///
    /// Uses inverse bind matrices when attached, captured bind locals
    /// otherwise.
    pub fn reset_to_bind_pose(&mut self) {
        match &self.inverse_binds {
            Some(inverse_binds) => {
                for (index, bone) in self.bones.iter_mut().enumerate() {
                    let world = match inverse_binds[index].try_inverse() {
                        Some(world) => world,
                        None => {
                            tracing::warn!(
                                "Inverse bind matrix of bone `{}` is singular",
                                bone.name
                            );
                            continue;
                        }
                    };
                    let local = match bone.parent {
                        Some(parent) => inverse_binds[parent] * world,
                        None => world,
                    };
                    bone.local = Transform::from_homogeneous(&local);
                }
            }
            None => {
                for (bone, bind) in self.bones.iter_mut().zip(self.bind.iter())
                {
                    bone.local = *bind;
                }
            }
        }
        self.update_world();
    }

    /// Rewrites local rotations only from the inverse bind matrices.
    /// Translations and scales are kept. No-op without inverse binds.
    pub fn force_bind_pose_rotations(&mut self, skip_root: bool) {
        let inverse_binds = match &self.inverse_binds {
            Some(inverse_binds) => inverse_binds,
            None => return,
        };

        for (index, bone) in self.bones.iter_mut().enumerate() {
            if skip_root && bone.parent.is_none() {
                continue;
            }
            let world = match inverse_binds[index].try_inverse() {
                Some(world) => world,
                None => continue,
            };
            let local = match bone.parent {
                Some(parent) => inverse_binds[parent] * world,
                None => world,
            };
            bone.local.rotation = Transform::from_homogeneous(&local).rotation;
        }
        self.update_world();
    }
}

impl Hierarchy for Skeleton {
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

fn validate(bones: &[Bone]) -> Result<(), SkeletonError> {
    if bones.is_empty() {
        return Ok(());
    }

    let mut root = None;
    for (index, bone) in bones.iter().enumerate() {
        match bone.parent {
            Some(parent) if parent >= bones.len() => {
                return Err(SkeletonError::ParentOutOfRange {
                    bone: index,
                    parent,
                });
            }
            Some(parent) if parent == index => {
                return Err(SkeletonError::SelfParent { bone: index });
            }
            Some(_) => {}
            None => match root {
                None => root = Some(index),
                Some(first) => {
                    return Err(SkeletonError::MultipleRoots {
                        first,
                        second: index,
                    });
                }
            },
        }
    }

    match root {
        None => return Err(SkeletonError::NoRoot),
        Some(0) => {}
        Some(root) => return Err(SkeletonError::RootNotFirst { root }),
    }

    // Every chain of parents must reach the root within `len` steps.
    for index in 0..bones.len() {
        let mut current = index;
        let mut steps = 0;
        while let Some(parent) = bones[current].parent {
            current = parent;
            steps += 1;
            if steps > bones.len() {
                return Err(SkeletonError::Cycle { bone: index });
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use {super::*, approx::assert_relative_eq};

    fn arm() -> Skeleton {
        Skeleton::new(vec![
            Bone::new(
                "root",
                None,
                Transform::from_translation(na::Vector3::new(0.0, 1.0, 0.0)),
            ),
            Bone::new(
                "upper",
                Some(0),
                Transform::from_parts(
                    na::Vector3::new(1.0, 0.0, 0.0),
                    na::UnitQuaternion::from_axis_angle(
                        &na::Vector3::z_axis(),
                        std::f32::consts::FRAC_PI_2,
                    ),
                ),
            ),
            Bone::new(
                "lower",
                Some(1),
                Transform::from_translation(na::Vector3::new(1.0, 0.0, 0.0)),
            ),
        ])
        .unwrap()
    }

    #[test]
    fn world_composes_parents() {
        let skeleton = arm();
        let lower = skeleton.global_position(2);

        assert_relative_eq!(lower, na::Vector3::new(1.0, 2.0, 0.0), epsilon = 1e-5);
        assert_eq!(skeleton.bone(0).children(), &[1]);
        assert_eq!(skeleton.bone(1).children(), &[2]);
    }

    #[test]
    fn container_applies_on_top_of_root() {
        let skeleton = arm().with_container(Transform::from_translation(
            na::Vector3::new(0.0, 0.0, 5.0),
        ));

        assert_relative_eq!(
            skeleton.global_position(0),
            na::Vector3::new(0.0, 1.0, 5.0),
            epsilon = 1e-6
        );
        assert_relative_eq!(
            skeleton.world(0).fixed_view::<3, 1>(0, 3).into_owned(),
            na::Vector3::new(0.0, 1.0, 0.0),
            epsilon = 1e-6
        );
    }

    #[test]
    fn subtree_refresh_moves_descendants_only() {
        let mut skeleton = arm();
        skeleton.set_local_rotation(1, na::UnitQuaternion::identity());
        skeleton.update_subtree(1);

        assert_relative_eq!(
            skeleton.global_position(2),
            na::Vector3::new(2.0, 1.0, 0.0),
            epsilon = 1e-5
        );
    }

    #[test]
    fn reset_restores_bind_locals() {
        let mut skeleton = arm();
        skeleton.set_local_rotation(
            1,
            na::UnitQuaternion::from_axis_angle(&na::Vector3::x_axis(), 1.0),
        );
        skeleton.update_world();
        skeleton.reset_to_bind_pose();

        assert_relative_eq!(
            skeleton.global_position(2),
            na::Vector3::new(1.0, 2.0, 0.0),
            epsilon = 1e-5
        );
    }

    #[test]
    fn reset_prefers_inverse_binds() {
        let bound = arm();
        let inverse_binds = (0..bound.len())
            .map(|index| bound.world(index).try_inverse().unwrap())
            .collect();

        let mut skeleton = arm().with_inverse_binds(inverse_binds).unwrap();
        skeleton.set_local(1, Transform::identity());
        skeleton.update_world();
        skeleton.reset_to_bind_pose();

        assert_relative_eq!(
            skeleton.global_position(2),
            na::Vector3::new(1.0, 2.0, 0.0),
            epsilon = 1e-5
        );
    }

    #[test]
    fn force_bind_rotations_keeps_translation() {
        let bound = arm();
        let inverse_binds = (0..bound.len())
            .map(|index| bound.world(index).try_inverse().unwrap())
            .collect();

        let mut skeleton = arm().with_inverse_binds(inverse_binds).unwrap();
        skeleton.set_local(
            1,
            Transform::from_translation(na::Vector3::new(3.0, 0.0, 0.0)),
        );
        skeleton.force_bind_pose_rotations(true);

        assert_relative_eq!(
            skeleton.local(1).translation,
            na::Vector3::new(3.0, 0.0, 0.0),
            epsilon = 1e-6
        );
        assert!(
            skeleton
                .local(1)
                .rotation
                .angle_to(&bound.local(1).rotation)
                < 1e-5
        );
    }

    #[test]
    fn rejects_malformed_trees() {
        let identity = Transform::identity();

        assert_eq!(
            Skeleton::new(vec![
                Bone::new("a", None, identity),
                Bone::new("b", None, identity),
            ])
            .unwrap_err(),
            SkeletonError::MultipleRoots { first: 0, second: 1 }
        );
        assert_eq!(
            Skeleton::new(vec![
                Bone::new("a", Some(1), identity),
                Bone::new("b", None, identity),
            ])
            .unwrap_err(),
            SkeletonError::RootNotFirst { root: 1 }
        );
        assert_eq!(
            Skeleton::new(vec![
                Bone::new("a", None, identity),
                Bone::new("b", Some(2), identity),
                Bone::new("c", Some(1), identity),
            ])
            .unwrap_err(),
            SkeletonError::Cycle { bone: 1 }
        );
        assert_eq!(
            Skeleton::new(vec![
                Bone::new("a", None, identity),
                Bone::new("b", Some(7), identity),
            ])
            .unwrap_err(),
            SkeletonError::ParentOutOfRange { bone: 1, parent: 7 }
        );
    }

    #[test]
    fn empty_skeleton_is_allowed() {
        let mut skeleton = Skeleton::new(Vec::new()).unwrap();
        skeleton.reset_to_bind_pose();
        assert!(skeleton.is_empty());
        assert_eq!(skeleton.find_bone("anything"), None);
    }

    #[test]
    fn find_bone_is_exact() {
        let skeleton = arm();
        assert_eq!(skeleton.find_bone("lower"), Some(2));
        assert_eq!(skeleton.find_bone("Lower"), None);
    }
}
