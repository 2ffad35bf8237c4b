#![allow(dead_code)]

use {
    animate::{Bone, Skeleton, Transform},
    nalgebra as na,
};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn at(x: f32, y: f32, z: f32) -> Transform {
    Transform::from_translation(na::Vector3::new(x, y, z))
}

fn turned(
    transform: Transform,
    axis: na::Unit<na::Vector3<f32>>,
    angle: f32,
) -> Transform {
    Transform {
        rotation: na::UnitQuaternion::from_axis_angle(&axis, angle),
        ..transform
    }
}

/// Humanoid in T-pose facing +Z, left hand towards +X, hips one unit
/// above the origin.
pub fn humanoid_bones(prefix: &str) -> Vec<Bone> {
    let name = |bone: &str| format!("{}{}", prefix, bone);
    vec![
        Bone::new(name("Hips"), None, at(0.0, 1.0, 0.0)),
        Bone::new(name("Spine"), Some(0), at(0.0, 0.1, 0.0)),
        Bone::new(name("Spine1"), Some(1), at(0.0, 0.1, 0.0)),
        Bone::new(name("Spine2"), Some(2), at(0.0, 0.1, 0.0)),
        Bone::new(name("Neck"), Some(3), at(0.0, 0.1, 0.0)),
        Bone::new(name("LeftShoulder"), Some(3), at(0.05, 0.05, 0.0)),
        Bone::new(name("LeftArm"), Some(5), at(0.1, 0.0, 0.0)),
        Bone::new(name("LeftForeArm"), Some(6), at(0.25, 0.0, 0.0)),
        Bone::new(name("LeftHand"), Some(7), at(0.25, 0.0, 0.0)),
        Bone::new(name("RightShoulder"), Some(3), at(-0.05, 0.05, 0.0)),
        Bone::new(name("RightArm"), Some(9), at(-0.1, 0.0, 0.0)),
        Bone::new(name("RightForeArm"), Some(10), at(-0.25, 0.0, 0.0)),
        Bone::new(name("RightHand"), Some(11), at(-0.25, 0.0, 0.0)),
        Bone::new(name("LeftUpLeg"), Some(0), at(0.1, -0.05, 0.0)),
        Bone::new(name("LeftLeg"), Some(13), at(0.0, -0.45, 0.0)),
        Bone::new(name("LeftFoot"), Some(14), at(0.0, -0.45, 0.0)),
        Bone::new(name("RightUpLeg"), Some(0), at(-0.1, -0.05, 0.0)),
        Bone::new(name("RightLeg"), Some(16), at(0.0, -0.45, 0.0)),
        Bone::new(name("RightFoot"), Some(17), at(0.0, -0.45, 0.0)),
    ]
}

pub fn humanoid() -> Skeleton {
    Skeleton::new(humanoid_bones("")).unwrap()
}

pub fn mixamo_humanoid() -> Skeleton {
    Skeleton::new(humanoid_bones("mixamorig:")).unwrap()
}

/// Same proportions as [`humanoid`], turned away from +Z with arms
/// lowered, elbows bent and legs apart.
pub fn a_pose_humanoid() -> Skeleton {
    let mut bones = humanoid_bones("");
    let edits = [
        (0, na::Vector3::y_axis(), 0.6),
        (6, na::Vector3::z_axis(), -0.7),
        (7, na::Vector3::y_axis(), 0.5),
        (10, na::Vector3::z_axis(), 0.7),
        (11, na::Vector3::y_axis(), -0.5),
        (13, na::Vector3::z_axis(), 0.3),
        (16, na::Vector3::z_axis(), -0.3),
    ];
    for &(index, axis, angle) in &edits {
        let bone = &bones[index];
        bones[index] = Bone::new(
            bone.name(),
            bone.parent(),
            turned(*bone.local(), axis, angle),
        );
    }
    Skeleton::new(bones).unwrap()
}

/// Root and a single child one unit above it.
pub fn two_bones(root: na::Vector3<f32>, child: na::UnitQuaternion<f32>) -> Skeleton {
    Skeleton::new(vec![
        Bone::new("Root", None, Transform::from_translation(root)),
        Bone::new(
            "Child",
            Some(0),
            Transform::from_parts(na::Vector3::new(0.0, 1.0, 0.0), child),
        ),
    ])
    .unwrap()
}

/// Angle between base to end direction of a bone pair and `axis`.
pub fn deviation(
    skeleton: &Skeleton,
    base: usize,
    end: usize,
    axis: na::Vector3<f32>,
) -> f32 {
    (skeleton.global_position(end) - skeleton.global_position(base)).angle(&axis)
}
