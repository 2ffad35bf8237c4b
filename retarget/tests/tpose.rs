//! Bind pose normalization on full humanoids.

mod common;

use {
    animate::Skeleton,
    nalgebra as na,
    retarget::{
        normalize_bind_pose, BoneMap, Limb, MappingConfig, NormalizeConfig,
        NormalizeReport,
    },
};

const HIPS: usize = 0;
const SPINE2: usize = 3;
const LEFT_ARM: usize = 6;
const LEFT_HAND: usize = 8;
const RIGHT_ARM: usize = 10;
const RIGHT_HAND: usize = 12;
const LEFT_UP_LEG: usize = 13;
const LEFT_LEG: usize = 14;
const RIGHT_UP_LEG: usize = 16;
const RIGHT_LEG: usize = 17;

/// Slack for float error on top of the tolerance.
const SLACK: f32 = 1e-3;

fn normalize(skeleton: &mut Skeleton) -> NormalizeReport {
    let map = BoneMap::resolve(
        &*skeleton,
        &*skeleton,
        None,
        &MappingConfig::default(),
    );
    normalize_bind_pose(skeleton, &map.source_chains(), &NormalizeConfig::default())
        .unwrap()
}

fn plane_normal(skeleton: &Skeleton) -> na::Vector3<f32> {
    let arm = skeleton.global_position(LEFT_HAND)
        - skeleton.global_position(LEFT_ARM);
    let spine =
        skeleton.global_position(SPINE2) - skeleton.global_position(HIPS);
    arm.normalize().cross(&spine.normalize())
}

fn assert_t_pose(skeleton: &Skeleton, tolerance: f32) {
    let checks = [
        (
            "left arm",
            common::deviation(skeleton, LEFT_ARM, LEFT_HAND, na::Vector3::x()),
        ),
        (
            "right arm",
            common::deviation(skeleton, RIGHT_ARM, RIGHT_HAND, -na::Vector3::x()),
        ),
        (
            "left leg",
            common::deviation(skeleton, LEFT_UP_LEG, LEFT_LEG, -na::Vector3::y()),
        ),
        (
            "right leg",
            common::deviation(skeleton, RIGHT_UP_LEG, RIGHT_LEG, -na::Vector3::y()),
        ),
        ("arm plane", plane_normal(skeleton).angle(&na::Vector3::z())),
    ];

    for &(what, angle) in &checks {
        assert!(
            angle <= tolerance + SLACK,
            "{} deviates by {} rad",
            what,
            angle
        );
    }
}

#[test]
fn t_pose_is_left_alone() {
    common::init_tracing();
    let mut skeleton = common::humanoid();

    let report = normalize(&mut skeleton);

    assert!(report.is_unchanged());
    assert!(report.skipped.is_empty());
    assert_t_pose(&skeleton, 0.0);
}

#[test]
fn a_pose_converges_to_t_pose() {
    common::init_tracing();
    let mut skeleton = common::a_pose_humanoid();

    let report = normalize(&mut skeleton);

    assert!(report.skipped.is_empty(), "{:?}", report.skipped);
    for &limb in &Limb::NORMALIZE_ORDER {
        assert!(
            report.corrections.iter().any(|c| c.limb == limb),
            "{:?} was not corrected",
            limb
        );
    }
    assert_t_pose(&skeleton, NormalizeConfig::default().tolerance);
}

#[test]
fn second_pass_changes_nothing() {
    let mut skeleton = common::a_pose_humanoid();
    normalize(&mut skeleton);

    let report = normalize(&mut skeleton);
    assert!(report.is_unchanged(), "{:?}", report.corrections);
}

#[test]
fn prefixed_rig_is_normalized_through_detected_chains() {
    let mut skeleton = common::mixamo_humanoid();
    let map = BoneMap::resolve(
        &skeleton,
        &skeleton,
        None,
        &MappingConfig::default(),
    );

    assert_eq!(map.chains().left_arm.base, "mixamorig:LeftArm");
    assert_eq!(map.chains().spine.end, "mixamorig:Spine2");

    let report = normalize_bind_pose(
        &mut skeleton,
        &map.source_chains(),
        &NormalizeConfig::default(),
    )
    .unwrap();
    assert!(report.skipped.is_empty());
}
