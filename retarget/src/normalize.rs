//! Squares a skeleton's bind pose up into a canonical T-pose.
//!
//! Checks run in a fixed order, spine plane first, then legs, then arms.
//! Each correction is a world-space rotation converted into the bone's
//! local rotation, followed by a refresh of the bone's subtree, so later
//! checks observe earlier corrections.
//!
//! Axes follow a character facing +Z with +Y up and its left hand
//! towards +X.

use {
    crate::{
        chain::{ChainBones, Limb, LimbChains},
        error::{ChainDefect, RetargetError},
    },
    animate::{Hierarchy, Skeleton},
    nalgebra as na,
    serde::{Deserialize, Serialize},
};

/// Shorter bone directions are treated as degenerate.
const MIN_LENGTH: f32 = 1e-6;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MissingChainPolicy {
    /// Log the defect, record it in the report and carry on.
    Skip,
    Fail,
}

impl Default for MissingChainPolicy {
    fn default() -> Self {
        MissingChainPolicy::Skip
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeConfig {
    /// Deviation in radians tolerated before a bone is rotated.
    pub tolerance: f32,
    pub missing_chain: MissingChainPolicy,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        NormalizeConfig {
            tolerance: 0.1,
            missing_chain: MissingChainPolicy::default(),
        }
    }
}

/// Single rotation applied to a bone.
#[derive(Clone, Debug, PartialEq)]
pub struct Correction {
    pub limb: Limb,
    pub bone: String,
    /// Deviation measured before the rotation.
    pub angle: f32,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct NormalizeReport {
    pub corrections: Vec<Correction>,
    pub skipped: Vec<(Limb, ChainDefect)>,
}

impl NormalizeReport {
    /// No bone was rotated.
    pub fn is_unchanged(&self) -> bool {
        self.corrections.is_empty()
    }
}

pub fn normalize_bind_pose(
    skeleton: &mut Skeleton,
    chains: &LimbChains,
    config: &NormalizeConfig,
) -> Result<NormalizeReport, RetargetError> {
    let mut report = NormalizeReport::default();
    let tolerance = config.tolerance;

    for &limb in &Limb::NORMALIZE_ORDER {
        let outcome = match limb {
            Limb::Spine => square_spine(skeleton, chains, tolerance, &mut report),
            Limb::LeftLeg | Limb::RightLeg => {
                straighten_leg(skeleton, chains, limb, tolerance, &mut report)
            }
            Limb::LeftArm | Limb::RightArm => {
                straighten_arm(skeleton, chains, limb, tolerance, &mut report)
            }
        };

        if let Err(defect) = outcome {
            match config.missing_chain {
                MissingChainPolicy::Skip => {
                    tracing::warn!(
                        "Skipping {:?} bind pose check: {}",
                        limb,
                        defect
                    );
                    report.skipped.push((limb, defect));
                }
                MissingChainPolicy::Fail => {
                    return Err(RetargetError::MalformedChain { limb, defect });
                }
            }
        }
    }

    tracing::debug!(
        "Bind pose normalized with {} corrections, {} checks skipped",
        report.corrections.len(),
        report.skipped.len()
    );
    Ok(report)
}

/// Rotates `bone` so the direction towards its first child points along
/// `axis`. Returns the deviation measured before rotating, `None` if it
/// was within `tolerance`.
pub fn align_bone_to_axis(
    skeleton: &mut Skeleton,
    bone: usize,
    axis: &na::Unit<na::Vector3<f32>>,
    tolerance: f32,
) -> Result<Option<f32>, ChainDefect> {
    let child = first_child(skeleton, bone)?;
    let current = direction(skeleton, bone, child)?;

    let angle = current.as_ref().angle(axis.as_ref());
    if angle <= tolerance {
        return Ok(None);
    }

    rotate_in_world(skeleton, bone, rotation_between(&current, axis));
    Ok(Some(angle))
}

/// Shortest rotation taking `from` onto `to`. Opposite directions turn by
/// half a circle about some perpendicular axis.
pub fn rotation_between(
    from: &na::Unit<na::Vector3<f32>>,
    to: &na::Unit<na::Vector3<f32>>,
) -> na::UnitQuaternion<f32> {
    match na::UnitQuaternion::rotation_between_axis(from, to) {
        Some(rotation) => rotation,
        None => na::UnitQuaternion::from_axis_angle(
            &perpendicular(from),
            std::f32::consts::PI,
        ),
    }
}

fn perpendicular(
    vector: &na::Unit<na::Vector3<f32>>,
) -> na::Unit<na::Vector3<f32>> {
    let helper = if vector.x.abs() < 0.9 {
        na::Vector3::x()
    } else {
        na::Vector3::y()
    };
    na::Unit::new_normalize(vector.cross(&helper))
}

fn square_spine(
    skeleton: &mut Skeleton,
    chains: &LimbChains,
    tolerance: f32,
    report: &mut NormalizeReport,
) -> Result<(), ChainDefect> {
    let spine = chain(chains, Limb::Spine)?;
    let arm = chain(chains, Limb::LeftArm)?;

    let spine_base = find(skeleton, &spine.base)?;
    let spine_end = find(skeleton, &spine.end)?;
    let arm_base = find(skeleton, &arm.base)?;
    let arm_end = find(skeleton, &arm.end)?;

    let spine_dir = direction(skeleton, spine_base, spine_end)?;
    let arm_dir = direction(skeleton, arm_base, arm_end)?;

    let normal = na::Unit::try_new(arm_dir.cross(&spine_dir), MIN_LENGTH)
        .ok_or_else(|| ChainDefect::Degenerate(spine.base.clone()))?;

    let angle = normal.as_ref().angle(&na::Vector3::z());
    if angle <= tolerance {
        return Ok(());
    }

    // Yaw bringing the normal's horizontal part onto +Z.
    let yaw = (-normal.x).atan2(normal.z);
    rotate_in_world(
        skeleton,
        spine_base,
        na::UnitQuaternion::from_axis_angle(&na::Vector3::y_axis(), yaw),
    );
    record(report, Limb::Spine, skeleton, spine_base, angle);
    Ok(())
}

fn straighten_leg(
    skeleton: &mut Skeleton,
    chains: &LimbChains,
    limb: Limb,
    tolerance: f32,
    report: &mut NormalizeReport,
) -> Result<(), ChainDefect> {
    let leg = chain(chains, limb)?;
    let base = find(skeleton, &leg.base)?;

    let down = na::Unit::new_unchecked(-na::Vector3::y());
    if let Some(angle) = align_bone_to_axis(skeleton, base, &down, tolerance)? {
        record(report, limb, skeleton, base, angle);
    }
    Ok(())
}

fn straighten_arm(
    skeleton: &mut Skeleton,
    chains: &LimbChains,
    limb: Limb,
    tolerance: f32,
    report: &mut NormalizeReport,
) -> Result<(), ChainDefect> {
    let arm = chain(chains, limb)?;
    let base = find(skeleton, &arm.base)?;
    let hand = find(skeleton, &arm.end)?;
    let elbow = parent(skeleton, hand)?;
    let upper = parent(skeleton, elbow)?;

    let upper_dir = direction(skeleton, upper, elbow)?;
    let lower_dir = direction(skeleton, elbow, hand)?;

    let bend = upper_dir.as_ref().angle(lower_dir.as_ref());
    if bend > tolerance {
        rotate_in_world(skeleton, elbow, rotation_between(&lower_dir, &upper_dir));
        record(report, limb, skeleton, elbow, bend);
    }

    let outwards = match limb {
        Limb::LeftArm => na::Vector3::x_axis(),
        _ => na::Unit::new_unchecked(-na::Vector3::x()),
    };
    if let Some(angle) = align_bone_to_axis(skeleton, base, &outwards, tolerance)?
    {
        record(report, limb, skeleton, base, angle);
    }
    Ok(())
}

/// Premultiplies bone's world rotation by `delta` and refreshes the
/// subtree.
fn rotate_in_world(
    skeleton: &mut Skeleton,
    bone: usize,
    delta: na::UnitQuaternion<f32>,
) {
    let global = skeleton.global_rotation(bone);
    let parent = skeleton.parent_global_rotation(bone);

    skeleton.set_local_rotation(bone, parent.inverse() * delta * global);
    skeleton.update_subtree(bone);
}

fn record(
    report: &mut NormalizeReport,
    limb: Limb,
    skeleton: &Skeleton,
    bone: usize,
    angle: f32,
) {
    tracing::trace!(
        "Rotated `{}` by {} rad for {:?}",
        skeleton.bone_name(bone),
        angle,
        limb
    );
    report.corrections.push(Correction {
        limb,
        bone: skeleton.bone_name(bone).to_owned(),
        angle,
    });
}

fn chain(chains: &LimbChains, limb: Limb) -> Result<&ChainBones, ChainDefect> {
    chains.get(limb).ok_or(ChainDefect::Unmapped)
}

fn find(skeleton: &Skeleton, name: &str) -> Result<usize, ChainDefect> {
    skeleton
        .find_bone(name)
        .ok_or_else(|| ChainDefect::MissingBone(name.to_owned()))
}

fn parent(skeleton: &Skeleton, bone: usize) -> Result<usize, ChainDefect> {
    skeleton
        .parent_index(bone)
        .ok_or_else(|| ChainDefect::NoParent(skeleton.bone_name(bone).to_owned()))
}

fn first_child(skeleton: &Skeleton, bone: usize) -> Result<usize, ChainDefect> {
    skeleton
        .bone(bone)
        .children()
        .first()
        .copied()
        .ok_or_else(|| ChainDefect::NoChild(skeleton.bone_name(bone).to_owned()))
}

fn direction(
    skeleton: &Skeleton,
    from: usize,
    to: usize,
) -> Result<na::Unit<na::Vector3<f32>>, ChainDefect> {
    let delta = skeleton.global_position(to) - skeleton.global_position(from);
    na::Unit::try_new(delta, MIN_LENGTH)
        .ok_or_else(|| ChainDefect::Degenerate(skeleton.bone_name(from).to_owned()))
}
