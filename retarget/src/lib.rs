//! Skeletal animation retargeting.
//!
//! A [`Retargeter`] maps bones of a source skeleton onto a target skeleton,
//! squares both bind poses up into a common T-pose and precomputes a pair
//! of rotations per mapped bone. With those, poses and keyframe clips
//! authored for the source are converted for the target without walking
//! either hierarchy again.

pub mod basis;
pub mod bone_map;
pub mod chain;
pub mod config;
pub mod error;
pub mod normalize;
pub mod retargeter;
pub mod snapshot;

pub use self::{
    basis::{BoneBasis, RetargetBasis},
    bone_map::{BoneMap, DuplicatePolicy, MappingConfig, NameTable},
    chain::{ChainBones, ChainNames, Limb, LimbChains},
    config::RetargetConfig,
    error::{ChainDefect, RetargetError},
    normalize::{
        align_bone_to_axis, normalize_bind_pose, MissingChainPolicy,
        NormalizeConfig, NormalizeReport,
    },
    retargeter::Retargeter,
    snapshot::{EmbeddedTransform, SkeletonSnapshot, SnapshotOptions},
};
