//! Skeletons, transforms and keyframe clips.

pub mod clip;
pub mod skeletal3d;
pub mod transform;

pub use self::{
    clip::{AnimationClip, ClipError, Interpolation, KeyframeTrack, TrackKind},
    skeletal3d::{Bone, Hierarchy, Skeleton, SkeletonError},
    transform::Transform,
};
