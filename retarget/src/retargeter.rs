use {
    crate::{
        basis::RetargetBasis,
        bone_map::BoneMap,
        config::RetargetConfig,
        error::RetargetError,
        normalize::NormalizeReport,
        snapshot::SkeletonSnapshot,
    },
    animate::{AnimationClip, Hierarchy, KeyframeTrack, Skeleton, TrackKind},
    nalgebra as na,
};

/// Retargeting session between two skeletons.
///
/// Holds normalized snapshots of both bind poses and the basis derived from
/// them. Retargeting only reads this state, so a shared session may serve
/// many poses and clips at once.
#[derive(Clone, Debug)]
pub struct Retargeter {
    config: RetargetConfig,
    bone_map: BoneMap,
    captured: Captured,
}

#[derive(Clone, Debug)]
struct Captured {
    source: SkeletonSnapshot,
    target: SkeletonSnapshot,
    source_report: NormalizeReport,
    target_report: NormalizeReport,
    basis: RetargetBasis,
}

impl Captured {
    fn new(
        source: &mut Skeleton,
        target: &mut Skeleton,
        bone_map: &BoneMap,
        config: &RetargetConfig,
    ) -> Result<Self, RetargetError> {
        let (source, source_report) = SkeletonSnapshot::capture(
            source,
            &bone_map.source_chains(),
            &config.source,
            &config.normalize,
        )?;
        let (target, target_report) = SkeletonSnapshot::capture(
            target,
            &bone_map.target_chains(),
            &config.target,
            &config.normalize,
        )?;
        let basis = RetargetBasis::compute(&source, &target, bone_map);

        Ok(Captured {
            source,
            target,
            source_report,
            target_report,
            basis,
        })
    }
}

impl Retargeter {
    /// Resolves bone correspondence, normalizes and captures both bind
    /// poses and precomputes the basis.
    ///
    /// Both skeletons are left in their normalized bind pose.
    #[tracing::instrument(skip_all)]
    pub fn new(
        source: &mut Skeleton,
        target: &mut Skeleton,
        config: &RetargetConfig,
    ) -> Result<Self, RetargetError> {
        let bone_map = BoneMap::resolve(
            &*source,
            &*target,
            config.bone_name_map.as_deref(),
            &config.mapping,
        );
        let captured = Captured::new(source, target, &bone_map, config)?;

        tracing::debug!(
            "Retargeting {} of {} source bones onto {} target bones",
            bone_map.mapped_count(),
            captured.source.len(),
            captured.target.len()
        );

        Ok(Retargeter {
            config: config.clone(),
            bone_map,
            captured,
        })
    }

    pub fn config(&self) -> &RetargetConfig {
        &self.config
    }

    pub fn bone_map(&self) -> &BoneMap {
        &self.bone_map
    }

    pub fn source(&self) -> &SkeletonSnapshot {
        &self.captured.source
    }

    pub fn target(&self) -> &SkeletonSnapshot {
        &self.captured.target
    }

    pub fn source_report(&self) -> &NormalizeReport {
        &self.captured.source_report
    }

    pub fn target_report(&self) -> &NormalizeReport {
        &self.captured.target_report
    }

    pub fn basis(&self) -> &RetargetBasis {
        &self.captured.basis
    }

    /// Replaces bone correspondence, keeping captured bind poses.
    ///
    /// Call [`Retargeter::recapture`] afterwards if the new map changes
    /// which bones form the limb chains.
    pub fn set_bone_map(&mut self, bone_map: BoneMap) {
        let basis = RetargetBasis::compute(
            &self.captured.source,
            &self.captured.target,
            &bone_map,
        );
        self.bone_map = bone_map;
        self.captured.basis = basis;
    }

    /// Captures both bind poses again with the current bone map.
    /// The session is left untouched on error.
    #[tracing::instrument(skip_all)]
    pub fn recapture(
        &mut self,
        source: &mut Skeleton,
        target: &mut Skeleton,
    ) -> Result<(), RetargetError> {
        let captured =
            Captured::new(source, target, &self.bone_map, &self.config)?;
        self.captured = captured;
        Ok(())
    }

    /// Converts source bone's local rotation into its target's local
    /// rotation. `None` for unmapped bones.
    pub fn retarget_rotation(
        &self,
        source: usize,
        rotation: &na::UnitQuaternion<f32>,
    ) -> Option<na::UnitQuaternion<f32>> {
        self.captured
            .basis
            .get(source)
            .map(|basis| basis.apply(rotation))
    }

    /// Writes retargeted local rotations of all mapped bones into `target`.
    ///
    /// Translations and scales stay as they are. World matrices are not
    /// refreshed.
    pub fn retarget_pose(&self, source: &Skeleton, target: &mut Skeleton) {
        for (source_index, target_index) in self.bone_map.pairs() {
            if source_index >= source.len() || target_index >= target.len() {
                continue;
            }
            let rotation = &source.local(source_index).rotation;
            if let Some(rotation) = self.retarget_rotation(source_index, rotation)
            {
                target.set_local_rotation(target_index, rotation);
            }
        }
    }

    /// Rotation track for the mapped target bone, every sample
    /// retargeted independently.
    pub fn retarget_rotation_track(
        &self,
        track: &KeyframeTrack,
    ) -> Option<KeyframeTrack> {
        if track.kind() != TrackKind::Rotation {
            return None;
        }
        let (source, target_name) = self.mapped_bone(track.bone())?;
        let basis = self.captured.basis.get(source)?;

        Some(track.map_samples(target_name, |input, output| {
            let rotation = na::UnitQuaternion::from_quaternion(
                na::Quaternion::new(input[3], input[0], input[1], input[2]),
            );
            let rotation = basis.apply(&rotation);
            output.copy_from_slice(rotation.coords.as_slice());
        }))
    }

    /// Root translation is shifted by the bind position offset between the
    /// roots. Other translation tracks are only renamed.
    pub fn retarget_translation_track(
        &self,
        track: &KeyframeTrack,
    ) -> Option<KeyframeTrack> {
        if track.kind() != TrackKind::Translation {
            return None;
        }
        let (source, target_name) = self.mapped_bone(track.bone())?;

        match self.captured.basis.root_offset() {
            Some(offset) if source == 0 => {
                Some(track.map_samples(target_name, |input, output| {
                    output[0] = input[0] + offset.x;
                    output[1] = input[1] + offset.y;
                    output[2] = input[2] + offset.z;
                }))
            }
            _ => Some(track.renamed(target_name)),
        }
    }

    /// Scale tracks are renamed, values are kept.
    pub fn retarget_scale_track(
        &self,
        track: &KeyframeTrack,
    ) -> Option<KeyframeTrack> {
        if track.kind() != TrackKind::Scale {
            return None;
        }
        let (_, target_name) = self.mapped_bone(track.bone())?;
        Some(track.renamed(target_name))
    }

    pub fn retarget_track(&self, track: &KeyframeTrack) -> Option<KeyframeTrack> {
        match track.kind() {
            TrackKind::Rotation => self.retarget_rotation_track(track),
            TrackKind::Translation => self.retarget_translation_track(track),
            TrackKind::Scale => self.retarget_scale_track(track),
        }
    }

    /// Retargets every track of a mapped bone, dropping the rest. Duration
    /// is derived from the emitted tracks.
    pub fn retarget_clip(&self, clip: &AnimationClip) -> AnimationClip {
        let tracks: Vec<_> = clip
            .tracks()
            .iter()
            .filter_map(|track| {
                let retargeted = self.retarget_track(track);
                if retargeted.is_none() {
                    tracing::trace!(
                        "Dropping track `{}`",
                        track.qualified_name()
                    );
                }
                retargeted
            })
            .collect();

        tracing::debug!(
            "Clip `{}` retargeted with {} of {} tracks",
            clip.name(),
            tracks.len(),
            clip.tracks().len()
        );
        AnimationClip::new(clip.name(), tracks)
    }

    fn mapped_bone(&self, source_name: &str) -> Option<(usize, &str)> {
        let source = self.captured.source.find_bone(source_name)?;
        let target = self.bone_map.target_index(source)?;
        if target >= self.captured.target.len() {
            return None;
        }
        Some((source, self.captured.target.bone_name(target)))
    }
}
