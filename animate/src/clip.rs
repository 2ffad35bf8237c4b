use serde::{Deserialize, Serialize};

/// Animated property of a bone.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrackKind {
    Translation,
    Rotation,
    Scale,
}

impl TrackKind {
    /// Number of floats per keyframe sample.
    pub const fn components(self) -> usize {
        match self {
            TrackKind::Translation | TrackKind::Scale => 3,
            TrackKind::Rotation => 4,
        }
    }

    /// Suffix used in bone-qualified track names.
    pub const fn property(self) -> &'static str {
        match self {
            TrackKind::Translation => "position",
            TrackKind::Rotation => "quaternion",
            TrackKind::Scale => "scale",
        }
    }

    pub fn from_property(property: &str) -> Option<Self> {
        match property {
            "position" => Some(TrackKind::Translation),
            "quaternion" => Some(TrackKind::Rotation),
            "scale" => Some(TrackKind::Scale),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interpolation {
    Linear,
    Step,
}

impl Default for Interpolation {
    fn default() -> Self {
        Interpolation::Linear
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ClipError {
    #[error("Track `{track}` holds {got} values, expected {expected}")]
    SampleCount {
        track: String,
        expected: usize,
        got: usize,
    },

    #[error("Track name `{0}` lacks `.property` suffix")]
    MissingProperty(String),

    #[error("Track property `{0}` cannot be animated")]
    UnknownProperty(String),
}

/// Time-sampled values of one property of one bone.
///
/// Values are a flat buffer, rotations laid out as `x, y, z, w`.
#[derive(Clone, Debug, PartialEq)]
pub struct KeyframeTrack {
    bone: String,
    kind: TrackKind,
    interpolation: Interpolation,
    times: Box<[f32]>,
    values: Box<[f32]>,
}

impl KeyframeTrack {
    pub fn new(
        bone: impl Into<String>,
        kind: TrackKind,
        times: Vec<f32>,
        values: Vec<f32>,
    ) -> Result<Self, ClipError> {
        let bone = bone.into();
        let expected = times.len() * kind.components();
        if values.len() != expected {
            return Err(ClipError::SampleCount {
                track: format!("{}.{}", bone, kind.property()),
                expected,
                got: values.len(),
            });
        }

        Ok(KeyframeTrack {
            bone,
            kind,
            interpolation: Interpolation::default(),
            times: times.into_boxed_slice(),
            values: values.into_boxed_slice(),
        })
    }

    /// Parses names like `"Hips.quaternion"`.
    pub fn from_qualified(
        name: &str,
        times: Vec<f32>,
        values: Vec<f32>,
    ) -> Result<Self, ClipError> {
        let (bone, property) = name
            .rsplit_once('.')
            .ok_or_else(|| ClipError::MissingProperty(name.to_owned()))?;
        let kind = TrackKind::from_property(property)
            .ok_or_else(|| ClipError::UnknownProperty(property.to_owned()))?;
        KeyframeTrack::new(bone, kind, times, values)
    }

    pub fn with_interpolation(mut self, interpolation: Interpolation) -> Self {
        self.interpolation = interpolation;
        self
    }

    pub fn bone(&self) -> &str {
        &self.bone
    }

    pub fn kind(&self) -> TrackKind {
        self.kind
    }

    pub fn interpolation(&self) -> Interpolation {
        self.interpolation
    }

    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.bone, self.kind.property())
    }

    pub fn times(&self) -> &[f32] {
        &self.times
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Number of keyframes.
    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn samples(&self) -> std::slice::ChunksExact<'_, f32> {
        self.values.chunks_exact(self.kind.components())
    }

    pub fn end_time(&self) -> Option<f32> {
        self.times.last().copied()
    }

    /// Same keyframes and values bound to another bone.
    pub fn renamed(&self, bone: impl Into<String>) -> Self {
        KeyframeTrack {
            bone: bone.into(),
            ..self.clone()
        }
    }

    /// Builds track for another bone, writing each output sample from the
    /// matching input sample. Timestamps and interpolation are kept.
    pub fn map_samples<F>(&self, bone: impl Into<String>, mut f: F) -> Self
    where
        F: FnMut(&[f32], &mut [f32]),
    {
        let components = self.kind.components();
        let mut values = vec![0.0; self.values.len()].into_boxed_slice();
        for (input, output) in self
            .values
            .chunks_exact(components)
            .zip(values.chunks_exact_mut(components))
        {
            f(input, output);
        }

        KeyframeTrack {
            bone: bone.into(),
            kind: self.kind,
            interpolation: self.interpolation,
            times: self.times.clone(),
            values,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct AnimationClip {
    name: String,
    duration: f32,
    tracks: Vec<KeyframeTrack>,
}

impl AnimationClip {
    /// Clip with duration derived from its tracks.
    pub fn new(name: impl Into<String>, tracks: Vec<KeyframeTrack>) -> Self {
        let mut clip = AnimationClip {
            name: name.into(),
            duration: 0.0,
            tracks,
        };
        clip.reset_duration();
        clip
    }

    pub fn with_duration(
        name: impl Into<String>,
        duration: f32,
        tracks: Vec<KeyframeTrack>,
    ) -> Self {
        AnimationClip {
            name: name.into(),
            duration,
            tracks,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn duration(&self) -> f32 {
        self.duration
    }

    pub fn tracks(&self) -> &[KeyframeTrack] {
        &self.tracks
    }

    pub fn into_tracks(self) -> Vec<KeyframeTrack> {
        self.tracks
    }

    /// Sets duration to the latest keyframe time, zero without keyframes.
    pub fn reset_duration(&mut self) {
        self.duration = self
            .tracks
            .iter()
            .filter_map(KeyframeTrack::end_time)
            .fold(0.0, f32::max);
    }
}
