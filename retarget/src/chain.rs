//! Named limb chains used to square bind poses up.
//!
//! Chains are found by scanning bone names for canonical markers. Each of
//! the ten endpoint markers locks onto the first bone that contains it.

use {
    serde::{Deserialize, Serialize},
    smallvec::SmallVec,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Limb {
    Spine,
    LeftLeg,
    RightLeg,
    LeftArm,
    RightArm,
}

impl Limb {
    /// Order in which the bind-pose checks run.
    pub const NORMALIZE_ORDER: [Limb; 5] = [
        Limb::Spine,
        Limb::LeftLeg,
        Limb::RightLeg,
        Limb::LeftArm,
        Limb::RightArm,
    ];

    /// Order in which markers are tried against a bone name.
    pub const MARKER_ORDER: [Limb; 5] = [
        Limb::LeftArm,
        Limb::RightArm,
        Limb::LeftLeg,
        Limb::RightLeg,
        Limb::Spine,
    ];

    const fn slot(self) -> usize {
        match self {
            Limb::Spine => 0,
            Limb::LeftLeg => 1,
            Limb::RightLeg => 2,
            Limb::LeftArm => 3,
            Limb::RightArm => 4,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Base,
    End,
}

/// Base and end bone names of a chain.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChainBones {
    pub base: String,
    pub end: String,
}

impl ChainBones {
    pub fn new(base: impl Into<String>, end: impl Into<String>) -> Self {
        ChainBones {
            base: base.into(),
            end: end.into(),
        }
    }

    pub fn endpoint(&self, endpoint: Endpoint) -> &str {
        match endpoint {
            Endpoint::Base => &self.base,
            Endpoint::End => &self.end,
        }
    }

    fn endpoint_mut(&mut self, endpoint: Endpoint) -> &mut String {
        match endpoint {
            Endpoint::Base => &mut self.base,
            Endpoint::End => &mut self.end,
        }
    }
}

/// The five chains of a humanoid.
///
/// Defaults are the canonical markers and double as fallback names.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainNames {
    pub left_arm: ChainBones,
    pub right_arm: ChainBones,
    pub left_leg: ChainBones,
    pub right_leg: ChainBones,
    pub spine: ChainBones,
}

impl Default for ChainNames {
    fn default() -> Self {
        ChainNames {
            left_arm: ChainBones::new("LeftArm", "LeftHand"),
            right_arm: ChainBones::new("RightArm", "RightHand"),
            left_leg: ChainBones::new("LeftUpLeg", "LeftFoot"),
            right_leg: ChainBones::new("RightUpLeg", "RightFoot"),
            spine: ChainBones::new("Hips", "Spine2"),
        }
    }
}

impl ChainNames {
    pub fn get(&self, limb: Limb) -> &ChainBones {
        match limb {
            Limb::Spine => &self.spine,
            Limb::LeftLeg => &self.left_leg,
            Limb::RightLeg => &self.right_leg,
            Limb::LeftArm => &self.left_arm,
            Limb::RightArm => &self.right_arm,
        }
    }

    pub fn get_mut(&mut self, limb: Limb) -> &mut ChainBones {
        match limb {
            Limb::Spine => &mut self.spine,
            Limb::LeftLeg => &mut self.left_leg,
            Limb::RightLeg => &mut self.right_leg,
            Limb::LeftArm => &mut self.left_arm,
            Limb::RightArm => &mut self.right_arm,
        }
    }
}

/// Chains as seen by one particular skeleton.
///
/// A limb is `None` when any of its endpoints has no bone there, e.g. a
/// source chain whose bones are not mapped to the target.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LimbChains {
    limbs: [Option<ChainBones>; 5],
}

impl LimbChains {
    pub fn get(&self, limb: Limb) -> Option<&ChainBones> {
        self.limbs[limb.slot()].as_ref()
    }

    pub fn set(&mut self, limb: Limb, chain: Option<ChainBones>) {
        self.limbs[limb.slot()] = chain;
    }
}

impl From<&ChainNames> for LimbChains {
    fn from(names: &ChainNames) -> Self {
        let mut chains = LimbChains::default();
        for &limb in &Limb::NORMALIZE_ORDER {
            chains.set(limb, Some(names.get(limb).clone()));
        }
        chains
    }
}

struct Marker {
    limb: Limb,
    endpoint: Endpoint,
    needle: String,
    found: Option<String>,
}

/// Scans bone names for chain endpoints.
pub struct ChainDetector {
    names: ChainNames,
    markers: SmallVec<[Marker; 10]>,
}

impl ChainDetector {
    pub fn new(names: &ChainNames) -> Self {
        let mut markers = SmallVec::new();
        for &limb in &Limb::MARKER_ORDER {
            for &endpoint in &[Endpoint::Base, Endpoint::End] {
                markers.push(Marker {
                    limb,
                    endpoint,
                    needle: names.get(limb).endpoint(endpoint).to_lowercase(),
                    found: None,
                });
            }
        }

        ChainDetector {
            names: names.clone(),
            markers,
        }
    }

    /// Tests `candidate` against markers still open and records `name` for
    /// the first one it contains.
    pub fn observe(&mut self, candidate: &str, name: &str) {
        let candidate = candidate.to_lowercase();
        let open = self.markers.iter_mut().filter(|marker| {
            marker.found.is_none() && !marker.needle.is_empty()
        });

        for marker in open {
            if candidate.contains(marker.needle.as_str()) {
                tracing::trace!(
                    "Bone `{}` resolves {:?} {:?}",
                    name,
                    marker.limb,
                    marker.endpoint
                );
                marker.found = Some(name.to_owned());
                break;
            }
        }
    }

    /// Resolved chain names, markers never matched fall back to themselves.
    pub fn finish(self) -> ChainNames {
        let mut names = self.names;
        for marker in self.markers {
            if let Some(found) = marker.found {
                *names.get_mut(marker.limb).endpoint_mut(marker.endpoint) =
                    found;
            }
        }
        names
    }
}
