use crate::chain::Limb;

/// Why a limb chain cannot be measured.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ChainDefect {
    #[error("bone `{0}` is missing")]
    MissingBone(String),

    #[error("bone `{0}` has no child")]
    NoChild(String),

    #[error("bone `{0}` has no parent")]
    NoParent(String),

    #[error("bones around `{0}` coincide")]
    Degenerate(String),

    #[error("chain endpoint is not mapped to the target skeleton")]
    Unmapped,
}

#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum RetargetError {
    #[error("Cannot normalize {limb:?} chain: {defect}")]
    MalformedChain { limb: Limb, defect: ChainDefect },

    #[error("Bone `{bone}` has a degenerate world transform")]
    DegenerateTransform { bone: String },
}
