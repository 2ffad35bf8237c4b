//! Correspondence between source and target bones.

use {
    crate::chain::{ChainBones, ChainDetector, ChainNames, Limb, LimbChains},
    ahash::RandomState,
    animate::Hierarchy,
    serde::{Deserialize, Serialize},
    std::collections::HashMap,
};

/// Ordered source to target bone name pairs.
pub type NameTable = Vec<(String, String)>;

pub type NameMap = HashMap<String, String, RandomState>;

/// Characters dropped from names before automatic matching.
const PUNCTUATION: &[char] = &[
    '`', '~', '!', '@', '#', '$', '%', '^', '&', '*', '(', ')', '_', '|', '+',
    '-', '=', '?', ';', ':', '\'', '"', '<', '>', '{', '}', '\\', '/',
];

/// What automatic mapping does when several target bones match one source
/// bone.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DuplicatePolicy {
    FirstMatch,
    LastMatch,
    /// Leave the source bone unmapped.
    Reject,
}

impl Default for DuplicatePolicy {
    fn default() -> Self {
        DuplicatePolicy::LastMatch
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MappingConfig {
    /// Markers for chain detection.
    pub chains: ChainNames,

    /// Rig prefixes removed before automatic matching.
    pub strip_prefixes: Vec<String>,

    pub duplicates: DuplicatePolicy,
}

impl Default for MappingConfig {
    fn default() -> Self {
        MappingConfig {
            chains: ChainNames::default(),
            strip_prefixes: vec!["mixamorig".to_owned()],
            duplicates: DuplicatePolicy::default(),
        }
    }
}

/// Maps every source bone to at most one target bone.
///
/// Tools may edit it through [`BoneMap::assign`] and
/// [`BoneMap::unassign`], which keep the index and name views in sync.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoneMap {
    index_map: Vec<Option<usize>>,
    name_map: NameMap,
    chains: ChainNames,
}

impl BoneMap {
    /// Map with every source bone unmapped.
    pub fn unmapped(source_len: usize, chains: ChainNames) -> Self {
        BoneMap {
            index_map: vec![None; source_len],
            name_map: NameMap::default(),
            chains,
        }
    }

    /// Resolves correspondence from an explicit source-to-target name table
    /// or, without one, by matching normalized names.
    ///
    /// Never fails. Bones that cannot be matched stay unmapped.
    pub fn resolve<S, T>(
        source: &S,
        target: &T,
        table: Option<&[(String, String)]>,
        config: &MappingConfig,
    ) -> Self
    where
        S: Hierarchy + ?Sized,
        T: Hierarchy + ?Sized,
    {
        let mut map =
            BoneMap::unmapped(source.bone_count(), config.chains.clone());
        let mut detector = ChainDetector::new(&config.chains);

        match table {
            Some(table) => {
                map.resolve_explicit(source, target, table, &mut detector)
            }
            None => map.resolve_automatic(source, target, config, &mut detector),
        }

        map.chains = detector.finish();

        tracing::debug!(
            "Mapped {} of {} source bones",
            map.mapped_count(),
            map.index_map.len()
        );
        map
    }

    fn resolve_explicit<S, T>(
        &mut self,
        source: &S,
        target: &T,
        table: &[(String, String)],
        detector: &mut ChainDetector,
    ) where
        S: Hierarchy + ?Sized,
        T: Hierarchy + ?Sized,
    {
        for (source_name, target_name) in table {
            let source_index = match source.find_bone(source_name) {
                Some(index) => index,
                None => {
                    tracing::debug!("No source bone `{}`", source_name);
                    continue;
                }
            };
            detector.observe(source_name, source_name);

            match target.find_bone(target_name) {
                Some(target_index) => {
                    self.index_map[source_index] = Some(target_index);
                    self.name_map
                        .insert(source_name.clone(), target_name.clone());
                }
                None => {
                    tracing::debug!("No target bone `{}`", target_name);
                }
            }
        }
    }

    fn resolve_automatic<S, T>(
        &mut self,
        source: &S,
        target: &T,
        config: &MappingConfig,
        detector: &mut ChainDetector,
    ) where
        S: Hierarchy + ?Sized,
        T: Hierarchy + ?Sized,
    {
        let target_keys: Vec<Option<String>> = (0..target.bone_count())
            .map(|index| {
                normalize_name(target.bone_name(index), &config.strip_prefixes)
            })
            .collect();

        for source_index in 0..source.bone_count() {
            let source_name = source.bone_name(source_index);
            let key =
                match normalize_name(source_name, &config.strip_prefixes) {
                    Some(key) => key,
                    None => continue,
                };
            detector.observe(&key, source_name);

            let mut matches = target_keys
                .iter()
                .enumerate()
                .filter(|(_, target_key)| {
                    target_key.as_deref() == Some(key.as_str())
                })
                .map(|(index, _)| index);

            let chosen = match config.duplicates {
                DuplicatePolicy::FirstMatch => matches.next(),
                DuplicatePolicy::LastMatch => matches.last(),
                DuplicatePolicy::Reject => {
                    let first = matches.next();
                    if matches.next().is_some() {
                        tracing::debug!(
                            "Source bone `{}` matches several target bones",
                            source_name
                        );
                        None
                    } else {
                        first
                    }
                }
            };

            if let Some(target_index) = chosen {
                self.index_map[source_index] = Some(target_index);
                self.name_map.insert(
                    source_name.to_owned(),
                    target.bone_name(target_index).to_owned(),
                );
            }
        }
    }

    /// Number of source bones, mapped or not.
    pub fn len(&self) -> usize {
        self.index_map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index_map.is_empty()
    }

    pub fn target_index(&self, source: usize) -> Option<usize> {
        self.index_map.get(source).copied().flatten()
    }

    pub fn target_name(&self, source_name: &str) -> Option<&str> {
        self.name_map.get(source_name).map(String::as_str)
    }

    pub fn is_mapped(&self, source: usize) -> bool {
        self.target_index(source).is_some()
    }

    pub fn mapped_count(&self) -> usize {
        self.index_map.iter().filter(|index| index.is_some()).count()
    }

    pub fn index_map(&self) -> &[Option<usize>] {
        &self.index_map
    }

    pub fn name_map(&self) -> &NameMap {
        &self.name_map
    }

    /// Mapped `(source, target)` index pairs in source order.
    pub fn pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.index_map
            .iter()
            .enumerate()
            .filter_map(|(source, target)| target.map(|target| (source, target)))
    }

    /// Chains resolved on the source skeleton.
    pub fn chains(&self) -> &ChainNames {
        &self.chains
    }

    pub fn source_chains(&self) -> LimbChains {
        LimbChains::from(&self.chains)
    }

    /// Source chains translated to target bone names. Limbs with an
    /// unmapped endpoint are left out.
    pub fn target_chains(&self) -> LimbChains {
        let mut chains = LimbChains::default();
        for &limb in &Limb::NORMALIZE_ORDER {
            let source = self.chains.get(limb);
            let mapped = self
                .target_name(&source.base)
                .zip(self.target_name(&source.end))
                .map(|(base, end)| ChainBones::new(base, end));
            chains.set(limb, mapped);
        }
        chains
    }

    /// Maps `source_name` onto `target_name`, replacing the previous entry.
    /// Returns `false` and leaves the map untouched if either bone is not
    /// found.
    pub fn assign<S, T>(
        &mut self,
        source: &S,
        target: &T,
        source_name: &str,
        target_name: &str,
    ) -> bool
    where
        S: Hierarchy + ?Sized,
        T: Hierarchy + ?Sized,
    {
        match (source.find_bone(source_name), target.find_bone(target_name)) {
            (Some(source_index), Some(target_index))
                if source_index < self.index_map.len() =>
            {
                self.index_map[source_index] = Some(target_index);
                self.name_map
                    .insert(source_name.to_owned(), target_name.to_owned());
                true
            }
            _ => false,
        }
    }

    pub fn unassign<S>(&mut self, source: &S, source_name: &str) -> bool
    where
        S: Hierarchy + ?Sized,
    {
        match source.find_bone(source_name) {
            Some(source_index) if self.is_mapped(source_index) => {
                self.index_map[source_index] = None;
                self.name_map.remove(source_name);
                true
            }
            _ => false,
        }
    }
}

/// Lowercases the name, drops the first occurrence of every prefix and
/// strips punctuation. `None` when nothing is left.
pub fn normalize_name(name: &str, strip_prefixes: &[String]) -> Option<String> {
    let mut name = name.to_lowercase();
    for prefix in strip_prefixes {
        let prefix = prefix.to_lowercase();
        if prefix.is_empty() {
            continue;
        }
        if let Some(at) = name.find(prefix.as_str()) {
            name.replace_range(at..at + prefix.len(), "");
        }
    }
    name.retain(|c| !PUNCTUATION.contains(&c));

    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}
