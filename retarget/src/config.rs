use {
    crate::{
        bone_map::{MappingConfig, NameTable},
        normalize::NormalizeConfig,
        snapshot::SnapshotOptions,
    },
    eyre::{Report, WrapErr},
    serde::{Deserialize, Serialize},
    std::path::{Path, PathBuf},
};

/// Everything a retargeting session is set up from.
///
/// Every field has a default, so a configuration file only lists what it
/// changes.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetargetConfig {
    pub source: SnapshotOptions,
    pub target: SnapshotOptions,

    /// Explicit source to target bone names. Automatic matching by
    /// normalized names is used when absent.
    pub bone_name_map: Option<NameTable>,

    pub mapping: MappingConfig,
    pub normalize: NormalizeConfig,
}

impl RetargetConfig {
    /// Loads from `RETARGET_CONFIG_PATH` or `./retarget.ron`.
    pub fn load_default() -> Result<Self, Report> {
        let path = std::env::var("RETARGET_CONFIG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./retarget.ron"));

        Self::load(path)
    }

    #[tracing::instrument(skip_all)]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Report> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).wrap_err_with(|| {
            format!("Failed to open config `{}`", path.display())
        })?;
        Ok(ron::de::from_reader(file)?)
    }

    pub fn from_ron(source: &str) -> Result<Self, Report> {
        Ok(ron::de::from_str(source)?)
    }
}
