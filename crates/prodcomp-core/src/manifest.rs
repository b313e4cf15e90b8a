use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use prodcomp_util::errors::ComposeError;

use crate::flavor::FlavorOverride;

/// Default file name of a product declaration.
pub const MANIFEST_FILE: &str = "ProductCompose.toml";

/// The parsed representation of a `ProductCompose.toml` file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductManifest {
    pub name: String,

    #[serde(default)]
    pub version: Option<String>,

    pub vendor: String,

    #[serde(default)]
    pub summary: Option<String>,

    #[serde(default)]
    pub product_directory_name: Option<String>,

    /// Take the product version from the best artifact of this name.
    #[serde(default)]
    pub version_from_package: Option<String>,

    #[serde(default)]
    pub architectures: Vec<String>,

    #[serde(default = "default_content")]
    pub content: Vec<String>,

    #[serde(default)]
    pub unpack: Vec<String>,

    #[serde(default)]
    pub source: Option<MediaMode>,

    #[serde(default)]
    pub debug: Option<MediaMode>,

    #[serde(default)]
    pub build_options: Vec<BuildOption>,

    #[serde(default)]
    pub flavors: BTreeMap<String, FlavorOverride>,

    #[serde(default)]
    pub packagesets: Vec<PackageSetDecl>,
}

fn default_content() -> Vec<String> {
    vec!["main".to_string()]
}

/// How source or debug artifacts are published.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaMode {
    Drop,
    Include,
    Split,
}

impl MediaMode {
    /// Whether artifacts of this kind are wanted at all.
    pub fn wanted(mode: Option<MediaMode>) -> bool {
        matches!(mode, Some(MediaMode::Include | MediaMode::Split))
    }
}

/// Recognised `build_options` entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildOption {
    TakeAllAvailableVersions,
    IgnoreMissingPackages,
    UpdateinfoPackagesOnly,
    AddSlsaProvenance,
    SkipUpdateinfos,
    HideFlavorInProductDirectoryName,
    AbortOnEmptyUpdateinfo,
    BlockUpdatesUnderEmbargo,
    BaseSkipPackages,
    NoProductProvides,
    #[serde(rename = "OBS_unordered_product_repos")]
    ObsUnorderedProductRepos,
}

/// One `[[packagesets]]` declaration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PackageSetDecl {
    #[serde(default = "default_set_name")]
    pub name: String,

    /// Flavors the declaration applies to; empty means all.
    #[serde(default)]
    pub flavors: Vec<String>,

    /// Architectures the declaration applies to; empty means all.
    #[serde(default)]
    pub architectures: Vec<String>,

    #[serde(default)]
    pub packages: Vec<String>,

    /// Support status tag; a leading `=` overrides tags of added sets.
    #[serde(default)]
    pub supportstatus: Option<String>,

    /// Skip binaries built after this time (seconds since the Unix epoch).
    #[serde(default)]
    pub ignore_binaries_newer_than: Option<u64>,

    #[serde(default)]
    pub add: Vec<String>,

    #[serde(default)]
    pub sub: Vec<String>,

    #[serde(default)]
    pub intersect: Vec<String>,
}

fn default_set_name() -> String {
    "main".to_string()
}

impl PackageSetDecl {
    /// Whether this declaration is active for `arch` and `flavor`.
    pub fn applies_to(&self, arch: &str, flavor: Option<&str>) -> bool {
        if let Some(flavor) = flavor {
            if !self.flavors.is_empty() && !self.flavors.iter().any(|f| f == flavor) {
                return false;
            }
        }
        self.architectures.is_empty() || self.architectures.iter().any(|a| a == arch)
    }
}

impl ProductManifest {
    /// Load and parse a product declaration from the given path.
    pub fn from_path(path: &Path) -> miette::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ComposeError::Manifest {
            message: format!("Failed to read {}: {e}", path.display()),
        })?;
        Self::from_str(&content)
    }

    /// Parse a product declaration from a string.
    pub fn from_str(content: &str) -> miette::Result<Self> {
        toml::from_str(content).map_err(|e| {
            ComposeError::Manifest {
                message: format!("Failed to parse {MANIFEST_FILE}: {e}"),
            }
            .into()
        })
    }

    pub fn has_option(&self, option: BuildOption) -> bool {
        self.build_options.contains(&option)
    }

    /// Flavor names in declaration order.
    pub fn flavor_names(&self) -> Vec<&str> {
        self.flavors.keys().map(String::as_str).collect()
    }

    /// The manifest as seen by one flavor.
    ///
    /// Values set in the flavor replace the global ones; build options are
    /// appended to the global list.
    pub fn for_flavor(&self, flavor: &str) -> Result<ProductManifest, ComposeError> {
        let overrides = self
            .flavors
            .get(flavor)
            .ok_or_else(|| ComposeError::Manifest {
                message: format!("Flavor not found: {flavor}"),
            })?;
        let mut out = self.clone();
        overrides.apply(&mut out);
        Ok(out)
    }

    /// Directory name for the product tree.
    pub fn product_dir(&self, flavor: Option<&str>) -> String {
        let mut dir = self
            .product_directory_name
            .clone()
            .unwrap_or_else(|| self.name.clone());
        if let Some(version) = &self.version {
            if self.product_directory_name.is_none() {
                dir = format!("{dir}-{version}");
            }
        }
        if let Some(flavor) = flavor {
            if !self.has_option(BuildOption::HideFlavorInProductDirectoryName) {
                dir = format!("{dir}-{flavor}");
            }
        }
        dir
    }
}
