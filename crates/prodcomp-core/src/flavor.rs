use serde::{Deserialize, Serialize};

use crate::manifest::{BuildOption, MediaMode, ProductManifest};

/// Per-flavor overrides from `[flavors.<name>]`.
///
/// Every field left unset (or empty) keeps the global value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlavorOverride {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub product_directory_name: Option<String>,
    #[serde(default)]
    pub version_from_package: Option<String>,
    #[serde(default)]
    pub architectures: Vec<String>,
    #[serde(default)]
    pub content: Vec<String>,
    #[serde(default)]
    pub unpack: Vec<String>,
    #[serde(default)]
    pub source: Option<MediaMode>,
    #[serde(default)]
    pub debug: Option<MediaMode>,
    /// Appended to the global build options.
    #[serde(default)]
    pub build_options: Vec<BuildOption>,
}

impl FlavorOverride {
    /// Apply the overrides to `manifest` in place.
    pub fn apply(&self, manifest: &mut ProductManifest) {
        override_opt(&mut manifest.version, &self.version);
        override_opt(&mut manifest.summary, &self.summary);
        override_opt(&mut manifest.product_directory_name, &self.product_directory_name);
        override_opt(&mut manifest.version_from_package, &self.version_from_package);
        if let Some(name) = &self.name {
            manifest.name = name.clone();
        }
        override_vec(&mut manifest.architectures, &self.architectures);
        override_vec(&mut manifest.content, &self.content);
        override_vec(&mut manifest.unpack, &self.unpack);
        if self.source.is_some() {
            manifest.source = self.source;
        }
        if self.debug.is_some() {
            manifest.debug = self.debug;
        }
        for option in &self.build_options {
            if !manifest.build_options.contains(option) {
                manifest.build_options.push(*option);
            }
        }
    }
}

fn override_opt(target: &mut Option<String>, value: &Option<String>) {
    if let Some(v) = value.as_ref().filter(|v| !v.is_empty()) {
        *target = Some(v.clone());
    }
}

fn override_vec(target: &mut Vec<String>, value: &[String]) {
    if !value.is_empty() {
        *target = value.to_vec();
    }
}
