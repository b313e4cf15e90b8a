use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use prodcomp_util::errors::ComposeError;

use crate::header::{FilenameNevra, HeaderSource, RpmHeaderReader};

/// Global user configuration loaded from `~/.prodcomp/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalConfig {
    #[serde(default)]
    pub scan: ScanConfig,

    #[serde(default)]
    pub build: BuildConfig,
}

/// Repository scanning settings from `[scan]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    #[serde(default = "default_artifact_patterns", rename = "artifact-patterns")]
    pub artifact_patterns: Vec<String>,
    #[serde(default = "default_updateinfo_patterns", rename = "updateinfo-patterns")]
    pub updateinfo_patterns: Vec<String>,
    #[serde(default)]
    pub metadata: MetadataMode,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            artifact_patterns: default_artifact_patterns(),
            updateinfo_patterns: default_updateinfo_patterns(),
            metadata: MetadataMode::default(),
        }
    }
}

fn default_artifact_patterns() -> Vec<String> {
    vec!["*.rpm".to_string()]
}

fn default_updateinfo_patterns() -> Vec<String> {
    vec!["*updateinfo*.xml".to_string()]
}

/// Where package metadata comes from during a scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetadataMode {
    /// Parse the RPM header of every file.
    #[default]
    Header,
    /// Trust `name-version-release.arch.rpm` file names.
    Filename,
}

impl MetadataMode {
    pub fn header_source(self) -> Box<dyn HeaderSource> {
        match self {
            MetadataMode::Header => Box::new(RpmHeaderReader),
            MetadataMode::Filename => Box::new(FilenameNevra),
        }
    }
}

/// Build settings from `[build]` in global config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Repository directory used when no `--reposdir` is given.
    #[serde(default)]
    pub reposdir: Option<String>,
}

/// What a scanned file is, judged by its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Artifact,
    UpdateInfo,
}

/// Compiled file name patterns of a [`ScanConfig`].
#[derive(Debug, Clone)]
pub struct ScanMatcher {
    artifacts: GlobSet,
    updateinfos: GlobSet,
}

impl ScanMatcher {
    /// Classify a file by its base name. Update notices win over artifacts.
    pub fn classify(&self, file_name: &str) -> Option<FileKind> {
        if self.updateinfos.is_match(file_name) {
            Some(FileKind::UpdateInfo)
        } else if self.artifacts.is_match(file_name) {
            Some(FileKind::Artifact)
        } else {
            None
        }
    }
}

impl ScanConfig {
    pub fn matcher(&self) -> Result<ScanMatcher, ComposeError> {
        Ok(ScanMatcher {
            artifacts: build_globset(&self.artifact_patterns)?,
            updateinfos: build_globset(&self.updateinfo_patterns)?,
        })
    }
}

fn build_globset(patterns: &[String]) -> Result<GlobSet, ComposeError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| ComposeError::Generic {
            message: format!("Invalid scan pattern '{pattern}': {e}"),
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|e| ComposeError::Generic {
        message: format!("Failed to compile scan patterns: {e}"),
    })
}

impl GlobalConfig {
    /// Load the global configuration, or return defaults if the file doesn't exist.
    pub fn load() -> miette::Result<Self> {
        Self::load_from(&Self::default_path())
    }

    pub fn load_from(path: &Path) -> miette::Result<Self> {
        if !path.is_file() {
            return Ok(Self::default());
        }
        tracing::debug!("loading global config from {}", path.display());
        let content = std::fs::read_to_string(path).map_err(|e| ComposeError::Generic {
            message: format!("Failed to read global config: {e}"),
        })?;
        toml::from_str(&content).map_err(|e| {
            ComposeError::Generic {
                message: format!("Failed to parse global config: {e}"),
            }
            .into()
        })
    }

    /// Returns the default path to the global config file.
    pub fn default_path() -> PathBuf {
        dirs_path().join("config.toml")
    }
}

/// Returns the prodcomp data directory: `$PRODCOMP_HOME`, else `~/.prodcomp/`.
pub fn dirs_path() -> PathBuf {
    if let Ok(home) = std::env::var("PRODCOMP_HOME") {
        return PathBuf::from(home);
    }
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());
    Path::new(&home).join(".prodcomp")
}
