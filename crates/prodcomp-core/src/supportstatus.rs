use std::collections::BTreeMap;
use std::path::Path;

use prodcomp_util::errors::ComposeError;

/// File next to the product declaration that overrides support status per package.
pub const SUPPORTSTATUS_FILE: &str = "supportstatus.txt";

/// Per-package support status overrides (`name status` per line).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SupportStatusOverrides {
    entries: BTreeMap<String, String>,
}

impl SupportStatusOverrides {
    /// Load overrides; a missing file yields an empty table.
    pub fn load(path: &Path) -> Result<Self, ComposeError> {
        if !path.is_file() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let table = Self::parse(&content)?;
        tracing::debug!("{} support status overrides from {}", table.len(), path.display());
        Ok(table)
    }

    pub fn parse(content: &str) -> Result<Self, ComposeError> {
        let mut entries = BTreeMap::new();
        for (lineno, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut fields = line.split_whitespace();
            match (fields.next(), fields.next()) {
                (Some(name), Some(status)) => {
                    entries.insert(name.to_string(), status.to_string());
                }
                _ => {
                    return Err(ComposeError::Generic {
                        message: format!(
                            "{SUPPORTSTATUS_FILE} line {}: expected `name status`",
                            lineno + 1
                        ),
                    })
                }
            }
        }
        Ok(Self { entries })
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
