//! Shared setup for every command: locate and load the product declaration,
//! the global configuration, the support status overrides and the package pool.

use std::path::{Path, PathBuf};

use prodcomp_core::config::GlobalConfig;
use prodcomp_core::manifest::{ProductManifest, MANIFEST_FILE};
use prodcomp_core::supportstatus::{SupportStatusOverrides, SUPPORTSTATUS_FILE};
use prodcomp_resolver::pool::Pool;
use prodcomp_util::errors::ComposeError;
use prodcomp_util::fs::find_ancestor_with;
use prodcomp_util::progress;

/// Where a command finds its inputs.
#[derive(Debug, Default, Clone)]
pub struct SetupOptions {
    /// Explicit path to `ProductCompose.toml`; otherwise searched upwards from the cwd.
    pub manifest: Option<PathBuf>,
    /// Repository directory to scan; falls back to `[build].reposdir` of the global config.
    pub reposdir: Option<PathBuf>,
}

/// Everything loaded before a command does its work.
pub struct ComposeContext {
    pub manifest: ProductManifest,
    pub manifest_path: PathBuf,
    pub config: GlobalConfig,
    pub overrides: SupportStatusOverrides,
    /// Present only when a repository directory is known.
    pub pool: Option<Pool>,
}

impl ComposeContext {
    /// Load the declaration and configuration without scanning.
    pub fn load(opts: &SetupOptions) -> miette::Result<Self> {
        let manifest_path = locate_manifest(opts.manifest.as_deref())?;
        tracing::debug!("using product declaration {}", manifest_path.display());
        let manifest = ProductManifest::from_path(&manifest_path)?;
        let config = GlobalConfig::load()?;
        let dir = manifest_path.parent().unwrap_or(Path::new("."));
        let overrides = SupportStatusOverrides::load(&dir.join(SUPPORTSTATUS_FILE))?;
        Ok(Self {
            manifest,
            manifest_path,
            config,
            overrides,
            pool: None,
        })
    }

    /// Load and scan the repository directory when one is configured.
    pub fn load_with_pool(opts: &SetupOptions) -> miette::Result<Self> {
        let mut ctx = Self::load(opts)?;
        if let Some(reposdir) = reposdir(opts, &ctx.config) {
            ctx.pool = Some(scan_pool(&reposdir, &ctx.config)?);
        }
        Ok(ctx)
    }

    /// Like [`ComposeContext::load_with_pool`] but a pool is mandatory.
    pub fn load_requiring_pool(opts: &SetupOptions) -> miette::Result<Self> {
        let ctx = Self::load_with_pool(opts)?;
        if ctx.pool.is_none() {
            return Err(no_reposdir().into());
        }
        Ok(ctx)
    }

    /// The scanned pool; errors if none was loaded.
    pub fn pool(&self) -> Result<&Pool, ComposeError> {
        self.pool.as_ref().ok_or_else(|| ComposeError::Generic {
            message: "No package pool loaded".to_string(),
        })
    }

    /// The flavors to work on: the requested one, or every declared flavor
    /// (`None` when the declaration has none).
    pub fn flavors(&self, flavor: Option<&str>) -> miette::Result<Vec<Option<String>>> {
        match flavor {
            Some(f) => {
                self.manifest.for_flavor(f)?;
                Ok(vec![Some(f.to_string())])
            }
            None if self.manifest.flavors.is_empty() => Ok(vec![None]),
            None => Ok(self
                .manifest
                .flavor_names()
                .into_iter()
                .map(|f| Some(f.to_string()))
                .collect()),
        }
    }

    /// The declaration as seen by `flavor`.
    pub fn manifest_for(&self, flavor: Option<&str>) -> Result<ProductManifest, ComposeError> {
        match flavor {
            Some(f) => self.manifest.for_flavor(f),
            None => Ok(self.manifest.clone()),
        }
    }
}

/// `--reposdir`, else `[build].reposdir` of the global configuration.
pub fn reposdir(opts: &SetupOptions, config: &GlobalConfig) -> Option<PathBuf> {
    opts.reposdir
        .clone()
        .or_else(|| config.build.reposdir.as_ref().map(PathBuf::from))
}

/// Scan the configured repository directory without loading a declaration.
pub fn load_pool(opts: &SetupOptions) -> miette::Result<Pool> {
    let config = GlobalConfig::load()?;
    let dir = reposdir(opts, &config).ok_or_else(no_reposdir)?;
    scan_pool(&dir, &config)
}

fn no_reposdir() -> ComposeError {
    ComposeError::Generic {
        message: "No repository directory given; use --reposdir or set [build].reposdir"
            .to_string(),
    }
}

fn locate_manifest(explicit: Option<&Path>) -> miette::Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().map_err(ComposeError::from)?;
    let dir = find_ancestor_with(&cwd, MANIFEST_FILE).ok_or_else(|| ComposeError::Manifest {
        message: format!(
            "Could not find {MANIFEST_FILE} in {} or any parent directory",
            cwd.display()
        ),
    })?;
    Ok(dir.join(MANIFEST_FILE))
}

/// Scan `reposdir` with a spinner and report what was found.
pub fn scan_pool(reposdir: &Path, config: &GlobalConfig) -> miette::Result<Pool> {
    let sp = progress::spinner(&format!("Scanning {}...", reposdir.display()));
    let mut pool = Pool::new();
    let result = pool.scan(reposdir, &config.scan);
    sp.finish_and_clear();
    let summary = result?;
    progress::status(
        "Scanned",
        &format!(
            "{} packages, {} update notices in {}",
            summary.packages,
            summary.updateinfos,
            reposdir.display()
        ),
    );
    if summary.skipped > 0 {
        progress::status_warn(
            "Skipped",
            &format!("{} unreadable package file(s)", summary.skipped),
        );
    }
    Ok(pool)
}
