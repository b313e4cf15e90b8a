//! Operation: compute which packages a product build would place into its tree.
//!
//! Scans the repository directory, drops packages of blocked updates, resolves
//! the content and unpack sets and runs selection for every architecture of
//! every requested flavor. Nothing is written; the plan is printed.

use std::collections::BTreeMap;

use serde::Serialize;

use prodcomp_core::manifest::{BuildOption, ProductManifest};
use prodcomp_core::supportstatus::SupportStatusOverrides;
use prodcomp_resolver::miss::{Miss, MissReport};
use prodcomp_resolver::pool::Pool;
use prodcomp_resolver::resolver::ResolutionContext;
use prodcomp_resolver::selection::{self, Medium, SelectOptions};
use prodcomp_util::errors::ComposeError;
use prodcomp_util::progress;

use crate::ops_setup::{ComposeContext, SetupOptions};

/// Options for `prodcomp plan`.
#[derive(Debug, Default, Clone)]
pub struct PlanOptions {
    pub setup: SetupOptions,
    pub flavor: Option<String>,
    /// Emit JSON instead of text.
    pub json: bool,
}

/// A planned package, as printed.
#[derive(Debug, Clone, Serialize)]
pub struct PlannedPackage {
    pub nevra: String,
    pub medium: String,
    pub origin: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supportstatus: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provenance: Option<String>,
}

/// Plan of one architecture.
#[derive(Debug, Clone, Serialize)]
pub struct ArchPlan {
    pub arch: String,
    pub packages: Vec<PlannedPackage>,
    pub unpack: Vec<String>,
    pub misses: Vec<Miss>,
}

/// Plan of one flavor (or the plain declaration).
#[derive(Debug, Clone, Serialize)]
pub struct FlavorPlan {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flavor: Option<String>,
    pub product_dir: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Product CPE advertised by a selected `*-release` package.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpeid: Option<String>,
    pub architectures: Vec<ArchPlan>,
}

pub fn plan(opts: &PlanOptions) -> miette::Result<()> {
    let mut ctx = ComposeContext::load_requiring_pool(&opts.setup)?;
    if let Some(pool) = ctx.pool.as_mut() {
        let removed = pool.remove_blocked();
        if removed > 0 {
            progress::status_info("Blocked", &format!("{removed} package(s) of blocked updates"));
        }
    }
    let pool = ctx.pool()?;

    let mut plans = Vec::new();
    for flavor in ctx.flavors(opts.flavor.as_deref())? {
        let manifest = ctx.manifest_for(flavor.as_deref())?;
        plans.push(plan_flavor(pool, &manifest, flavor, &ctx.overrides)?);
    }

    if opts.json {
        let out = serde_json::to_string_pretty(&plans).map_err(|e| ComposeError::Generic {
            message: format!("Failed to serialize plan: {e}"),
        })?;
        println!("{out}");
    } else {
        for p in &plans {
            print_plan(p);
        }
    }
    Ok(())
}

/// Build the plan of one flavor; aborts on misses unless the declaration allows them.
pub fn plan_flavor(
    pool: &Pool,
    manifest: &ProductManifest,
    flavor: Option<String>,
    overrides: &SupportStatusOverrides,
) -> miette::Result<FlavorPlan> {
    let version = selection::product_version(pool, manifest)?;
    let options = SelectOptions::from_manifest(manifest);
    let mut resolution = ResolutionContext::new(&manifest.packagesets, Some(pool));
    let mut misses = MissReport::new();
    let mut architectures = Vec::new();
    let mut cpeid = None;

    for arch in &manifest.architectures {
        let content =
            resolution.resolve_union("content", arch, flavor.as_deref(), &manifest.content)?;
        let picked = selection::select(pool, &content, arch, &options, overrides)?;

        let mut unpack = Vec::new();
        let mut arch_misses = picked.misses.clone();
        for setname in &manifest.unpack {
            let set = resolution.resolve(arch, flavor.as_deref(), setname)?;
            let (found, missing) = selection::select_unpack(pool, &set, arch);
            unpack.extend(found.iter().map(|p| p.nevra()));
            arch_misses.extend(missing);
        }

        if cpeid.is_none() {
            cpeid = picked
                .of(Medium::Binary)
                .find_map(|p| p.package.product_cpeid());
        }

        let packages = picked
            .picks
            .iter()
            .map(|pick| PlannedPackage {
                nevra: pick.package.nevra(),
                medium: pick.medium.to_string(),
                origin: pick.package.origin.display().to_string(),
                supportstatus: match pick.medium {
                    Medium::Binary => picked
                        .supportstatus
                        .get(&pick.package.name)
                        .cloned()
                        .flatten(),
                    _ => None,
                },
                provenance: pick.provenance.as_ref().map(|p| p.display().to_string()),
            })
            .collect();

        architectures.push(ArchPlan {
            arch: arch.clone(),
            packages,
            unpack,
            misses: arch_misses.misses.clone(),
        });
        misses.extend(arch_misses);
    }

    if !misses.is_empty() {
        if manifest.has_option(BuildOption::IgnoreMissingPackages) {
            progress::status_warn("Missing", &format!("{} package(s) ignored", misses.len()));
        } else {
            eprint!("{misses}");
            return Err(ComposeError::MissingPackages {
                count: misses.len(),
            }
            .into());
        }
    }

    Ok(FlavorPlan {
        product_dir: manifest.product_dir(flavor.as_deref()),
        flavor,
        version,
        cpeid,
        architectures,
    })
}

fn print_plan(plan: &FlavorPlan) {
    let label = plan.flavor.as_deref().unwrap_or("(default)");
    match &plan.version {
        Some(v) => println!("{label}: {} (version {v})", plan.product_dir),
        None => println!("{label}: {}", plan.product_dir),
    }
    if let Some(cpeid) = &plan.cpeid {
        println!("  cpeid: {cpeid}");
    }
    for arch in &plan.architectures {
        let mut by_medium: BTreeMap<&str, Vec<&PlannedPackage>> = BTreeMap::new();
        for p in &arch.packages {
            by_medium.entry(p.medium.as_str()).or_default().push(p);
        }
        println!("  {}:", arch.arch);
        for (medium, packages) in by_medium {
            println!("    {medium} ({}):", packages.len());
            for p in packages {
                match &p.supportstatus {
                    Some(status) => println!("      {} [{status}]", p.nevra),
                    None => println!("      {}", p.nevra),
                }
            }
        }
        if !arch.unpack.is_empty() {
            println!("    unpack: {}", arch.unpack.join(", "));
        }
        for miss in &arch.misses {
            println!("    missing {miss}");
        }
    }
}
