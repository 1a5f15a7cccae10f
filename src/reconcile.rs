// src/reconcile.rs

//! Manifest reconciliation
//!
//! Install and uninstall requests are turned into a `Plan`: the records to
//! hand to the package manager and the complete manifest to write back. Plans
//! are computed entirely in memory; `apply` runs the package manager first and
//! only then overwrites the manifest, so a failed install leaves the manifest
//! untouched.

use crate::error::Result;
use crate::index::IndexClient;
use crate::installer::{InstallerCommand, PackageInstaller, PassthroughArgs};
use crate::manifest::{self, ManifestSet, SaveMode};
use crate::package::{PackageToken, parse_token};
use crate::resolver::Resolver;
use std::path::Path;
use tracing::debug;

/// Exit code reported when a request has no effect
pub const NOTHING_TO_DO_EXIT_CODE: i32 = 4000;

/// Whether a plan has any effect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Run the package manager and write the manifest
    Apply,
    /// Nothing to install or remove
    NothingToDo,
}

impl Outcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            Outcome::Apply => 0,
            Outcome::NothingToDo => NOTHING_TO_DO_EXIT_CODE,
        }
    }
}

/// Result of reconciling a request against the current manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub command: InstallerCommand,
    pub outcome: Outcome,
    /// Records to install, or records to remove
    pub changes: ManifestSet,
    /// Full manifest after the change
    pub next_manifest: ManifestSet,
}

impl Plan {
    pub fn is_nothing_to_do(&self) -> bool {
        self.outcome == Outcome::NothingToDo
    }

    /// Package arguments for the package manager
    ///
    /// Installs pass canonical records, removals pass bare names.
    pub fn installer_packages(&self) -> Vec<String> {
        match self.command {
            InstallerCommand::Install => self.changes.iter().map(ToString::to_string).collect(),
            InstallerCommand::Uninstall => self.changes.iter().map(|r| r.name.clone()).collect(),
        }
    }
}

fn outcome(changes: &ManifestSet, args: &PassthroughArgs) -> Outcome {
    if changes.is_empty() && !args.forces_run() {
        Outcome::NothingToDo
    } else {
        Outcome::Apply
    }
}

/// Merge already-resolved records into the current manifest
///
/// Records already present verbatim are not reinstalled. A current record
/// is replaced when a new record names the same package.
pub fn merge_install(current: &ManifestSet, resolved: ManifestSet, args: &PassthroughArgs) -> Plan {
    let to_install: ManifestSet = resolved.difference(current).cloned().collect();

    let mut next_manifest: ManifestSet = current
        .iter()
        .filter(|old| !to_install.iter().any(|new| new.same_package(old)))
        .cloned()
        .collect();
    next_manifest.extend(to_install.iter().cloned());

    debug!("To install: {:?}", to_install);
    Plan {
        command: InstallerCommand::Install,
        outcome: outcome(&to_install, args),
        changes: to_install,
        next_manifest,
    }
}

/// Resolve requested tokens and merge them into the current manifest
///
/// With `update_all`, every current record is also re-resolved from its
/// `name[extras]`, which pins it to the newest eligible release. Explicitly
/// requested tokens win over re-resolved records of the same package.
pub fn install_merge<C: IndexClient>(
    resolver: &Resolver<C>,
    current: &ManifestSet,
    requested: &[String],
    update_all: bool,
    args: &PassthroughArgs,
) -> Result<Plan> {
    let mut resolved: ManifestSet = resolver.resolve_all(requested)?.into_iter().collect();

    if update_all {
        let names: Vec<String> = current.iter().map(|r| r.requirement_name()).collect();
        let refreshed = resolver.resolve_all(names.as_slice())?;
        let refreshed: Vec<_> = refreshed
            .into_iter()
            .filter(|record| !resolved.iter().any(|r| r.same_package(record)))
            .collect();
        resolved.extend(refreshed);
    }

    Ok(merge_install(current, resolved, args))
}

/// Work out which current records a removal request targets
///
/// Only names are matched; specifiers in the request are ignored. No index
/// query is needed.
pub fn uninstall_merge(
    current: &ManifestSet,
    requested: &[String],
    delete_all: bool,
    args: &PassthroughArgs,
) -> Result<Plan> {
    let tokens = requested
        .iter()
        .map(|token| parse_token(token))
        .collect::<Result<Vec<PackageToken>>>()?;

    let to_remove: ManifestSet = if delete_all {
        current.clone()
    } else {
        current
            .iter()
            .filter(|record| tokens.iter().any(|token| token.name == record.name))
            .cloned()
            .collect()
    };

    let next_manifest: ManifestSet = current.difference(&to_remove).cloned().collect();

    debug!("To remove: {:?}", to_remove);
    Ok(Plan {
        command: InstallerCommand::Uninstall,
        outcome: outcome(&to_remove, args),
        changes: to_remove,
        next_manifest,
    })
}

/// Carry out a plan
///
/// The package manager only runs for `Outcome::Apply`; the next manifest is
/// written in either case.
pub fn apply<I>(plan: &Plan, installer: &I, args: &PassthroughArgs, manifest_path: &Path) -> Result<Outcome>
where
    I: PackageInstaller + ?Sized,
{
    if plan.outcome == Outcome::Apply {
        installer.run(plan.command, &plan.installer_packages(), args.as_slice())?;
    }

    manifest::save(&plan.next_manifest, manifest_path, SaveMode::Overwrite)?;
    Ok(plan.outcome)
}
