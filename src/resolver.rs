// src/resolver.rs

//! Resolution of package tokens against the package index
//!
//! A token either carries a specifier, which is kept verbatim once at least
//! one eligible release satisfies it, or none, in which case the record is
//! pinned to the newest eligible release (`==<release>`).
//!
//! A release is eligible when one of its distribution files declares a
//! `requires_python` constraint that admits the configured runtime. Projects
//! whose files declare no constraint at all treat every release as eligible.

use crate::error::{Error, Result};
use crate::index::{IndexClient, ProjectInfo};
use crate::package::{PackageRecord, parse_token};
use crate::version::{Release, SpecifierSet};
use rayon::prelude::*;
use tracing::debug;

/// Resolves package tokens to manifest records
pub struct Resolver<C> {
    client: C,
    /// Runtime version releases must be compatible with
    runtime: Release,
}

impl<C: IndexClient> Resolver<C> {
    pub fn new(client: C, runtime: Release) -> Self {
        Self { client, runtime }
    }

    /// Resolve one package token into the record to persist
    pub fn resolve(&self, token: &str) -> Result<PackageRecord> {
        let token = parse_token(token)?;

        // Reject malformed specifiers before touching the network
        let requested = token
            .specifier
            .as_deref()
            .map(|s| s.parse::<SpecifierSet>().map(|set| (s, set)))
            .transpose()?;

        let project = self.client.project(&token.name)?;
        let eligible = eligible_releases(&project, &self.runtime);
        debug!(
            "Eligible releases of {}: {:?}",
            token.name,
            eligible.iter().map(|r| r.raw.as_str()).collect::<Vec<_>>()
        );

        if eligible.is_empty() {
            return Err(Error::NoCompatibleRelease {
                name: token.name,
                runtime: self.runtime.to_string(),
            });
        }

        let specifier = match requested {
            Some((text, set)) => {
                if !eligible.iter().any(|release| set.contains(release)) {
                    return Err(Error::UnsatisfiableSpecifier {
                        name: token.name,
                        specifier: text.to_string(),
                    });
                }
                text.to_string()
            }
            None => {
                let latest = latest_release(&eligible).ok_or_else(|| Error::NoCompatibleRelease {
                    name: token.name.clone(),
                    runtime: self.runtime.to_string(),
                })?;
                format!("=={}", latest.raw)
            }
        };

        debug!("Resolved {} to {}", token.name, specifier);
        Ok(PackageRecord {
            name: token.name,
            extras: token.extras,
            specifier: Some(specifier),
        })
    }

    /// Resolve a batch of tokens
    ///
    /// Index queries run in parallel; the first failure fails the batch.
    pub fn resolve_all<S>(&self, tokens: &[S]) -> Result<Vec<PackageRecord>>
    where
        S: AsRef<str> + Sync,
    {
        tokens
            .par_iter()
            .map(|token| self.resolve(token.as_ref()))
            .collect()
    }
}

/// Releases of `project` usable with `runtime`
///
/// Release strings without a semver rendering and releases whose files are
/// all yanked are skipped.
pub fn eligible_releases(project: &ProjectInfo, runtime: &Release) -> Vec<Release> {
    let mut declared = false;
    let mut compatible = Vec::new();
    let mut published = Vec::new();

    for (raw, files) in &project.releases {
        let Some(release) = Release::parse(raw) else {
            debug!("Skipping release {} without a comparable version", raw);
            continue;
        };

        let mut files = files.iter().filter(|file| !file.yanked).peekable();
        if files.peek().is_none() {
            continue;
        }

        let mut admits = false;
        for constraint in files.filter_map(|file| file.requires_python.as_deref()) {
            declared = true;
            admits |= runtime_admits(constraint, runtime);
        }

        if admits {
            compatible.push(release.clone());
        }
        published.push(release);
    }

    if declared { compatible } else { published }
}

/// Whether a `requires_python` constraint admits `runtime`
fn runtime_admits(constraint: &str, runtime: &Release) -> bool {
    match constraint.parse::<SpecifierSet>() {
        Ok(set) => set.contains(runtime),
        Err(e) => {
            debug!("Ignoring unparseable runtime constraint: {}", e);
            false
        }
    }
}

/// Greatest eligible release by version precedence, pre-releases included
pub fn latest_release(eligible: &[Release]) -> Option<&Release> {
    eligible.iter().max()
}
