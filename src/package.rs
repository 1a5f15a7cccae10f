// src/package.rs

//! Package records and the package token grammar
//!
//! A package token is `name`, optionally followed by `[extras]`, followed by
//! a specifier expression taken verbatim (`SomePackage[suffix]>=2.0,<3.0`).
//! The same grammar is used for command-line tokens and manifest lines.

use crate::error::{Error, Result};
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

static TOKEN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<name>[A-Za-z0-9_-]+)(?:\[(?P<extras>[A-Za-z0-9_-]+)\])?(?P<specifier>(?s:.*))$")
        .expect("package token pattern is valid")
});

/// Fields of a parsed package token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageToken {
    pub name: String,
    pub extras: Option<String>,
    /// Everything after the name and extras, unvalidated
    pub specifier: Option<String>,
}

/// Split a package token into name, extras and specifier expression
///
/// Only the name group is validated here; the specifier expression is kept
/// as written and interpreted later by the resolver.
pub fn parse_token(token: &str) -> Result<PackageToken> {
    let caps = TOKEN_PATTERN
        .captures(token)
        .ok_or_else(|| Error::InvalidPackageToken(token.to_string()))?;

    let name = caps["name"].to_string();
    let extras = caps.name("extras").map(|m| m.as_str().to_string());
    let specifier = caps
        .name("specifier")
        .map(|m| m.as_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    Ok(PackageToken {
        name,
        extras,
        specifier,
    })
}

/// A package as it appears in the manifest
///
/// Equality, hashing and ordering cover name, extras and specifier together,
/// so two records that differ only in their specifier are distinct members of
/// a manifest set. Use [`PackageRecord::same_package`] for name-only checks.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackageRecord {
    pub name: String,
    pub extras: Option<String>,
    pub specifier: Option<String>,
}

impl PackageRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            extras: None,
            specifier: None,
        }
    }

    pub fn with_extras(mut self, extras: impl Into<String>) -> Self {
        self.extras = Some(extras.into());
        self
    }

    pub fn with_specifier(mut self, specifier: impl Into<String>) -> Self {
        self.specifier = Some(specifier.into());
        self
    }

    /// Whether both records name the same package, ignoring extras and specifier
    pub fn same_package(&self, other: &PackageRecord) -> bool {
        self.name == other.name
    }

    /// `name[extras]` without the specifier, used to re-resolve a record
    pub fn requirement_name(&self) -> String {
        match &self.extras {
            Some(extras) => format!("{}[{}]", self.name, extras),
            None => self.name.clone(),
        }
    }
}

impl From<PackageToken> for PackageRecord {
    fn from(token: PackageToken) -> Self {
        Self {
            name: token.name,
            extras: token.extras,
            specifier: token.specifier,
        }
    }
}

impl FromStr for PackageRecord {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        parse_token(s).map(Self::from)
    }
}

impl fmt::Display for PackageRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(extras) = &self.extras {
            write!(f, "[{}]", extras)?;
        }
        if let Some(specifier) = &self.specifier {
            write!(f, "{}", specifier)?;
        }
        Ok(())
    }
}
