// src/version.rs

//! Release versions and specifier expressions
//!
//! Index release strings (`1.2`, `2.0.0rc1`, `1.0.dev3+local`) are mapped onto
//! `semver::Version` so that ordering follows semver precedence. Pre-release
//! labels are rewritten so that `dev < alpha < beta < rc < final` holds under
//! semver's identifier ordering.
//!
//! A specifier expression is a comma-joined list of comparator clauses such as
//! `>=2.0,<3.0`, `!=3.0.*` or `~=1.4.5`.

use crate::error::{Error, Result};
use regex::Regex;
use semver::{BuildMetadata, Prerelease, Version};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

static RELEASE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?ix)^
        v?
        (?P<major>\d+)(?:\.(?P<minor>\d+))?(?:\.(?P<patch>\d+))?
        (?:[-_.]?(?P<label>alpha|a|beta|b|rc|c|preview|pre|dev)[-_.]?(?P<num>\d+)?)?
        (?:\+(?P<local>[a-z0-9]+(?:[-_.][a-z0-9]+)*))?
        $",
    )
    .expect("release pattern is valid")
});

static WILDCARD_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+(?:\.\d+){0,2}$").expect("wildcard pattern is valid"));

/// A release version as published on the package index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Release {
    /// Release text exactly as the index spells it
    pub raw: String,
    /// Semver rendering used for ordering and comparisons
    pub version: Version,
}

impl Release {
    /// Parse an index release string
    ///
    /// Returns `None` for release strings that have no semver rendering
    /// (epochs, post releases, four or more numeric components).
    pub fn parse(raw: &str) -> Option<Self> {
        parse_version(raw.trim()).map(|(version, _)| Self {
            raw: raw.to_string(),
            version,
        })
    }

    /// Major, minor and patch as a slice-friendly array
    fn components(&self) -> [u64; 3] {
        [self.version.major, self.version.minor, self.version.patch]
    }
}

impl Ord for Release {
    fn cmp(&self, other: &Self) -> Ordering {
        self.version
            .cmp(&other.version)
            .then_with(|| self.raw.cmp(&other.raw))
    }
}

impl PartialOrd for Release {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Release {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

/// Map a release string onto semver, also returning how many numeric
/// components were actually written.
fn parse_version(text: &str) -> Option<(Version, usize)> {
    let caps = RELEASE_PATTERN.captures(text)?;

    let number = |name: &str| -> Option<Option<u64>> {
        match caps.name(name) {
            Some(m) => m.as_str().parse().ok().map(Some),
            None => Some(None),
        }
    };

    let major = number("major")??;
    let minor = number("minor")?;
    let patch = number("patch")?;
    let written = 1 + usize::from(minor.is_some()) + usize::from(patch.is_some());

    let mut version = Version::new(major, minor.unwrap_or(0), patch.unwrap_or(0));

    if let Some(label) = caps.name("label") {
        let label = match label.as_str().to_ascii_lowercase().as_str() {
            "dev" => "0dev",
            "a" | "alpha" => "alpha",
            "b" | "beta" => "beta",
            _ => "rc",
        };
        let num = caps.name("num").map_or("0", |m| m.as_str());
        let num: u64 = num.parse().ok()?;
        version.pre = Prerelease::new(&format!("{}.{}", label, num)).ok()?;
    }

    if let Some(local) = caps.name("local") {
        let local = local.as_str().replace(['_', '-'], ".");
        // A local label that semver rejects is dropped, it never affects matching.
        if let Ok(build) = BuildMetadata::new(&local) {
            version.build = build;
        }
    }

    Some((version, written))
}

/// Version with build metadata stripped, for equality checks
fn precedence(version: &Version) -> Version {
    Version {
        build: BuildMetadata::EMPTY,
        ..version.clone()
    }
}

/// Comparison operator of a single specifier clause
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Equal,
    NotEqual,
    GreaterEq,
    LessEq,
    Greater,
    Less,
    Compatible,
    Arbitrary,
}

impl Operator {
    pub fn as_str(&self) -> &str {
        match self {
            Operator::Equal => "==",
            Operator::NotEqual => "!=",
            Operator::GreaterEq => ">=",
            Operator::LessEq => "<=",
            Operator::Greater => ">",
            Operator::Less => "<",
            Operator::Compatible => "~=",
            Operator::Arbitrary => "===",
        }
    }

    /// Split a clause into its operator and the remaining version text
    fn split(clause: &str) -> Option<(Self, &str)> {
        // Longer operators first so that `===` is not read as `==`
        const OPERATORS: [(&str, Operator); 8] = [
            ("===", Operator::Arbitrary),
            ("==", Operator::Equal),
            ("!=", Operator::NotEqual),
            (">=", Operator::GreaterEq),
            ("<=", Operator::LessEq),
            ("~=", Operator::Compatible),
            (">", Operator::Greater),
            ("<", Operator::Less),
        ];

        OPERATORS
            .iter()
            .find_map(|(token, op)| clause.strip_prefix(token).map(|rest| (*op, rest.trim())))
    }
}

/// One `op version` clause of a specifier expression
#[derive(Debug, Clone)]
struct Clause {
    op: Operator,
    /// Version text as written after the operator
    text: String,
    /// Parsed version (unused for `===`)
    version: Version,
    /// Numeric components as written, used by wildcards and `~=`
    components: Vec<u64>,
    wildcard: bool,
}

impl Clause {
    fn parse(clause: &str) -> Result<Self> {
        let invalid = || Error::InvalidSpecifier(clause.to_string());

        let (op, text) = Operator::split(clause).ok_or_else(invalid)?;
        if text.is_empty() {
            return Err(invalid());
        }

        if op == Operator::Arbitrary {
            return Ok(Self {
                op,
                text: text.to_string(),
                version: Version::new(0, 0, 0),
                components: Vec::new(),
                wildcard: false,
            });
        }

        if let Some(prefix) = text.strip_suffix(".*") {
            if !matches!(op, Operator::Equal | Operator::NotEqual)
                || !WILDCARD_PATTERN.is_match(prefix)
            {
                return Err(invalid());
            }
            let components = prefix
                .split('.')
                .map(|c| c.parse::<u64>().map_err(|_| invalid()))
                .collect::<Result<Vec<_>>>()?;
            return Ok(Self {
                op,
                text: text.to_string(),
                version: Version::new(0, 0, 0),
                components,
                wildcard: true,
            });
        }

        let (version, written) = parse_version(text).ok_or_else(invalid)?;
        if op == Operator::Compatible && written < 2 {
            return Err(invalid());
        }
        let components = [version.major, version.minor, version.patch][..written].to_vec();

        Ok(Self {
            op,
            text: text.to_string(),
            version,
            components,
            wildcard: false,
        })
    }

    fn prefix_matches(&self, release: &Release, prefix: &[u64]) -> bool {
        release.components().iter().zip(prefix).all(|(a, b)| a == b)
    }

    fn contains(&self, release: &Release) -> bool {
        let candidate = precedence(&release.version);
        let target = precedence(&self.version);

        match self.op {
            Operator::Arbitrary => release.raw.trim().eq_ignore_ascii_case(&self.text),
            Operator::Equal if self.wildcard => self.prefix_matches(release, &self.components),
            Operator::NotEqual if self.wildcard => !self.prefix_matches(release, &self.components),
            Operator::Equal => candidate == target,
            Operator::NotEqual => candidate != target,
            Operator::GreaterEq => candidate >= target,
            Operator::LessEq => candidate <= target,
            Operator::Greater => candidate > target,
            Operator::Less => candidate < target,
            Operator::Compatible => {
                let prefix = &self.components[..self.components.len() - 1];
                candidate >= target && self.prefix_matches(release, prefix)
            }
        }
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.op.as_str(), self.text)
    }
}

/// A parsed specifier expression
///
/// An empty expression admits every release.
#[derive(Debug, Clone, Default)]
pub struct SpecifierSet {
    clauses: Vec<Clause>,
}

impl SpecifierSet {
    /// Whether `release` satisfies every clause
    pub fn contains(&self, release: &Release) -> bool {
        self.clauses.iter().all(|clause| clause.contains(release))
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }
}

impl FromStr for SpecifierSet {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.trim().is_empty() {
            return Ok(Self::default());
        }

        let clauses = s
            .split(',')
            .map(|clause| Clause::parse(clause.trim()))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { clauses })
    }
}

impl fmt::Display for SpecifierSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let clauses: Vec<String> = self.clauses.iter().map(ToString::to_string).collect();
        write!(f, "{}", clauses.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn release(raw: &str) -> Release {
        Release::parse(raw).unwrap()
    }

    fn spec(s: &str) -> SpecifierSet {
        s.parse().unwrap()
    }

    #[test]
    fn test_release_padding() {
        assert_eq!(release("1").version, Version::new(1, 0, 0));
        assert_eq!(release("1.2").version, Version::new(1, 2, 0));
        assert_eq!(release("v1.2.3").version, Version::new(1, 2, 3));
        assert_eq!(release("1.2").raw, "1.2");
    }

    #[test]
    fn test_unmappable_releases_are_rejected() {
        assert!(Release::parse("1!2.0").is_none());
        assert!(Release::parse("1.0.post1").is_none());
        assert!(Release::parse("1.2.3.4").is_none());
        assert!(Release::parse("latest").is_none());
    }

    #[test]
    fn test_prerelease_ordering() {
        let mut releases = vec![
            release("1.0"),
            release("1.0rc1"),
            release("1.0b2"),
            release("1.0.dev1"),
            release("1.0a1"),
            release("0.9"),
        ];
        releases.sort();
        let order: Vec<&str> = releases.iter().map(|r| r.raw.as_str()).collect();
        assert_eq!(order, vec!["0.9", "1.0.dev1", "1.0a1", "1.0b2", "1.0rc1", "1.0"]);
        assert!(!release("1.0rc1").version.pre.is_empty());
        assert!(release("1.0").version.pre.is_empty());
    }

    #[test]
    fn test_range_clauses_admit_prereleases() {
        assert!(spec(">=1.5").contains(&release("2.0.0rc1")));
        assert!(spec("<2.0").contains(&release("2.0.0rc1")));
        assert!(!spec(">=2.0").contains(&release("2.0.0rc1")));
    }

    #[test]
    fn test_numeric_ordering_is_not_lexicographic() {
        assert!(release("1.10.0") > release("1.9.0"));
        assert!(release("10.0") > release("9.9.9"));
    }

    #[test]
    fn test_range_specifier() {
        let set = spec(">=2.0.0,<3.0.0");
        assert!(set.contains(&release("2.0.0")));
        assert!(set.contains(&release("2.9")));
        assert!(!set.contains(&release("3.0.0")));
        assert!(!set.contains(&release("1.9")));
    }

    #[test]
    fn test_equality_pads_zeros() {
        assert!(spec("==1.2").contains(&release("1.2.0")));
        assert!(spec("==1.2.0").contains(&release("1.2")));
        assert!(spec("==1.2").contains(&release("1.2+cpu")));
        assert!(!spec("!=1.2").contains(&release("1.2.0")));
    }

    #[test]
    fn test_wildcards() {
        let set = spec(">=2.7, !=3.0.*, !=3.1.*");
        assert!(set.contains(&release("2.7.18")));
        assert!(!set.contains(&release("3.0.1")));
        assert!(!set.contains(&release("3.1")));
        assert!(set.contains(&release("3.12.1")));
        assert!(spec("==1.*").contains(&release("1.4.2")));
    }

    #[test]
    fn test_compatible_release() {
        let set = spec("~=1.4.5");
        assert!(set.contains(&release("1.4.5")));
        assert!(set.contains(&release("1.4.9")));
        assert!(!set.contains(&release("1.5.0")));

        let set = spec("~=2.2");
        assert!(set.contains(&release("2.9")));
        assert!(!set.contains(&release("3.0")));
        assert!(!set.contains(&release("2.1")));
    }

    #[test]
    fn test_arbitrary_equality() {
        assert!(spec("===1.0").contains(&release("1.0")));
        assert!(!spec("===1.0").contains(&release("1.0.0")));
    }

    #[test]
    fn test_invalid_specifiers() {
        for bad in ["2.0", ">=", ">=abc", "~=1", ">=1.*", "==1.x.*", ">=1.0,,<2"] {
            let result = bad.parse::<SpecifierSet>();
            assert!(
                matches!(result, Err(Error::InvalidSpecifier(_))),
                "expected {} to be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_empty_specifier_admits_everything() {
        let set = spec("");
        assert!(set.is_empty());
        assert!(set.contains(&release("0.0.1")));
    }

    #[test]
    fn test_display_is_normalized() {
        assert_eq!(spec(" >= 2.0 , < 3.0 ").to_string(), ">=2.0,<3.0");
    }
}
