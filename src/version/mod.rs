//! Version specification parsing and validation.
//!
//! Installs are requested either for a concrete `MAJOR.MINOR.PATCH` version
//! or for "whatever the newest release is". Artifact servers expose the
//! latter through the literal `[RELEASE]` path segment, which resolves
//! server-side to the most recent published version.
//!
//! Concrete versions are validated before any network traffic: they must
//! match the three-component format, and they must not be older than the
//! minimum release the artifact layout supports (older releases were
//! published under a different directory scheme and cannot be fetched by
//! this client).

use crate::core::ArmoryError;
use anyhow::Result;
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

/// Path segment artifact servers interpret as "the newest release".
pub const LATEST_SENTINEL: &str = "[RELEASE]";

/// Oldest release the artifact directory layout supports.
fn min_supported_version() -> semver::Version {
    semver::Version::new(2, 6, 1)
}

fn version_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\d+\.\d+\.\d+$").expect("version pattern is valid"))
}

/// A requested tool version: either the newest release or an exact one.
///
/// # Examples
///
/// ```rust
/// use armory::version::VersionSpec;
///
/// assert!(VersionSpec::parse("latest").unwrap().is_latest());
/// assert!(VersionSpec::parse("").unwrap().is_latest());
///
/// let exact = VersionSpec::parse("2.7.0").unwrap();
/// assert_eq!(exact.path_segment(), "2.7.0");
/// assert!(VersionSpec::parse("1.2").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VersionSpec {
    /// Resolve to the newest published release at download time.
    Latest,
    /// A concrete, validated `MAJOR.MINOR.PATCH` version.
    Exact(String),
}

impl VersionSpec {
    /// Parse a user-supplied version string.
    ///
    /// The empty string, `latest` (any case), and the raw `[RELEASE]`
    /// sentinel all mean [`VersionSpec::Latest`]. Anything else must be a
    /// valid exact version.
    ///
    /// # Errors
    ///
    /// Returns [`ArmoryError::InvalidVersion`] when the string is neither a
    /// latest alias nor a supported `MAJOR.MINOR.PATCH` version.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty()
            || trimmed.eq_ignore_ascii_case("latest")
            || trimmed == LATEST_SENTINEL
        {
            return Ok(Self::Latest);
        }

        validate_exact(trimmed)?;
        Ok(Self::Exact(trimmed.to_string()))
    }

    /// Whether this spec resolves server-side to the newest release.
    #[must_use]
    pub const fn is_latest(&self) -> bool {
        matches!(self, Self::Latest)
    }

    /// The segment this version occupies in artifact URLs.
    #[must_use]
    pub fn path_segment(&self) -> &str {
        match self {
            Self::Latest => LATEST_SENTINEL,
            Self::Exact(version) => version,
        }
    }

    /// The directory name installs of this version live under.
    ///
    /// `[RELEASE]` is not a usable directory name, so latest installs share
    /// a `latest` directory and are upgraded in place as releases appear.
    #[must_use]
    pub fn dir_segment(&self) -> &str {
        match self {
            Self::Latest => "latest",
            Self::Exact(version) => version,
        }
    }
}

impl fmt::Display for VersionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Latest => f.write_str("latest"),
            Self::Exact(version) => f.write_str(version),
        }
    }
}

/// Validate an exact version string: format first, then the minimum floor.
fn validate_exact(version: &str) -> Result<()> {
    if !version_pattern().is_match(version) {
        return Err(ArmoryError::InvalidVersion {
            version: version.to_string(),
            reason: "expected MAJOR.MINOR.PATCH, e.g. 2.7.0".to_string(),
        }
        .into());
    }

    let parsed = semver::Version::parse(version).map_err(|err| ArmoryError::InvalidVersion {
        version: version.to_string(),
        reason: err.to_string(),
    })?;

    let min = min_supported_version();
    if parsed < min {
        return Err(ArmoryError::InvalidVersion {
            version: version.to_string(),
            reason: format!("below the minimum supported version {min}"),
        }
        .into());
    }

    Ok(())
}
