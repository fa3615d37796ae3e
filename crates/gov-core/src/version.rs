//! # Schema and API Versions
//!
//! A policy document declares `apiVersion: <namespace>/<schema-version>`.
//! Schema versions identify a field layout; migrations move documents
//! between them. Both `1.1.0` and `v1.1.0` spellings are accepted and
//! normalize to the same [`SchemaVersion`].
//!
//! A policy's own `metadata.version` is a separate, full semantic version
//! ([`PolicyVersion`]).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::VersionError;

/// A `v<major>.<minor>.<patch>` schema version identifier.
///
/// Ordering is numeric per component, so `v1.10.0 > v1.9.0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SchemaVersion {
    major: u64,
    minor: u64,
    patch: u64,
}

impl SchemaVersion {
    /// Construct a version from its numeric components.
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parse a version string, accepting an optional leading `v`.
    pub fn parse(raw: &str) -> Result<Self, VersionError> {
        let invalid = || VersionError::InvalidSchemaVersion(raw.to_string());
        let trimmed = raw.trim();
        let digits = trimmed.strip_prefix('v').unwrap_or(trimmed);
        let mut parts = digits.split('.');
        let mut next = || -> Result<u64, VersionError> {
            let part = parts.next().ok_or_else(invalid)?;
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            part.parse::<u64>().map_err(|_| invalid())
        };
        let major = next()?;
        let minor = next()?;
        let patch = next()?;
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(Self::new(major, minor, patch))
    }

    /// Major component.
    pub fn major(&self) -> u64 {
        self.major
    }

    /// Minor component.
    pub fn minor(&self) -> u64 {
        self.minor
    }

    /// Patch component.
    pub fn patch(&self) -> u64 {
        self.patch
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for SchemaVersion {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for SchemaVersion {
    type Error = VersionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<SchemaVersion> for String {
    fn from(value: SchemaVersion) -> Self {
        value.to_string()
    }
}

/// A parsed `apiVersion` value: `<namespace>/<schema-version>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ApiVersion {
    /// Namespace portion, e.g. `governance`.
    pub namespace: String,
    /// Schema version portion.
    pub version: SchemaVersion,
}

impl ApiVersion {
    /// Build an `apiVersion` from its parts.
    pub fn new(namespace: impl Into<String>, version: SchemaVersion) -> Self {
        Self {
            namespace: namespace.into(),
            version,
        }
    }

    /// Parse `<namespace>/<version>`. The namespace must be non-empty.
    pub fn parse(raw: &str) -> Result<Self, VersionError> {
        let (namespace, version) = raw
            .split_once('/')
            .ok_or_else(|| VersionError::InvalidApiVersion(raw.to_string()))?;
        if namespace.trim().is_empty() {
            return Err(VersionError::InvalidApiVersion(raw.to_string()));
        }
        let version = SchemaVersion::parse(version)
            .map_err(|_| VersionError::InvalidApiVersion(raw.to_string()))?;
        Ok(Self::new(namespace.trim(), version))
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.version)
    }
}

impl FromStr for ApiVersion {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// The content version a policy declares in `metadata.version`.
///
/// A full semantic version, prerelease and build metadata included
/// (`1.2.0-rc.1+build.5`). Unlike [`SchemaVersion`] there is no `v` prefix.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PolicyVersion(semver::Version);

impl PolicyVersion {
    /// Parse a semantic version string.
    pub fn parse(raw: &str) -> Result<Self, VersionError> {
        semver::Version::parse(raw)
            .map(Self)
            .map_err(|_| VersionError::InvalidPolicyVersion(raw.to_string()))
    }

    /// Whether the version carries a prerelease tag.
    pub fn is_prerelease(&self) -> bool {
        !self.0.pre.is_empty()
    }

    /// The underlying semver value.
    pub fn as_semver(&self) -> &semver::Version {
        &self.0
    }
}

impl fmt::Display for PolicyVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for PolicyVersion {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for PolicyVersion {
    type Error = VersionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PolicyVersion> for String {
    fn from(value: PolicyVersion) -> Self {
        value.to_string()
    }
}
