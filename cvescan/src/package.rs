use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use anyhow::{Result, bail};
use serde::Serialize;

/// Canonical lookup key for a package+version: its package-URL string.
///
/// Derived once from a [`Package`] and never mutated; this is the identity
/// the vulnerability service keys its responses on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct PackageCoordinate(String);

impl PackageCoordinate {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PackageCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Package {
    pub raw: String,
    pub package_type: String,
    pub namespace: Option<String>,
    pub name: String,
    pub version: Option<String>,
}

impl FromStr for Package {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self> {
        let Some(rest) = raw.strip_prefix("pkg:") else {
            bail!("missing 'pkg:' scheme in package URL: {raw}");
        };

        let (path, version) = match rest.rsplit_once('@') {
            Some((path, version)) if !version.is_empty() => (path, Some(version.to_string())),
            Some((path, _)) => (path, None),
            None => (rest, None),
        };

        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        if segments.len() < 2 {
            bail!("expected type/name in package URL: {raw}");
        }

        let package_type = segments[0].to_string();
        let name = segments[segments.len() - 1].to_string();
        let namespace = if segments.len() > 2 {
            Some(segments[1..segments.len() - 1].join("/"))
        } else {
            None
        };

        Ok(Self {
            raw: raw.to_string(),
            package_type,
            namespace,
            name,
            version,
        })
    }
}

impl fmt::Display for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pkg:{}", self.package_type)?;
        if let Some(ns) = &self.namespace {
            write!(f, "/{ns}")?;
        }
        write!(f, "/{}", self.name)?;
        if let Some(version) = &self.version {
            write!(f, "@{version}")?;
        }
        Ok(())
    }
}

impl Package {
    /// Derive the canonical coordinate used to query the vulnerability
    /// service. Total and deterministic over any parsed package.
    pub fn coordinate(&self) -> PackageCoordinate {
        PackageCoordinate(self.to_string())
    }
}

impl PartialEq for Package {
    fn eq(&self, other: &Self) -> bool {
        self.package_type == other.package_type
            && self.namespace == other.namespace
            && self.name == other.name
            && self.version == other.version
    }
}

impl Eq for Package {}

impl PartialOrd for Package {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Package {
    fn cmp(&self, other: &Self) -> Ordering {
        self.package_type
            .cmp(&other.package_type)
            .then_with(|| self.namespace.cmp(&other.namespace))
            .then_with(|| self.name.cmp(&other.name))
            .then_with(|| self.version.cmp(&other.version))
    }
}

impl Hash for Package {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.package_type.hash(state);
        self.namespace.hash(state);
        self.name.hash(state);
        self.version.hash(state);
    }
}
