// ── Wire primitives ──
//
// Hrefs, concurrency tokens and API versions. All three are opaque to the
// rest of the workspace: hrefs are only ever compared or joined, tokens are
// byte-compared, versions are ordered numerically.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::Error;

// ── Href ────────────────────────────────────────────────────────────

/// Server-assigned resource locator.
///
/// Usually an absolute URL (`https://smc:8082/6.5/elements/host/42`).
/// Relative hrefs are resolved against the session's API root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Href(String);

impl Href {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Resolve to a full URL, joining relative hrefs onto `base`.
    pub fn to_url(&self, base: &Url) -> Result<Url, Error> {
        match Url::parse(&self.0) {
            Ok(url) => Ok(url),
            Err(url::ParseError::RelativeUrlWithoutBase) => Ok(base.join(&self.0)?),
            Err(e) => Err(Error::InvalidUrl(e)),
        }
    }

    /// Path segments of the href, ignoring scheme, host and query.
    pub fn segments(&self) -> Vec<&str> {
        let without_query = self.0.split(['?', '#']).next().unwrap_or_default();
        let path = without_query
            .split_once("://")
            .map_or(without_query, |(_, rest)| {
                rest.find('/').map_or("", |idx| &rest[idx..])
            });
        path.split('/').filter(|s| !s.is_empty()).collect()
    }
}

impl fmt::Display for Href {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Href {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Href {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<Url> for Href {
    fn from(u: Url) -> Self {
        Self(u.into())
    }
}

// ── Etag ────────────────────────────────────────────────────────────

/// Opaque optimistic-concurrency token.
///
/// Compared byte-for-byte; no ordering or monotonicity is assumed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Etag(String);

impl Etag {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Etag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ── ApiVersion ──────────────────────────────────────────────────────

/// Versions of the REST API this client can speak, oldest first.
pub const SUPPORTED_VERSIONS: &[ApiVersion] = &[
    ApiVersion::new(6, 1),
    ApiVersion::new(6, 2),
    ApiVersion::new(6, 3),
    ApiVersion::new(6, 4),
    ApiVersion::new(6, 5),
];

/// A `major.minor` API protocol version, used as the path prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ApiVersion {
    pub major: u16,
    pub minor: u16,
}

impl ApiVersion {
    pub const fn new(major: u16, minor: u16) -> Self {
        Self { major, minor }
    }

    pub fn is_supported(self) -> bool {
        SUPPORTED_VERSIONS.contains(&self)
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Error returned when a version string isn't `major.minor`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid API version '{0}', expected MAJOR.MINOR")]
pub struct ParseVersionError(String);

impl FromStr for ApiVersion {
    type Err = ParseVersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseVersionError(s.to_owned());
        let (major, minor) = s.trim().split_once('.').ok_or_else(err)?;
        Ok(Self {
            major: major.parse().map_err(|_| err())?,
            minor: minor.parse().map_err(|_| err())?,
        })
    }
}

impl Serialize for ApiVersion {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ApiVersion {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Pick the highest version offered by both sides.
///
/// With `pinned` set, that exact version must be offered by both.
pub fn negotiate_version(
    server: &[ApiVersion],
    pinned: Option<ApiVersion>,
) -> Result<ApiVersion, Error> {
    let chosen = match pinned {
        Some(v) => (v.is_supported() && server.contains(&v)).then_some(v),
        None => server.iter().copied().filter(|v| v.is_supported()).max(),
    };
    chosen.ok_or_else(|| Error::VersionMismatch {
        client: SUPPORTED_VERSIONS.to_vec(),
        server: server.to_vec(),
    })
}
