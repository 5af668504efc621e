//! Server version parsing and era classification.
//!
//! MySQL 8.0 changed ALTER TABLE behavior several times inside a single
//! minor series, so classification keys off behavioral eras rather than
//! point versions. Managed flavors (Aurora) report their own version
//! scheme; [`ServerVersion::effective_patch`] maps those back onto the
//! upstream patch line so one classifier serves every flavor.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

// ---------------------------------------------------------------------------
// ServerFlavor
// ---------------------------------------------------------------------------

/// The server distribution, derived from `version_comment` and friends.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ServerFlavor {
    Mysql,
    Percona,
    Mariadb,
    AuroraMysql,
    /// Catch-all for forks this tool has no special handling for.
    Other(String),
}

impl ServerFlavor {
    /// Returns the string representation.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Mysql => "mysql",
            Self::Percona => "percona",
            Self::Mariadb => "mariadb",
            Self::AuroraMysql => "aurora-mysql",
            Self::Other(s) => s.as_str(),
        }
    }
}

impl Default for ServerFlavor {
    fn default() -> Self {
        Self::Mysql
    }
}

impl fmt::Display for ServerFlavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ServerFlavor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ServerFlavor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Self::from(s.as_str()))
    }
}

impl From<&str> for ServerFlavor {
    fn from(s: &str) -> Self {
        match s {
            "mysql" => Self::Mysql,
            "percona" => Self::Percona,
            "mariadb" => Self::Mariadb,
            "aurora-mysql" => Self::AuroraMysql,
            other => Self::Other(other.to_owned()),
        }
    }
}

// ---------------------------------------------------------------------------
// VersionEra
// ---------------------------------------------------------------------------

/// Behavioral era for DDL classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VersionEra {
    /// 8.0 before 8.0.12: no INSTANT algorithm at all.
    Early80,
    /// 8.0.12 through 8.0.28: INSTANT exists but only for trailing columns.
    Instant80,
    /// 8.0.29 and later: INSTANT for any column position, INSTANT DROP COLUMN.
    Full80,
    /// The 8.4 LTS series.
    Lts84,
}

impl VersionEra {
    /// Every era, in chronological order.
    pub const ALL: &'static [VersionEra] = &[
        Self::Early80,
        Self::Instant80,
        Self::Full80,
        Self::Lts84,
    ];

    /// Returns the canonical string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Early80 => "early-8.0",
            Self::Instant80 => "instant-8.0",
            Self::Full80 => "full-8.0",
            Self::Lts84 => "lts-8.4",
        }
    }

    /// Returns `true` once INSTANT supports any column position.
    pub fn has_full_instant(&self) -> bool {
        matches!(self, Self::Full80 | Self::Lts84)
    }
}

impl fmt::Display for VersionEra {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for VersionEra {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ServerVersion
// ---------------------------------------------------------------------------

/// A parsed server version with flavor awareness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    #[serde(default)]
    pub flavor: ServerFlavor,
    /// The value of `aurora_version()` when the flavor is Aurora.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aurora_version: Option<String>,
}

impl ServerVersion {
    /// Creates a plain MySQL version.
    pub fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
            flavor: ServerFlavor::Mysql,
            aurora_version: None,
        }
    }

    /// Creates an Aurora MySQL version from the engine version plus the
    /// Aurora-specific version string.
    pub fn aurora(major: u32, minor: u32, patch: u32, aurora_version: impl Into<String>) -> Self {
        Self {
            major,
            minor,
            patch,
            flavor: ServerFlavor::AuroraMysql,
            aurora_version: Some(aurora_version.into()),
        }
    }

    /// Parses a `VERSION()` string like `8.0.35-0ubuntu0.22.04.1` or
    /// `8.0.mysql_aurora.3.04.1`. Missing components default to zero.
    pub fn parse(version: &str) -> Self {
        let mut parts = version.split(|c: char| !c.is_ascii_digit());
        let mut next = || {
            parts
                .by_ref()
                .find(|p| !p.is_empty())
                .and_then(|p| p.parse().ok())
                .unwrap_or(0)
        };
        let major = next();
        let minor = next();
        let patch = next();
        let mut v = Self::new(major, minor, patch);
        if let Some(idx) = version.find("mysql_aurora.") {
            v.flavor = ServerFlavor::AuroraMysql;
            v.aurora_version = Some(version[idx + "mysql_aurora.".len()..].to_owned());
        } else if version.contains("aurora") {
            v.flavor = ServerFlavor::AuroraMysql;
        } else if version.to_ascii_lowercase().contains("mariadb") {
            v.flavor = ServerFlavor::Mariadb;
        }
        v
    }

    /// The patch number used for era classification.
    ///
    /// Aurora MySQL 3.x tracks the 8.0 line but its engine patch number
    /// does not map linearly onto upstream patches; patch 23 pins it into
    /// the initial-INSTANT era, which matches its observed DDL surface.
    pub fn effective_patch(&self) -> u32 {
        if self.flavor == ServerFlavor::AuroraMysql {
            if let Some(av) = &self.aurora_version {
                if av.starts_with("3.") {
                    return 23;
                }
            }
        }
        self.patch
    }

    /// Bins this version into a behavioral era.
    pub fn era(&self) -> VersionEra {
        let patch = self.effective_patch();
        if self.major == 8 && self.minor == 4 {
            VersionEra::Lts84
        } else if self.major == 8 && self.minor == 0 {
            if patch >= 29 {
                VersionEra::Full80
            } else if patch >= 12 {
                VersionEra::Instant80
            } else {
                VersionEra::Early80
            }
        } else {
            // Anything newer should at least match 8.0.29 semantics.
            VersionEra::Full80
        }
    }

    /// Returns `true` if this server is at least `major.minor.patch`.
    /// Used for version-gated matrix rows.
    pub fn at_least(&self, major: u32, minor: u32, patch: u32) -> bool {
        (self.major, self.minor, self.effective_patch()) >= (major, minor, patch)
    }
}

impl fmt::Display for ServerVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(av) = &self.aurora_version {
            write!(f, " (aurora {})", av)?;
        }
        Ok(())
    }
}
