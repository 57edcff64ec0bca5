use std::fmt;

use serde::Deserialize;

/// Which server implementation is on the other end. Both speak the same
/// API but differ in their bulk content endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerFlavor {
    /// Bulk contents are requested by path.
    Gitea,
    /// Bulk contents are requested by blob sha.
    Forgejo,
}

impl ServerFlavor {
    /// Oldest `(major, minor)` with the bulk content endpoint.
    pub fn minimum_version(self) -> (u64, u64) {
        match self {
            Self::Gitea => (1, 24),
            Self::Forgejo => (12, 0),
        }
    }
}

impl fmt::Display for ServerFlavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gitea => write!(f, "Gitea"),
            Self::Forgejo => write!(f, "Forgejo"),
        }
    }
}

/// `GET /version`
#[derive(Debug, Deserialize)]
pub struct VersionResponse {
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerVersion {
    pub flavor: ServerFlavor,
    pub major: u64,
    pub minor: u64,
    pub raw: String,
}

impl ServerVersion {
    /// Parse a version string such as `1.24.2` or `12.0.1+gitea-1.22.0`.
    /// Forgejo reports its Gitea compatibility level after `+gitea-`.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim().trim_start_matches('v');
        let flavor = if raw.contains("+gitea-") {
            ServerFlavor::Forgejo
        } else {
            ServerFlavor::Gitea
        };

        let core = raw.split(['-', '+']).next()?;
        let mut parts = core.split('.');
        let major = parts.next()?.parse().ok()?;
        let minor = parts.next().map_or(Some(0), |m| m.parse().ok())?;

        Some(Self {
            flavor,
            major,
            minor,
            raw: raw.to_owned(),
        })
    }

    pub fn is_supported(&self) -> bool {
        (self.major, self.minor) >= self.flavor.minimum_version()
    }

    pub fn minimum_label(&self) -> String {
        let (major, minor) = self.flavor.minimum_version();
        format!("{major}.{minor}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_gitea_version() {
        let version = ServerVersion::parse("1.24.3").unwrap();
        assert_eq!(version.flavor, ServerFlavor::Gitea);
        assert_eq!((version.major, version.minor), (1, 24));
        assert!(version.is_supported());
    }

    #[test]
    fn parses_forgejo_version() {
        let version = ServerVersion::parse("12.0.1+gitea-1.22.0").unwrap();
        assert_eq!(version.flavor, ServerFlavor::Forgejo);
        assert_eq!((version.major, version.minor), (12, 0));
        assert!(version.is_supported());
    }

    #[test]
    fn old_versions_are_rejected() {
        assert!(!ServerVersion::parse("1.23.8").unwrap().is_supported());
        assert!(!ServerVersion::parse("11.0.3+gitea-1.22.0").unwrap().is_supported());
    }

    #[test]
    fn development_builds_parse() {
        let version = ServerVersion::parse("1.25.0-dev-123-gabcdef").unwrap();
        assert_eq!((version.major, version.minor), (1, 25));
        assert!(version.is_supported());
    }

    #[test]
    fn garbage_does_not_parse() {
        assert!(ServerVersion::parse("unknown").is_none());
        assert!(ServerVersion::parse("").is_none());
    }
}
