//! Chart metadata and qualified release names

use once_cell::sync::Lazy;
use regex::Regex;
use semver::Version;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Longest release name the packaging backend accepts
pub const MAX_RELEASE_NAME_LEN: usize = 53;

static RELEASE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?$").expect("valid regex"));

/// Metadata supplied by a caller when requesting a new environment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartMetadata {
    /// Unqualified environment name
    pub name: String,

    /// Chart version (SemVer)
    #[serde(with = "version_serde", default = "default_version")]
    pub version: Version,

    /// Human-readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

fn default_version() -> Version {
    Version::new(0, 1, 0)
}

impl ChartMetadata {
    /// Create metadata with the default version and no description
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: default_version(),
            description: None,
        }
    }

    pub fn with_version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// The release name used for every backend call
    pub fn qualified_name(&self, prefix: &str) -> Result<String> {
        qualify(prefix, &self.name)
    }
}

static ENV_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9][-a-z0-9]*$").expect("valid regex"));

/// Check that a prefix can isolate managed releases from everything else
pub fn validate_prefix(prefix: &str) -> Result<()> {
    if prefix.is_empty() {
        return Err(CoreError::InvalidName {
            name: prefix.to_string(),
            reason: "environment prefix must not be empty".to_string(),
        });
    }
    if prefix.len() >= MAX_RELEASE_NAME_LEN || !ENV_PREFIX.is_match(prefix) {
        return Err(CoreError::InvalidName {
            name: prefix.to_string(),
            reason: format!(
                "environment prefix must be shorter than {MAX_RELEASE_NAME_LEN} characters, lowercase alphanumerics or '-', starting with an alphanumeric"
            ),
        });
    }
    Ok(())
}

/// Prepend the environment prefix and validate the result as a release name
pub fn qualify(prefix: &str, name: &str) -> Result<String> {
    validate_prefix(prefix)?;
    if name.is_empty() {
        return Err(CoreError::InvalidName {
            name: name.to_string(),
            reason: "name must not be empty".to_string(),
        });
    }

    let qualified = format!("{prefix}{name}");
    if qualified.len() > MAX_RELEASE_NAME_LEN {
        return Err(CoreError::InvalidName {
            name: qualified,
            reason: format!("longer than {MAX_RELEASE_NAME_LEN} characters"),
        });
    }
    if !RELEASE_NAME.is_match(&qualified) {
        return Err(CoreError::InvalidName {
            name: qualified,
            reason: "must consist of lowercase alphanumerics or '-', and start and end with an alphanumeric"
                .to_string(),
        });
    }

    Ok(qualified)
}

/// Whether a backend-reported release name belongs to this environment prefix
#[inline]
pub fn is_managed(prefix: &str, release_name: &str) -> bool {
    !prefix.is_empty() && release_name.starts_with(prefix)
}

mod version_serde {
    use semver::Version;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(version: &Version, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&version.to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Version, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Version::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qualified_name() {
        let meta = ChartMetadata::new("chart1");
        assert_eq!(meta.qualified_name("test-").unwrap(), "test-chart1");
    }

    #[test]
    fn test_qualify_rejects_empty() {
        assert!(matches!(
            qualify("test-", ""),
            Err(CoreError::InvalidName { .. })
        ));
    }

    #[test]
    fn test_qualify_rejects_invalid_characters() {
        assert!(qualify("test-", "My_App").is_err());
        assert!(qualify("test-", "app-").is_err());
        assert!(qualify("test-", "../etc").is_err());
    }

    #[test]
    fn test_qualify_rejects_long_names() {
        let name = "a".repeat(MAX_RELEASE_NAME_LEN);
        assert!(qualify("test-", &name).is_err());
        assert!(qualify("t", &name[1..]).is_ok());
    }

    #[test]
    fn test_prefix_must_isolate() {
        assert!(validate_prefix("test-").is_ok());
        assert!(validate_prefix("dev2-").is_ok());
        assert!(matches!(
            qualify("", "db"),
            Err(CoreError::InvalidName { .. })
        ));
        assert!(validate_prefix("Test-").is_err());
        assert!(validate_prefix("-x").is_err());
        assert!(validate_prefix(".*").is_err());
    }

    #[test]
    fn test_is_managed() {
        assert!(is_managed("test-", "test-db"));
        assert!(!is_managed("test-", "prod-db"));
        assert!(!is_managed("test-", "db-test-"));
        assert!(!is_managed("", "prod-db"));
    }

    #[test]
    fn test_metadata_deserialize() {
        let meta: ChartMetadata = serde_yaml::from_str(
            "name: chart1\nversion: 0.2.0\ndescription: d\n",
        )
        .unwrap();

        assert_eq!(meta.name, "chart1");
        assert_eq!(meta.version, Version::new(0, 2, 0));
        assert_eq!(meta.description.as_deref(), Some("d"));
    }

    #[test]
    fn test_metadata_default_version() {
        let meta: ChartMetadata = serde_yaml::from_str("name: chart1\n").unwrap();
        assert_eq!(meta.version, Version::new(0, 1, 0));
        assert!(meta.description.is_none());
    }

    #[test]
    fn test_metadata_rejects_bad_version() {
        let result: std::result::Result<ChartMetadata, _> =
            serde_yaml::from_str("name: chart1\nversion: not-a-version\n");
        assert!(result.is_err());
    }
}
