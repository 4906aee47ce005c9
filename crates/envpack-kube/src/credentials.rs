//! Credential bootstrap
//!
//! Credentials are resolved once, before the server is constructed. A
//! source produces a flat key/value map; [`ApiKeys::from_credentials`] then
//! picks out the keys guarding each mutating route.
//!
//! Sources:
//! - **Environment**: selected process environment variables
//! - **Secret**: a Kubernetes Secret used as a parameter store
//! - **Static**: a fixed map, for tests

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::Client;
use kube::api::Api;
use std::collections::BTreeMap;

use crate::error::CredentialError;

pub const CREATE_API_KEY: &str = "ENVPACK_CREATE_API_KEY";
pub const UPDATE_API_KEY: &str = "ENVPACK_UPDATE_API_KEY";
pub const DELETE_API_KEY: &str = "ENVPACK_DELETE_API_KEY";

/// Every credential the server requires, in validation order
pub const REQUIRED_KEYS: [&str; 3] = [CREATE_API_KEY, UPDATE_API_KEY, DELETE_API_KEY];

/// Resolved credential map
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials(BTreeMap<String, String>);

impl Credentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Overlay `other` on top of `self`; keys in `other` win
    pub fn merge(mut self, other: Credentials) -> Self {
        self.0.extend(other.0);
        self
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// Values are secrets, only the key names are printed
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.0.keys()).finish()
    }
}

/// Something that can produce credentials
#[async_trait]
pub trait CredentialSource: Send + Sync {
    async fn load(&self) -> Result<Credentials, CredentialError>;
}

/// Reads named variables from the process environment
#[derive(Debug, Clone)]
pub struct EnvCredentialSource {
    keys: Vec<String>,
}

impl EnvCredentialSource {
    pub fn new(keys: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }
}

impl Default for EnvCredentialSource {
    fn default() -> Self {
        Self::new(REQUIRED_KEYS)
    }
}

#[async_trait]
impl CredentialSource for EnvCredentialSource {
    async fn load(&self) -> Result<Credentials, CredentialError> {
        let mut credentials = Credentials::new();
        for key in &self.keys {
            if let Ok(value) = std::env::var(key) {
                credentials = credentials.with(key.clone(), value);
            }
        }
        Ok(credentials)
    }
}

/// Reads credentials from the data of a Kubernetes Secret
///
/// `mapping` maps secret data keys to credential names. Keys absent from
/// the secret are skipped; validation happens in [`ApiKeys`].
pub struct SecretCredentialSource {
    client: Client,
    namespace: String,
    name: String,
    mapping: BTreeMap<String, String>,
}

impl SecretCredentialSource {
    /// Source reading the required keys under their own names
    pub fn new(client: Client, namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            client,
            namespace: namespace.into(),
            name: name.into(),
            mapping: REQUIRED_KEYS
                .iter()
                .map(|k| (k.to_string(), k.to_string()))
                .collect(),
        }
    }

    /// Connect with the ambient kubeconfig or in-cluster configuration
    pub async fn connect(
        namespace: impl Into<String>,
        name: impl Into<String>,
    ) -> Result<Self, CredentialError> {
        let client = Client::try_default().await?;
        Ok(Self::new(client, namespace, name))
    }

    /// Map a secret data key to a credential name
    pub fn with_mapping(mut self, secret_key: impl Into<String>, credential: impl Into<String>) -> Self {
        self.mapping.insert(secret_key.into(), credential.into());
        self
    }

    fn secrets_api(&self) -> Api<Secret> {
        Api::namespaced(self.client.clone(), &self.namespace)
    }
}

#[async_trait]
impl CredentialSource for SecretCredentialSource {
    async fn load(&self) -> Result<Credentials, CredentialError> {
        let secret = self
            .secrets_api()
            .get(&self.name)
            .await
            .map_err(|source| CredentialError::SecretRead {
                name: self.name.clone(),
                namespace: self.namespace.clone(),
                source,
            })?;

        let credentials = credentials_from_secret(&secret, &self.mapping)?;
        tracing::info!(
            secret = %self.name,
            namespace = %self.namespace,
            count = credentials.len(),
            "loaded credentials from secret"
        );
        Ok(credentials)
    }
}

/// Extract mapped keys from a secret's `data` and `stringData`
fn credentials_from_secret(
    secret: &Secret,
    mapping: &BTreeMap<String, String>,
) -> Result<Credentials, CredentialError> {
    let mut credentials = Credentials::new();

    for (secret_key, credential) in mapping {
        let value = if let Some(bytes) = secret.data.as_ref().and_then(|d| d.get(secret_key)) {
            String::from_utf8(bytes.0.clone()).map_err(|_| CredentialError::InvalidValue {
                key: credential.clone(),
                reason: "not valid UTF-8".to_string(),
            })?
        } else if let Some(value) = secret.string_data.as_ref().and_then(|d| d.get(secret_key)) {
            value.clone()
        } else {
            continue;
        };

        credentials = credentials.with(credential.clone(), value.trim().to_string());
    }

    Ok(credentials)
}

/// A fixed credential map
#[derive(Debug, Clone, Default)]
pub struct StaticCredentialSource(Credentials);

impl StaticCredentialSource {
    pub fn new(credentials: Credentials) -> Self {
        Self(credentials)
    }
}

#[async_trait]
impl CredentialSource for StaticCredentialSource {
    async fn load(&self) -> Result<Credentials, CredentialError> {
        Ok(self.0.clone())
    }
}

/// API keys guarding the mutating routes
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKeys {
    pub create: String,
    pub update: String,
    pub delete: String,
}

impl ApiKeys {
    /// Require every key, failing on the first missing or empty one
    pub fn from_credentials(credentials: &Credentials) -> Result<Self, CredentialError> {
        let require = |key: &str| {
            credentials
                .get(key)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .ok_or_else(|| CredentialError::Missing {
                    key: key.to_string(),
                })
        };

        Ok(Self {
            create: require(CREATE_API_KEY)?,
            update: require(UPDATE_API_KEY)?,
            delete: require(DELETE_API_KEY)?,
        })
    }
}

impl std::fmt::Debug for ApiKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeys").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::ByteString;

    fn full() -> Credentials {
        Credentials::new()
            .with(CREATE_API_KEY, "c")
            .with(UPDATE_API_KEY, "u")
            .with(DELETE_API_KEY, "d")
    }

    #[test]
    fn test_api_keys_from_credentials() {
        let keys = ApiKeys::from_credentials(&full()).unwrap();
        assert_eq!(keys.create, "c");
        assert_eq!(keys.update, "u");
        assert_eq!(keys.delete, "d");
    }

    #[test]
    fn test_first_missing_key_is_named() {
        let credentials = Credentials::new().with(CREATE_API_KEY, "c");
        let err = ApiKeys::from_credentials(&credentials).unwrap_err();
        assert_eq!(
            err.to_string(),
            "required credential ENVPACK_UPDATE_API_KEY missing"
        );
    }

    #[test]
    fn test_empty_key_counts_as_missing() {
        let credentials = full().with(DELETE_API_KEY, "");
        assert!(matches!(
            ApiKeys::from_credentials(&credentials),
            Err(CredentialError::Missing { key }) if key == DELETE_API_KEY
        ));
    }

    #[test]
    fn test_debug_hides_values() {
        let printed = format!("{:?} {:?}", full(), ApiKeys::from_credentials(&full()).unwrap());
        assert!(printed.contains(CREATE_API_KEY));
        assert!(!printed.contains("\"c\""));
    }

    #[test]
    fn test_merge_prefers_overlay() {
        let base = Credentials::new().with("A", "1").with("B", "2");
        let merged = base.merge(Credentials::new().with("B", "3"));
        assert_eq!(merged.get("A"), Some("1"));
        assert_eq!(merged.get("B"), Some("3"));
    }

    #[test]
    fn test_credentials_from_secret() {
        let mut data = BTreeMap::new();
        data.insert("create".to_string(), ByteString(b"c\n".to_vec()));
        data.insert("unrelated".to_string(), ByteString(b"x".to_vec()));
        let mut string_data = BTreeMap::new();
        string_data.insert("update".to_string(), "u".to_string());

        let secret = Secret {
            data: Some(data),
            string_data: Some(string_data),
            ..Default::default()
        };

        let mapping: BTreeMap<String, String> = [
            ("create", CREATE_API_KEY),
            ("update", UPDATE_API_KEY),
            ("delete", DELETE_API_KEY),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let credentials = credentials_from_secret(&secret, &mapping).unwrap();
        assert_eq!(credentials.get(CREATE_API_KEY), Some("c"));
        assert_eq!(credentials.get(UPDATE_API_KEY), Some("u"));
        assert_eq!(credentials.get(DELETE_API_KEY), None);
        assert_eq!(credentials.len(), 2);
    }

    #[test]
    fn test_secret_with_invalid_utf8() {
        let mut data = BTreeMap::new();
        data.insert(CREATE_API_KEY.to_string(), ByteString(vec![0xff, 0xfe]));
        let secret = Secret {
            data: Some(data),
            ..Default::default()
        };
        let mapping: BTreeMap<String, String> =
            [(CREATE_API_KEY.to_string(), CREATE_API_KEY.to_string())].into();

        assert!(matches!(
            credentials_from_secret(&secret, &mapping),
            Err(CredentialError::InvalidValue { .. })
        ));
    }

    #[tokio::test]
    async fn test_static_source() {
        let source = StaticCredentialSource::new(full());
        let loaded = source.load().await.unwrap();
        assert_eq!(loaded, full());
    }

    #[tokio::test]
    async fn test_env_source_skips_unset() {
        let source = EnvCredentialSource::new(["ENVPACK_TEST_SURELY_UNSET_VARIABLE"]);
        assert!(source.load().await.unwrap().is_empty());
    }
}
