//! Credential handling for the oracle and search providers.
//!
//! Both external services are authenticated with static keys (OpenAI API
//! key; Google API key plus search engine id). Every key is wrapped in an
//! [`ApiCredential`] the moment it is read:
//!
//! - `Debug` and `Display` print `[REDACTED]`
//! - the value is zeroed on drop (via `secrecy`)
//! - reading it requires an explicit `.expose()` at the point of use
//!
//! Lookup order is always: explicit config value, then each environment
//! variable in turn. Several variables are accepted so that legacy names
//! (e.g. `OPEN_AI_KEY`) keep working.

use secrecy::{ExposeSecret, SecretString};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::fmt;

use super::ProviderError;

/// Where a credential was loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    /// JSON/YAML configuration
    Config,
    /// Environment variable
    Environment,
    /// Passed in by the caller
    Programmatic,
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialSource::Config => write!(f, "config"),
            CredentialSource::Environment => write!(f, "environment"),
            CredentialSource::Programmatic => write!(f, "programmatic"),
        }
    }
}

/// A secret API key with its provenance.
pub struct ApiCredential {
    value: SecretString,
    source: CredentialSource,
    name: &'static str,
}

impl ApiCredential {
    /// Wrap a raw value.
    pub fn new(value: impl Into<String>, source: CredentialSource, name: &'static str) -> Self {
        Self {
            value: SecretString::from(value.into()),
            source,
            name,
        }
    }

    /// Read the first non-empty variable among `env_vars`.
    pub fn from_env(env_vars: &[&str], name: &'static str) -> Result<Self, ProviderError> {
        first_env(env_vars)
            .map(|v| Self::new(v, CredentialSource::Environment, name))
            .ok_or_else(|| {
                ProviderError::NotConfigured(format!(
                    "{} not set: configure one of {:?}",
                    name, env_vars
                ))
            })
    }

    /// Read `config[config_key]`, falling back to the environment.
    pub fn from_config_or_env(
        config: &JsonValue,
        config_key: &str,
        env_vars: &[&str],
        name: &'static str,
    ) -> Result<Self, ProviderError> {
        if let Some(value) = config_str(config, config_key) {
            return Ok(Self::new(value, CredentialSource::Config, name));
        }

        if let Some(value) = first_env(env_vars) {
            return Ok(Self::new(value, CredentialSource::Environment, name));
        }

        Err(ProviderError::NotConfigured(format!(
            "{} required: set '{}' in config or one of {:?}",
            name, config_key, env_vars
        )))
    }

    /// Whether the credential could be loaded, without loading it.
    pub fn is_available(config: &JsonValue, config_key: &str, env_vars: &[&str]) -> bool {
        config_str(config, config_key).is_some() || first_env(env_vars).is_some()
    }

    /// The raw value. Call only where the key is sent.
    pub fn expose(&self) -> &str {
        self.value.expose_secret()
    }

    pub fn is_empty(&self) -> bool {
        self.value.expose_secret().is_empty()
    }

    pub fn source(&self) -> CredentialSource {
        self.source
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Debug for ApiCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiCredential")
            .field("value", &"[REDACTED]")
            .field("source", &self.source)
            .field("name", &self.name)
            .finish()
    }
}

impl fmt::Display for ApiCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} from {} [REDACTED]", self.name, self.source)
    }
}

fn config_str<'a>(config: &'a JsonValue, key: &str) -> Option<&'a str> {
    config[key].as_str().filter(|v| !v.is_empty())
}

fn first_env(env_vars: &[&str]) -> Option<String> {
    env_vars
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|v| !v.is_empty())
}

/// Loads a group of credentials that belong together.
///
/// Google Custom Search, for example, needs both an API key and a search
/// engine id.
///
/// ```ignore
/// let creds = CredentialBuilder::new()
///     .require("api_key", &["GOOGLE_SEARCH_API_KEY"], "Google API key")
///     .require("engine_id", &["CUSTOM_SEARCH_ENGINE_ID"], "Search engine id")
///     .build(&config)?;
/// ```
#[derive(Default)]
pub struct CredentialBuilder {
    specs: Vec<CredentialSpec>,
}

struct CredentialSpec {
    config_key: &'static str,
    env_vars: &'static [&'static str],
    name: &'static str,
    required: bool,
}

impl CredentialBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a credential that must be present.
    pub fn require(
        mut self,
        config_key: &'static str,
        env_vars: &'static [&'static str],
        name: &'static str,
    ) -> Self {
        self.specs.push(CredentialSpec {
            config_key,
            env_vars,
            name,
            required: true,
        });
        self
    }

    /// Add a credential that may be absent.
    pub fn optional(
        mut self,
        config_key: &'static str,
        env_vars: &'static [&'static str],
        name: &'static str,
    ) -> Self {
        self.specs.push(CredentialSpec {
            config_key,
            env_vars,
            name,
            required: false,
        });
        self
    }

    /// Load every credential; the first missing required one is an error.
    pub fn build(self, config: &JsonValue) -> Result<CredentialSet, ProviderError> {
        let mut credentials = BTreeMap::new();

        for spec in self.specs {
            if !spec.required && !ApiCredential::is_available(config, spec.config_key, spec.env_vars)
            {
                continue;
            }
            let cred =
                ApiCredential::from_config_or_env(config, spec.config_key, spec.env_vars, spec.name)?;
            credentials.insert(spec.config_key, cred);
        }

        Ok(CredentialSet { credentials })
    }
}

/// Credentials loaded by a [`CredentialBuilder`], keyed by config key.
pub struct CredentialSet {
    credentials: BTreeMap<&'static str, ApiCredential>,
}

impl CredentialSet {
    pub fn get(&self, key: &str) -> Result<&ApiCredential, ProviderError> {
        self.credentials
            .get(key)
            .ok_or_else(|| ProviderError::NotConfigured(format!("Credential '{}' not found", key)))
    }

    /// Move a credential out of the set.
    pub fn take(&mut self, key: &str) -> Result<ApiCredential, ProviderError> {
        self.credentials
            .remove(key)
            .ok_or_else(|| ProviderError::NotConfigured(format!("Credential '{}' not found", key)))
    }

    pub fn get_optional(&self, key: &str) -> Option<&ApiCredential> {
        self.credentials.get(key)
    }

    pub fn has(&self, key: &str) -> bool {
        self.credentials.contains_key(key)
    }
}

impl fmt::Debug for CredentialSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialSet")
            .field("keys", &self.credentials.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_redacted_in_debug_and_display() {
        let secret = "sk-super-secret-key-12345";
        let cred = ApiCredential::new(secret, CredentialSource::Config, "OpenAI API key");

        let debug = format!("{:?}", cred);
        assert!(!debug.contains(secret), "Secret exposed in Debug!");
        assert!(debug.contains("[REDACTED]"));

        let display = format!("{}", cred);
        assert!(!display.contains(secret), "Secret exposed in Display!");
        assert!(display.contains("OpenAI API key from config"));
        assert_eq!(cred.expose(), secret);
    }

    #[test]
    fn test_config_wins_over_env() {
        std::env::set_var("FACTCHECK_TEST_KEY_PRIORITY", "env-key");
        let config = serde_json::json!({ "api_key": "config-key" });

        let cred = ApiCredential::from_config_or_env(
            &config,
            "api_key",
            &["FACTCHECK_TEST_KEY_PRIORITY"],
            "Test key",
        )
        .unwrap();

        assert_eq!(cred.expose(), "config-key");
        assert_eq!(cred.source(), CredentialSource::Config);
        std::env::remove_var("FACTCHECK_TEST_KEY_PRIORITY");
    }

    #[test]
    fn test_legacy_env_var_fallback() {
        std::env::remove_var("FACTCHECK_TEST_KEY_PRIMARY");
        std::env::set_var("FACTCHECK_TEST_KEY_LEGACY", "legacy-key");

        let cred = ApiCredential::from_env(
            &["FACTCHECK_TEST_KEY_PRIMARY", "FACTCHECK_TEST_KEY_LEGACY"],
            "Test key",
        )
        .unwrap();

        assert_eq!(cred.expose(), "legacy-key");
        assert_eq!(cred.source(), CredentialSource::Environment);
        std::env::remove_var("FACTCHECK_TEST_KEY_LEGACY");
    }

    #[test]
    fn test_missing_credential_error_names_sources() {
        let err = ApiCredential::from_config_or_env(
            &serde_json::json!({}),
            "api_key",
            &["FACTCHECK_NONEXISTENT_VAR_12345"],
            "Test key",
        )
        .unwrap_err();

        let msg = err.to_string();
        assert!(msg.contains("Test key"));
        assert!(msg.contains("api_key"));
        assert!(msg.contains("FACTCHECK_NONEXISTENT_VAR_12345"));
    }

    #[test]
    fn test_empty_config_value_is_ignored() {
        let config = serde_json::json!({ "api_key": "" });
        assert!(!ApiCredential::is_available(
            &config,
            "api_key",
            &["FACTCHECK_NONEXISTENT_VAR_12345"]
        ));
    }

    #[test]
    fn test_credential_builder_pair() {
        let config = serde_json::json!({
            "api_key": "google-key",
            "engine_id": "cx-123"
        });

        let mut creds = CredentialBuilder::new()
            .require("api_key", &["FACTCHECK_NONEXISTENT_A"], "Google API key")
            .require("engine_id", &["FACTCHECK_NONEXISTENT_B"], "Search engine id")
            .optional("endpoint", &["FACTCHECK_NONEXISTENT_C"], "Endpoint")
            .build(&config)
            .unwrap();

        assert!(creds.has("engine_id"));
        assert!(creds.get_optional("endpoint").is_none());
        assert_eq!(creds.take("api_key").unwrap().expose(), "google-key");
        assert!(!creds.has("api_key"));
    }

    #[test]
    fn test_credential_builder_missing_required() {
        let result = CredentialBuilder::new()
            .require("engine_id", &["FACTCHECK_NONEXISTENT_B"], "Search engine id")
            .build(&serde_json::json!({}));
        assert!(matches!(result, Err(ProviderError::NotConfigured(_))));
    }
}
