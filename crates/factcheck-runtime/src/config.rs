//! Runtime configuration.
//!
//! Loaded from YAML (`RuntimeConfig::from_yaml_file`) or from the
//! environment (`RuntimeConfig::from_env`). Durations are written the
//! human way (`10s`, `1m 30s`).
//!
//! ```yaml
//! max_iterations: 3
//! provider: openai
//! reasoner:
//!   model: gpt-4o-mini
//!   timeout: 30s
//! search:
//!   result_cap: 5
//!   timeout: 10s
//! batch:
//!   concurrency: 4
//!   rate_per_second: 2
//!   deadline: 5m
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::path::Path;
use std::time::Duration;

use crate::providers::CompletionConfig;
use crate::resilience::CircuitBreakerConfig;
use crate::RuntimeError;

/// Largest page size the Custom Search API serves.
pub const MAX_RESULT_CAP: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Search rounds allowed per statement
    pub max_iterations: u32,

    /// Oracle provider type registered in the `ProviderRegistry`
    pub provider: String,

    /// Provider-specific settings (`api_key`, `base_url`)
    pub provider_config: JsonValue,

    pub reasoner: ReasonerConfig,
    pub extractor: ExtractorConfig,
    pub search: SearchConfig,
    pub batch: BatchConfig,
    pub circuit_breaker: CircuitBreakerConfig,
    pub cache: CacheConfig,

    /// Token allowance for a whole batch; unlimited when absent
    pub token_budget: Option<u32>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_iterations: 3,
            provider: "openai".to_string(),
            provider_config: JsonValue::Object(Default::default()),
            reasoner: ReasonerConfig::default(),
            extractor: ExtractorConfig::default(),
            search: SearchConfig::default(),
            batch: BatchConfig::default(),
            circuit_breaker: CircuitBreakerConfig::default(),
            cache: CacheConfig::default(),
            token_budget: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReasonerConfig {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,

    #[serde(with = "duration_str")]
    pub timeout: Duration,

    /// Retries for transient oracle failures
    pub max_retries: usize,
}

impl Default for ReasonerConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            temperature: 0.3,
            max_tokens: 1000,
            timeout: Duration::from_secs(30),
            max_retries: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Overrides `reasoner.model` for extraction
    pub model: Option<String>,

    #[serde(with = "duration_str")]
    pub timeout: Duration,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            model: None,
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Results kept per query
    pub result_cap: usize,

    #[serde(with = "duration_str")]
    pub timeout: Duration,

    /// Search provider settings (`api_key`, `engine_id`, `endpoint`)
    pub provider_config: JsonValue,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            result_cap: 5,
            timeout: Duration::from_secs(10),
            provider_config: JsonValue::Object(Default::default()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Statements verified at the same time
    pub concurrency: usize,

    /// Statement launches per second
    pub rate_per_second: u32,

    /// Overall deadline after which the batch is cancelled
    #[serde(with = "duration_str::option")]
    pub deadline: Option<Duration>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            concurrency: 1,
            rate_per_second: 2,
            deadline: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub max_entries: u64,

    #[serde(with = "duration_str")]
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: 1_000,
            ttl: Duration::from_secs(3600),
        }
    }
}

impl RuntimeConfig {
    /// Defaults overridden by `FACTCHECK_*` environment variables.
    pub fn from_env() -> Result<Self, RuntimeError> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, RuntimeError> {
        let config: Self = serde_yaml::from_str(yaml)
            .map_err(|e| RuntimeError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a YAML file, then apply environment overrides.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, RuntimeError> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|e| {
            RuntimeError::InvalidConfig(format!("cannot read {}: {}", path.display(), e))
        })?;
        let mut config = Self::from_yaml_str(&yaml)?;
        config.apply_env()?;
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<(), RuntimeError> {
        if let Some(model) = env_var("FACTCHECK_MODEL") {
            self.reasoner.model = model;
        }
        if let Some(n) = env_parse("FACTCHECK_MAX_ITERATIONS")? {
            self.max_iterations = n;
        }
        if let Some(n) = env_parse("FACTCHECK_RESULT_CAP")? {
            self.search.result_cap = n;
        }
        if let Some(n) = env_parse("FACTCHECK_CONCURRENCY")? {
            self.batch.concurrency = n;
        }
        if let Some(d) = env_duration("FACTCHECK_SEARCH_TIMEOUT")? {
            self.search.timeout = d;
        }
        if let Some(d) = env_duration("FACTCHECK_REASONER_TIMEOUT")? {
            self.reasoner.timeout = d;
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<(), RuntimeError> {
        if self.max_iterations == 0 {
            return Err(RuntimeError::InvalidConfig(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        if !(1..=MAX_RESULT_CAP).contains(&self.search.result_cap) {
            return Err(RuntimeError::InvalidConfig(format!(
                "search.result_cap must be between 1 and {}, got {}",
                MAX_RESULT_CAP, self.search.result_cap
            )));
        }
        if self.batch.concurrency == 0 {
            return Err(RuntimeError::InvalidConfig(
                "batch.concurrency must be at least 1".to_string(),
            ));
        }
        if self.batch.rate_per_second == 0 {
            return Err(RuntimeError::InvalidConfig(
                "batch.rate_per_second must be at least 1".to_string(),
            ));
        }
        for (name, timeout) in [
            ("search.timeout", self.search.timeout),
            ("reasoner.timeout", self.reasoner.timeout),
            ("extractor.timeout", self.extractor.timeout),
        ] {
            if timeout.is_zero() {
                return Err(RuntimeError::InvalidConfig(format!(
                    "{} must be greater than zero",
                    name
                )));
            }
        }
        Ok(())
    }

    pub fn reasoner_completion(&self) -> CompletionConfig {
        CompletionConfig {
            model: self.reasoner.model.clone(),
            max_tokens: self.reasoner.max_tokens,
            temperature: self.reasoner.temperature,
            timeout: self.reasoner.timeout,
            json_mode: true,
        }
    }

    pub fn extractor_completion(&self) -> CompletionConfig {
        CompletionConfig {
            model: self
                .extractor
                .model
                .clone()
                .unwrap_or_else(|| self.reasoner.model.clone()),
            timeout: self.extractor.timeout,
            ..self.reasoner_completion()
        }
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T>(name: &str) -> Result<Option<T>, RuntimeError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    env_var(name)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| RuntimeError::InvalidConfig(format!("{}={:?}: {}", name, raw, e)))
        })
        .transpose()
}

fn env_duration(name: &str) -> Result<Option<Duration>, RuntimeError> {
    env_var(name)
        .map(|raw| {
            humantime::parse_duration(raw.trim())
                .map_err(|e| RuntimeError::InvalidConfig(format!("{}={:?}: {}", name, raw, e)))
        })
        .transpose()
}

/// Serde adapter for `humantime` duration strings.
pub(crate) mod duration_str {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
    }

    pub mod option {
        use serde::{Deserialize, Deserializer, Serializer};
        use std::time::Duration;

        pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match duration {
                Some(d) => serializer.serialize_str(&humantime::format_duration(*d).to_string()),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
        where
            D: Deserializer<'de>,
        {
            Option::<String>::deserialize(deserializer)?
                .map(|raw| humantime::parse_duration(&raw).map_err(serde::de::Error::custom))
                .transpose()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RuntimeConfig::default();
        assert_eq!(config.max_iterations, 3);
        assert_eq!(config.search.result_cap, 5);
        assert_eq!(config.search.timeout, Duration::from_secs(10));
        assert_eq!(config.reasoner.timeout, Duration::from_secs(30));
        assert_eq!(config.batch.concurrency, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_yaml_with_human_durations() {
        let config = RuntimeConfig::from_yaml_str(
            r#"
max_iterations: 4
reasoner:
  model: gpt-4o
  timeout: 45s
search:
  result_cap: 8
  timeout: 2s
batch:
  concurrency: 3
  deadline: 2m
"#,
        )
        .unwrap();

        assert_eq!(config.max_iterations, 4);
        assert_eq!(config.reasoner.model, "gpt-4o");
        assert_eq!(config.reasoner.timeout, Duration::from_secs(45));
        assert_eq!(config.reasoner.temperature, 0.3);
        assert_eq!(config.search.result_cap, 8);
        assert_eq!(config.batch.deadline, Some(Duration::from_secs(120)));
        assert_eq!(config.batch.rate_per_second, 2);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = RuntimeConfig::default();
        config.max_iterations = 0;
        assert!(matches!(config.validate(), Err(RuntimeError::InvalidConfig(_))));

        let mut config = RuntimeConfig::default();
        config.search.result_cap = 11;
        assert!(config.validate().is_err());

        let mut config = RuntimeConfig::default();
        config.batch.concurrency = 0;
        assert!(config.validate().is_err());

        let mut config = RuntimeConfig::default();
        config.search.timeout = Duration::ZERO;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_yaml_validation_error_surfaces() {
        let err = RuntimeConfig::from_yaml_str("max_iterations: 0\n").unwrap_err();
        assert!(err.to_string().contains("max_iterations"));

        let err = RuntimeConfig::from_yaml_str("search:\n  timeout: soon\n").unwrap_err();
        assert!(matches!(err, RuntimeError::InvalidConfig(_)));
    }

    #[test]
    fn test_extractor_shares_reasoner_model() {
        let mut config = RuntimeConfig::default();
        config.extractor.timeout = Duration::from_secs(5);
        let completion = config.extractor_completion();
        assert_eq!(completion.model, "gpt-4o-mini");
        assert_eq!(completion.timeout, Duration::from_secs(5));

        config.extractor.model = Some("gpt-4.1-mini".to_string());
        assert_eq!(config.extractor_completion().model, "gpt-4.1-mini");
    }

    #[test]
    fn test_serialized_durations_round_trip_through_humantime() {
        let config = RuntimeConfig::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        assert!(yaml.contains("timeout: 10s"));

        let back: RuntimeConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back.search.timeout, config.search.timeout);
        assert_eq!(back.batch.deadline, None);
    }
}
