use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::SiftError;

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = ".sift.toml";

/// Top-level configuration loaded from `.sift.toml`.
///
/// Supports layered resolution: CLI flags > env vars > local config > defaults.
///
/// # Examples
///
/// ```
/// use sift_core::SiftConfig;
///
/// let config = SiftConfig::default();
/// assert_eq!(config.search.score_tolerance, 1e-4);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SiftConfig {
    /// LLM provider settings.
    #[serde(default)]
    pub llm: LlmConfig,
    /// Response validation settings.
    #[serde(default)]
    pub search: SearchConfig,
}

impl SiftConfig {
    /// Load configuration from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`SiftError::FileNotFound`] if the file does not exist,
    /// [`SiftError::Io`] if it cannot be read, [`SiftError::Toml`] if the
    /// content is not valid TOML, or [`SiftError::Config`] if a value is
    /// out of range.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use sift_core::SiftConfig;
    /// use std::path::Path;
    ///
    /// let config = SiftConfig::from_file(Path::new(".sift.toml")).unwrap();
    /// ```
    pub fn from_file(path: &Path) -> Result<Self, SiftError> {
        if !path.exists() {
            return Err(SiftError::FileNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`SiftError::Toml`] if parsing fails, or [`SiftError::Config`]
    /// if a value is out of range.
    ///
    /// # Examples
    ///
    /// ```
    /// use sift_core::SiftConfig;
    ///
    /// let toml = r#"
    /// [llm]
    /// model = "llama3.1"
    /// "#;
    /// let config = SiftConfig::from_toml(toml).unwrap();
    /// assert_eq!(config.llm.model, "llama3.1");
    /// ```
    pub fn from_toml(content: &str) -> Result<Self, SiftError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Resolve configuration: an explicit path must exist; otherwise
    /// `.sift.toml` in `dir` is used when present, else defaults.
    ///
    /// # Errors
    ///
    /// Same as [`SiftConfig::from_file`].
    pub fn discover(explicit: Option<&Path>, dir: &Path) -> Result<Self, SiftError> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => {
                let default_path = dir.join(CONFIG_FILE_NAME);
                if default_path.exists() {
                    Self::from_file(&default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    fn validate(&self) -> Result<(), SiftError> {
        let tolerance = self.search.score_tolerance;
        if !tolerance.is_finite() || tolerance < 0.0 {
            return Err(SiftError::Config(format!(
                "search.score_tolerance must be a non-negative number, got {tolerance}"
            )));
        }
        if self.llm.timeout_secs == 0 {
            return Err(SiftError::Config(
                "llm.timeout_secs must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

/// LLM provider configuration.
///
/// # Examples
///
/// ```
/// use sift_core::LlmConfig;
///
/// let config = LlmConfig::default();
/// assert_eq!(config.model, "gpt-4o-mini");
/// assert_eq!(config.api_key_env_var(), "OPENAI_API_KEY");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Provider name (e.g. `"openai"`, `"ollama"`, `"anthropic"`).
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Model identifier.
    #[serde(default = "default_model")]
    pub model: String,
    /// API key for the provider.
    pub api_key: Option<String>,
    /// Custom base URL for API requests.
    pub base_url: Option<String>,
    /// HTTP request timeout in seconds (default: 120).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Sampling temperature (default: 0.1).
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Ask the provider for a JSON-only response (default: true).
    #[serde(default = "default_json_mode")]
    pub json_mode: bool,
}

fn default_provider() -> String {
    "openai".into()
}

fn default_model() -> String {
    "gpt-4o-mini".into()
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_temperature() -> f64 {
    0.1
}

fn default_json_mode() -> bool {
    true
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            api_key: None,
            base_url: None,
            timeout_secs: default_timeout_secs(),
            temperature: default_temperature(),
            json_mode: default_json_mode(),
        }
    }
}

impl LlmConfig {
    /// Environment variable consulted for the API key of this provider.
    pub fn api_key_env_var(&self) -> &'static str {
        match self.provider.as_str() {
            "anthropic" => "ANTHROPIC_API_KEY",
            "gemini" => "GEMINI_API_KEY",
            _ => "OPENAI_API_KEY",
        }
    }

    /// Local providers that accept unauthenticated requests.
    pub fn requires_api_key(&self) -> bool {
        !matches!(self.provider.as_str(), "ollama" | "local")
    }

    /// The configured key, falling back to the provider's environment variable.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var(self.api_key_env_var()).ok())
            .filter(|k| !k.is_empty())
    }
}

/// Response validation configuration.
///
/// # Examples
///
/// ```
/// use sift_core::SearchConfig;
///
/// let config = SearchConfig::default();
/// assert!(config.check_offsets);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// How far outside `[0, 1]` a score may stray and still be clamped (default: 0.0001).
    #[serde(default = "default_score_tolerance")]
    pub score_tolerance: f64,
    /// Reject matches whose `endIndex` exceeds the body length (default: true).
    #[serde(default = "default_check_offsets")]
    pub check_offsets: bool,
}

fn default_score_tolerance() -> f64 {
    1e-4
}

fn default_check_offsets() -> bool {
    true
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            score_tolerance: default_score_tolerance(),
            check_offsets: default_check_offsets(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let config = SiftConfig::default();
        assert_eq!(config.llm.provider, "openai");
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.llm.timeout_secs, 120);
        assert_eq!(config.llm.temperature, 0.1);
        assert!(config.llm.json_mode);
        assert!(config.llm.api_key.is_none());
        assert_eq!(config.search.score_tolerance, 1e-4);
        assert!(config.search.check_offsets);
    }

    #[test]
    fn parse_full_toml() {
        let toml = r#"
[llm]
provider = "ollama"
model = "llama3.1"
base_url = "http://localhost:11434"
timeout_secs = 30
json_mode = false

[search]
score_tolerance = 0.01
check_offsets = false
"#;
        let config = SiftConfig::from_toml(toml).unwrap();
        assert_eq!(config.llm.provider, "ollama");
        assert_eq!(config.llm.base_url.as_deref(), Some("http://localhost:11434"));
        assert_eq!(config.llm.timeout_secs, 30);
        assert!(!config.llm.json_mode);
        assert!(!config.llm.requires_api_key());
        assert_eq!(config.search.score_tolerance, 0.01);
        assert!(!config.search.check_offsets);
    }

    #[test]
    fn empty_toml_gives_defaults() {
        let config = SiftConfig::from_toml("").unwrap();
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert!(config.search.check_offsets);
    }

    #[test]
    fn invalid_toml_returns_error() {
        assert!(matches!(
            SiftConfig::from_toml("{{invalid}}"),
            Err(SiftError::Toml(_))
        ));
    }

    #[test]
    fn negative_tolerance_rejected() {
        let result = SiftConfig::from_toml("[search]\nscore_tolerance = -0.5\n");
        assert!(matches!(result, Err(SiftError::Config(_))));
    }

    #[test]
    fn zero_timeout_rejected() {
        let result = SiftConfig::from_toml("[llm]\ntimeout_secs = 0\n");
        assert!(matches!(result, Err(SiftError::Config(_))));
    }

    #[test]
    fn env_var_per_provider() {
        let mut config = LlmConfig::default();
        assert_eq!(config.api_key_env_var(), "OPENAI_API_KEY");
        config.provider = "anthropic".into();
        assert_eq!(config.api_key_env_var(), "ANTHROPIC_API_KEY");
        config.provider = "gemini".into();
        assert_eq!(config.api_key_env_var(), "GEMINI_API_KEY");
    }

    #[test]
    fn configured_key_wins_over_env() {
        let config = LlmConfig {
            api_key: Some("from-config".into()),
            ..LlmConfig::default()
        };
        assert_eq!(config.resolve_api_key().as_deref(), Some("from-config"));
    }

    #[test]
    fn discover_missing_explicit_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        let result = SiftConfig::discover(Some(&missing), dir.path());
        assert!(matches!(result, Err(SiftError::FileNotFound(_))));
    }

    #[test]
    fn discover_reads_local_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "[llm]\nmodel = \"local-model\"\n",
        )
        .unwrap();
        let config = SiftConfig::discover(None, dir.path()).unwrap();
        assert_eq!(config.llm.model, "local-model");
    }

    #[test]
    fn discover_without_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = SiftConfig::discover(None, dir.path()).unwrap();
        assert_eq!(config.llm.provider, "openai");
    }
}
