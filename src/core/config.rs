//! Engine configuration.
//!
//! [`EngineConfig`] controls where reference modules come from and which
//! optional behaviors of the engine are switched on. It can be built in code
//! or loaded from TOML:
//!
//! ```rust
//! use quill::EngineConfig;
//!
//! let config = EngineConfig::from_toml_str(r#"
//!     base_url = "https://app.example.com/"
//!     fetch_timeout_secs = 10
//!     cache_compiled = true
//! "#).unwrap();
//!
//! assert!(config.cache_compiled);
//! assert_eq!(config.fetch_timeout_secs, 10);
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::core::error::{Error, Result};

/// Configuration for a [`TemplateEngine`](crate::TemplateEngine)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Origin serving reference modules under `_framework/_bin/`
    pub base_url: Option<Url>,

    /// Timeout for a single reference module request
    pub fetch_timeout_secs: u64,

    /// User agent sent with module requests
    pub user_agent: String,

    /// Memoize compiled renderers by template text and model type
    pub cache_compiled: bool,

    /// Serialize calls into the compiler backend
    pub serialize_backend: bool,

    /// Whether templates may reference external template files.
    /// The engine has no template file system, so only `false` is accepted.
    pub external_templates: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            fetch_timeout_secs: 30,
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string(),
            cache_compiled: false,
            serialize_backend: false,
            external_templates: false,
        }
    }
}

impl EngineConfig {
    /// Parse a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| Error::config(format!("Failed to parse configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = Some(base_url);
        self
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// Check the configuration is usable
    pub fn validate(&self) -> Result<()> {
        if self.external_templates {
            return Err(Error::config(
                "external template files are not supported; templates are always compiled from text",
            ));
        }

        if self.fetch_timeout_secs == 0 {
            return Err(Error::config("fetch_timeout_secs must be greater than zero"));
        }

        if let Some(base_url) = &self.base_url {
            if base_url.cannot_be_a_base() {
                return Err(Error::config(format!(
                    "base_url '{base_url}' cannot be used as a base URL"
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_engine_config_default() {
        let config = EngineConfig::default();
        assert!(config.base_url.is_none());
        assert_eq!(config.fetch_timeout_secs, 30);
        assert!(config.user_agent.starts_with("quill/"));
        assert!(!config.cache_compiled);
        assert!(!config.serialize_backend);
        assert!(!config.external_templates);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_engine_config_from_toml() {
        let config = EngineConfig::from_toml_str(
            r#"
            base_url = "https://app.example.com/"
            serialize_backend = true
            "#,
        )
        .unwrap();

        assert_eq!(
            config.base_url.as_ref().map(Url::as_str),
            Some("https://app.example.com/")
        );
        assert!(config.serialize_backend);
        assert_eq!(config.fetch_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_engine_config_rejects_external_templates() {
        let error = EngineConfig::from_toml_str("external_templates = true").unwrap_err();
        assert!(matches!(error, Error::Config(_)));
        assert!(error.to_string().contains("external template files"));
    }

    #[test]
    fn test_engine_config_rejects_unknown_fields() {
        let error = EngineConfig::from_toml_str("cache = true").unwrap_err();
        assert!(error.to_string().contains("Failed to parse configuration"));
    }

    #[test]
    fn test_engine_config_rejects_zero_timeout() {
        assert!(EngineConfig::from_toml_str("fetch_timeout_secs = 0").is_err());
    }

    #[test]
    fn test_engine_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "cache_compiled = true").unwrap();

        let config = EngineConfig::from_file(file.path()).unwrap();
        assert!(config.cache_compiled);
    }

    #[test]
    fn test_engine_config_missing_file() {
        let error = EngineConfig::from_file("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(error, Error::Io(_)));
    }
}
