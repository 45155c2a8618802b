use std::path::{Path, PathBuf};

use clarify_matching::{CatalogError, MatchConfig, PatternCatalog};
use serde::Deserialize;
use thiserror::Error;

pub const CONFIG_ENV: &str = "CLARIFY_CONFIG";
pub const BIND_ENV: &str = "CLARIFY_BIND";
const DEFAULT_BIND: &str = "127.0.0.1:3030";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid matching config: {0}")]
    Matching(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    /// Replaces the built-in catalog when set.
    pub catalog_path: Option<PathBuf>,
    pub matching: MatchConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            catalog_path: None,
            matching: MatchConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn from_toml(toml_content: &str) -> Result<Self, ConfigError> {
        let config: ServerConfig = toml::from_str(toml_content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Reads the file named by `CLARIFY_CONFIG` if set, then applies
    /// `CLARIFY_BIND`.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var_os(CONFIG_ENV) {
            Some(path) => {
                let path = PathBuf::from(path);
                tracing::info!("Loading config from {}", path.display());
                Self::from_path(&path)?
            }
            None => Self::default(),
        };
        config.apply_bind_override(std::env::var(BIND_ENV).ok());
        Ok(config)
    }

    pub fn apply_bind_override(&mut self, bind: Option<String>) {
        if let Some(bind) = bind.filter(|b| !b.trim().is_empty()) {
            self.bind = bind;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let MatchConfig {
            threshold,
            name_weight,
        } = self.matching;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError::Matching(format!(
                "threshold {threshold} is outside [0, 1]"
            )));
        }
        if !(0.0..=1.0).contains(&name_weight) {
            return Err(ConfigError::Matching(format!(
                "name_weight {name_weight} is outside [0, 1]"
            )));
        }
        Ok(())
    }

    pub fn load_catalog(&self) -> Result<PatternCatalog, CatalogError> {
        match &self.catalog_path {
            Some(path) => PatternCatalog::from_path(path),
            None => Ok(PatternCatalog::builtin().clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = ServerConfig::from_toml("").unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.bind, "127.0.0.1:3030");
        assert_eq!(config.matching.threshold, 0.6);
    }

    #[test]
    fn matching_section_overrides_thresholds() {
        let config = ServerConfig::from_toml(
            r#"
            bind = "0.0.0.0:8080"
            catalog_path = "/etc/clarify/catalog.toml"

            [matching]
            threshold = 0.75
            "#,
        )
        .unwrap();
        assert_eq!(config.bind, "0.0.0.0:8080");
        assert_eq!(config.catalog_path, Some(PathBuf::from("/etc/clarify/catalog.toml")));
        assert_eq!(config.matching.threshold, 0.75);
        assert_eq!(config.matching.name_weight, 0.6);
    }

    #[test]
    fn rejects_out_of_range_weights() {
        let err = ServerConfig::from_toml("[matching]\nname_weight = 1.5\n").unwrap_err();
        assert!(matches!(err, ConfigError::Matching(_)));
    }

    #[test]
    fn rejects_bad_toml() {
        assert!(matches!(
            ServerConfig::from_toml("bind = ["),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn bind_override_ignores_blank() {
        let mut config = ServerConfig::default();
        config.apply_bind_override(Some("  ".to_string()));
        assert_eq!(config.bind, "127.0.0.1:3030");
        config.apply_bind_override(Some("0.0.0.0:9000".to_string()));
        assert_eq!(config.bind, "0.0.0.0:9000");
    }

    #[test]
    fn missing_file_reports_path() {
        let err = ServerConfig::from_path(Path::new("/nonexistent/clarify.toml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/clarify.toml"));
    }

    #[test]
    fn default_catalog_is_builtin() {
        let catalog = ServerConfig::default().load_catalog().unwrap();
        assert_eq!(&catalog, PatternCatalog::builtin());
    }
}
