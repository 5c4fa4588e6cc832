//! Configuration file loader.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::error::{ConfigError, ConfigResult};
use super::schema::BrazeConfig;

/// Configuration loader with support for multiple sources.
pub struct ConfigLoader {
    search_paths: Vec<PathBuf>,
}

impl ConfigLoader {
    /// Creates a new configuration loader.
    pub fn new() -> Self {
        Self {
            search_paths: Vec::new(),
        }
    }

    /// Adds a search path for configuration files.
    pub fn add_search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.search_paths.push(path.as_ref().to_path_buf());
        self
    }

    /// Adds the current directory to search paths.
    pub fn with_current_dir(self) -> Self {
        if let Ok(cwd) = std::env::current_dir() {
            self.add_search_path(cwd)
        } else {
            self
        }
    }

    /// Adds the user config directory to search paths.
    pub fn with_user_config_dir(self) -> Self {
        if let Some(config_dir) = dirs::config_dir() {
            self.add_search_path(config_dir.join("braze"))
        } else {
            self
        }
    }

    /// Loads configuration from the first available source.
    pub fn load(&self) -> ConfigResult<BrazeConfig> {
        if let Some(path) = self.find_config_file() {
            return self.load_from_file(&path);
        }

        info!("No configuration file found, using defaults");
        Ok(BrazeConfig::default())
    }

    /// Loads configuration from a specific file.
    pub fn load_from_file<P: AsRef<Path>>(&self, path: P) -> ConfigResult<BrazeConfig> {
        let path = path.as_ref();
        info!("Loading configuration from: {}", path.display());

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = std::fs::read_to_string(path)?;
        self.load_from_str(&content)
    }

    /// Loads configuration from a YAML string.
    pub fn load_from_str(&self, yaml: &str) -> ConfigResult<BrazeConfig> {
        let expanded = self.expand_env_vars(yaml);
        let config = serde_yaml::from_str(&expanded)?;
        Ok(config)
    }

    /// Finds the first available configuration file.
    fn find_config_file(&self) -> Option<PathBuf> {
        const CONFIG_NAMES: &[&str] = &[
            "braze.yaml",
            "braze.yml",
            "config.yaml",
            "config.yml",
            ".braze.yaml",
            ".braze.yml",
        ];

        for search_path in &self.search_paths {
            for name in CONFIG_NAMES {
                let path = search_path.join(name);
                debug!("Checking for config file: {}", path.display());
                if path.exists() {
                    info!("Found configuration file: {}", path.display());
                    return Some(path);
                }
            }
        }

        None
    }

    /// Expands environment variables in the format ${VAR_NAME} or ${VAR_NAME:-default}.
    fn expand_env_vars(&self, content: &str) -> String {
        let mut result = content.to_string();
        let re = regex_lite::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)(:-([^}]*))?\}").unwrap();

        for cap in re.captures_iter(content) {
            let full_match = cap.get(0).unwrap().as_str();
            let var_name = cap.get(1).unwrap().as_str();
            let default_value = cap.get(3).map(|m| m.as_str());

            let value = std::env::var(var_name)
                .ok()
                .or_else(|| default_value.map(String::from))
                .unwrap_or_default();

            result = result.replace(full_match, &value);
        }

        result
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new().with_current_dir().with_user_config_dir()
    }
}

/// Convenience function to load configuration with default settings.
pub fn load_config() -> ConfigResult<BrazeConfig> {
    ConfigLoader::default().load()
}

/// Convenience function to load configuration from a specific file.
pub fn load_config_from_file<P: AsRef<Path>>(path: P) -> ConfigResult<BrazeConfig> {
    ConfigLoader::new().load_from_file(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::LogLevel;

    #[test]
    fn parse_empty_yaml() {
        let loader = ConfigLoader::new();
        let config = loader.load_from_str("").unwrap();
        assert_eq!(config.bot.uin, 0);
        assert!(config.services.is_empty());
    }

    #[test]
    fn parse_minimal_config() {
        let yaml = r#"
logging:
  level: debug
"#;
        let loader = ConfigLoader::new();
        let config = loader.load_from_str(yaml).unwrap();
        assert_eq!(config.logging.level, LogLevel::Debug);
    }

    #[test]
    fn env_var_expansion() {
        // SAFETY: This test runs in single-threaded context
        unsafe { std::env::set_var("BRAZE_TEST_UIN", "314159") };
        let loader = ConfigLoader::new();

        let yaml = r#"
bot:
  uin: ${BRAZE_TEST_UIN}
"#;
        let config = loader.load_from_str(yaml).unwrap();
        assert_eq!(config.bot.uin, 314159);

        // SAFETY: This test runs in single-threaded context
        unsafe { std::env::remove_var("BRAZE_TEST_UIN") };
    }

    #[test]
    fn env_var_default_value() {
        let loader = ConfigLoader::new();

        let yaml = r#"
bot:
  uin: ${BRAZE_NONEXISTENT_VAR:-271828}
"#;
        let config = loader.load_from_str(yaml).unwrap();
        assert_eq!(config.bot.uin, 271828);
    }

    #[test]
    fn missing_file_is_an_error() {
        let loader = ConfigLoader::new();
        let result = loader.load_from_file("/nonexistent/braze.yaml");
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }
}
