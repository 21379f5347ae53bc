// Layered configuration loading for the NS Gifts client

pub mod env;
pub mod error;
pub mod loader;
pub mod validation;

pub use env::{DEFAULT_PREFIX, EnvLoader};
pub use error::{ConfigError, Result};
pub use loader::{ConfigLoader, FileFormat};
pub use validation::{ConfigValidator, Validate};

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

/// Layered settings store.
///
/// Later loads override earlier ones, so the usual order is file, then `.env`,
/// then process environment.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    values: HashMap<String, Value>,
}

impl Settings {
    /// Create an empty settings store using the default `NSGIFTS` prefix
    pub fn new() -> Self {
        Self::default()
    }

    /// Load settings from prefixed environment variables
    pub fn load_env(&mut self) -> &mut Self {
        let loaded = EnvLoader::default().load();
        debug!(count = loaded.len(), "Loaded settings from environment");
        self.values.extend(loaded);
        self
    }

    /// Load a `.env` file into the process environment, then the environment
    pub fn load_dotenv(&mut self, path: Option<&Path>) -> Result<&mut Self> {
        if let Some(path) = path {
            dotenvy::from_path(path).map_err(|e| ConfigError::LoadError(e.to_string()))?;
        } else {
            dotenvy::dotenv().ok(); // Ignore if .env doesn't exist
        }
        Ok(self.load_env())
    }

    /// Load settings from a JSON, TOML or `.env` file, detected by extension
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<&mut Self> {
        let path = path.as_ref();
        let data = ConfigLoader::auto(path)?.load_file(path)?;

        match data {
            Value::Object(map) => {
                debug!(path = %path.display(), count = map.len(), "Loaded settings file");
                self.values.extend(map);
                Ok(self)
            }
            _ => Err(ConfigError::ParseError(format!(
                "{} does not contain a table of settings",
                path.display()
            ))),
        }
    }

    /// Set a value, overriding anything loaded before
    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> &mut Self {
        self.values.insert(key.to_string(), value.into());
        self
    }

    /// Get a typed value
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let value = self
            .values
            .get(key)
            .ok_or_else(|| ConfigError::KeyNotFound(key.to_string()))?;

        serde_json::from_value(value.clone())
            .map_err(|e| ConfigError::DeserializationError(format!("{}: {}", key, e)))
    }

    /// Check if a key exists
    pub fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Merge another store into this one; `other` wins on conflicts
    pub fn merge(&mut self, other: &Settings) -> &mut Self {
        self.values
            .extend(other.values.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    /// Deserialize every setting into `T` and validate it
    pub fn load_validated<T: DeserializeOwned + Validate>(&self) -> Result<T> {
        let json_value = Value::Object(
            self.values
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        );

        let validated: T = serde_json::from_value(json_value)
            .map_err(|e| ConfigError::DeserializationError(e.to_string()))?;

        validated.validate()?;

        Ok(validated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::io::Write;

    #[derive(Debug, Deserialize)]
    struct Sample {
        base_url: String,
        #[serde(default)]
        max_retries: Option<u32>,
    }

    impl Validate for Sample {
        fn validate(&self) -> Result<()> {
            ConfigValidator::is_url(&self.base_url, "base_url")
        }
    }

    #[test]
    fn test_set_and_get() {
        let mut settings = Settings::new();
        settings.set("max_retries", 4);

        let value: u32 = settings.get("max_retries").unwrap();
        assert_eq!(value, 4);
        assert!(settings.has("max_retries"));
        assert!(!settings.has("base_url"));
    }

    #[test]
    fn test_merge_prefers_other() {
        let mut base = Settings::new();
        base.set("max_retries", 3).set("base_url", "https://a.example");

        let mut overlay = Settings::new();
        overlay.set("max_retries", 7);

        base.merge(&overlay);
        assert_eq!(base.get::<u32>("max_retries").unwrap(), 7);
        assert_eq!(base.get::<String>("base_url").unwrap(), "https://a.example");
    }

    #[test]
    fn test_load_validated() {
        let mut settings = Settings::new();
        settings.set("base_url", "https://api.example.com");
        let sample: Sample = settings.load_validated().unwrap();
        assert_eq!(sample.max_retries, None);

        settings.set("base_url", "ftp://nope");
        assert!(matches!(
            settings.load_validated::<Sample>(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_load_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "base_url = \"https://api.example.com\"\nmax_retries = 2").unwrap();

        let mut settings = Settings::new();
        settings.load_file(file.path()).unwrap();

        let sample: Sample = settings.load_validated().unwrap();
        assert_eq!(sample.max_retries, Some(2));
    }
}
