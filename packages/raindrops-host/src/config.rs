//! Host configuration.
//!
//! Values are layered: built-in defaults, then an optional JSON file, then
//! `RAINDROPS_*` environment variables.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::HostError;

/// Size of one WebAssembly page in bytes.
pub const WASM_PAGE_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HostConfig {
    /// Pages of linear memory given to modules that import their memory.
    pub initial_pages: u32,
    /// Upper bound the provided memory may grow to.
    pub max_pages: Option<u32>,
    /// Fuel per `convert` call. `None` disables metering.
    pub fuel: Option<u64>,
    /// Name of the conversion export.
    pub export: String,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            initial_pages: 1,
            max_pages: None,
            fuel: None,
            export: "convert".to_string(),
        }
    }
}

impl HostConfig {
    /// Load a config file. Fields missing from the file keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, HostError> {
        let text = std::fs::read_to_string(path).map_err(|source| HostError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text)
            .map_err(|e| HostError::Config(format!("{}: {e}", path.display())))
    }

    /// Apply `RAINDROPS_INITIAL_PAGES`, `RAINDROPS_MAX_PAGES`,
    /// `RAINDROPS_FUEL` and `RAINDROPS_EXPORT` from the process environment.
    pub fn with_env(self) -> Result<Self, HostError> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`, keyed by environment variable name.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, HostError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("RAINDROPS_INITIAL_PAGES") {
            self.initial_pages = parse_var("RAINDROPS_INITIAL_PAGES", &v)?;
        }
        if let Some(v) = lookup("RAINDROPS_MAX_PAGES") {
            self.max_pages = Some(parse_var("RAINDROPS_MAX_PAGES", &v)?);
        }
        if let Some(v) = lookup("RAINDROPS_FUEL") {
            self.fuel = Some(parse_var("RAINDROPS_FUEL", &v)?);
        }
        if let Some(v) = lookup("RAINDROPS_EXPORT") {
            self.export = v;
        }
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), HostError> {
        if self.initial_pages == 0 {
            return Err(HostError::Config(
                "initial_pages must be at least 1".to_string(),
            ));
        }
        if let Some(max) = self.max_pages {
            if max < self.initial_pages {
                return Err(HostError::Config(format!(
                    "max_pages ({max}) is below initial_pages ({})",
                    self.initial_pages
                )));
            }
        }
        if self.fuel == Some(0) {
            return Err(HostError::Config("fuel must be positive".to_string()));
        }
        if self.export.is_empty() {
            return Err(HostError::Config("export name is empty".to_string()));
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, HostError>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| HostError::Config(format!("{key}={value:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_one_page_harness() {
        let config = HostConfig::default();
        assert_eq!(config.initial_pages, 1);
        assert_eq!(config.max_pages, None);
        assert_eq!(config.fuel, None);
        assert_eq!(config.export, "convert");
        config.validate().unwrap();
    }

    #[test]
    fn file_fields_override_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"max_pages": 4, "fuel": 100000}}"#).unwrap();

        let config = HostConfig::from_file(file.path()).unwrap();
        assert_eq!(config.initial_pages, 1);
        assert_eq!(config.max_pages, Some(4));
        assert_eq!(config.fuel, Some(100_000));
    }

    #[test]
    fn unknown_file_fields_are_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"pages": 2}}"#).unwrap();

        let err = HostConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, HostError::Config(_)), "{err}");
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = HostConfig::from_file(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, HostError::Io { .. }), "{err}");
    }

    #[test]
    fn env_overrides_apply() {
        let config = HostConfig::default()
            .with_overrides(env(&[
                ("RAINDROPS_INITIAL_PAGES", "2"),
                ("RAINDROPS_MAX_PAGES", " 8 "),
                ("RAINDROPS_FUEL", "5000"),
                ("RAINDROPS_EXPORT", "sound"),
            ]))
            .unwrap();
        assert_eq!(
            config,
            HostConfig {
                initial_pages: 2,
                max_pages: Some(8),
                fuel: Some(5000),
                export: "sound".to_string(),
            }
        );
    }

    #[test]
    fn bad_env_value_names_the_variable() {
        let err = HostConfig::default()
            .with_overrides(env(&[("RAINDROPS_FUEL", "lots")]))
            .unwrap_err();
        assert!(err.to_string().contains("RAINDROPS_FUEL"), "{err}");
    }

    #[test]
    fn validate_rejects_bad_limits() {
        let zero_pages = HostConfig {
            initial_pages: 0,
            ..HostConfig::default()
        };
        assert!(zero_pages.validate().is_err());

        let inverted = HostConfig {
            initial_pages: 4,
            max_pages: Some(2),
            ..HostConfig::default()
        };
        assert!(inverted.validate().is_err());

        let no_fuel = HostConfig {
            fuel: Some(0),
            ..HostConfig::default()
        };
        assert!(no_fuel.validate().is_err());
    }
}
