use std::path::Path;

use ijr_bus::{BatchPublisher, MessageBus};
use ijr_diff::{CompareOptions, FlattenOptions, KeyFilter};
use ijr_secrets::SecretVersion;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Prefix of environment variables overriding settings, e.g. `IJR_DATABASE`.
pub const ENV_PREFIX: &str = "IJR_";

/// Settings shared by every function in a project.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub project_id: Option<String>,
    pub database: String,
    pub collection: String,
    /// Secret holding the document store credentials.
    pub store_secret: String,
    /// `latest` or a version number.
    pub store_secret_version: String,
    pub writer_threshold: usize,
    pub publisher_threshold: usize,
    /// Joins key paths in flattened diffs.
    pub separator: String,
    /// Flatten list diffs into indexed paths such as `shops.0`.
    pub expand_sequences: bool,
    pub ignore_prefix: Option<String>,
    pub ignore_suffix: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            project_id: None,
            database: "config".into(),
            collection: "functions".into(),
            store_secret: "mongodb".into(),
            store_secret_version: "latest".into(),
            writer_threshold: 250,
            publisher_threshold: 25,
            separator: ".".into(),
            expand_sequences: false,
            ignore_prefix: None,
            ignore_suffix: None,
        }
    }
}

impl Settings {
    pub fn from_toml_str(s: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Read settings from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Override fields from `IJR_*` environment variables.
    pub fn apply_env(&mut self) -> ConfigResult<()> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    pub(crate) fn apply_env_from(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> ConfigResult<()> {
        let var = |field: &str| {
            let key = format!("{ENV_PREFIX}{}", field.to_ascii_uppercase());
            lookup(&key).map(|value| (key, value))
        };
        let number = |field: &str, current: usize| -> ConfigResult<usize> {
            match var(field) {
                Some((key, value)) => value
                    .parse()
                    .map_err(|_| ConfigError::InvalidEnv { var: key, value }),
                None => Ok(current),
            }
        };
        let flag = |field: &str, current: bool| -> ConfigResult<bool> {
            match var(field) {
                Some((key, value)) => value
                    .parse()
                    .map_err(|_| ConfigError::InvalidEnv { var: key, value }),
                None => Ok(current),
            }
        };

        if let Some((_, v)) = var("project_id") {
            self.project_id = Some(v);
        }
        if let Some((_, v)) = var("database") {
            self.database = v;
        }
        if let Some((_, v)) = var("collection") {
            self.collection = v;
        }
        if let Some((_, v)) = var("store_secret") {
            self.store_secret = v;
        }
        if let Some((_, v)) = var("store_secret_version") {
            self.store_secret_version = v;
        }
        self.writer_threshold = number("writer_threshold", self.writer_threshold)?;
        self.publisher_threshold = number("publisher_threshold", self.publisher_threshold)?;
        if let Some((_, v)) = var("separator") {
            self.separator = v;
        }
        self.expand_sequences = flag("expand_sequences", self.expand_sequences)?;
        if let Some((_, v)) = var("ignore_prefix") {
            self.ignore_prefix = Some(v).filter(|p| !p.is_empty());
        }
        if let Some((_, v)) = var("ignore_suffix") {
            self.ignore_suffix = Some(v).filter(|s| !s.is_empty());
        }
        Ok(())
    }

    pub fn secret_version(&self) -> ConfigResult<SecretVersion> {
        Ok(self.store_secret_version.parse()?)
    }

    /// Diff options built from the ignore patterns.
    pub fn compare_options(&self) -> ConfigResult<CompareOptions> {
        let filter = KeyFilter::new(self.ignore_prefix.as_deref(), self.ignore_suffix.as_deref())?;
        Ok(CompareOptions::with_filter(filter))
    }

    /// A publisher for `topic` flushing at the configured threshold.
    pub fn publisher<B: MessageBus>(
        &self,
        bus: B,
        topic: &str,
        msg_type: &str,
    ) -> BatchPublisher<B> {
        BatchPublisher::new(bus, topic, msg_type).with_threshold(self.publisher_threshold)
    }

    pub fn flatten_options(&self) -> ConfigResult<FlattenOptions> {
        let options = FlattenOptions::new(&self.separator)?;
        Ok(if self.expand_sequences {
            options.expanding_sequences()
        } else {
            options
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ijr_bus::InMemoryBus;
    use ijr_diff::DiffError;
    use std::collections::HashMap;

    #[test]
    fn defaults() {
        let s = Settings::default();
        assert_eq!(s.writer_threshold, 250);
        assert_eq!(s.publisher_threshold, 25);
        assert_eq!(s.separator, ".");
        assert!(!s.flatten_options().unwrap().expands_sequences());
        assert_eq!(s.secret_version().unwrap(), SecretVersion::Latest);
        assert!(s.project_id.is_none());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let s = Settings::from_toml_str(
            r#"
            project_id = "retail-prod"
            collection = "stock_functions"
            store_secret_version = "3"
            ignore_prefix = "tmp"
            "#,
        )
        .unwrap();
        assert_eq!(s.project_id.as_deref(), Some("retail-prod"));
        assert_eq!(s.collection, "stock_functions");
        assert_eq!(s.database, "config");
        assert_eq!(s.secret_version().unwrap(), SecretVersion::Number(3));
        assert!(s.compare_options().unwrap().filter.excludes("tmp_value"));
    }

    #[test]
    fn publisher_uses_configured_threshold() {
        let s = Settings::from_toml_str("publisher_threshold = 3").unwrap();
        let publisher = s.publisher(InMemoryBus::new(), "stock", "stock_change");
        assert_eq!(publisher.threshold(), 3);
        assert_eq!(publisher.topic(), "stock");

        let default = Settings::default().publisher(InMemoryBus::new(), "t", "n");
        assert_eq!(default.threshold(), ijr_bus::DEFAULT_PUBLISH_THRESHOLD);
    }

    #[test]
    fn bad_toml_is_parse_error() {
        let err = Settings::from_toml_str("writer_threshold = \"many\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.toml");
        assert!(matches!(
            Settings::load(&path),
            Err(ConfigError::Io { path: ref p, .. }) if *p == path
        ));
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ijr.toml");
        std::fs::write(&path, "database = \"stock\"\n").unwrap();
        let s = Settings::load(&path).unwrap();
        assert_eq!(s.database, "stock");
    }

    #[test]
    fn env_overrides() {
        let env: HashMap<&str, &str> = [
            ("IJR_DATABASE", "override"),
            ("IJR_WRITER_THRESHOLD", "10"),
            ("IJR_SEPARATOR", "/"),
            ("IJR_IGNORE_SUFFIX", "_at"),
            ("IJR_EXPAND_SEQUENCES", "true"),
        ]
        .into_iter()
        .collect();
        let mut s = Settings::default();
        s.apply_env_from(|k| env.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(s.database, "override");
        assert_eq!(s.writer_threshold, 10);
        let flatten = s.flatten_options().unwrap();
        assert_eq!(flatten.separator(), "/");
        assert!(flatten.expands_sequences());
        assert_eq!(s.ignore_suffix.as_deref(), Some("_at"));
        assert_eq!(s.collection, "functions");
    }

    #[test]
    fn env_number_must_parse() {
        let mut s = Settings::default();
        let err = s
            .apply_env_from(|k| (k == "IJR_PUBLISHER_THRESHOLD").then(|| "lots".to_string()))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidEnv { ref var, .. } if var == "IJR_PUBLISHER_THRESHOLD"
        ));
    }

    #[test]
    fn env_flag_must_parse() {
        let mut s = Settings::default();
        let err = s
            .apply_env_from(|k| (k == "IJR_EXPAND_SEQUENCES").then(|| "yes".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { .. }));
    }

    #[test]
    fn invalid_options_surface_diff_errors() {
        let s = Settings {
            separator: String::new(),
            ignore_prefix: Some(String::new()),
            ..Settings::default()
        };
        assert!(matches!(
            s.flatten_options(),
            Err(ConfigError::Diff(DiffError::InvalidSeparator(_)))
        ));
        assert!(matches!(
            s.compare_options(),
            Err(ConfigError::Diff(DiffError::InvalidFilter { .. }))
        ));
    }

    #[test]
    fn invalid_secret_version() {
        let s = Settings {
            store_secret_version: "0".into(),
            ..Settings::default()
        };
        assert!(matches!(s.secret_version(), Err(ConfigError::Secrets(_))));
    }
}
