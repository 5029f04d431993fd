//! Live target configuration sources.
//!
//! Runners call [`ConfigSource::current`] once per cycle and never hold on
//! to the result, so whatever a source returns *now* is what the next
//! request is sent to.

use crate::error::EnvError;
use crate::types::TargetConfig;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tracing::debug;

/// Provides the target configuration as of the moment of the call.
pub trait ConfigSource: Send + Sync + 'static {
    /// Returns the current configuration.
    ///
    /// Must not fail: an unreadable source yields an empty config, which the
    /// runner turns into failed (and absorbed) requests.
    fn current(&self) -> TargetConfig;
}

/// In-memory configuration shared between the engine and whoever edits it.
#[derive(Clone, Debug, Default)]
pub struct SharedConfig {
    inner: Arc<RwLock<TargetConfig>>,
}

impl SharedConfig {
    /// Creates a shared config with an initial value.
    pub fn new(config: TargetConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(config)),
        }
    }

    /// Replaces the whole config.
    pub fn replace(&self, config: TargetConfig) {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        *guard = config;
    }

    /// Updates only the fields that are provided.
    pub fn update(&self, error_injection_api: Option<String>, sample_api: Option<String>) {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        if let Some(url) = error_injection_api {
            guard.error_injection_api = url;
        }
        if let Some(url) = sample_api {
            guard.sample_api = url;
        }
    }
}

impl ConfigSource for SharedConfig {
    fn current(&self) -> TargetConfig {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

/// Configuration re-read from a JSON file on every call.
///
/// A missing or malformed file is treated as "not configured".
#[derive(Clone, Debug)]
pub struct JsonFileConfig {
    path: PathBuf,
}

impl JsonFileConfig {
    /// Creates a source reading from `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path this source reads.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads and parses the file, reporting why it could not be used.
    pub fn load(&self) -> Result<TargetConfig, EnvError> {
        // Blocking read of a few hundred bytes once per cycle
        let raw = std::fs::read_to_string(&self.path)
            .map_err(|e| EnvError::ConfigError(format!("{}: {}", self.path.display(), e)))?;
        Ok(serde_json::from_str(&raw)?)
    }
}

impl ConfigSource for JsonFileConfig {
    fn current(&self) -> TargetConfig {
        match self.load() {
            Ok(config) => config,
            Err(e) => {
                debug!("Falling back to empty config: {}", e);
                TargetConfig::default()
            }
        }
    }
}

/// A live source with fixed overrides laid on top.
///
/// Non-empty override fields win; empty ones fall through to the base
/// source, which is still consulted on every call.
#[derive(Clone, Debug)]
pub struct LayeredConfig<B> {
    base: B,
    overrides: TargetConfig,
}

impl<B: ConfigSource> LayeredConfig<B> {
    /// Layers `overrides` over `base`.
    pub fn new(base: B, overrides: TargetConfig) -> Self {
        Self { base, overrides }
    }
}

impl<B: ConfigSource> ConfigSource for LayeredConfig<B> {
    fn current(&self) -> TargetConfig {
        let mut config = self.base.current();
        if !self.overrides.error_injection_api.trim().is_empty() {
            config.error_injection_api = self.overrides.error_injection_api.clone();
        }
        if !self.overrides.sample_api.trim().is_empty() {
            config.sample_api = self.overrides.sample_api.clone();
        }
        config
    }
}

impl<T: ConfigSource> ConfigSource for Arc<T> {
    fn current(&self) -> TargetConfig {
        (**self).current()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_shared_config_update_is_visible_to_clones() {
        let config = SharedConfig::new(TargetConfig::new("http://inject", "http://a"));
        let reader = config.clone();

        config.update(None, Some("http://b".to_string()));

        let current = reader.current();
        assert_eq!(current.sample_api, "http://b");
        assert_eq!(current.error_injection_api, "http://inject");
    }

    #[test]
    fn test_missing_file_yields_default() {
        let source = JsonFileConfig::new("/nonexistent/faultline/config.json");
        assert!(source.load().is_err());
        assert_eq!(source.current(), TargetConfig::default());
    }

    #[test]
    fn test_file_is_reread_each_call() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"error_injection_api": "http://i", "sample_api": "http://a"}}"#).unwrap();
        let source = JsonFileConfig::new(file.path());
        assert_eq!(source.current().sample_api, "http://a");

        std::fs::write(
            file.path(),
            r#"{"error_injection_api": "http://i", "sample_api": "http://b"}"#,
        )
        .unwrap();
        assert_eq!(source.current().sample_api, "http://b");
    }

    #[test]
    fn test_layered_overrides_only_set_fields() {
        let base = SharedConfig::new(TargetConfig::new("http://i", "http://a"));
        let layered = LayeredConfig::new(base.clone(), TargetConfig::new("", "http://override"));

        assert_eq!(layered.current(), TargetConfig::new("http://i", "http://override"));

        base.update(Some("http://i2".to_string()), None);
        assert_eq!(layered.current().error_injection_api, "http://i2");
    }

    #[test]
    fn test_malformed_file_yields_default() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let source = JsonFileConfig::new(file.path());
        assert!(matches!(source.load(), Err(EnvError::SerializationError(_))));
        assert!(!source.current().is_configured());
    }
}
