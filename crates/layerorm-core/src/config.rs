//! Engine configuration
//!
//! Loaded from TOML; every key is optional.
//!
//! ```toml
//! default_region = "default"
//! default_key_field = "id"
//! log_profile = "production"
//! ```

use serde::Deserialize;
use std::path::Path;

use crate::errors::{OrmError, Result};
use crate::logging_facility::Profile;

pub const DEFAULT_REGION: &str = "default";
pub const DEFAULT_KEY_FIELD: &str = "id";

pub const ENV_DEFAULT_REGION: &str = "LAYERORM_DEFAULT_REGION";
pub const ENV_DEFAULT_KEY_FIELD: &str = "LAYERORM_DEFAULT_KEY_FIELD";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Region used when a caller names none
    pub default_region: String,
    /// Key field tables fall back to for key lookups
    pub default_key_field: Option<String>,
    /// Passed to `logging_facility::init_from_config`
    pub log_profile: Profile,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            default_region: DEFAULT_REGION.to_string(),
            default_key_field: Some(DEFAULT_KEY_FIELD.to_string()),
            log_profile: Profile::default(),
        }
    }
}

impl CoreConfig {
    /// # Errors
    ///
    /// `Config` when the text is not valid TOML for this shape.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// # Errors
    ///
    /// `Config` when the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| OrmError::Config {
            message: format!("failed to read {}: {}", path.display(), e),
        })?;
        Self::from_toml_str(&text)
    }

    /// Apply `LAYERORM_DEFAULT_REGION` / `LAYERORM_DEFAULT_KEY_FIELD`
    ///
    /// An empty key field variable clears the fallback key field.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(region) = lookup(ENV_DEFAULT_REGION).filter(|r| !r.is_empty()) {
            self.default_region = region;
        }
        if let Some(field) = lookup(ENV_DEFAULT_KEY_FIELD) {
            self.default_key_field = (!field.is_empty()).then_some(field);
        }
        self
    }
}
