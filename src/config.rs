//! Engine configuration.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::backend::BackendConfig;
use crate::error::{DualdexError, Result};
use crate::limits::SearchLimits;

/// Defaults applied by a [`SearchEngine`](crate::search::SearchEngine) when a
/// request leaves a knob unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Document field holding the identifier.
    pub primary_field: String,

    /// Document field holding the indexed text.
    pub index_field: String,

    /// Result count when a search gives no limit.
    pub default_limit: usize,

    /// Largest accepted search limit.
    pub max_limit: usize,

    /// Postings read per backend page on the paged paths.
    pub postings_page_size: usize,

    /// Baseline budget; request limits are overlaid on it.
    pub limits: SearchLimits,

    /// Backend the CLI builds. Ignored by an engine built around an explicit backend.
    pub backend: BackendConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            primary_field: "id".to_string(),
            index_field: "text".to_string(),
            default_limit: 20,
            max_limit: 1000,
            postings_page_size: 128,
            limits: SearchLimits::default(),
            backend: BackendConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load and validate a JSON config file. Missing keys take their defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: EngineConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.primary_field.trim().is_empty() {
            return Err(DualdexError::config("primary_field must not be empty"));
        }
        if self.index_field.trim().is_empty() {
            return Err(DualdexError::config("index_field must not be empty"));
        }
        if self.default_limit == 0 {
            return Err(DualdexError::config("default_limit must be greater than zero"));
        }
        if self.max_limit < self.default_limit {
            return Err(DualdexError::config(format!(
                "max_limit ({}) must be at least default_limit ({})",
                self.max_limit, self.default_limit
            )));
        }
        if self.postings_page_size == 0 {
            return Err(DualdexError::config(
                "postings_page_size must be greater than zero",
            ));
        }
        Ok(())
    }

    /// Clamp a requested result count into `1..=max_limit`.
    pub fn effective_limit(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.default_limit)
            .clamp(1, self.max_limit.max(1))
    }
}
