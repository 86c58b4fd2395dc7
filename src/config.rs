//! World configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// External classifier command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReasonerConfig {
    /// Program to run. Empty means no process classifier is configured.
    pub program: String,
    /// Arguments passed before the input is written to stdin.
    pub args: Vec<String>,
    /// Wall-clock limit for one classification; the child is killed on expiry.
    pub timeout_ms: u64,
}

impl Default for ReasonerConfig {
    fn default() -> Self {
        Self {
            program: String::new(),
            args: Vec::new(),
            timeout_ms: 30_000,
        }
    }
}

impl ReasonerConfig {
    /// Returns true if a program is set.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        !self.program.trim().is_empty()
    }
}

/// Settings for a [`crate::World`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Directories searched by `load(iri)` and written by `save(ontology)`.
    pub search_paths: Vec<PathBuf>,
    /// External classifier used by `sync_configured_reasoner`.
    pub reasoner: ReasonerConfig,
}

impl WorldConfig {
    /// Validate the configuration.
    ///
    /// This is called by `World::with_config`.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.reasoner.timeout_ms == 0 {
            return Err(ValidationError::InvalidConfig {
                reason: "reasoner.timeout_ms must be > 0".to_string(),
            });
        }
        if let Some(path) = self.search_paths.iter().find(|p| p.as_os_str().is_empty()) {
            return Err(ValidationError::InvalidConfig {
                reason: format!("empty search path {path:?}"),
            });
        }
        Ok(())
    }

    /// Builds a configuration from `ONTOSYNC_*` environment variables.
    ///
    /// - `ONTOSYNC_PATH`: search paths, split like `PATH`
    /// - `ONTOSYNC_REASONER`: classifier program
    /// - `ONTOSYNC_REASONER_ARGS`: whitespace-separated arguments
    /// - `ONTOSYNC_REASONER_TIMEOUT_MS`: timeout in milliseconds
    pub fn from_env() -> Result<Self, ValidationError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ValidationError> {
        let mut config = Self::default();
        if let Some(paths) = lookup("ONTOSYNC_PATH") {
            config.search_paths = std::env::split_paths(&paths)
                .filter(|p| !p.as_os_str().is_empty())
                .collect();
        }
        if let Some(program) = lookup("ONTOSYNC_REASONER") {
            config.reasoner.program = program;
        }
        if let Some(args) = lookup("ONTOSYNC_REASONER_ARGS") {
            config.reasoner.args = args.split_whitespace().map(str::to_string).collect();
        }
        if let Some(timeout) = lookup("ONTOSYNC_REASONER_TIMEOUT_MS") {
            config.reasoner.timeout_ms =
                timeout
                    .trim()
                    .parse()
                    .map_err(|err| ValidationError::InvalidConfig {
                        reason: format!("ONTOSYNC_REASONER_TIMEOUT_MS: {err}"),
                    })?;
        }
        config.validate()?;
        Ok(config)
    }

    /// Parses a JSON configuration; missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ValidationError> {
        let config: Self = serde_json::from_str(json).map_err(|err| ValidationError::InvalidConfig {
            reason: err.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }
}
