// crates/stageflow-config/src/config.rs
// ============================================================================
// Module: Stageflow Configuration
// Description: Configuration loading and validation for Stageflow.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: stageflow-core, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Every section defaults, so an empty file is a valid configuration.
//! Missing or invalid configuration fails closed. A validated config resolves
//! into core [`LoadOptions`], [`EngineOptions`], and an audit sink.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Deserialize;
use stageflow_core::AnalysisOptions;
use stageflow_core::DEFAULT_MAX_LOCK_DEPTH;
use stageflow_core::EngineOptions;
use stageflow_core::EvaluationAuditSink;
use stageflow_core::FileAuditSink;
use stageflow_core::LoadOptions;
use stageflow_core::NoopAuditSink;
use stageflow_core::RegexAnchoring;
use stageflow_core::RegressionPolicy;
use stageflow_core::StderrAuditSink;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
pub const DEFAULT_CONFIG_NAME: &str = "stageflow.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "STAGEFLOW_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Smallest accepted compound lock nesting limit.
pub(crate) const MIN_LOCK_DEPTH: usize = 1;
/// Largest accepted compound lock nesting limit.
pub(crate) const MAX_LOCK_DEPTH: usize = 64;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Stageflow engine configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StageflowConfig {
    /// Load-time analysis configuration.
    #[serde(default)]
    pub analysis: AnalysisConfig,
    /// Evaluation configuration.
    #[serde(default)]
    pub evaluation: EvaluationConfig,
    /// Audit sink configuration.
    #[serde(default)]
    pub audit: AuditConfig,
}

impl StageflowConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml(content)
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.analysis.validate()?;
        self.audit.validate()
    }

    /// Returns the loader options described by this configuration.
    #[must_use]
    pub const fn load_options(&self) -> LoadOptions {
        LoadOptions {
            regex_anchoring: self.evaluation.regex_anchoring,
            default_regression_policy: self.evaluation.default_regression_policy,
            max_lock_depth: self.analysis.max_lock_depth,
            analysis: AnalysisOptions {
                report_controlled_cycles: self.analysis.report_controlled_cycles,
            },
        }
    }

    /// Returns the engine options described by this configuration.
    #[must_use]
    pub const fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            revalidate_prior_stages: self.evaluation.revalidate_prior_stages,
        }
    }

    /// Builds the configured audit sink.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] when the audit file cannot be opened.
    pub fn audit_sink(&self) -> Result<Arc<dyn EvaluationAuditSink>, ConfigError> {
        match self.audit.sink {
            AuditSinkKind::None => Ok(Arc::new(NoopAuditSink)),
            AuditSinkKind::Stderr => Ok(Arc::new(StderrAuditSink)),
            AuditSinkKind::File => {
                let path = self.audit.path.as_ref().ok_or_else(|| {
                    ConfigError::Invalid("file audit sink requires audit.path".to_string())
                })?;
                let sink = FileAuditSink::new(path).map_err(|err| ConfigError::Io(err.to_string()))?;
                Ok(Arc::new(sink))
            }
        }
    }
}

/// Load-time analysis configuration.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct AnalysisConfig {
    /// Report cycles that carry a termination condition as info issues.
    #[serde(default)]
    pub report_controlled_cycles: bool,
    /// Maximum compound lock nesting depth.
    #[serde(default = "default_max_lock_depth")]
    pub max_lock_depth: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            report_controlled_cycles: false,
            max_lock_depth: default_max_lock_depth(),
        }
    }
}

impl AnalysisConfig {
    /// Validates analysis configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_LOCK_DEPTH ..= MAX_LOCK_DEPTH).contains(&self.max_lock_depth) {
            return Err(ConfigError::Invalid(format!(
                "analysis.max_lock_depth must be between {MIN_LOCK_DEPTH} and {MAX_LOCK_DEPTH}"
            )));
        }
        Ok(())
    }
}

/// Evaluation configuration.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct EvaluationConfig {
    /// Regex anchoring mode for `regex` locks.
    #[serde(default)]
    pub regex_anchoring: RegexAnchoring,
    /// Regression policy for definitions that declare none.
    #[serde(default)]
    pub default_regression_policy: RegressionPolicy,
    /// Re-evaluate stages before the current one on every evaluation.
    #[serde(default)]
    pub revalidate_prior_stages: bool,
}

/// Audit sink configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditConfig {
    /// Sink kind.
    #[serde(default)]
    pub sink: AuditSinkKind,
    /// Log file path when using the file sink.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl AuditConfig {
    /// Validates audit configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        match self.sink {
            AuditSinkKind::None | AuditSinkKind::Stderr => {
                if self.path.is_some() {
                    return Err(ConfigError::Invalid(
                        "audit.path is only valid with the file sink".to_string(),
                    ));
                }
                Ok(())
            }
            AuditSinkKind::File => {
                let path = self.path.as_ref().ok_or_else(|| {
                    ConfigError::Invalid("file audit sink requires audit.path".to_string())
                })?;
                validate_path_string("audit.path", &path.to_string_lossy())
            }
        }
    }
}

/// Audit sink kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuditSinkKind {
    /// Discard audit events.
    #[default]
    None,
    /// Write JSON lines to stderr.
    Stderr,
    /// Append JSON lines to a file.
    File,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Default compound lock nesting limit.
const fn default_max_lock_depth() -> usize {
    DEFAULT_MAX_LOCK_DEPTH
}

/// Resolves the config path from the caller or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against length limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        let component_value = component.as_os_str().to_string_lossy();
        if component_value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}
