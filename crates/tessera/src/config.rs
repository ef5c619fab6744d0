//! Configuration types for Tessera.
//!
//! All types implement [`serde::Deserialize`] and every field has a default,
//! so an empty file is a valid configuration.
//!
//! - [`AppConfig`] - Top-level configuration.
//! - [`EvaluationConfig`] - Randomness, clock and error rendering of passes.
//! - [`MigrationConfig`] - Post-processing of migrated formulas.
//!
//! # Example
//!
//! ```
//! # use tessera::config::AppConfig;
//! let config = AppConfig::default();
//! assert_eq!(config.evaluation().max_depth(), 32);
//! assert!(config.migration().escape_date_quotes());
//! ```

use chrono::{DateTime, NaiveDateTime};
use serde::Deserialize;

use crate::eval::{DEFAULT_MAX_DEPTH, FixedClock};

/// Format of [`EvaluationConfig`]'s `now` without an explicit offset
pub const NOW_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    evaluation: EvaluationConfig,

    #[serde(default)]
    migration: MigrationConfig,
}

impl AppConfig {
    pub fn new(evaluation: EvaluationConfig, migration: MigrationConfig) -> Self {
        Self {
            evaluation,
            migration,
        }
    }

    pub fn evaluation(&self) -> &EvaluationConfig {
        &self.evaluation
    }

    pub fn migration(&self) -> &MigrationConfig {
        &self.migration
    }
}

/// The `[evaluation]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    /// Seed of the random source; random when unset.
    seed: Option<u64>,

    /// Freezes the clock, as RFC 3339 or `YYYY-MM-DDTHH:MM:SS` (UTC).
    now: Option<String>,

    max_depth: usize,

    /// Render failed calls as `[ERROR: ...]` instead of their source text.
    error_marker: bool,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            seed: None,
            now: None,
            max_depth: DEFAULT_MAX_DEPTH,
            error_marker: true,
        }
    }
}

impl EvaluationConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_now(mut self, now: impl Into<String>) -> Self {
        self.now = Some(now.into());
        self
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn error_marker(&self) -> bool {
        self.error_marker
    }

    /// The frozen clock, or `None` to use the system time.
    ///
    /// # Errors
    ///
    /// Returns an error if `now` is neither RFC 3339 nor [`NOW_FORMAT`].
    pub fn clock(&self) -> Result<Option<FixedClock>, String> {
        self.now
            .as_deref()
            .map(|now| {
                DateTime::parse_from_rfc3339(now)
                    .or_else(|_| {
                        NaiveDateTime::parse_from_str(now, NOW_FORMAT)
                            .map(|naive| naive.and_utc().fixed_offset())
                    })
                    .map(FixedClock::new)
            })
            .transpose()
            .map_err(|err| format!("Invalid `now` in config: {err}"))
    }
}

/// The `[migration]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MigrationConfig {
    /// Escape `'T'`/`'Z'` in `DATE` macros of migrated formulas.
    escape_date_quotes: bool,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            escape_date_quotes: true,
        }
    }
}

impl MigrationConfig {
    pub fn new(escape_date_quotes: bool) -> Self {
        Self { escape_date_quotes }
    }

    pub fn escape_date_quotes(&self) -> bool {
        self.escape_date_quotes
    }
}

#[cfg(test)]
mod tests {
    use crate::eval::Clock;

    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: AppConfig = toml::from_str("").expect("empty config");
        assert_eq!(config.evaluation().seed(), None);
        assert_eq!(config.evaluation().max_depth(), DEFAULT_MAX_DEPTH);
        assert!(config.evaluation().error_marker());
        assert!(config.migration().escape_date_quotes());
        assert!(config.evaluation().clock().expect("no clock").is_none());
    }

    #[test]
    fn test_partial_sections() {
        let config: AppConfig = toml::from_str(
            r#"
            [evaluation]
            seed = 7
            error_marker = false

            [migration]
            escape_date_quotes = false
            "#,
        )
        .expect("valid config");

        assert_eq!(config.evaluation().seed(), Some(7));
        assert_eq!(config.evaluation().max_depth(), DEFAULT_MAX_DEPTH);
        assert!(!config.evaluation().error_marker());
        assert!(!config.migration().escape_date_quotes());
    }

    #[test]
    fn test_fixed_clock_formats() {
        let naive = EvaluationConfig::default().with_now("2024-05-01T08:30:00");
        let clock = naive.clock().expect("valid").expect("fixed clock");
        assert_eq!(clock.now().to_rfc3339(), "2024-05-01T08:30:00+00:00");

        let offset = EvaluationConfig::default().with_now("2024-05-01T08:30:00+02:00");
        let clock = offset.clock().expect("valid").expect("fixed clock");
        assert_eq!(clock.now().offset().local_minus_utc(), 7200);
    }

    #[test]
    fn test_invalid_now() {
        let config = EvaluationConfig::default().with_now("yesterday");
        let err = config.clock().expect_err("invalid");
        assert!(err.starts_with("Invalid `now` in config"));
    }
}
