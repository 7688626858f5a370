//! Analysis configuration
//!
//! Two settings drive the core pipeline: the worker count for threaded
//! feature-effect derivation and the simplification mode. Both are
//! validated before any processing starts.

use crate::error::{Error, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// How much of the pipeline applies formula simplification.
///
/// The levels are cumulative: a mode also enables every cheaper mode
/// below it, so `FeatureEffects` simplifies presence conditions too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SimplificationMode {
    /// Never simplify
    #[default]
    None,

    /// Simplify each presence condition on extraction
    PresenceConditions,

    /// Additionally simplify each feature effect and each aggregated result
    FeatureEffects,
}

/// Configuration for a feature-effect analysis run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Worker count for threaded feature-effect derivation; must be >= 1
    #[serde(default = "default_threads")]
    pub threads: usize,

    /// Simplification mode
    #[serde(default, alias = "simplification-mode")]
    pub simplification: SimplificationMode,

    /// Optional regex; when set, only matching variables are analyzed
    #[serde(default)]
    pub relevant_variables: Option<String>,
}

fn default_threads() -> usize {
    4
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            threads: default_threads(),
            simplification: SimplificationMode::None,
            relevant_variables: None,
        }
    }
}

impl AnalysisConfig {
    /// Parse a config from YAML
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: AnalysisConfig = serde_norway::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the settings that would otherwise fail mid-run.
    ///
    /// Returns the compiled relevant-variables filter, if one is set.
    pub fn validate(&self) -> Result<Option<Regex>> {
        if self.threads < 1 {
            return Err(Error::Setup(format!(
                "number of threads can't be {}",
                self.threads
            )));
        }
        match &self.relevant_variables {
            Some(pattern) => Ok(Some(Regex::new(pattern)?)),
            None => Ok(None),
        }
    }
}
