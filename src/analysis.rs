//! Pipeline wiring
//!
//! [`FeatureEffectAnalysis`] composes the three stages — presence-condition
//! extraction, feature-effect derivation, aggregation — into one lazy
//! pipeline. All setup validation happens in [`FeatureEffectAnalysis::new`];
//! after that point nothing aborts the run.

use crate::aggregate::{AggregatedFeatureEffect, FeAggregator};
use crate::config::{AnalysisConfig, SimplificationMode};
use crate::error::{Error, Result};
use crate::fes::{FeatureEffectFinder, ThreadedFeatureEffectFinder, VariableWithFeatureEffect};
use crate::pcs::PcFinder;
use crate::simplify::Simplifier;
use crate::source::SourceUnit;

/// A configured feature-effect analysis
pub struct FeatureEffectAnalysis {
    config: AnalysisConfig,
    simplifier: Simplifier,
}

impl FeatureEffectAnalysis {
    /// Validate the configuration and the simplifier availability.
    ///
    /// Fails when `threads < 1`, when the relevant-variables pattern does
    /// not compile, or when a simplification mode other than `NONE` is
    /// requested with an engine-less [`Simplifier`].
    pub fn new(config: AnalysisConfig, simplifier: Simplifier) -> Result<Self> {
        config.validate()?;
        if config.simplification > SimplificationMode::None && !simplifier.is_available() {
            return Err(Error::Setup(format!(
                "simplification mode {:?} requested but no simplifier engine is available",
                config.simplification
            )));
        }
        Ok(FeatureEffectAnalysis { config, simplifier })
    }

    /// Run the pipeline over the given source units.
    ///
    /// The returned iterator is lazy, finite, and non-restartable.
    /// Derivation runs on a worker pool when `threads > 1`, on the
    /// calling thread otherwise; the output is identical either way.
    pub fn run<U>(&self, units: U) -> Result<impl Iterator<Item = AggregatedFeatureEffect>>
    where
        U: IntoIterator<Item = SourceUnit> + Send + 'static,
        U::IntoIter: Send,
    {
        let pc_finder = PcFinder::new(&self.config, self.simplifier.clone())?;
        let aggregator = FeAggregator::new(&self.config, self.simplifier.clone())?;
        let records = pc_finder.find_in(units);

        let effects: Box<dyn Iterator<Item = VariableWithFeatureEffect>> =
            if self.config.threads > 1 {
                let finder = ThreadedFeatureEffectFinder::new(&self.config, self.simplifier.clone())?;
                Box::new(finder.find_feature_effects(records)?)
            } else {
                let finder = FeatureEffectFinder::new(&self.config, self.simplifier.clone())?;
                Box::new(finder.find_feature_effects(records))
            };

        Ok(aggregator.aggregate(effects))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_rejects_zero_threads() {
        let config = AnalysisConfig {
            threads: 0,
            ..AnalysisConfig::default()
        };
        assert!(matches!(
            FeatureEffectAnalysis::new(config, Simplifier::none()),
            Err(Error::Setup(_))
        ));
    }

    #[test]
    fn test_setup_rejects_simplification_without_engine() {
        let config = AnalysisConfig {
            simplification: SimplificationMode::FeatureEffects,
            ..AnalysisConfig::default()
        };
        assert!(matches!(
            FeatureEffectAnalysis::new(config, Simplifier::none()),
            Err(Error::Setup(_))
        ));
    }

    #[test]
    fn test_setup_accepts_simplification_with_engine() {
        let config = AnalysisConfig {
            simplification: SimplificationMode::FeatureEffects,
            ..AnalysisConfig::default()
        };
        assert!(FeatureEffectAnalysis::new(config, Simplifier::qmc()).is_ok());
    }
}
