//! Feature-effect derivation
//!
//! Turns each variable's presence conditions into a feature-effect
//! formula: the condition under which changing that variable changes the
//! compiled result. For presence condition `pc` of variable `v` the
//! per-occurrence effect is `xor(pc[v <- true], pc[v <- false])`; the
//! effects of all occurrences are joined by disjunction, in order.
//!
//! For a value-qualified variable like `A=1`, the positive substitution
//! also sets every sibling `A=<other>` to false, since a multi-valued
//! variable holds exactly one value at a time.
//!
//! Derivation is a pure per-record function, so the threaded variant can
//! fan records out to a worker pool and still emit results in arrival
//! order.

use crate::config::{AnalysisConfig, SimplificationMode};
use crate::error::{Error, Result};
use crate::formula::Formula;
use crate::parallel::OrderPreservingParallelizer;
use crate::pcs::VariableWithPcs;
use crate::simplify::Simplifier;
use regex::Regex;
use std::sync::mpsc::sync_channel;
use std::sync::Arc;
use std::thread;

/// A feature-effect formula for one occurrence context.
///
/// `variable` is either a bare name (`"A"`) or a value-qualified key
/// (`"A=1"`); aggregation groups these by base name later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableWithFeatureEffect {
    pub variable: String,
    pub feature_effect: Formula,
}

impl VariableWithFeatureEffect {
    pub fn new(variable: impl Into<String>, feature_effect: Formula) -> Self {
        VariableWithFeatureEffect {
            variable: variable.into(),
            feature_effect,
        }
    }
}

/// Derives feature effects sequentially
pub struct FeatureEffectFinder {
    simplifier: Simplifier,
    simplify_fes: bool,
    relevant: Option<Regex>,
}

impl FeatureEffectFinder {
    /// Fails if feature-effect simplification is requested without an
    /// engine, or the relevant-variables pattern does not compile.
    pub fn new(config: &AnalysisConfig, simplifier: Simplifier) -> Result<Self> {
        let simplify_fes = config.simplification >= SimplificationMode::FeatureEffects;
        if simplify_fes && !simplifier.is_available() {
            return Err(Error::Setup(
                "feature-effect simplification requested but no simplifier engine is available"
                    .into(),
            ));
        }
        let relevant = match &config.relevant_variables {
            Some(pattern) => Some(Regex::new(pattern)?),
            None => None,
        };
        Ok(FeatureEffectFinder {
            simplifier,
            simplify_fes,
            relevant,
        })
    }

    /// Derive the feature effect for one record.
    ///
    /// Returns `None` when a relevant-variables filter is configured and
    /// the variable does not match it.
    pub fn process_single(&self, record: &VariableWithPcs) -> Option<VariableWithFeatureEffect> {
        if let Some(filter) = &self.relevant {
            if !filter.is_match(&record.variable) {
                return None;
            }
        }

        let effect = build_feature_effect(&record.variable, &record.pcs);
        let effect = if self.simplify_fes {
            self.simplifier.apply(&effect)
        } else {
            effect
        };
        Some(VariableWithFeatureEffect {
            variable: record.variable.clone(),
            feature_effect: effect,
        })
    }

    /// Sequential mode: one record at a time, order trivially preserved
    pub fn find_feature_effects<R>(
        self,
        records: R,
    ) -> impl Iterator<Item = VariableWithFeatureEffect>
    where
        R: IntoIterator<Item = VariableWithPcs>,
    {
        records
            .into_iter()
            .filter_map(move |record| self.process_single(&record))
    }
}

/// Derives feature effects on a worker pool, preserving arrival order.
///
/// Worth using when per-record simplification is expensive; the output
/// contract is identical to [`FeatureEffectFinder`].
pub struct ThreadedFeatureEffectFinder {
    finder: Arc<FeatureEffectFinder>,
    threads: usize,
}

impl ThreadedFeatureEffectFinder {
    pub fn new(config: &AnalysisConfig, simplifier: Simplifier) -> Result<Self> {
        if config.threads < 1 {
            return Err(Error::Setup(format!(
                "number of threads can't be {}",
                config.threads
            )));
        }
        Ok(ThreadedFeatureEffectFinder {
            finder: Arc::new(FeatureEffectFinder::new(config, simplifier)?),
            threads: config.threads,
        })
    }

    /// Drive the records through the parallelizer.
    ///
    /// The returned iterator yields lazily while a driver thread feeds
    /// the pool behind bounded backpressure.
    pub fn find_feature_effects<R>(
        &self,
        records: R,
    ) -> Result<impl Iterator<Item = VariableWithFeatureEffect>>
    where
        R: IntoIterator<Item = VariableWithPcs> + Send + 'static,
        R::IntoIter: Send,
    {
        let (out_tx, out_rx) = sync_channel(self.threads * 2);
        let finder = Arc::clone(&self.finder);

        let mut parallelizer = OrderPreservingParallelizer::new(
            self.threads,
            move |record: VariableWithPcs| finder.process_single(&record),
            move |result: Option<VariableWithFeatureEffect>| {
                if let Some(effect) = result {
                    // A closed receiver means downstream gave up early
                    let _ = out_tx.send(effect);
                }
            },
        )?;

        thread::Builder::new()
            .name("fefinder-driver".into())
            .spawn(move || {
                for record in records {
                    parallelizer.add(record);
                }
                parallelizer.join();
            })
            .map_err(|e| Error::Setup(format!("could not spawn driver: {e}")))?;

        Ok(out_rx.into_iter())
    }
}

/// Disjunction of per-occurrence effects, in presence-condition order
fn build_feature_effect(variable: &str, pcs: &[Formula]) -> Formula {
    let mut result: Option<Formula> = None;
    for pc in pcs {
        let part = effect_for_pc(variable, pc);
        result = Some(match result {
            None => part,
            Some(acc) => Formula::or(acc, part),
        });
    }
    result.unwrap_or(Formula::False)
}

/// `xor(pc[v <- true], pc[v <- false])` with a structural-equality
/// short-circuit: a presence condition the variable cannot flip
/// contributes `False`.
fn effect_for_pc(variable: &str, pc: &Formula) -> Formula {
    let base = value_qualified_base(variable);
    let when_set = pc.substitute_with(&|name| positive_assignment(variable, base, name));
    let when_unset = pc.substitute(variable, false);

    if when_set == when_unset {
        return Formula::False;
    }
    Formula::or(
        Formula::and(when_set.clone(), Formula::not(when_unset.clone())),
        Formula::and(Formula::not(when_set), when_unset),
    )
}

/// Base name of a value-qualified variable, `None` for bare names
fn value_qualified_base(variable: &str) -> Option<&str> {
    variable.split_once('=').map(|(base, _)| base)
}

/// Positive substitution: the variable itself becomes true; for a
/// value-qualified variable, each sibling `base=<other>` becomes false.
/// Base-name matching is exact, never a prefix match.
fn positive_assignment(variable: &str, base: Option<&str>, name: &str) -> Option<bool> {
    if name == variable {
        return Some(true);
    }
    if let Some(base) = base {
        if let Some(rest) = name.strip_prefix(base) {
            if rest.starts_with('=') {
                return Some(false);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn finder() -> FeatureEffectFinder {
        FeatureEffectFinder::new(&AnalysisConfig::default(), Simplifier::none()).unwrap()
    }

    fn effect_of(finder: &FeatureEffectFinder, record: VariableWithPcs) -> Formula {
        finder.process_single(&record).unwrap().feature_effect
    }

    #[test]
    fn test_effect_under_enclosing_condition() {
        // X referenced under A && X: flipping X matters only when A holds
        let pc = Formula::And(vec![Formula::var("A"), Formula::var("X")]);
        let fe = effect_of(&finder(), VariableWithPcs::new("X", vec![pc]));
        assert_eq!(fe, Formula::var("A"));
    }

    #[test]
    fn test_unmentioned_variable_has_no_effect() {
        let pc = Formula::var("A");
        let fe = effect_of(&finder(), VariableWithPcs::new("X", vec![pc]));
        assert_eq!(fe, Formula::False);
    }

    #[test]
    fn test_multiple_pcs_join_by_disjunction_in_order() {
        let pcs = vec![
            Formula::And(vec![Formula::var("A"), Formula::var("X")]),
            Formula::And(vec![Formula::var("B"), Formula::var("X")]),
        ];
        let fe = effect_of(&finder(), VariableWithPcs::new("X", pcs));
        assert_eq!(fe, Formula::Or(vec![Formula::var("A"), Formula::var("B")]));
    }

    #[test]
    fn test_value_qualified_siblings_set_false() {
        // pc references both X=1 and X=2; with X=1 set, X=2 cannot hold
        let pc = Formula::And(vec![
            Formula::var("A"),
            Formula::Or(vec![Formula::var("X=1"), Formula::var("X=2")]),
        ]);
        let fe = effect_of(&finder(), VariableWithPcs::new("X=1", vec![pc]));
        // when_set: A, when_unset: A && X=2
        let expected = Formula::Or(vec![
            Formula::And(vec![
                Formula::var("A"),
                Formula::not(Formula::And(vec![Formula::var("A"), Formula::var("X=2")])),
            ]),
            Formula::And(vec![
                Formula::not(Formula::var("A")),
                Formula::And(vec![Formula::var("A"), Formula::var("X=2")]),
            ]),
        ]);
        assert_eq!(fe, expected);
    }

    #[test]
    fn test_sibling_matching_is_exact_not_prefix() {
        // XX=1 is not a sibling of X=1
        let pc = Formula::And(vec![Formula::var("XX=1"), Formula::var("X=1")]);
        let fe = effect_of(&finder(), VariableWithPcs::new("X=1", vec![pc]));
        assert_eq!(fe, Formula::var("XX=1"));
    }

    #[test]
    fn test_relevant_variables_filter() {
        let config = AnalysisConfig {
            relevant_variables: Some("^CONFIG_".into()),
            ..AnalysisConfig::default()
        };
        let finder = FeatureEffectFinder::new(&config, Simplifier::none()).unwrap();

        let record = VariableWithPcs::new("OTHER", vec![Formula::var("A")]);
        assert_eq!(finder.process_single(&record), None);

        let record = VariableWithPcs::new("CONFIG_X", vec![Formula::var("A")]);
        assert!(finder.process_single(&record).is_some());
    }

    #[test]
    fn test_simplification_requires_engine() {
        let config = AnalysisConfig {
            simplification: SimplificationMode::FeatureEffects,
            ..AnalysisConfig::default()
        };
        assert!(FeatureEffectFinder::new(&config, Simplifier::none()).is_err());
    }

    #[test]
    fn test_threaded_matches_sequential_order() {
        let records: Vec<VariableWithPcs> = (0..40)
            .map(|i| {
                VariableWithPcs::new(
                    format!("X{i}"),
                    vec![Formula::And(vec![
                        Formula::var(format!("G{i}")),
                        Formula::var(format!("X{i}")),
                    ])],
                )
            })
            .collect();

        let config = AnalysisConfig::default();
        let sequential: Vec<_> = FeatureEffectFinder::new(&config, Simplifier::none())
            .unwrap()
            .find_feature_effects(records.clone())
            .collect();
        let threaded: Vec<_> = ThreadedFeatureEffectFinder::new(&config, Simplifier::none())
            .unwrap()
            .find_feature_effects(records)
            .unwrap()
            .collect();

        assert_eq!(threaded, sequential);
    }
}
