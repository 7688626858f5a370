//! Cross-occurrence aggregation
//!
//! Merges the ordered stream of per-context feature effects into one
//! formula per base variable. The base name is everything before the
//! first `=` of the key; `"A=0"` and `"A=1"` and a bare `"A"` all land in
//! the same group, while `"AA=0"` never does — grouping compares base
//! names for full equality, not by prefix.
//!
//! Formulas of one group are joined by disjunction without
//! deduplication: the first two arrivals form one disjunction, and each
//! later arrival wraps the accumulated result as the outer left
//! operand, so `[B, C, D]` joins to `D || (B || C)`. Groups are emitted
//! in the order their first entry arrived.

use crate::config::{AnalysisConfig, SimplificationMode};
use crate::error::{Error, Result};
use crate::fes::VariableWithFeatureEffect;
use crate::formula::Formula;
use crate::simplify::Simplifier;
use std::collections::{HashMap, VecDeque};

/// The aggregated feature effect of one base variable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatedFeatureEffect {
    pub variable: String,
    pub feature_effect: Formula,
}

impl AggregatedFeatureEffect {
    pub fn new(variable: impl Into<String>, feature_effect: Formula) -> Self {
        AggregatedFeatureEffect {
            variable: variable.into(),
            feature_effect,
        }
    }
}

/// Groups per-context feature effects by base variable
pub struct FeAggregator {
    simplifier: Simplifier,
    simplify_results: bool,
}

impl FeAggregator {
    /// Fails if result simplification is requested but the simplifier
    /// handle carries no engine.
    pub fn new(config: &AnalysisConfig, simplifier: Simplifier) -> Result<Self> {
        let simplify_results = config.simplification >= SimplificationMode::FeatureEffects;
        if simplify_results && !simplifier.is_available() {
            return Err(Error::Setup(
                "result simplification requested but no simplifier engine is available".into(),
            ));
        }
        Ok(FeAggregator {
            simplifier,
            simplify_results,
        })
    }

    /// Aggregate the stream.
    ///
    /// The upstream is drained on the first `next()` call (grouping needs
    /// the whole stream); the returned iterator is finite and
    /// non-restartable.
    pub fn aggregate<S>(self, stream: S) -> impl Iterator<Item = AggregatedFeatureEffect>
    where
        S: IntoIterator<Item = VariableWithFeatureEffect>,
    {
        let mut upstream = Some(stream);
        let mut finished: VecDeque<AggregatedFeatureEffect> = VecDeque::new();
        std::iter::from_fn(move || {
            if let Some(stream) = upstream.take() {
                finished = self.drain(stream);
            }
            finished.pop_front()
        })
    }

    fn drain<S>(&self, stream: S) -> VecDeque<AggregatedFeatureEffect>
    where
        S: IntoIterator<Item = VariableWithFeatureEffect>,
    {
        let mut order: Vec<String> = Vec::new();
        let mut groups: HashMap<String, Vec<Formula>> = HashMap::new();

        for entry in stream {
            let base = base_name(&entry.variable);
            groups
                .entry(base.to_string())
                .or_insert_with_key(|key| {
                    order.push(key.clone());
                    Vec::new()
                })
                .push(entry.feature_effect);
        }

        log::debug!("aggregated {} base variables", order.len());
        order
            .into_iter()
            .map(|variable| {
                let formulas = groups.remove(&variable).unwrap_or_default();
                let combined = join_contexts(formulas);
                let combined = if self.simplify_results {
                    self.simplifier.apply(&combined)
                } else {
                    combined
                };
                AggregatedFeatureEffect {
                    variable,
                    feature_effect: combined,
                }
            })
            .collect()
    }
}

/// Join the formulas of one group.
///
/// A single context passes through unwrapped. The first two contexts
/// form one disjunction in arrival order; every later context becomes
/// the outer left operand of a new disjunction around the accumulated
/// result. No folding and no deduplication happens here.
fn join_contexts(formulas: Vec<Formula>) -> Formula {
    let mut contexts = formulas.into_iter();
    let first = match contexts.next() {
        Some(f) => f,
        None => return Formula::False,
    };
    let mut joined = match contexts.next() {
        Some(second) => Formula::Or(vec![first, second]),
        None => return first,
    };
    for next in contexts {
        joined = Formula::Or(vec![next, joined]);
    }
    joined
}

/// Key substring before the first `=`, or the whole key without one.
///
/// A key whose value part contains a further `=` is suspicious (the
/// variable name itself may contain `=`); it is flagged, and the first
/// `=` still splits.
fn base_name(key: &str) -> &str {
    match key.split_once('=') {
        Some((base, value)) => {
            if value.contains('=') {
                log::warn!(
                    "key {key:?} contains more than one '='; \
                     treating {base:?} as the variable name"
                );
            }
            base
        }
        None => key,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn aggregator() -> FeAggregator {
        FeAggregator::new(&AnalysisConfig::default(), Simplifier::none()).unwrap()
    }

    #[test]
    fn test_base_name_split() {
        assert_eq!(base_name("A"), "A");
        assert_eq!(base_name("A=0"), "A");
        assert_eq!(base_name("A=B=1"), "A");
        assert_eq!(base_name("AA=1"), "AA");
    }

    #[test]
    fn test_single_context_passes_through_unwrapped() {
        let ag = aggregator();
        let results: Vec<_> = ag
            .aggregate(vec![VariableWithFeatureEffect::new("A=0", Formula::var("B"))])
            .collect();
        assert_eq!(
            results,
            vec![AggregatedFeatureEffect::new("A", Formula::var("B"))]
        );
    }

    #[test]
    fn test_third_context_wraps_accumulated_disjunction() {
        let ag = aggregator();
        let results: Vec<_> = ag
            .aggregate(vec![
                VariableWithFeatureEffect::new("A", Formula::var("B")),
                VariableWithFeatureEffect::new("A=0", Formula::var("C")),
                VariableWithFeatureEffect::new("A=1", Formula::var("D")),
            ])
            .collect();
        assert_eq!(
            results,
            vec![AggregatedFeatureEffect::new(
                "A",
                Formula::Or(vec![
                    Formula::var("D"),
                    Formula::Or(vec![Formula::var("B"), Formula::var("C")]),
                ]),
            )]
        );
    }

    #[test]
    fn test_lazy_drain_happens_on_first_next() {
        let ag = aggregator();
        let entries = vec![
            VariableWithFeatureEffect::new("A=0", Formula::var("B")),
            VariableWithFeatureEffect::new("A=1", Formula::var("C")),
        ];
        let mut iter = ag.aggregate(entries);
        assert_eq!(
            iter.next(),
            Some(AggregatedFeatureEffect::new(
                "A",
                Formula::Or(vec![Formula::var("B"), Formula::var("C")]),
            ))
        );
        assert_eq!(iter.next(), None);
        assert_eq!(iter.next(), None);
    }
}
