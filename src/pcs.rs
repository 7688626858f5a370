//! Presence-condition extraction
//!
//! Walks conditional code-element trees and computes, per configuration
//! variable, the presence condition of every occurrence: the conjunction
//! of all guards enclosing the reference, root to leaf. All occurrences
//! of one variable inside one source unit accumulate into a single
//! [`VariableWithPcs`] record, emitted in first-occurrence order.

use crate::config::{AnalysisConfig, SimplificationMode};
use crate::error::{Error, Result};
use crate::formula::Formula;
use crate::simplify::Simplifier;
use crate::source::{CodeElement, SourceUnit, MAX_NESTING_DEPTH};
use std::collections::HashMap;

/// One variable with the presence conditions of all its occurrences in
/// one source unit, in traversal order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableWithPcs {
    pub variable: String,
    pub pcs: Vec<Formula>,
}

impl VariableWithPcs {
    pub fn new(variable: impl Into<String>, pcs: Vec<Formula>) -> Self {
        VariableWithPcs {
            variable: variable.into(),
            pcs,
        }
    }
}

/// Extracts presence conditions from source units
pub struct PcFinder {
    simplifier: Simplifier,
    simplify_pcs: bool,
}

impl PcFinder {
    /// Fails if presence-condition simplification is requested but the
    /// simplifier handle carries no engine.
    pub fn new(config: &AnalysisConfig, simplifier: Simplifier) -> Result<Self> {
        let simplify_pcs = config.simplification >= SimplificationMode::PresenceConditions;
        if simplify_pcs && !simplifier.is_available() {
            return Err(Error::Setup(
                "presence-condition simplification requested but no simplifier engine is available"
                    .into(),
            ));
        }
        Ok(PcFinder {
            simplifier,
            simplify_pcs,
        })
    }

    /// Lazily walk the given units.
    ///
    /// A malformed unit is logged and skipped; later units still produce
    /// results.
    pub fn find_in<U>(self, units: U) -> impl Iterator<Item = VariableWithPcs>
    where
        U: IntoIterator<Item = SourceUnit>,
    {
        units
            .into_iter()
            .flat_map(move |unit| self.find_in_unit(&unit))
    }

    /// Extract all records of one unit; empty if the unit is malformed
    pub fn find_in_unit(&self, unit: &SourceUnit) -> Vec<VariableWithPcs> {
        let unit_name = unit.path.display().to_string();
        let mut order: Vec<String> = Vec::new();
        let mut pcs_by_var: HashMap<String, Vec<Formula>> = HashMap::new();

        for element in &unit.elements {
            if let Err(err) = self.walk(
                &unit_name,
                element,
                &Formula::True,
                0,
                &mut order,
                &mut pcs_by_var,
            ) {
                log::error!("skipping source unit: {err}");
                return Vec::new();
            }
        }

        log::debug!(
            "extracted presence conditions for {} variables from {unit_name}",
            order.len()
        );
        order
            .into_iter()
            .map(|variable| {
                let pcs = pcs_by_var.remove(&variable).unwrap_or_default();
                VariableWithPcs { variable, pcs }
            })
            .collect()
    }

    fn walk(
        &self,
        unit_name: &str,
        element: &CodeElement,
        enclosing: &Formula,
        depth: usize,
        order: &mut Vec<String>,
        pcs_by_var: &mut HashMap<String, Vec<Formula>>,
    ) -> Result<()> {
        if depth > MAX_NESTING_DEPTH {
            return Err(Error::MalformedUnit {
                unit: unit_name.to_string(),
                reason: format!("element nesting exceeds {MAX_NESTING_DEPTH}"),
            });
        }

        let pc = Formula::and(enclosing.clone(), element.condition.clone());
        let pc = if self.simplify_pcs {
            self.simplifier.apply(&pc)
        } else {
            pc
        };

        for variable in &element.variables {
            let occurrences = pcs_by_var.entry(variable.clone()).or_insert_with(|| {
                order.push(variable.clone());
                Vec::new()
            });
            // One entry per distinct condition, first-seen order
            if !occurrences.contains(&pc) {
                occurrences.push(pc.clone());
            }
        }

        for child in &element.children {
            self.walk(unit_name, child, &pc, depth + 1, order, pcs_by_var)?;
        }
        Ok(())
    }
}
