//! Boolean formula values
//!
//! Immutable propositional formulas over named configuration variables.
//! Presence conditions, feature effects, and aggregated results are all
//! expressed with this one type. Equality is structural; nothing here
//! deduplicates or reorders operands.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A propositional formula over named variables
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Formula {
    /// Constant true
    True,

    /// Constant false
    False,

    /// A configuration variable, referenced by name
    Variable(String),

    /// Negation
    Not(Box<Formula>),

    /// N-ary conjunction (operand order preserved)
    And(Vec<Formula>),

    /// N-ary disjunction (operand order preserved)
    Or(Vec<Formula>),
}

impl Formula {
    /// Variable reference
    pub fn var(name: impl Into<String>) -> Formula {
        Formula::Variable(name.into())
    }

    /// Negation, folding constants and double negation
    pub fn not(operand: Formula) -> Formula {
        match operand {
            Formula::True => Formula::False,
            Formula::False => Formula::True,
            Formula::Not(inner) => *inner,
            f => Formula::Not(Box::new(f)),
        }
    }

    /// Binary conjunction; `True` is dropped, `False` dominates
    pub fn and(lhs: Formula, rhs: Formula) -> Formula {
        match (lhs, rhs) {
            (Formula::False, _) | (_, Formula::False) => Formula::False,
            (Formula::True, f) | (f, Formula::True) => f,
            (a, b) => Formula::And(vec![a, b]),
        }
    }

    /// Binary disjunction; `False` is dropped, `True` dominates
    pub fn or(lhs: Formula, rhs: Formula) -> Formula {
        match (lhs, rhs) {
            (Formula::True, _) | (_, Formula::True) => Formula::True,
            (Formula::False, f) | (f, Formula::False) => f,
            (a, b) => Formula::Or(vec![a, b]),
        }
    }

    /// Literal n-ary disjunction over the given operands, in order.
    ///
    /// No folding and no deduplication: `[C, C]` yields `C || C`. An empty
    /// list yields `False`, a single operand is returned unchanged.
    pub fn or_all(mut operands: Vec<Formula>) -> Formula {
        match operands.len() {
            0 => Formula::False,
            1 => operands.pop().unwrap_or(Formula::False),
            _ => Formula::Or(operands),
        }
    }

    /// Literal n-ary conjunction over the given operands, in order.
    ///
    /// An empty list yields `True`, a single operand is returned unchanged.
    pub fn and_all(mut operands: Vec<Formula>) -> Formula {
        match operands.len() {
            0 => Formula::True,
            1 => operands.pop().unwrap_or(Formula::True),
            _ => Formula::And(operands),
        }
    }

    /// Evaluate under an assignment; unassigned variables read as `false`
    pub fn evaluate(&self, assignment: &HashMap<String, bool>) -> bool {
        match self {
            Formula::True => true,
            Formula::False => false,
            Formula::Variable(name) => assignment.get(name).copied().unwrap_or(false),
            Formula::Not(inner) => !inner.evaluate(assignment),
            Formula::And(operands) => operands.iter().all(|f| f.evaluate(assignment)),
            Formula::Or(operands) => operands.iter().any(|f| f.evaluate(assignment)),
        }
    }

    /// Names of all referenced variables, in first-occurrence order
    pub fn variables(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_variables(&mut out);
        out
    }

    fn collect_variables(&self, out: &mut Vec<String>) {
        match self {
            Formula::True | Formula::False => {}
            Formula::Variable(name) => {
                if !out.iter().any(|v| v == name) {
                    out.push(name.clone());
                }
            }
            Formula::Not(inner) => inner.collect_variables(out),
            Formula::And(operands) | Formula::Or(operands) => {
                for f in operands {
                    f.collect_variables(out);
                }
            }
        }
    }

    /// Replace one variable by a constant and fold the result
    pub fn substitute(&self, name: &str, value: bool) -> Formula {
        self.substitute_with(&|v| if v == name { Some(value) } else { None })
    }

    /// Replace every variable for which `lookup` returns a constant, then
    /// constant-fold the surrounding structure (`!True` -> `False`, a
    /// `False` conjunct collapses the conjunction, `True` conjuncts are
    /// dropped, dually for disjunctions).
    pub fn substitute_with<F>(&self, lookup: &F) -> Formula
    where
        F: Fn(&str) -> Option<bool>,
    {
        match self {
            Formula::True => Formula::True,
            Formula::False => Formula::False,
            Formula::Variable(name) => match lookup(name) {
                Some(true) => Formula::True,
                Some(false) => Formula::False,
                None => Formula::Variable(name.clone()),
            },
            Formula::Not(inner) => Formula::not(inner.substitute_with(lookup)),
            Formula::And(operands) => {
                let mut kept = Vec::with_capacity(operands.len());
                for f in operands {
                    match f.substitute_with(lookup) {
                        Formula::True => {}
                        Formula::False => return Formula::False,
                        folded => kept.push(folded),
                    }
                }
                Formula::and_all(kept)
            }
            Formula::Or(operands) => {
                let mut kept = Vec::with_capacity(operands.len());
                for f in operands {
                    match f.substitute_with(lookup) {
                        Formula::False => {}
                        Formula::True => return Formula::True,
                        folded => kept.push(folded),
                    }
                }
                Formula::or_all(kept)
            }
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            Formula::Or(_) => 0,
            Formula::And(_) => 1,
            Formula::Not(_) => 2,
            Formula::True | Formula::False | Formula::Variable(_) => 3,
        }
    }

    fn fmt_operand(&self, parent: u8, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.precedence() < parent {
            write!(f, "({self})")
        } else {
            write!(f, "{self}")
        }
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Formula::True => write!(f, "true"),
            Formula::False => write!(f, "false"),
            Formula::Variable(name) => write!(f, "{name}"),
            Formula::Not(inner) => {
                write!(f, "!")?;
                inner.fmt_operand(2, f)
            }
            Formula::And(operands) => {
                for (i, op) in operands.iter().enumerate() {
                    if i > 0 {
                        write!(f, " && ")?;
                    }
                    op.fmt_operand(1, f)?;
                }
                Ok(())
            }
            Formula::Or(operands) => {
                for (i, op) in operands.iter().enumerate() {
                    if i > 0 {
                        write!(f, " || ")?;
                    }
                    op.fmt_operand(0, f)?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn assignment(pairs: &[(&str, bool)]) -> HashMap<String, bool> {
        pairs.iter().map(|(n, v)| (n.to_string(), *v)).collect()
    }

    #[test]
    fn test_display_precedence() {
        let f = Formula::or(
            Formula::and(Formula::var("A"), Formula::not(Formula::var("B"))),
            Formula::var("C"),
        );
        assert_eq!(f.to_string(), "A && !B || C");

        let g = Formula::and(
            Formula::or(Formula::var("A"), Formula::var("B")),
            Formula::var("C"),
        );
        assert_eq!(g.to_string(), "(A || B) && C");

        let h = Formula::not(Formula::and(Formula::var("A"), Formula::var("B")));
        assert_eq!(h.to_string(), "!(A && B)");
    }

    #[test]
    fn test_constructors_fold_constants() {
        assert_eq!(Formula::and(Formula::True, Formula::var("A")), Formula::var("A"));
        assert_eq!(Formula::and(Formula::False, Formula::var("A")), Formula::False);
        assert_eq!(Formula::or(Formula::False, Formula::var("A")), Formula::var("A"));
        assert_eq!(Formula::or(Formula::True, Formula::var("A")), Formula::True);
        assert_eq!(Formula::not(Formula::not(Formula::var("A"))), Formula::var("A"));
    }

    #[test]
    fn test_or_all_keeps_duplicates() {
        let f = Formula::or_all(vec![Formula::var("C"), Formula::var("C")]);
        assert_eq!(f, Formula::Or(vec![Formula::var("C"), Formula::var("C")]));
    }

    #[test]
    fn test_evaluate() {
        let f = Formula::or(
            Formula::and(Formula::var("A"), Formula::var("B")),
            Formula::not(Formula::var("C")),
        );
        assert!(f.evaluate(&assignment(&[("A", true), ("B", true), ("C", true)])));
        assert!(!f.evaluate(&assignment(&[("A", true), ("B", false), ("C", true)])));
        assert!(f.evaluate(&assignment(&[("C", false)])));
    }

    #[test]
    fn test_substitute_folds() {
        let f = Formula::and(
            Formula::var("A"),
            Formula::or(Formula::var("B"), Formula::var("C")),
        );
        assert_eq!(f.substitute("A", true), Formula::Or(vec![Formula::var("B"), Formula::var("C")]));
        assert_eq!(f.substitute("A", false), Formula::False);
        assert_eq!(
            f.substitute("B", false),
            Formula::And(vec![Formula::var("A"), Formula::var("C")])
        );
    }

    #[test]
    fn test_variables_first_occurrence_order() {
        let f = Formula::or(
            Formula::and(Formula::var("B"), Formula::var("A")),
            Formula::var("B"),
        );
        assert_eq!(f.variables(), vec!["B".to_string(), "A".to_string()]);
    }
}
