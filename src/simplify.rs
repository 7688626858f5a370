//! Optional formula simplification
//!
//! Simplification is a pluggable capability: components hold a
//! [`Simplifier`] handle that either wraps an engine or is explicitly
//! empty. An engine must be semantics-preserving; a faulting engine call
//! degrades to the unsimplified formula and is logged, never fatal.
//!
//! The built-in [`QmcEngine`] minimizes via Quine-McCluskey. It refuses
//! formulas with too many distinct variables, which surfaces as an
//! ordinary engine fault at the call site.

use crate::formula::Formula;
use quine_mc_cluskey::Bool;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Quine-McCluskey is exponential in the variable count; above this many
/// distinct variables the engine refuses and the caller keeps the input.
pub const QMC_VAR_LIMIT: usize = 16;

/// A failed simplification attempt
#[derive(Error, Debug)]
pub enum SimplifyError {
    #[error("formula has {count} distinct variables, limit is {limit}")]
    TooManyVariables { count: usize, limit: usize },

    #[error("{0}")]
    Engine(String),
}

/// A semantics-preserving formula rewriter.
///
/// Implementations must return a formula with the same truth value as the
/// input under every variable assignment, and must be safe to call from
/// multiple threads at once.
pub trait SimplifyEngine: Send + Sync {
    fn simplify(&self, formula: &Formula) -> Result<Formula, SimplifyError>;
}

/// Handle to an optional simplification engine.
///
/// Cheap to clone and share across worker threads. With no engine,
/// [`Simplifier::apply`] is the identity.
#[derive(Clone)]
pub struct Simplifier {
    engine: Option<Arc<dyn SimplifyEngine>>,
}

impl Simplifier {
    /// Handle without an engine; `apply` returns its input unchanged
    pub fn none() -> Self {
        Simplifier { engine: None }
    }

    /// Handle wrapping the given engine
    pub fn with_engine(engine: Arc<dyn SimplifyEngine>) -> Self {
        Simplifier {
            engine: Some(engine),
        }
    }

    /// Handle wrapping the built-in Quine-McCluskey engine
    pub fn qmc() -> Self {
        Simplifier::with_engine(Arc::new(QmcEngine))
    }

    /// Whether an engine is present
    pub fn is_available(&self) -> bool {
        self.engine.is_some()
    }

    /// Simplify if an engine is present.
    ///
    /// An engine fault is logged and the input is returned unchanged.
    pub fn apply(&self, formula: &Formula) -> Formula {
        match &self.engine {
            None => formula.clone(),
            Some(engine) => match engine.simplify(formula) {
                Ok(simplified) => simplified,
                Err(err) => {
                    log::warn!("simplification failed, keeping original formula: {err}");
                    formula.clone()
                }
            },
        }
    }
}

impl fmt::Debug for Simplifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Simplifier")
            .field("available", &self.is_available())
            .finish()
    }
}

/// Quine-McCluskey minimization engine
pub struct QmcEngine;

impl SimplifyEngine for QmcEngine {
    fn simplify(&self, formula: &Formula) -> Result<Formula, SimplifyError> {
        let names = formula.variables();
        if names.len() > QMC_VAR_LIMIT {
            return Err(SimplifyError::TooManyVariables {
                count: names.len(),
                limit: QMC_VAR_LIMIT,
            });
        }

        // quine_mc_cluskey requires a contiguous term naming scheme
        let index: HashMap<&str, u8> = names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.as_str(), i as u8))
            .collect();

        let bool_expr = to_bool(formula, &index)?;
        let minimal = bool_expr
            .simplify()
            .into_iter()
            .next()
            .ok_or_else(|| SimplifyError::Engine("minimizer returned no forms".into()))?;

        Ok(from_bool(&minimal, &names))
    }
}

fn to_bool(formula: &Formula, index: &HashMap<&str, u8>) -> Result<Bool, SimplifyError> {
    Ok(match formula {
        Formula::True => Bool::True,
        Formula::False => Bool::False,
        Formula::Variable(name) => {
            let term = index
                .get(name.as_str())
                .ok_or_else(|| SimplifyError::Engine(format!("unindexed variable {name}")))?;
            Bool::Term(*term)
        }
        Formula::Not(inner) => Bool::Not(Box::new(to_bool(inner, index)?)),
        Formula::And(operands) => Bool::And(
            operands
                .iter()
                .map(|f| to_bool(f, index))
                .collect::<Result<Vec<_>, _>>()?,
        ),
        Formula::Or(operands) => Bool::Or(
            operands
                .iter()
                .map(|f| to_bool(f, index))
                .collect::<Result<Vec<_>, _>>()?,
        ),
    })
}

fn from_bool(expr: &Bool, names: &[String]) -> Formula {
    match expr {
        Bool::True => Formula::True,
        Bool::False => Formula::False,
        Bool::Term(term) => names
            .get(*term as usize)
            .map(|name| Formula::var(name.as_str()))
            .unwrap_or(Formula::False),
        Bool::Not(inner) => Formula::not(from_bool(inner, names)),
        Bool::And(operands) => {
            Formula::and_all(operands.iter().map(|b| from_bool(b, names)).collect())
        }
        Bool::Or(operands) => {
            Formula::or_all(operands.iter().map(|b| from_bool(b, names)).collect())
        }
    }
}
