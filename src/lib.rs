// Production-quality lints
#![warn(
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::print_stderr
)]
// Deny truly dangerous patterns
#![deny(clippy::mem_forget)]
// Allow common patterns in library code
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

//! # fefinder — feature-effect analysis for variability-aware code
//!
//! Highly configurable software guards code with nested Boolean
//! conditions. For each configuration variable, fefinder computes a
//! **feature-effect formula**: a Boolean expression over the *other*
//! variables describing when this variable's value actually influences
//! the compiled artifact.
//!
//! The pipeline has three stages:
//!
//! - **Presence conditions** ([`PcFinder`]): walk each source unit's
//!   conditional element tree and conjoin the guards enclosing every
//!   variable reference.
//! - **Feature effects** ([`FeatureEffectFinder`] /
//!   [`ThreadedFeatureEffectFinder`]): per occurrence, the effect is
//!   `xor(pc[v <- true], pc[v <- false])`; occurrences join by
//!   disjunction. Derivation is pure per record, so the threaded variant
//!   fans out to a worker pool and restores arrival order on the way out.
//! - **Aggregation** ([`FeAggregator`]): value-qualified keys (`"A=0"`,
//!   `"A=1"`) merge with their bare base variable into a single formula,
//!   emitted in first-appearance order.
//!
//! Simplification is an optional capability: supply a
//! [`Simplifier`] with an engine (the built-in one minimizes via
//! Quine-McCluskey) and pick a [`SimplificationMode`].
//!
//! ## Quick start
//!
//! ```rust
//! use fefinder::{
//!     AnalysisConfig, CodeElement, FeatureEffectAnalysis, Formula, Simplifier, SourceUnit,
//! };
//!
//! // #if A
//! //   #if X
//! //     ...
//! let unit = SourceUnit::with_elements(
//!     "file1.c",
//!     vec![CodeElement::new(Formula::var("A"))
//!         .containing(CodeElement::new(Formula::var("X")).referencing("X"))],
//! );
//!
//! let analysis =
//!     FeatureEffectAnalysis::new(AnalysisConfig::default(), Simplifier::none())?;
//! for effect in analysis.run(vec![unit])? {
//!     // X only matters when A is enabled: prints "X: A"
//!     println!("{}: {}", effect.variable, effect.feature_effect);
//! }
//! # Ok::<(), fefinder::Error>(())
//! ```

pub mod aggregate;
pub mod analysis;
pub mod config;
pub mod error;
pub mod fes;
pub mod formula;
pub mod parallel;
pub mod pcs;
pub mod simplify;
pub mod source;

pub use aggregate::{AggregatedFeatureEffect, FeAggregator};
pub use analysis::FeatureEffectAnalysis;
pub use config::{AnalysisConfig, SimplificationMode};
pub use error::{Error, Result};
pub use fes::{FeatureEffectFinder, ThreadedFeatureEffectFinder, VariableWithFeatureEffect};
pub use formula::Formula;
pub use parallel::OrderPreservingParallelizer;
pub use pcs::{PcFinder, VariableWithPcs};
pub use simplify::{QmcEngine, Simplifier, SimplifyEngine, SimplifyError};
pub use source::{CodeElement, SourceUnit, MAX_NESTING_DEPTH};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
