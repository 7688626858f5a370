//! Conditional code-element trees
//!
//! The input side of the analysis: a source unit is a tree of elements
//! where each node carries the Boolean guard under which it is compiled
//! and the configuration variables referenced directly at that nesting
//! level. How such trees are extracted from real source files is the
//! job of an external extractor; this crate only consumes them.

use crate::formula::Formula;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Deeper nesting than this is treated as a malformed unit and skipped.
pub const MAX_NESTING_DEPTH: usize = 256;

/// One parsed source file as a tree of guarded elements
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceUnit {
    /// Path of the originating file (identification and logging only)
    pub path: PathBuf,

    /// Top-level elements
    pub elements: Vec<CodeElement>,
}

impl SourceUnit {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        SourceUnit {
            path: path.into(),
            elements: Vec::new(),
        }
    }

    pub fn with_elements(path: impl Into<PathBuf>, elements: Vec<CodeElement>) -> Self {
        SourceUnit {
            path: path.into(),
            elements,
        }
    }
}

/// A guarded element inside a source unit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeElement {
    /// The immediate guard of this element (not the accumulated
    /// presence condition; that is computed during extraction)
    pub condition: Formula,

    /// Variables referenced directly at this nesting level, in source order
    pub variables: Vec<String>,

    /// Nested elements
    pub children: Vec<CodeElement>,
}

impl CodeElement {
    /// Element with a guard and no references or children
    pub fn new(condition: Formula) -> Self {
        CodeElement {
            condition,
            variables: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Builder-style: add a variable reference
    pub fn referencing(mut self, variable: impl Into<String>) -> Self {
        self.variables.push(variable.into());
        self
    }

    /// Builder-style: add a nested element
    pub fn containing(mut self, child: CodeElement) -> Self {
        self.children.push(child);
        self
    }
}
