//! Error taxonomy for the generation pipeline.
//!
//! Fatal conditions abort the run and map to a non-zero exit code. Everything
//! else degrades gracefully and is carried as a [`Warning`] on the final
//! [`RunSummary`] so that no condition is silently dropped.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Fatal pipeline errors. Any of these terminates the run.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The external generator call failed, or returned no extractable
    /// payload even after the single direct-instruction retry.
    #[error("generation failed: {0}")]
    Generation(String),

    /// A payload was extracted but no valid project spec could be parsed
    /// from it.
    #[error("spec format error: {0}")]
    SpecFormat(String),

    /// Workspace I/O failure.
    #[error("workspace I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Non-fatal conditions surfaced on the run summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// The grammar check still failed after the repair attempts were
    /// exhausted; the component was persisted with its best content.
    ValidationDegraded { name: String, error: String },
    /// A referenced component was still missing after the second generation
    /// pass and was resolved by stubbing.
    UnresolvedReference { name: String },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::ValidationDegraded { name, error } => {
                write!(f, "component {} persisted with unrepaired grammar error: {}", name, error)
            }
            Warning::UnresolvedReference { name } => {
                write!(f, "component {} was never generated; stub written", name)
            }
        }
    }
}

/// Outcome of a completed run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub project_dir: PathBuf,
    /// Names of components genuinely produced by the generator, in
    /// persistence order.
    pub generated: Vec<String>,
    /// Names resolved by placeholder synthesis.
    pub stubbed: Vec<String>,
    pub warnings: Vec<Warning>,
}

impl RunSummary {
    /// True when the run completed without any degraded artifacts or stubs.
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty() && self.stubbed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warning_display_names_the_component() {
        let w = Warning::UnresolvedReference {
            name: "Sidebar".to_string(),
        };
        assert!(w.to_string().contains("Sidebar"));
    }
}
