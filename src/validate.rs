//! Bounded validate-repair loop for generated components.
//!
//! A component either converges to a grammatically valid form within the
//! attempt budget or comes back `ok = false` with its best content and the
//! last grammar error. Degraded output is preferred over silent omission;
//! the caller persists it and records the warning.

use tracing::{debug, warn};

use crate::balance;
use crate::parse::{self, GrammarError};
use crate::spec::ArtifactSpec;

/// Default attempt budget, an explicit parameter rather than ambient state.
pub const DEFAULT_MAX_ATTEMPTS: usize = 3;

/// Result of validating one component.
#[derive(Debug, Clone)]
pub struct ValidationOutcome {
    pub ok: bool,
    /// Best available content: repaired when validation succeeded, the last
    /// attempt otherwise.
    pub content: String,
    pub last_error: Option<GrammarError>,
}

/// Validate an artifact, repairing its template section between attempts.
///
/// Generator fences are stripped and import paths normalized up front, then
/// the grammar check runs up to `max_attempts` times with a balancing pass
/// on the template fragment after each failure. When no template section is
/// extractable there is nothing to repair and the loop stops immediately.
pub fn validate_component(artifact: &ArtifactSpec, max_attempts: usize) -> ValidationOutcome {
    let mut content =
        parse::normalize_import_paths(&crate::spec::strip_code_fences(&artifact.raw_content));
    let mut last_error: Option<GrammarError> = None;

    for attempt in 1..=max_attempts {
        match parse::check_grammar(&content) {
            Ok(()) => {
                return ValidationOutcome {
                    ok: true,
                    content,
                    last_error: None,
                };
            }
            Err(err) => {
                debug!(name = %artifact.name, attempt, error = %err, "grammar check failed");
                last_error = Some(err);

                let Some(fragment) = parse::extract_template(&content) else {
                    break;
                };
                let outcome = balance::balance(&fragment);
                if outcome.was_modified {
                    warn!(
                        name = %artifact.name,
                        attempt,
                        "repaired tag nesting in template section"
                    );
                }
                content = parse::splice_template(&content, &outcome.repaired);
            }
        }
    }

    ValidationOutcome {
        ok: false,
        content,
        last_error,
    }
}
