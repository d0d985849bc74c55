//! The end-to-end generation pipeline.
//!
//! An explicit bounded state machine rather than recursive retries, so the
//! termination and call-count guarantees are structural:
//!
//! Requesting -> Parsing -> Generating(pass 1) -> Validating -> Resolving ->
//! [Requesting(pass 2) if missing, else Stubbing] -> Resolving(final) ->
//! Stubbing(remaining) -> Assembling -> Done
//!
//! Exactly one second generation pass is attempted; whatever is still
//! missing afterwards is stubbed unconditionally. Total external generator
//! calls are bounded at two per run (payload-extraction retries aside), no
//! matter how many dependencies the generator keeps omitting.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use tracing::{info, warn};

use crate::client::GenerationClient;
use crate::error::{AgentError, RunSummary, Warning};
use crate::finalize;
use crate::prompts;
use crate::resolve;
use crate::spec::{ArtifactSpec, GenerationRequest};
use crate::store::Workspace;
use crate::stub;
use crate::validate::{self, DEFAULT_MAX_ATTEMPTS};

/// Pipeline phases, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Requesting,
    Parsing,
    Generating,
    Validating,
    Resolving,
    Stubbing,
    Assembling,
    Done,
}

pub struct Orchestrator {
    client: GenerationClient,
    /// Validation attempt budget per artifact.
    max_validation_attempts: usize,
    /// Extra generation passes for missing dependencies.
    extra_passes: u32,
}

impl Orchestrator {
    pub fn new(client: GenerationClient) -> Self {
        Self {
            client,
            max_validation_attempts: DEFAULT_MAX_ATTEMPTS,
            extra_passes: 1,
        }
    }

    /// Run the full pipeline against a workspace. Fatal errors abort the
    /// run; everything else degrades into warnings on the summary.
    pub async fn run(
        &self,
        store: &Workspace,
        request: &GenerationRequest,
    ) -> Result<RunSummary, AgentError> {
        let system_prompt = prompts::system_prompt(&request.style_hints);
        let user_prompt = prompts::user_prompt(&request.description);
        let mut warnings: Vec<Warning> = Vec::new();
        let mut generated: Vec<String> = Vec::new();

        // Requesting / Parsing: both failures are fatal.
        info!(phase = ?Phase::Requesting, "requesting project spec");
        let spec = self
            .client
            .request_spec(store, &system_prompt, &user_prompt)
            .await?;
        let root = spec.root.clone().ok_or_else(|| {
            AgentError::SpecFormat("generator reply has no root application artifact".to_string())
        })?;

        // Generating(pass 1) / Validating: persist every component in
        // generation order, degraded or not. Duplicate names within one
        // pass are last-write-wins.
        info!(phase = ?Phase::Validating, count = spec.components.len(), "validating components");
        self.persist_components(store, &spec.components, &mut generated, &mut warnings, false)?;

        // Resolving: recompute the reference graph from the persisted
        // files plus the still-unwritten root.
        let root_content = validate_root(&root, self.max_validation_attempts, &mut warnings);
        let mut missing = self.resolve_missing(store, &root, &root_content)?;

        // One bounded second pass, then unconditional stubbing.
        if !missing.is_empty() {
            warn!(phase = ?Phase::Requesting, ?missing, "second generation pass for missing components");
            for _ in 0..self.extra_passes {
                let second = self
                    .client
                    .request_named_spec(store, &missing, &system_prompt, &request.description)
                    .await?;
                // Never shadow an artifact that already exists.
                let fresh: Vec<ArtifactSpec> = second
                    .components
                    .into_iter()
                    .filter(|c| !store.component_exists(&c.name))
                    .collect();
                self.persist_components(store, &fresh, &mut generated, &mut warnings, true)?;
                missing = self.resolve_missing(store, &root, &root_content)?;
                if missing.is_empty() {
                    break;
                }
            }
        }

        // Stubbing(remaining): terminal fallback, never fails.
        info!(phase = ?Phase::Stubbing, count = missing.len());
        let mut stubbed = Vec::new();
        for name in &missing {
            if store.component_exists(name) {
                continue;
            }
            warnings.push(Warning::UnresolvedReference { name: name.clone() });
            warn!(name = %name, "stubbing unresolved component");
            let s = stub::stub(name);
            store.write_component(&s.name, &s.raw_content)?;
            stubbed.push(name.clone());
        }

        // Assembling: the root is rewritten against the genuinely generated
        // names and written exactly once. Stubs satisfy references from
        // other components but are never surfaced in the root.
        info!(phase = ?Phase::Assembling, "assembling root artifact");
        let final_names: HashSet<String> = generated.iter().cloned().collect();
        store.write_root(&finalize::assemble(&root_content, &final_names))?;
        store.scaffold()?;

        for w in &warnings {
            warn!("{}", w);
        }
        info!(phase = ?Phase::Done, project_dir = %store.project_dir().display());

        Ok(RunSummary {
            project_dir: store.project_dir().to_path_buf(),
            generated,
            stubbed,
            warnings,
        })
    }

    /// Validate and persist a batch of components in array order.
    fn persist_components(
        &self,
        store: &Workspace,
        components: &[ArtifactSpec],
        generated: &mut Vec<String>,
        warnings: &mut Vec<Warning>,
        second_pass: bool,
    ) -> Result<(), AgentError> {
        for component in components {
            let outcome = validate::validate_component(component, self.max_validation_attempts);
            if !outcome.ok {
                let error = outcome
                    .last_error
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "unknown grammar error".to_string());
                warnings.push(Warning::ValidationDegraded {
                    name: component.name.clone(),
                    error,
                });
            }
            store.write_component(&component.name, &outcome.content)?;
            if !generated.contains(&component.name) {
                generated.push(component.name.clone());
            }
            if second_pass {
                info!(name = %component.name, "component recovered in second pass");
            }
        }
        Ok(())
    }

    /// Recompute the missing set from scratch: every persisted component is
    /// re-read (references introduced by repair count too) and the pending
    /// root content is included.
    fn resolve_missing(
        &self,
        store: &Workspace,
        root: &ArtifactSpec,
        root_content: &str,
    ) -> Result<BTreeSet<String>, AgentError> {
        let mut contents: BTreeMap<String, String> = store.read_all_components()?;
        contents.insert(root.name.clone(), root_content.to_string());

        let mut known: HashSet<String> = store.list_component_names().into_iter().collect();
        known.insert(root.name.clone());

        Ok(resolve::compute_missing(&contents, &known))
    }
}

/// The root passes through the same validator as any component before
/// assembly; failure degrades rather than aborts.
fn validate_root(
    root: &ArtifactSpec,
    max_attempts: usize,
    warnings: &mut Vec<Warning>,
) -> String {
    let outcome = validate::validate_component(root, max_attempts);
    if !outcome.ok {
        warnings.push(Warning::ValidationDegraded {
            name: root.name.clone(),
            error: outcome
                .last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "unknown grammar error".to_string()),
        });
    }
    outcome.content
}

/// Convenience constructor wiring the pipeline from configuration.
pub fn orchestrator_from_config(config: &crate::config::AgentConfig) -> Orchestrator {
    let client = std::sync::Arc::new(crate::client::OpenAiClient::new(config));
    Orchestrator::new(GenerationClient::new(client))
}
