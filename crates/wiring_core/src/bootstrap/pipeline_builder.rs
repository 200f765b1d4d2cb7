//! Instance-lifecycle pipeline construction.
//!
//! # Responsibility
//! - Discover every instance hook declared in the registry and append it to
//!   the pipeline in precedence order.
//! - Arm an [`EligibilityChecker`] ahead of the discovered hooks.
//!
//! # Invariants
//! - Pipeline order is: pre-existing entries, checker, `Priority` hooks,
//!   `Ordered` hooks, untagged hooks, then merge-aware hooks moved to the tail.
//! - `Ordered` and untagged hooks are instantiated only after every `Priority`
//!   hook is in the pipeline.

use crate::bootstrap::eligibility::{EligibilityChecker, ELIGIBILITY_CHECKER_NAME};
use crate::bootstrap::error::{BootstrapError, Phase};
use crate::bootstrap::invoker::{instantiate_candidate, Candidate, ExtensionInvoker};
use crate::extension::capability::Capability;
use crate::extension::precedence::{sort_by_precedence, Tier};
use crate::registry::pipeline::Pipeline;
use crate::registry::{DefinitionRegistry, RegistryError};
use log::{debug, info, warn};
use std::sync::Arc;

/// Result of pipeline construction.
#[derive(Debug, Clone)]
pub struct BuiltPipeline {
    /// Pipeline snapshot taken after the last registration.
    pub pipeline: Pipeline,
    pub target_count: usize,
    pub checker: Arc<EligibilityChecker>,
    /// Discovered hooks in registration order, merge-aware re-adds included.
    pub registered: Vec<String>,
}

impl ExtensionInvoker {
    /// Builds the instance-lifecycle pipeline.
    ///
    /// Call once per bootstrap, after the mutation phase. The invoker is
    /// spent afterwards: a second build would arm another checker whose
    /// target the pipeline can never reach.
    ///
    /// # Errors
    /// - [`BootstrapError::PipelineAlreadyBuilt`] when this invoker already
    ///   ran a build, successful or not. The pipeline is left untouched.
    /// - Returns the first instantiation or registration failure.
    pub fn build_instance_lifecycle_pipeline(
        &mut self,
        registry: &mut dyn DefinitionRegistry,
    ) -> Result<BuiltPipeline, BootstrapError> {
        if self.pipeline_built {
            warn!(
                "event=pipeline_build module=bootstrap status=error run_id={} reason=already_built",
                self.run_id()
            );
            return Err(BootstrapError::PipelineAlreadyBuilt(self.run_id().to_string()));
        }
        self.pipeline_built = true;

        let names: Vec<String> = registry
            .find_extensions(Capability::InstanceHook)
            .into_iter()
            .filter(|name| !self.processed.contains(name))
            .collect();

        let target_count = registry.pipeline().len() + 1 + names.len();
        let checker = Arc::new(EligibilityChecker::new(target_count));
        registry
            .add_to_pipeline(ELIGIBILITY_CHECKER_NAME, checker.clone())
            .map_err(|source| {
                BootstrapError::registry(ELIGIBILITY_CHECKER_NAME, Phase::PipelineRegistration, source)
            })?;

        let mut priority = vec![];
        let mut ordered_names = vec![];
        let mut untagged_names = vec![];
        for name in names {
            if registry.is_tagged(&name, Tier::Priority) {
                priority.push(instantiate_hook(registry, &name)?);
            } else if registry.is_tagged(&name, Tier::Ordered) {
                ordered_names.push(name);
            } else {
                untagged_names.push(name);
            }
        }

        let mut registered = vec![];
        let mut merge_aware = vec![];

        sort_by_precedence(&mut priority);
        register_all(registry, &priority, &mut registered, &mut merge_aware)?;

        let mut ordered = vec![];
        for name in &ordered_names {
            ordered.push(instantiate_hook(registry, name)?);
        }
        sort_by_precedence(&mut ordered);
        register_all(registry, &ordered, &mut registered, &mut merge_aware)?;

        let mut untagged = vec![];
        for name in &untagged_names {
            untagged.push(instantiate_hook(registry, name)?);
        }
        register_all(registry, &untagged, &mut registered, &mut merge_aware)?;

        sort_by_precedence(&mut merge_aware);
        register_all(registry, &merge_aware, &mut registered, &mut vec![])?;

        let pipeline = registry.pipeline().clone();
        info!(
            "event=pipeline_build module=bootstrap status=ok run_id={} hooks={} merge_aware={} pipeline_len={} target={}",
            self.run_id(),
            priority.len() + ordered.len() + untagged.len(),
            merge_aware.len(),
            pipeline.len(),
            target_count
        );
        Ok(BuiltPipeline {
            pipeline,
            target_count,
            checker,
            registered,
        })
    }
}

fn instantiate_hook(
    registry: &mut dyn DefinitionRegistry,
    name: &str,
) -> Result<Candidate, BootstrapError> {
    let candidate = instantiate_candidate(registry, name, Phase::PipelineRegistration)?;
    if !candidate.extension.capabilities().contains(Capability::InstanceHook) {
        return Err(BootstrapError::registry(
            name,
            Phase::PipelineRegistration,
            RegistryError::CapabilityMismatch {
                name: name.to_string(),
                capability: Capability::InstanceHook,
            },
        ));
    }
    Ok(candidate)
}

fn register_all(
    registry: &mut dyn DefinitionRegistry,
    batch: &[Candidate],
    registered: &mut Vec<String>,
    merge_aware: &mut Vec<Candidate>,
) -> Result<(), BootstrapError> {
    for candidate in batch {
        registry
            .add_to_pipeline(&candidate.name, candidate.extension.clone())
            .map_err(|source| {
                BootstrapError::registry(&candidate.name, Phase::PipelineRegistration, source)
            })?;
        debug!(
            "event=pipeline_register module=bootstrap status=ok name={} tier={}",
            candidate.name,
            candidate.precedence.tier().as_str()
        );
        registered.push(candidate.name.clone());
        if candidate.extension.as_merge_aware().is_some() {
            merge_aware.push(candidate.clone());
        }
    }
    Ok(())
}
