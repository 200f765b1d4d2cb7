//! Registry-mutation phase of the bootstrap orchestrator.
//!
//! # Responsibility
//! - Invoke every registry mutator exactly once, honoring precedence tiers.
//! - Keep discovering mutators registered by earlier mutators until a
//!   discovery round finds nothing new.
//! - Run finalize hooks once mutation has settled.
//!
//! # Invariants
//! - Supplied extensions run before any registry-discovered extension.
//! - An identity recorded in the processed set is never invoked again by the
//!   same invoker.
//! - A registry without a mutation surface gets finalize hooks for the
//!   supplied extensions only, with no discovery queries.

use crate::bootstrap::error::{BootstrapError, Phase};
use crate::bootstrap::processed::ProcessedSet;
use crate::extension::capability::Capability;
use crate::extension::contract::{finalize_extension, Extension};
use crate::extension::precedence::{sort_by_precedence, HasPrecedence, Precedence, Tier};
use crate::registry::{DefinitionRegistry, RegistryError};
use log::{debug, error, info, warn};
use serde::Serialize;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// Extension handed to the invoker directly instead of through the registry.
#[derive(Clone)]
pub struct SuppliedExtension {
    pub name: String,
    pub extension: Arc<dyn Extension>,
}

impl SuppliedExtension {
    pub fn new(name: impl Into<String>, extension: Arc<dyn Extension>) -> Self {
        Self {
            name: name.into(),
            extension,
        }
    }
}

impl Debug for SuppliedExtension {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SuppliedExtension")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Registry-discovered extension ready to be ordered.
#[derive(Clone)]
pub(crate) struct Candidate {
    pub(crate) name: String,
    pub(crate) precedence: Precedence,
    pub(crate) extension: Arc<dyn Extension>,
}

impl HasPrecedence for Candidate {
    fn precedence(&self) -> Precedence {
        self.precedence
    }
}

/// Outcome of one mutation-phase call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MutationSummary {
    pub run_id: Uuid,
    /// Mutation hooks in invocation order.
    pub mutated: Vec<String>,
    /// Finalize hooks in invocation order.
    pub finalized: Vec<String>,
    /// Fixed-point rounds that found at least one new mutator.
    pub discovery_rounds: usize,
    pub degraded: bool,
}

/// Orchestrator state for one container bootstrap.
///
/// Create one invoker per bootstrap; its processed set is what makes repeated
/// calls on a settled registry invoke nothing.
#[derive(Debug)]
pub struct ExtensionInvoker {
    run_id: Uuid,
    pub(crate) processed: ProcessedSet,
    pub(crate) pipeline_built: bool,
}

impl Default for ExtensionInvoker {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtensionInvoker {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            processed: ProcessedSet::new(),
            pipeline_built: false,
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Identities handled by the mutation phase so far.
    pub fn processed(&self) -> &ProcessedSet {
        &self.processed
    }

    /// Runs registry mutators and finalizers.
    ///
    /// # Errors
    /// - Returns the first hook or registry failure; the remaining hooks of
    ///   the run are not invoked.
    pub fn run_registry_mutation_phase(
        &mut self,
        registry: &mut dyn DefinitionRegistry,
        supplied: &[SuppliedExtension],
    ) -> Result<MutationSummary, BootstrapError> {
        let started_at = Instant::now();
        info!(
            "event=mutation_phase module=bootstrap status=start run_id={} supplied={}",
            self.run_id,
            supplied.len()
        );

        let result = if registry.as_mutable().is_some() {
            self.run_with_mutable_registry(registry, supplied)
        } else {
            self.run_with_degraded_registry(registry, supplied)
        };

        match result {
            Ok(summary) => {
                registry.invalidate_derived_metadata();
                info!(
                    "event=mutation_phase module=bootstrap status=ok run_id={} mutated={} finalized={} rounds={} degraded={} duration_ms={}",
                    self.run_id,
                    summary.mutated.len(),
                    summary.finalized.len(),
                    summary.discovery_rounds,
                    summary.degraded,
                    started_at.elapsed().as_millis()
                );
                Ok(summary)
            }
            Err(err) => {
                error!(
                    "event=mutation_phase module=bootstrap status=error run_id={} duration_ms={} error={}",
                    self.run_id,
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err)
            }
        }
    }

    fn run_with_degraded_registry(
        &mut self,
        registry: &mut dyn DefinitionRegistry,
        supplied: &[SuppliedExtension],
    ) -> Result<MutationSummary, BootstrapError> {
        warn!(
            "event=mutation_phase module=bootstrap status=degraded run_id={} reason=registry_not_mutable",
            self.run_id
        );
        let mut summary = self.summary(true);
        for item in supplied {
            if !self.processed.mark(&item.name) {
                continue;
            }
            self.finalize(registry, &item.name, item.extension.as_ref(), &mut summary)?;
        }
        Ok(summary)
    }

    fn run_with_mutable_registry(
        &mut self,
        registry: &mut dyn DefinitionRegistry,
        supplied: &[SuppliedExtension],
    ) -> Result<MutationSummary, BootstrapError> {
        let mut summary = self.summary(false);
        let mut invoked: Vec<Candidate> = vec![];
        let mut generic: Vec<&SuppliedExtension> = vec![];

        for item in supplied {
            if !self.processed.mark(&item.name) {
                debug!(
                    "event=extension_skip module=bootstrap status=ok run_id={} name={} reason=already_processed",
                    self.run_id, item.name
                );
                continue;
            }
            if item.extension.as_registry_mutator().is_some() {
                let candidate = Candidate {
                    name: item.name.clone(),
                    precedence: Precedence::Untagged,
                    extension: item.extension.clone(),
                };
                self.mutate(registry, &candidate, Phase::SuppliedMutation, &mut summary)?;
                invoked.push(candidate);
            } else {
                generic.push(item);
            }
        }

        let batch = self.collect_mutators(registry, Some(Tier::Priority), Phase::PriorityMutation)?;
        self.mutate_batch(registry, batch, Phase::PriorityMutation, &mut invoked, &mut summary)?;

        let batch = self.collect_mutators(registry, Some(Tier::Ordered), Phase::OrderedMutation)?;
        self.mutate_batch(registry, batch, Phase::OrderedMutation, &mut invoked, &mut summary)?;

        loop {
            let batch = self.collect_mutators(registry, None, Phase::DiscoveryMutation)?;
            if batch.is_empty() {
                break;
            }
            summary.discovery_rounds += 1;
            debug!(
                "event=discovery_round module=bootstrap status=ok run_id={} round={} found={}",
                self.run_id,
                summary.discovery_rounds,
                batch.len()
            );
            self.mutate_batch(registry, batch, Phase::DiscoveryMutation, &mut invoked, &mut summary)?;
        }

        for candidate in &invoked {
            self.finalize(registry, &candidate.name, candidate.extension.as_ref(), &mut summary)?;
        }
        for item in generic {
            self.finalize(registry, &item.name, item.extension.as_ref(), &mut summary)?;
        }

        self.finalize_discovered(registry, &mut summary)?;
        Ok(summary)
    }

    fn summary(&self, degraded: bool) -> MutationSummary {
        MutationSummary {
            run_id: self.run_id,
            degraded,
            ..MutationSummary::default()
        }
    }

    /// Collects unprocessed registry mutators, optionally limited to `tier`,
    /// and returns them ordered.
    fn collect_mutators(
        &mut self,
        registry: &mut dyn DefinitionRegistry,
        tier: Option<Tier>,
        phase: Phase,
    ) -> Result<Vec<Candidate>, BootstrapError> {
        let mut batch = vec![];
        for name in registry.find_extensions(Capability::RegistryMutator) {
            if self.processed.contains(&name) {
                continue;
            }
            if let Some(tier) = tier {
                if !registry.is_tagged(&name, tier) {
                    continue;
                }
            }
            let candidate = instantiate_candidate(registry, &name, phase)?;
            self.processed.mark(&name);
            batch.push(candidate);
        }
        sort_by_precedence(&mut batch);
        Ok(batch)
    }

    fn mutate_batch(
        &self,
        registry: &mut dyn DefinitionRegistry,
        batch: Vec<Candidate>,
        phase: Phase,
        invoked: &mut Vec<Candidate>,
        summary: &mut MutationSummary,
    ) -> Result<(), BootstrapError> {
        for candidate in batch {
            self.mutate(registry, &candidate, phase, summary)?;
            invoked.push(candidate);
        }
        Ok(())
    }

    fn mutate(
        &self,
        registry: &mut dyn DefinitionRegistry,
        candidate: &Candidate,
        phase: Phase,
        summary: &mut MutationSummary,
    ) -> Result<(), BootstrapError> {
        let Some(mutator) = candidate.extension.as_registry_mutator() else {
            return Err(BootstrapError::registry(
                &candidate.name,
                phase,
                RegistryError::CapabilityMismatch {
                    name: candidate.name.clone(),
                    capability: Capability::RegistryMutator,
                },
            ));
        };
        let Some(mutable) = registry.as_mutable() else {
            return Ok(());
        };
        mutator
            .mutate_registry(mutable)
            .map_err(|source| BootstrapError::hook(&candidate.name, phase, source))?;
        debug!(
            "event=extension_invoke module=bootstrap status=ok run_id={} phase={} name={} tier={}",
            self.run_id,
            phase,
            candidate.name,
            candidate.precedence.tier().as_str()
        );
        summary.mutated.push(candidate.name.clone());
        Ok(())
    }

    fn finalize(
        &self,
        registry: &mut dyn DefinitionRegistry,
        name: &str,
        extension: &dyn Extension,
        summary: &mut MutationSummary,
    ) -> Result<(), BootstrapError> {
        match finalize_extension(extension, registry) {
            Some(result) => {
                result.map_err(|source| BootstrapError::hook(name, Phase::Finalization, source))?;
                debug!(
                    "event=extension_finalize module=bootstrap status=ok run_id={} name={}",
                    self.run_id, name
                );
                summary.finalized.push(name.to_string());
            }
            None => warn!(
                "event=extension_finalize module=bootstrap status=skipped run_id={} name={} reason=no_finalize_hook",
                self.run_id, name
            ),
        }
        Ok(())
    }

    /// Finalizes registry-discovered extensions that only implement the
    /// finalize hook, tier by tier.
    fn finalize_discovered(
        &mut self,
        registry: &mut dyn DefinitionRegistry,
        summary: &mut MutationSummary,
    ) -> Result<(), BootstrapError> {
        let mut priority = vec![];
        let mut ordered_names = vec![];
        let mut untagged_names = vec![];
        for name in registry.find_extensions(Capability::Finalizer) {
            if !self.processed.mark(&name) {
                continue;
            }
            if registry.is_tagged(&name, Tier::Priority) {
                priority.push(instantiate_candidate(registry, &name, Phase::Finalization)?);
            } else if registry.is_tagged(&name, Tier::Ordered) {
                ordered_names.push(name);
            } else {
                untagged_names.push(name);
            }
        }

        sort_by_precedence(&mut priority);
        for candidate in &priority {
            self.finalize(registry, &candidate.name, candidate.extension.as_ref(), summary)?;
        }

        let mut ordered = vec![];
        for name in &ordered_names {
            ordered.push(instantiate_candidate(registry, name, Phase::Finalization)?);
        }
        sort_by_precedence(&mut ordered);
        for candidate in &ordered {
            self.finalize(registry, &candidate.name, candidate.extension.as_ref(), summary)?;
        }

        for name in &untagged_names {
            let candidate = instantiate_candidate(registry, name, Phase::Finalization)?;
            self.finalize(registry, &candidate.name, candidate.extension.as_ref(), summary)?;
        }
        Ok(())
    }
}

pub(crate) fn instantiate_candidate(
    registry: &mut dyn DefinitionRegistry,
    name: &str,
    phase: Phase,
) -> Result<Candidate, BootstrapError> {
    let extension = registry
        .instantiate(name)
        .map_err(|source| BootstrapError::registry(name, phase, source))?;
    Ok(Candidate {
        name: name.to_string(),
        precedence: registry.precedence_of(name).unwrap_or_default(),
        extension,
    })
}
