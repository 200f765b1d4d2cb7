//! In-memory component registry.
//!
//! # Responsibility
//! - Store component definitions in registration order with a capability
//!   index for discovery.
//! - Create singleton components through their factories and run the
//!   instance-hook pipeline on every created component.
//!
//! # Invariants
//! - A component name resolves to at most one created instance.
//! - Factories that re-enter creation for a component already being created
//!   fail with `CurrentlyInCreation` instead of recursing.
//! - Instance hooks see the definition snapshot cached at first creation
//!   until `invalidate_derived_metadata` drops the cache.

use crate::extension::capability::Capability;
use crate::extension::contract::{Extension, HookError, InitContext};
use crate::extension::precedence::Precedence;
use crate::model::definition::{ComponentDefinition, Role};
use crate::model::instance::Instance;
use crate::registry::pipeline::{Pipeline, PipelineEntry};
use crate::registry::{DefinitionRegistry, InitStage, MutableRegistry, RegistryError};
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

static COMPONENT_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.:#-]*$").expect("valid component name regex")
});

/// Prefix of names the container gives its own pipeline entries.
///
/// Definitions may not use it, so discovery can never instantiate a
/// component under a built-in entry's name.
pub const RESERVED_NAME_PREFIX: &str = "internal.";

/// Returns whether `name` is acceptable as a component name.
pub fn is_valid_component_name(name: &str) -> bool {
    COMPONENT_NAME_RE.is_match(name)
}

/// Registry of component definitions, created singletons, and the pipeline.
#[derive(Debug, Default)]
pub struct ComponentRegistry {
    definitions: BTreeMap<String, ComponentDefinition>,
    registration_order: Vec<String>,
    capability_index: BTreeMap<Capability, Vec<String>>,
    definition_cache: BTreeMap<String, ComponentDefinition>,
    singletons: BTreeMap<String, Instance>,
    in_creation: BTreeSet<String>,
    pipeline: Pipeline,
    metadata_invalidations: usize,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn definition(&self, name: &str) -> Option<&ComponentDefinition> {
        self.definitions.get(name)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Returns the component named `name`, creating it on first request.
    pub fn get_component(&mut self, name: &str) -> Result<Instance, RegistryError> {
        if let Some(instance) = self.singletons.get(name) {
            return Ok(instance.clone());
        }
        if !self.in_creation.insert(name.to_string()) {
            return Err(RegistryError::CurrentlyInCreation(name.to_string()));
        }

        let created = self.create_component(name);
        self.in_creation.remove(name);
        let instance = created?;
        self.singletons.insert(name.to_string(), instance.clone());
        Ok(instance)
    }

    /// Returns the component named `name` downcast to `T`.
    pub fn get_typed<T: std::any::Any + Send + Sync>(
        &mut self,
        name: &str,
    ) -> Result<Option<Arc<T>>, RegistryError> {
        Ok(self.get_component(name)?.downcast::<T>())
    }

    pub fn contains_singleton(&self, name: &str) -> bool {
        self.singletons.contains_key(name)
    }

    pub fn singleton_count(&self) -> usize {
        self.singletons.len()
    }

    /// Drops every created singleton and returns how many were dropped.
    pub fn destroy_singletons(&mut self) -> usize {
        let count = self.singletons.len();
        self.singletons.clear();
        debug!(
            "event=singletons_destroy module=registry status=ok count={}",
            count
        );
        count
    }

    /// Number of `invalidate_derived_metadata` calls so far.
    pub fn metadata_invalidations(&self) -> usize {
        self.metadata_invalidations
    }

    fn cached_definition(&mut self, name: &str) -> Result<ComponentDefinition, RegistryError> {
        if let Some(cached) = self.definition_cache.get(name) {
            return Ok(cached.clone());
        }
        let definition = self
            .definitions
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::NoSuchDefinition(name.to_string()))?;
        self.definition_cache
            .insert(name.to_string(), definition.clone());
        Ok(definition)
    }

    fn create_component(&mut self, name: &str) -> Result<Instance, RegistryError> {
        let definition = self.cached_definition(name)?;
        let factory = definition.factory();
        let instance = factory(self)?;

        for entry in self.pipeline.entries() {
            if let Some(merge_aware) = entry.extension().as_merge_aware() {
                merge_aware
                    .on_definition(&definition)
                    .map_err(|source| hook_error(name, entry, InitStage::Definition, source))?;
            }
        }

        let ctx = InitContext {
            component_name: name,
            role: definition.role(),
            pipeline_len: self.pipeline.len(),
        };

        let mut current = instance;
        for entry in self.pipeline.entries() {
            let Some(hook) = entry.extension().as_instance_hook() else {
                continue;
            };
            match hook
                .before_init(current.clone(), &ctx)
                .map_err(|source| hook_error(name, entry, InitStage::BeforeInit, source))?
            {
                Some(next) => current = next,
                None => break,
            }
        }
        for entry in self.pipeline.entries() {
            let Some(hook) = entry.extension().as_instance_hook() else {
                continue;
            };
            match hook
                .after_init(current.clone(), &ctx)
                .map_err(|source| hook_error(name, entry, InitStage::AfterInit, source))?
            {
                Some(next) => current = next,
                None => break,
            }
        }

        debug!(
            "event=component_create module=registry status=ok name={} type={} role={} pipeline_len={}",
            name,
            current.type_name(),
            definition.role().as_str(),
            ctx.pipeline_len
        );
        Ok(current)
    }
}

fn hook_error(
    component: &str,
    entry: &PipelineEntry,
    stage: InitStage,
    source: HookError,
) -> RegistryError {
    RegistryError::Hook {
        component: component.to_string(),
        hook: entry.name().to_string(),
        stage,
        source,
    }
}

impl DefinitionRegistry for ComponentRegistry {
    fn find_extensions(&self, capability: Capability) -> Vec<String> {
        self.capability_index
            .get(&capability)
            .cloned()
            .unwrap_or_default()
    }

    fn precedence_of(&self, name: &str) -> Option<Precedence> {
        self.definitions
            .get(name)
            .map(ComponentDefinition::precedence)
    }

    fn instantiate(&mut self, name: &str) -> Result<Arc<dyn Extension>, RegistryError> {
        let instance = self.get_component(name)?;
        instance
            .as_extension()
            .cloned()
            .ok_or_else(|| RegistryError::NotAnExtension(name.to_string()))
    }

    fn is_infrastructure_role(&self, name: &str) -> bool {
        self.definitions
            .get(name)
            .is_some_and(|definition| definition.role() == Role::Infrastructure)
    }

    fn invalidate_derived_metadata(&mut self) {
        let dropped = self.definition_cache.len();
        self.definition_cache.clear();
        self.metadata_invalidations += 1;
        debug!(
            "event=metadata_invalidate module=registry status=ok dropped={}",
            dropped
        );
    }

    fn as_mutable(&mut self) -> Option<&mut dyn MutableRegistry> {
        Some(self)
    }

    fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    fn add_to_pipeline(
        &mut self,
        name: &str,
        extension: Arc<dyn Extension>,
    ) -> Result<(), RegistryError> {
        let entry = PipelineEntry::new(name, extension)?;
        self.pipeline.add(entry);
        debug!(
            "event=pipeline_add module=registry status=ok name={} len={}",
            name,
            self.pipeline.len()
        );
        Ok(())
    }
}

impl MutableRegistry for ComponentRegistry {
    fn register_definition(&mut self, definition: ComponentDefinition) -> Result<(), RegistryError> {
        let name = definition.name().to_string();
        if !is_valid_component_name(&name) || name.starts_with(RESERVED_NAME_PREFIX) {
            return Err(RegistryError::InvalidName(name));
        }
        if self.definitions.contains_key(&name) {
            return Err(RegistryError::DuplicateDefinition(name));
        }

        for capability in definition.capabilities().iter() {
            self.capability_index
                .entry(capability)
                .or_default()
                .push(name.clone());
        }
        debug!(
            "event=definition_register module=registry status=ok name={} capabilities={} tier={}",
            name,
            definition.capabilities(),
            definition.precedence().tier().as_str()
        );
        self.definition_cache.remove(&name);
        self.registration_order.push(name.clone());
        self.definitions.insert(name, definition);
        Ok(())
    }

    fn remove_definition(&mut self, name: &str) -> Result<ComponentDefinition, RegistryError> {
        let definition = self
            .definitions
            .remove(name)
            .ok_or_else(|| RegistryError::NoSuchDefinition(name.to_string()))?;
        self.registration_order.retain(|existing| existing != name);
        for names in self.capability_index.values_mut() {
            names.retain(|existing| existing != name);
        }
        self.definition_cache.remove(name);
        self.singletons.remove(name);
        debug!(
            "event=definition_remove module=registry status=ok name={}",
            name
        );
        Ok(definition)
    }

    fn definition_mut(&mut self, name: &str) -> Option<&mut ComponentDefinition> {
        self.definitions.get_mut(name)
    }

    fn contains_definition(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    fn definition_names(&self) -> Vec<String> {
        self.registration_order.clone()
    }
}
