//! Definition registry contracts.
//!
//! # Responsibility
//! - Define the collaborator interface the bootstrap orchestrator consumes.
//! - Separate read/discovery access from definition mutation so a registry
//!   that cannot be mutated is expressible.
//!
//! # Invariants
//! - `find_extensions` returns names in registration order.
//! - `instantiate` is idempotent: repeated calls return the same allocation.

pub mod component_registry;
pub mod pipeline;

use crate::extension::capability::Capability;
use crate::extension::contract::{Extension, HookError};
use crate::extension::precedence::{Precedence, Tier};
use crate::model::definition::ComponentDefinition;
use crate::registry::pipeline::Pipeline;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Stage of component creation a failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitStage {
    Definition,
    BeforeInit,
    AfterInit,
}

impl InitStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Definition => "definition",
            Self::BeforeInit => "before_init",
            Self::AfterInit => "after_init",
        }
    }
}

/// Registry lookup, registration, and creation errors.
#[derive(Debug)]
pub enum RegistryError {
    InvalidName(String),
    DuplicateDefinition(String),
    NoSuchDefinition(String),
    CurrentlyInCreation(String),
    NotAnExtension(String),
    CapabilityMismatch {
        name: String,
        capability: Capability,
    },
    Factory {
        name: String,
        source: HookError,
    },
    Hook {
        component: String,
        hook: String,
        stage: InitStage,
        source: HookError,
    },
}

impl Display for RegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidName(value) => write!(f, "component name is invalid: {value:?}"),
            Self::DuplicateDefinition(value) => {
                write!(f, "component definition already registered: {value}")
            }
            Self::NoSuchDefinition(value) => write!(f, "no component definition named {value}"),
            Self::CurrentlyInCreation(value) => {
                write!(f, "component {value} is currently in creation (dependency cycle?)")
            }
            Self::NotAnExtension(value) => write!(f, "component {value} is not an extension"),
            Self::CapabilityMismatch { name, capability } => write!(
                f,
                "component {name} is declared as {capability} but does not implement it"
            ),
            Self::Factory { name, source } => {
                write!(f, "factory for component {name} failed: {source}")
            }
            Self::Hook {
                component,
                hook,
                stage,
                source,
            } => write!(
                f,
                "hook {hook} failed during {} of component {component}: {source}",
                stage.as_str()
            ),
        }
    }
}

impl Error for RegistryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Factory { source, .. } | Self::Hook { source, .. } => Some(source),
            Self::InvalidName(_)
            | Self::DuplicateDefinition(_)
            | Self::NoSuchDefinition(_)
            | Self::CurrentlyInCreation(_)
            | Self::NotAnExtension(_)
            | Self::CapabilityMismatch { .. } => None,
        }
    }
}

/// Discovery and creation surface consumed by the bootstrap orchestrator.
pub trait DefinitionRegistry {
    /// Names of definitions declaring `capability`, in registration order.
    fn find_extensions(&self, capability: Capability) -> Vec<String>;

    fn precedence_of(&self, name: &str) -> Option<Precedence>;

    fn is_tagged(&self, name: &str, tier: Tier) -> bool {
        self.precedence_of(name)
            .is_some_and(|precedence| precedence.tier() == tier)
    }

    /// Creates (or returns the already created) extension named `name`.
    fn instantiate(&mut self, name: &str) -> Result<Arc<dyn Extension>, RegistryError>;

    /// Whether the current definition of `name` has the infrastructure role.
    ///
    /// Instance hooks see the same fact through `InitContext::role`, taken
    /// from the definition snapshot the component is created from; this
    /// method answers for the live definition.
    fn is_infrastructure_role(&self, name: &str) -> bool;

    /// Drops cached metadata derived from definitions.
    fn invalidate_derived_metadata(&mut self);

    /// Mutation surface, or `None` when this registry cannot be mutated.
    fn as_mutable(&mut self) -> Option<&mut dyn MutableRegistry>;

    fn pipeline(&self) -> &Pipeline;

    /// Appends `extension` to the pipeline, moving it to the tail when an
    /// entry with the same name is already present.
    fn add_to_pipeline(
        &mut self,
        name: &str,
        extension: Arc<dyn Extension>,
    ) -> Result<(), RegistryError>;
}

/// Definition mutation surface handed to registry mutators.
pub trait MutableRegistry {
    /// # Errors
    /// - `InvalidName` for malformed names and for names under the reserved
    ///   `internal.` prefix.
    /// - `DuplicateDefinition` when the name is taken.
    fn register_definition(&mut self, definition: ComponentDefinition) -> Result<(), RegistryError>;

    fn remove_definition(&mut self, name: &str) -> Result<ComponentDefinition, RegistryError>;

    fn definition_mut(&mut self, name: &str) -> Option<&mut ComponentDefinition>;

    fn contains_definition(&self, name: &str) -> bool;

    /// All definition names in registration order.
    fn definition_names(&self) -> Vec<String>;
}
