//! Extension hook contracts.
//!
//! An extension exposes the hook families it implements through explicit
//! `as_*` accessors. Callers query those accessors instead of inspecting the
//! concrete type.

use crate::extension::capability::{Capability, CapabilitySet};
use crate::model::definition::{ComponentDefinition, Role};
use crate::model::instance::Instance;
use crate::registry::{DefinitionRegistry, MutableRegistry};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type HookResult<T> = Result<T, HookError>;

/// Failure raised by extension code from inside a hook.
#[derive(Debug)]
pub struct HookError {
    message: String,
    source: Option<Box<dyn Error + Send + Sync + 'static>>,
}

impl HookError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Wraps a lower-level error with a hook-specific message.
    pub fn with_source(
        message: impl Into<String>,
        source: impl Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for HookError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl Error for HookError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source
            .as_deref()
            .map(|err| err as &(dyn Error + 'static))
    }
}

/// Per-component view handed to instance hooks.
#[derive(Debug, Clone, Copy)]
pub struct InitContext<'a> {
    pub component_name: &'a str,
    pub role: Role,
    /// Pipeline length at the moment the hook runs.
    pub pipeline_len: usize,
}

/// Base contract of every extension value.
pub trait Extension: Send + Sync {
    fn as_registry_mutator(&self) -> Option<&dyn RegistryMutator> {
        None
    }

    fn as_registry_finalizer(&self) -> Option<&dyn RegistryFinalizer> {
        None
    }

    fn as_instance_hook(&self) -> Option<&dyn InstanceHook> {
        None
    }

    fn as_merge_aware(&self) -> Option<&dyn MergeAware> {
        None
    }

    fn as_event_listener(&self) -> Option<&dyn EventListener> {
        None
    }

    /// Capabilities this value actually implements.
    fn capabilities(&self) -> CapabilitySet {
        let mut set = CapabilitySet::new();
        if self.as_registry_mutator().is_some() {
            set.insert(Capability::RegistryMutator);
        }
        if self.as_registry_finalizer().is_some() {
            set.insert(Capability::Finalizer);
        }
        if self.as_instance_hook().is_some() {
            set.insert(Capability::InstanceHook);
        }
        if self.as_merge_aware().is_some() {
            set.insert(Capability::MergeAware);
        }
        if self.as_event_listener().is_some() {
            set.insert(Capability::EventListener);
        }
        set
    }
}

/// Generic hook run once registry mutation has settled.
pub trait RegistryFinalizer {
    fn finalize_registry(&self, registry: &mut dyn DefinitionRegistry) -> HookResult<()>;
}

/// Hook allowed to add or alter component definitions.
///
/// Every mutator is also a finalizer; its finalize hook runs after the
/// fixed-point mutation loop has completed.
pub trait RegistryMutator: RegistryFinalizer {
    fn mutate_registry(&self, registry: &mut dyn MutableRegistry) -> HookResult<()>;
}

/// Hooks applied around every component's initialization.
///
/// Returning `Ok(None)` keeps the current instance and skips the remaining
/// hooks of the same stage.
pub trait InstanceHook {
    fn before_init(&self, instance: Instance, _ctx: &InitContext<'_>) -> HookResult<Option<Instance>> {
        Ok(Some(instance))
    }

    fn after_init(&self, instance: Instance, _ctx: &InitContext<'_>) -> HookResult<Option<Instance>> {
        Ok(Some(instance))
    }
}

/// Instance hook that also sees each component's definition before its
/// initialization hooks run.
pub trait MergeAware: InstanceHook {
    fn on_definition(&self, definition: &ComponentDefinition) -> HookResult<()>;
}

/// Container lifecycle event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerEvent {
    Refreshed { container: String, components: usize },
    Closed { container: String },
}

/// Receiver of container events.
pub trait EventListener {
    fn on_event(&self, event: &ContainerEvent) -> HookResult<()>;
}

/// Runs the finalize hook of `extension` if it has one.
///
/// Registry mutators are finalized through their own supertrait method so
/// implementors do not need to expose both accessors.
pub fn finalize_extension(
    extension: &dyn Extension,
    registry: &mut dyn DefinitionRegistry,
) -> Option<HookResult<()>> {
    if let Some(mutator) = extension.as_registry_mutator() {
        return Some(mutator.finalize_registry(registry));
    }
    extension
        .as_registry_finalizer()
        .map(|finalizer| finalizer.finalize_registry(registry))
}

#[cfg(test)]
mod tests {
    use super::{
        Capability, Extension, HookError, HookResult, InstanceHook, MergeAware, RegistryFinalizer,
    };
    use crate::model::definition::ComponentDefinition;
    use crate::registry::DefinitionRegistry;
    use std::error::Error;

    struct Finalizing;

    impl RegistryFinalizer for Finalizing {
        fn finalize_registry(&self, _registry: &mut dyn DefinitionRegistry) -> HookResult<()> {
            Ok(())
        }
    }

    impl Extension for Finalizing {
        fn as_registry_finalizer(&self) -> Option<&dyn RegistryFinalizer> {
            Some(self)
        }
    }

    struct Merging;

    impl InstanceHook for Merging {}

    impl MergeAware for Merging {
        fn on_definition(&self, _definition: &ComponentDefinition) -> HookResult<()> {
            Ok(())
        }
    }

    impl Extension for Merging {
        fn as_instance_hook(&self) -> Option<&dyn InstanceHook> {
            Some(self)
        }

        fn as_merge_aware(&self) -> Option<&dyn MergeAware> {
            Some(self)
        }
    }

    #[test]
    fn capabilities_follow_accessors() {
        let finalizing = Finalizing.capabilities();
        assert!(finalizing.contains(Capability::Finalizer));
        assert!(!finalizing.contains(Capability::RegistryMutator));

        let merging = Merging.capabilities();
        assert!(merging.contains(Capability::MergeAware));
        assert!(merging.contains(Capability::InstanceHook));
    }

    #[test]
    fn hook_error_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk gone");
        let err = HookError::with_source("failed to scan", io);
        assert_eq!(err.to_string(), "failed to scan");
        assert_eq!(err.message(), "failed to scan");
        assert_eq!(
            err.source().map(|source| source.to_string()),
            Some("disk gone".to_string())
        );
        assert!(HookError::new("plain").source().is_none());
    }
}
