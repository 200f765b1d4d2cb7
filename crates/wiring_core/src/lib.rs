//! Bootstrap-time extension orchestration for a component container.
//! Extensions may mutate the definition registry, finalize it, or wrap
//! component initialization; this crate sequences them exactly once each.

pub mod bootstrap;
pub mod config;
pub mod container;
pub mod extension;
pub mod logging;
pub mod model;
pub mod registry;

pub use bootstrap::{
    BootstrapError, BuiltPipeline, EligibilityChecker, ExtensionInvoker, IneligibleComponent,
    MutationSummary, Phase, ProcessedSet, SuppliedExtension,
};
pub use config::{ConfigError, ContainerConfig, LoggingConfig};
pub use container::listener::ListenerDetector;
pub use container::{Container, ContainerState, RefreshSummary};
pub use extension::capability::{Capability, CapabilitySet};
pub use extension::contract::{
    ContainerEvent, EventListener, Extension, HookError, HookResult, InitContext, InstanceHook,
    MergeAware, RegistryFinalizer, RegistryMutator,
};
pub use extension::precedence::{sort_by_precedence, HasPrecedence, Precedence, Tier};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::definition::{ComponentDefinition, Role};
pub use model::instance::Instance;
pub use registry::component_registry::ComponentRegistry;
pub use registry::pipeline::{Pipeline, PipelineEntry};
pub use registry::{DefinitionRegistry, MutableRegistry, RegistryError};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
