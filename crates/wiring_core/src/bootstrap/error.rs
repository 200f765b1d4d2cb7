//! Bootstrap failure reporting.

use crate::extension::contract::HookError;
use crate::registry::RegistryError;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Orchestration phase an invocation belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Mutation hooks of externally supplied extensions.
    SuppliedMutation,
    /// Registry-discovered mutators tagged `Priority`.
    PriorityMutation,
    /// Registry-discovered mutators tagged `Ordered`.
    OrderedMutation,
    /// Fixed-point rounds over every remaining mutator.
    DiscoveryMutation,
    /// Finalize hooks.
    Finalization,
    /// Instance-hook discovery and pipeline registration.
    PipelineRegistration,
    /// Eager creation of singletons after the pipeline is complete.
    SingletonCreation,
    /// Event delivery to detected listeners.
    EventDelivery,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SuppliedMutation => "supplied_mutation",
            Self::PriorityMutation => "priority_mutation",
            Self::OrderedMutation => "ordered_mutation",
            Self::DiscoveryMutation => "discovery_mutation",
            Self::Finalization => "finalization",
            Self::PipelineRegistration => "pipeline_registration",
            Self::SingletonCreation => "singleton_creation",
            Self::EventDelivery => "event_delivery",
        }
    }
}

impl Display for Phase {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fatal bootstrap failure.
///
/// Every hook or registry failure names the extension (or component) and the
/// phase it happened in.
#[derive(Debug)]
pub enum BootstrapError {
    Hook {
        extension: String,
        phase: Phase,
        source: HookError,
    },
    Registry {
        extension: String,
        phase: Phase,
        source: RegistryError,
    },
    AlreadyRefreshed(String),
    /// The invoker already built a pipeline; carries its run id.
    PipelineAlreadyBuilt(String),
}

impl BootstrapError {
    pub(crate) fn hook(extension: &str, phase: Phase, source: HookError) -> Self {
        Self::Hook {
            extension: extension.to_string(),
            phase,
            source,
        }
    }

    pub(crate) fn registry(extension: &str, phase: Phase, source: RegistryError) -> Self {
        Self::Registry {
            extension: extension.to_string(),
            phase,
            source,
        }
    }

    /// Name of the failing extension or component.
    pub fn extension(&self) -> Option<&str> {
        match self {
            Self::Hook { extension, .. } | Self::Registry { extension, .. } => Some(extension),
            Self::AlreadyRefreshed(_) | Self::PipelineAlreadyBuilt(_) => None,
        }
    }

    pub fn phase(&self) -> Option<Phase> {
        match self {
            Self::Hook { phase, .. } | Self::Registry { phase, .. } => Some(*phase),
            Self::AlreadyRefreshed(_) | Self::PipelineAlreadyBuilt(_) => None,
        }
    }
}

impl Display for BootstrapError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hook {
                extension,
                phase,
                source,
            } => write!(f, "extension {extension} failed during {phase}: {source}"),
            Self::Registry {
                extension,
                phase,
                source,
            } => write!(f, "{extension} could not be processed during {phase}: {source}"),
            Self::AlreadyRefreshed(container) => {
                write!(f, "container {container} does not support multiple refreshes")
            }
            Self::PipelineAlreadyBuilt(run_id) => {
                write!(f, "invoker {run_id} already built its instance pipeline")
            }
        }
    }
}

impl Error for BootstrapError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Hook { source, .. } => Some(source),
            Self::Registry { source, .. } => Some(source),
            Self::AlreadyRefreshed(_) | Self::PipelineAlreadyBuilt(_) => None,
        }
    }
}
