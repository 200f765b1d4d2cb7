//! Container refresh sequence.
//!
//! # Responsibility
//! - Drive one bootstrap: registry mutation, pipeline build, eager singleton
//!   creation and the refreshed event.
//! - Tear down created singletons when any step fails.
//!
//! # Invariants
//! - A container refreshes at most once.
//! - The listener detector is the last pipeline entry after refresh.
//! - A failed refresh leaves no created singletons behind.

pub mod listener;

use crate::bootstrap::eligibility::{EligibilityChecker, IneligibleComponent};
use crate::bootstrap::error::{BootstrapError, Phase};
use crate::bootstrap::invoker::{ExtensionInvoker, MutationSummary, SuppliedExtension};
use crate::config::{ConfigError, ContainerConfig};
use crate::extension::contract::{ContainerEvent, Extension};
use crate::registry::component_registry::ComponentRegistry;
use crate::registry::{DefinitionRegistry, MutableRegistry};
use listener::{ListenerDetector, LISTENER_DETECTOR_NAME};
use log::{error, info, warn};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerState {
    Created,
    Refreshing,
    Active,
    Failed,
    Closed,
}

impl ContainerState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Refreshing => "refreshing",
            Self::Active => "active",
            Self::Failed => "failed",
            Self::Closed => "closed",
        }
    }
}

/// What one successful refresh did.
#[derive(Debug, Clone, Serialize)]
pub struct RefreshSummary {
    pub container: String,
    pub run_id: Uuid,
    pub mutation: MutationSummary,
    /// Pipeline entry names after refresh, head first.
    pub pipeline: Vec<String>,
    pub target_count: usize,
    pub singletons: usize,
    pub listeners: usize,
    pub ineligible: Vec<IneligibleComponent>,
    pub duration_ms: u64,
}

#[derive(Debug)]
pub struct Container {
    config: ContainerConfig,
    registry: ComponentRegistry,
    supplied: Vec<SuppliedExtension>,
    state: ContainerState,
    detector: Arc<ListenerDetector>,
    checker: Option<Arc<EligibilityChecker>>,
}

impl Container {
    /// Creates an empty container.
    ///
    /// # Errors
    /// - Returns [`ConfigError`] when `config` does not validate.
    pub fn new(config: ContainerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            registry: ComponentRegistry::new(),
            supplied: vec![],
            state: ContainerState::Created,
            detector: Arc::new(ListenerDetector::new()),
            checker: None,
        })
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &ContainerConfig {
        &self.config
    }

    pub fn state(&self) -> ContainerState {
        self.state
    }

    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    /// Registry access for definition registration before refresh.
    pub fn registry_mut(&mut self) -> &mut ComponentRegistry {
        &mut self.registry
    }

    /// Supplies an extension directly; it runs before any registry-discovered
    /// extension.
    pub fn add_extension(&mut self, name: impl Into<String>, extension: Arc<dyn Extension>) {
        let name = name.into();
        if self.state != ContainerState::Created {
            warn!(
                "event=extension_supply module=container status=ignored container={} name={} state={}",
                self.config.name,
                name,
                self.state.as_str()
            );
            return;
        }
        self.supplied.push(SuppliedExtension::new(name, extension));
    }

    pub fn supplied_extensions(&self) -> &[SuppliedExtension] {
        &self.supplied
    }

    /// Components reported by the eligibility checker so far.
    pub fn ineligible_components(&self) -> Vec<IneligibleComponent> {
        self.checker
            .as_ref()
            .map(|checker| checker.reports())
            .unwrap_or_default()
    }

    /// Runs the bootstrap sequence.
    ///
    /// # Errors
    /// - [`BootstrapError::AlreadyRefreshed`] on every call after the first.
    /// - Any hook or registry failure; created singletons are destroyed and
    ///   the container moves to [`ContainerState::Failed`].
    pub fn refresh(&mut self) -> Result<RefreshSummary, BootstrapError> {
        if self.state != ContainerState::Created {
            return Err(BootstrapError::AlreadyRefreshed(self.config.name.clone()));
        }
        self.state = ContainerState::Refreshing;
        let started_at = Instant::now();
        let mut invoker = ExtensionInvoker::new();
        info!(
            "event=container_refresh module=container status=start container={} run_id={} supplied={} definitions={}",
            self.config.name,
            invoker.run_id(),
            self.supplied.len(),
            self.registry.len()
        );

        match self.run_refresh(&mut invoker, started_at) {
            Ok(summary) => {
                self.state = ContainerState::Active;
                info!(
                    "event=container_refresh module=container status=ok container={} run_id={} singletons={} listeners={} ineligible={} duration_ms={}",
                    summary.container,
                    summary.run_id,
                    summary.singletons,
                    summary.listeners,
                    summary.ineligible.len(),
                    summary.duration_ms
                );
                Ok(summary)
            }
            Err(err) => {
                let destroyed = self.registry.destroy_singletons();
                self.detector.clear();
                self.state = ContainerState::Failed;
                error!(
                    "event=container_refresh module=container status=error container={} run_id={} destroyed={} error={}",
                    self.config.name,
                    invoker.run_id(),
                    destroyed,
                    err
                );
                Err(err)
            }
        }
    }

    fn run_refresh(
        &mut self,
        invoker: &mut ExtensionInvoker,
        started_at: Instant,
    ) -> Result<RefreshSummary, BootstrapError> {
        if self.config.detect_listeners {
            self.register_listener_detector()?;
        }

        let mutation = invoker.run_registry_mutation_phase(&mut self.registry, &self.supplied)?;
        let built = invoker.build_instance_lifecycle_pipeline(&mut self.registry)?;
        self.checker = Some(built.checker.clone());

        if self.config.detect_listeners {
            self.register_listener_detector()?;
        }

        if self.config.pre_instantiate_singletons {
            self.pre_instantiate_singletons()?;
        }

        self.publish(&ContainerEvent::Refreshed {
            container: self.config.name.clone(),
            components: self.registry.singleton_count(),
        })?;

        Ok(RefreshSummary {
            container: self.config.name.clone(),
            run_id: invoker.run_id(),
            mutation,
            pipeline: self
                .registry
                .pipeline()
                .names()
                .into_iter()
                .map(str::to_string)
                .collect(),
            target_count: built.target_count,
            singletons: self.registry.singleton_count(),
            listeners: self.detector.len(),
            ineligible: built.checker.reports(),
            duration_ms: started_at.elapsed().as_millis() as u64,
        })
    }

    fn register_listener_detector(&mut self) -> Result<(), BootstrapError> {
        self.registry
            .add_to_pipeline(LISTENER_DETECTOR_NAME, self.detector.clone())
            .map_err(|source| {
                BootstrapError::registry(LISTENER_DETECTOR_NAME, Phase::PipelineRegistration, source)
            })
    }

    fn pre_instantiate_singletons(&mut self) -> Result<(), BootstrapError> {
        for name in self.registry.definition_names() {
            let lazy = self
                .registry
                .definition(&name)
                .is_some_and(|definition| definition.is_lazy_init());
            if lazy {
                continue;
            }
            self.registry
                .get_component(&name)
                .map_err(|source| BootstrapError::registry(&name, Phase::SingletonCreation, source))?;
        }
        Ok(())
    }

    /// Delivers `event` to every detected listener in detection order.
    pub fn publish(&self, event: &ContainerEvent) -> Result<(), BootstrapError> {
        for (name, extension) in self.detector.listeners() {
            let Some(listener) = extension.as_event_listener() else {
                continue;
            };
            listener
                .on_event(event)
                .map_err(|source| BootstrapError::hook(&name, Phase::EventDelivery, source))?;
        }
        Ok(())
    }

    /// Publishes the closed event (when active) and destroys singletons.
    ///
    /// # Errors
    /// - Returns the first listener failure; singletons are destroyed anyway.
    pub fn close(&mut self) -> Result<(), BootstrapError> {
        if self.state == ContainerState::Closed {
            return Ok(());
        }
        let published = if self.state == ContainerState::Active {
            self.publish(&ContainerEvent::Closed {
                container: self.config.name.clone(),
            })
        } else {
            Ok(())
        };
        let destroyed = self.registry.destroy_singletons();
        self.detector.clear();
        self.state = ContainerState::Closed;
        info!(
            "event=container_close module=container status={} container={} destroyed={}",
            if published.is_ok() { "ok" } else { "error" },
            self.config.name,
            destroyed
        );
        published
    }
}
