//! CLI smoke entry point.
//!
//! # Responsibility
//! - Boot a small demo container to verify `wiring_core` end to end.
//! - Keep output deterministic `key=value` lines for quick sanity checks.
//!
//! Environment: `WIRING_LOG_LEVEL`, `WIRING_LOG_DIR` (absolute, optional).

use log::info;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use wiring_core::{
    Capability, ComponentDefinition, Container, ContainerConfig, ContainerEvent,
    DefinitionRegistry, EventListener, Extension, HookError, HookResult, InitContext, Instance,
    InstanceHook, MutableRegistry, Precedence, RegistryFinalizer, RegistryMutator,
};

struct Greeting {
    message: String,
}

/// Registers the demo components the way a configuration scanner would.
struct DemoScanner;

impl RegistryFinalizer for DemoScanner {
    fn finalize_registry(&self, registry: &mut dyn DefinitionRegistry) -> HookResult<()> {
        info!(
            "event=demo_finalize module=cli status=ok hooks={}",
            registry.find_extensions(Capability::InstanceHook).len()
        );
        Ok(())
    }
}

impl RegistryMutator for DemoScanner {
    fn mutate_registry(&self, registry: &mut dyn MutableRegistry) -> HookResult<()> {
        let definitions = [
            ComponentDefinition::new("greeting", |_| {
                Ok(Instance::new(Greeting {
                    message: "hello from wiring".to_string(),
                }))
            }),
            ComponentDefinition::new("shouting_hook", |_| Ok(Instance::extension(ShoutingHook)))
                .with_capability(Capability::InstanceHook)
                .with_precedence(Precedence::Ordered(10)),
            ComponentDefinition::new("audit_listener", |_| Ok(Instance::extension(AuditListener)))
                .with_capability(Capability::EventListener),
        ];
        for definition in definitions {
            registry
                .register_definition(definition)
                .map_err(|err| HookError::with_source("demo registration failed", err))?;
        }
        Ok(())
    }
}

impl Extension for DemoScanner {
    fn as_registry_mutator(&self) -> Option<&dyn RegistryMutator> {
        Some(self)
    }
}

struct ShoutingHook;

impl InstanceHook for ShoutingHook {
    fn before_init(&self, instance: Instance, _ctx: &InitContext<'_>) -> HookResult<Option<Instance>> {
        match instance.downcast::<Greeting>() {
            Some(greeting) => Ok(Some(Instance::new(Greeting {
                message: greeting.message.to_uppercase(),
            }))),
            None => Ok(Some(instance)),
        }
    }
}

impl Extension for ShoutingHook {
    fn as_instance_hook(&self) -> Option<&dyn InstanceHook> {
        Some(self)
    }
}

struct AuditListener;

impl EventListener for AuditListener {
    fn on_event(&self, event: &ContainerEvent) -> HookResult<()> {
        match event {
            ContainerEvent::Refreshed {
                container,
                components,
            } => println!("event=refreshed container={container} components={components}"),
            ContainerEvent::Closed { container } => println!("event=closed container={container}"),
        }
        Ok(())
    }
}

impl Extension for AuditListener {
    fn as_event_listener(&self) -> Option<&dyn EventListener> {
        Some(self)
    }
}

fn config_from_env() -> ContainerConfig {
    let mut config = ContainerConfig::named("demo");
    if let Ok(level) = std::env::var("WIRING_LOG_LEVEL") {
        config.logging.level = level;
    }
    config.logging.dir = std::env::var_os("WIRING_LOG_DIR").map(PathBuf::from);
    config
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = config_from_env();
    wiring_core::init_logging(&config.logging)?;

    let mut container = Container::new(config)?;
    container.add_extension("demo.scanner", Arc::new(DemoScanner));
    let summary = container.refresh()?;

    let message = container
        .registry_mut()
        .get_typed::<Greeting>("greeting")?
        .map(|greeting| greeting.message.clone())
        .unwrap_or_default();

    println!("wiring_core version={}", wiring_core::core_version());
    println!("run_id={}", summary.run_id);
    println!("mutated={}", summary.mutation.mutated.join(","));
    println!("pipeline={}", summary.pipeline.join(","));
    println!("singletons={}", summary.singletons);
    println!("ineligible={}", summary.ineligible.len());
    println!("greeting={message}");

    container.close()?;
    Ok(())
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error={err}");
            ExitCode::FAILURE
        }
    }
}
