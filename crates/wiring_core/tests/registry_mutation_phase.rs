use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use wiring_core::{
    BootstrapError, Capability, ComponentDefinition, ComponentRegistry, DefinitionRegistry,
    Extension, ExtensionInvoker, HookError, HookResult, Instance, MutableRegistry, Phase,
    Pipeline, PipelineEntry, Precedence, RegistryError, RegistryFinalizer, RegistryMutator,
    SuppliedExtension,
};

type Journal = Arc<Mutex<Vec<String>>>;
type Action = Arc<dyn Fn(&mut dyn MutableRegistry) -> HookResult<()> + Send + Sync>;

struct Recorder {
    label: String,
    journal: Journal,
    action: Option<Action>,
}

impl RegistryFinalizer for Recorder {
    fn finalize_registry(&self, _registry: &mut dyn DefinitionRegistry) -> HookResult<()> {
        record(&self.journal, format!("finalize:{}", self.label));
        Ok(())
    }
}

impl RegistryMutator for Recorder {
    fn mutate_registry(&self, registry: &mut dyn MutableRegistry) -> HookResult<()> {
        record(&self.journal, format!("mutate:{}", self.label));
        match &self.action {
            Some(action) => action(registry),
            None => Ok(()),
        }
    }
}

impl Extension for Recorder {
    fn as_registry_mutator(&self) -> Option<&dyn RegistryMutator> {
        Some(self)
    }
}

struct Finalizer {
    label: String,
    journal: Journal,
}

impl RegistryFinalizer for Finalizer {
    fn finalize_registry(&self, _registry: &mut dyn DefinitionRegistry) -> HookResult<()> {
        record(&self.journal, format!("finalize:{}", self.label));
        Ok(())
    }
}

impl Extension for Finalizer {
    fn as_registry_finalizer(&self) -> Option<&dyn RegistryFinalizer> {
        Some(self)
    }
}

fn record(journal: &Journal, entry: String) {
    journal.lock().expect("journal lock").push(entry);
}

fn entries(journal: &Journal) -> Vec<String> {
    journal.lock().expect("journal lock").clone()
}

fn recorder(label: &str, journal: &Journal, action: Option<Action>) -> Recorder {
    Recorder {
        label: label.to_string(),
        journal: journal.clone(),
        action,
    }
}

fn mutator_definition(
    name: &str,
    precedence: Precedence,
    journal: &Journal,
    action: Option<Action>,
) -> ComponentDefinition {
    let label = name.to_string();
    let journal = journal.clone();
    ComponentDefinition::new(name, move |_| {
        Ok(Instance::extension(Recorder {
            label: label.clone(),
            journal: journal.clone(),
            action: action.clone(),
        }))
    })
    .with_capability(Capability::RegistryMutator)
    .with_precedence(precedence)
}

fn finalizer_definition(name: &str, precedence: Precedence, journal: &Journal) -> ComponentDefinition {
    let label = name.to_string();
    let journal = journal.clone();
    ComponentDefinition::new(name, move |_| {
        Ok(Instance::extension(Finalizer {
            label: label.clone(),
            journal: journal.clone(),
        }))
    })
    .with_capability(Capability::Finalizer)
    .with_precedence(precedence)
}

fn registers(definition: impl Fn() -> ComponentDefinition + Send + Sync + 'static) -> Action {
    Arc::new(move |registry: &mut dyn MutableRegistry| {
        registry
            .register_definition(definition())
            .map_err(|err| HookError::with_source("registration failed", err))
    })
}

fn new_journal() -> Journal {
    Arc::new(Mutex::new(vec![]))
}

#[test]
fn mutators_run_by_tier_then_order_value() {
    let journal = new_journal();
    let mut registry = ComponentRegistry::new();
    for definition in [
        mutator_definition("d", Precedence::Untagged, &journal, None),
        mutator_definition("b", Precedence::Ordered(5), &journal, None),
        mutator_definition("a", Precedence::Priority(100), &journal, None),
        mutator_definition("c", Precedence::Ordered(1), &journal, None),
    ] {
        registry.register_definition(definition).expect("register");
    }

    let summary = ExtensionInvoker::new()
        .run_registry_mutation_phase(&mut registry, &[])
        .expect("mutation phase");

    assert_eq!(summary.mutated, vec!["a", "c", "b", "d"]);
    assert_eq!(summary.finalized, vec!["a", "c", "b", "d"]);
    assert_eq!(
        entries(&journal),
        vec![
            "mutate:a",
            "mutate:c",
            "mutate:b",
            "mutate:d",
            "finalize:a",
            "finalize:c",
            "finalize:b",
            "finalize:d",
        ]
    );
}

#[test]
fn late_priority_registration_is_discovered_in_the_fixed_point_loop() {
    let journal = new_journal();
    let late_journal = journal.clone();
    let mut registry = ComponentRegistry::new();
    registry
        .register_definition(mutator_definition(
            "c",
            Precedence::Ordered(1),
            &journal,
            Some(registers(move || {
                mutator_definition("x", Precedence::Priority(0), &late_journal, None)
            })),
        ))
        .expect("register c");
    registry
        .register_definition(mutator_definition("d", Precedence::Untagged, &journal, None))
        .expect("register d");

    let summary = ExtensionInvoker::new()
        .run_registry_mutation_phase(&mut registry, &[])
        .expect("mutation phase");

    assert_eq!(summary.mutated, vec!["c", "x", "d"]);
    assert_eq!(summary.discovery_rounds, 1);
}

#[test]
fn chained_registrations_invoke_each_mutator_exactly_once() {
    let journal = new_journal();
    let third = journal.clone();
    let second = journal.clone();
    let mut registry = ComponentRegistry::new();
    registry
        .register_definition(mutator_definition(
            "m1",
            Precedence::Untagged,
            &journal,
            Some(registers(move || {
                let third = third.clone();
                mutator_definition(
                    "m2",
                    Precedence::Untagged,
                    &second,
                    Some(registers(move || {
                        mutator_definition("m3", Precedence::Untagged, &third, None)
                    })),
                )
            })),
        ))
        .expect("register m1");

    let summary = ExtensionInvoker::new()
        .run_registry_mutation_phase(&mut registry, &[])
        .expect("mutation phase");

    assert_eq!(summary.mutated, vec!["m1", "m2", "m3"]);
    assert_eq!(summary.discovery_rounds, 3);
    let mutations: Vec<String> = entries(&journal)
        .into_iter()
        .filter(|entry| entry.starts_with("mutate:"))
        .collect();
    assert_eq!(mutations, vec!["mutate:m1", "mutate:m2", "mutate:m3"]);
}

#[test]
fn supplied_identity_is_never_reinvoked_from_the_registry() {
    let journal = new_journal();
    let factory_calls = Arc::new(AtomicUsize::new(0));
    let calls = factory_calls.clone();
    let registry_journal = journal.clone();
    let mut registry = ComponentRegistry::new();
    registry
        .register_definition(
            ComponentDefinition::new("shared", move |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(Instance::extension(recorder("registry", &registry_journal, None)))
            })
            .with_capability(Capability::RegistryMutator)
            .with_precedence(Precedence::Priority(0)),
        )
        .expect("register shared");

    let supplied = vec![SuppliedExtension::new(
        "shared",
        Arc::new(recorder("supplied", &journal, None)),
    )];
    let summary = ExtensionInvoker::new()
        .run_registry_mutation_phase(&mut registry, &supplied)
        .expect("mutation phase");

    assert_eq!(factory_calls.load(Ordering::SeqCst), 0);
    assert_eq!(summary.mutated, vec!["shared"]);
    assert_eq!(
        entries(&journal),
        vec!["mutate:supplied", "finalize:supplied"]
    );
}

#[test]
fn supplied_extensions_run_before_registry_mutators() {
    let journal = new_journal();
    let mut registry = ComponentRegistry::new();
    registry
        .register_definition(mutator_definition("found", Precedence::Priority(0), &journal, None))
        .expect("register");

    let supplied = vec![
        SuppliedExtension::new(
            "generic",
            Arc::new(Finalizer {
                label: "generic".to_string(),
                journal: journal.clone(),
            }),
        ),
        SuppliedExtension::new("given", Arc::new(recorder("given", &journal, None))),
    ];
    ExtensionInvoker::new()
        .run_registry_mutation_phase(&mut registry, &supplied)
        .expect("mutation phase");

    assert_eq!(
        entries(&journal),
        vec![
            "mutate:given",
            "mutate:found",
            "finalize:given",
            "finalize:found",
            "finalize:generic",
        ]
    );
}

#[test]
fn second_call_on_settled_registry_invokes_nothing() {
    let journal = new_journal();
    let mut registry = ComponentRegistry::new();
    registry
        .register_definition(mutator_definition("a", Precedence::Untagged, &journal, None))
        .expect("register");
    registry
        .register_definition(finalizer_definition("f", Precedence::Untagged, &journal))
        .expect("register");
    let supplied = vec![SuppliedExtension::new(
        "given",
        Arc::new(recorder("given", &journal, None)),
    )];

    let mut invoker = ExtensionInvoker::new();
    invoker
        .run_registry_mutation_phase(&mut registry, &supplied)
        .expect("first call");
    let after_first = entries(&journal);
    assert_eq!(registry.metadata_invalidations(), 1);

    let second = invoker
        .run_registry_mutation_phase(&mut registry, &supplied)
        .expect("second call");

    assert!(second.mutated.is_empty());
    assert!(second.finalized.is_empty());
    assert_eq!(second.run_id, invoker.run_id());
    assert_eq!(entries(&journal), after_first);
    assert_eq!(registry.metadata_invalidations(), 2);
}

#[test]
fn discovered_finalizers_run_by_tier_after_supplied_ones() {
    let journal = new_journal();
    let mut registry = ComponentRegistry::new();
    for definition in [
        finalizer_definition("untagged", Precedence::Untagged, &journal),
        finalizer_definition("ordered", Precedence::Ordered(2), &journal),
        finalizer_definition("priority", Precedence::Priority(0), &journal),
        mutator_definition("mutator", Precedence::Untagged, &journal, None),
    ] {
        registry.register_definition(definition).expect("register");
    }
    let supplied = vec![SuppliedExtension::new(
        "generic",
        Arc::new(Finalizer {
            label: "generic".to_string(),
            journal: journal.clone(),
        }),
    )];

    let summary = ExtensionInvoker::new()
        .run_registry_mutation_phase(&mut registry, &supplied)
        .expect("mutation phase");

    assert_eq!(
        summary.finalized,
        vec!["mutator", "generic", "priority", "ordered", "untagged"]
    );
}

#[test]
fn registry_mutator_failure_names_extension_and_phase() {
    let journal = new_journal();
    let mut registry = ComponentRegistry::new();
    let failing: Action = Arc::new(|_registry: &mut dyn MutableRegistry| {
        Err::<(), _>(HookError::new("cannot scan"))
    });
    registry
        .register_definition(mutator_definition(
            "scanner",
            Precedence::Ordered(3),
            &journal,
            Some(failing),
        ))
        .expect("register");
    registry
        .register_definition(mutator_definition("after", Precedence::Untagged, &journal, None))
        .expect("register");

    let err = ExtensionInvoker::new()
        .run_registry_mutation_phase(&mut registry, &[])
        .expect_err("failure propagates");

    assert!(matches!(err, BootstrapError::Hook { .. }));
    assert_eq!(err.extension(), Some("scanner"));
    assert_eq!(err.phase(), Some(Phase::OrderedMutation));
    assert!(err.to_string().contains("cannot scan"));
    assert_eq!(entries(&journal), vec!["mutate:scanner"]);
}

/// Registry without a mutation surface that counts discovery queries.
#[derive(Default)]
struct ReadOnlyRegistry {
    discovery_calls: AtomicUsize,
    invalidations: usize,
    pipeline: Pipeline,
}

impl DefinitionRegistry for ReadOnlyRegistry {
    fn find_extensions(&self, _capability: Capability) -> Vec<String> {
        self.discovery_calls.fetch_add(1, Ordering::SeqCst);
        vec![]
    }

    fn precedence_of(&self, _name: &str) -> Option<Precedence> {
        None
    }

    fn instantiate(&mut self, name: &str) -> Result<Arc<dyn Extension>, RegistryError> {
        Err(RegistryError::NoSuchDefinition(name.to_string()))
    }

    fn is_infrastructure_role(&self, _name: &str) -> bool {
        false
    }

    fn invalidate_derived_metadata(&mut self) {
        self.invalidations += 1;
    }

    fn as_mutable(&mut self) -> Option<&mut dyn MutableRegistry> {
        None
    }

    fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    fn add_to_pipeline(
        &mut self,
        name: &str,
        extension: Arc<dyn Extension>,
    ) -> Result<(), RegistryError> {
        self.pipeline.add(PipelineEntry::new(name, extension)?);
        Ok(())
    }
}

#[test]
fn read_only_registry_only_finalizes_supplied_extensions() {
    let journal = new_journal();
    let mut registry = ReadOnlyRegistry::default();
    let supplied = vec![
        SuppliedExtension::new("p", Arc::new(recorder("p", &journal, None))),
        SuppliedExtension::new(
            "q",
            Arc::new(Finalizer {
                label: "q".to_string(),
                journal: journal.clone(),
            }),
        ),
    ];

    let summary = ExtensionInvoker::new()
        .run_registry_mutation_phase(&mut registry, &supplied)
        .expect("degraded phase");

    assert!(summary.degraded);
    assert!(summary.mutated.is_empty());
    assert_eq!(entries(&journal), vec!["finalize:p", "finalize:q"]);
    assert_eq!(registry.discovery_calls.load(Ordering::SeqCst), 0);
    assert_eq!(registry.invalidations, 1);
}
