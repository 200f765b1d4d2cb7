//! Capability declarations for extension discovery.
//!
//! Definitions declare capabilities up front so the registry can answer
//! discovery queries without creating instances.

use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};

/// Hook family an extension participates in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Capability {
    /// Adds or alters component definitions before instantiation begins.
    RegistryMutator,
    /// Runs once registry mutation has settled.
    Finalizer,
    /// Wraps every component instance during creation.
    InstanceHook,
    /// Instance hook that also observes each component definition.
    MergeAware,
    /// Receives container events.
    EventListener,
}

impl Capability {
    /// Stable string id used in log events.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RegistryMutator => CAPABILITY_REGISTRY_MUTATOR,
            Self::Finalizer => CAPABILITY_FINALIZER,
            Self::InstanceHook => CAPABILITY_INSTANCE_HOOK,
            Self::MergeAware => CAPABILITY_MERGE_AWARE,
            Self::EventListener => CAPABILITY_EVENT_LISTENER,
        }
    }

    /// Capability that declaring `self` implies.
    ///
    /// - `registry_mutator` -> `finalizer`
    /// - `merge_aware` -> `instance_hook`
    pub fn implied(self) -> Option<Capability> {
        match self {
            Self::RegistryMutator => Some(Self::Finalizer),
            Self::MergeAware => Some(Self::InstanceHook),
            Self::Finalizer | Self::InstanceHook | Self::EventListener => None,
        }
    }
}

impl Display for Capability {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const CAPABILITY_REGISTRY_MUTATOR: &str = "registry_mutator";
pub const CAPABILITY_FINALIZER: &str = "finalizer";
pub const CAPABILITY_INSTANCE_HOOK: &str = "instance_hook";
pub const CAPABILITY_MERGE_AWARE: &str = "merge_aware";
pub const CAPABILITY_EVENT_LISTENER: &str = "event_listener";

/// Declared capability set of one definition.
///
/// Inserting a capability also inserts what it implies, so a registry
/// mutator is always discoverable as a finalizer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapabilitySet {
    values: BTreeSet<Capability>,
}

impl CapabilitySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, capability: Capability) {
        self.values.insert(capability);
        if let Some(implied) = capability.implied() {
            self.values.insert(implied);
        }
    }

    pub fn with(mut self, capability: Capability) -> Self {
        self.insert(capability);
        self
    }

    pub fn contains(&self, capability: Capability) -> bool {
        self.values.contains(&capability)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        self.values.iter().copied()
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<T: IntoIterator<Item = Capability>>(iter: T) -> Self {
        let mut set = Self::new();
        for capability in iter {
            set.insert(capability);
        }
        set
    }
}

impl Display for CapabilitySet {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let joined = self
            .values
            .iter()
            .map(|capability| capability.as_str())
            .collect::<Vec<_>>()
            .join(",");
        f.write_str(&joined)
    }
}

#[cfg(test)]
mod tests {
    use super::{Capability, CapabilitySet};

    #[test]
    fn registry_mutator_implies_finalizer() {
        let set = CapabilitySet::new().with(Capability::RegistryMutator);
        assert!(set.contains(Capability::RegistryMutator));
        assert!(set.contains(Capability::Finalizer));
        assert!(!set.contains(Capability::InstanceHook));
    }

    #[test]
    fn merge_aware_implies_instance_hook() {
        let set: CapabilitySet = [Capability::MergeAware].into_iter().collect();
        assert!(set.contains(Capability::InstanceHook));
        assert_eq!(set.to_string(), "instance_hook,merge_aware");
    }

    #[test]
    fn finalizer_alone_does_not_imply_mutation() {
        let set = CapabilitySet::new().with(Capability::Finalizer);
        assert!(!set.contains(Capability::RegistryMutator));
        assert!(!set.is_empty());
    }
}
