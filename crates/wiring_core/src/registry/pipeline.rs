//! Ordered instance-hook pipeline.

use crate::extension::capability::Capability;
use crate::extension::contract::Extension;
use crate::registry::RegistryError;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

/// One named pipeline entry. Only instance hooks are accepted.
#[derive(Clone)]
pub struct PipelineEntry {
    name: String,
    extension: Arc<dyn Extension>,
}

impl PipelineEntry {
    pub fn new(name: impl Into<String>, extension: Arc<dyn Extension>) -> Result<Self, RegistryError> {
        let name = name.into();
        if !extension.capabilities().contains(Capability::InstanceHook) {
            return Err(RegistryError::CapabilityMismatch {
                name,
                capability: Capability::InstanceHook,
            });
        }
        Ok(Self { name, extension })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn extension(&self) -> &Arc<dyn Extension> {
        &self.extension
    }
}

impl Debug for PipelineEntry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineEntry")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Instance hooks applied, in order, to every component created after they
/// were added.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    entries: Vec<PipelineEntry>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `entry`; an entry with the same name is removed first so
    /// re-adding moves it to the tail.
    pub fn add(&mut self, entry: PipelineEntry) {
        self.entries.retain(|existing| existing.name != entry.name);
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[PipelineEntry] {
        &self.entries
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|entry| entry.name()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|entry| entry.name == name)
    }
}
