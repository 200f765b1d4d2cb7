//! Deduplication tracker for one orchestration run.

use std::collections::BTreeSet;

/// Identities already handed to the invoker.
///
/// Every invocation path checks this set first; an identity is recorded
/// before its hook runs so a hook that re-registers itself is not picked up
/// again by the next discovery round.
#[derive(Debug, Clone, Default)]
pub struct ProcessedSet {
    names: BTreeSet<String>,
}

impl ProcessedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `name`; returns `false` when it was already recorded.
    pub fn mark(&mut self, name: &str) -> bool {
        self.names.insert(name.to_string())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
