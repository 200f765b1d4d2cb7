//! Component definitions owned by the registry.
//!
//! # Responsibility
//! - Describe how one named component is created and classified.
//! - Carry declaration-time metadata (role, capabilities, precedence) so
//!   discovery never needs an instance.
//!
//! # Invariants
//! - Names are validated by the registry on registration, not here.
//! - Definitions stay mutable until the registry is refreshed; mutation hooks
//!   rely on that.

use crate::extension::capability::{Capability, CapabilitySet};
use crate::extension::precedence::Precedence;
use crate::model::instance::Instance;
use crate::registry::component_registry::ComponentRegistry;
use crate::registry::RegistryError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

/// Factory creating one component instance.
///
/// The registry is passed in so a factory can resolve its own dependencies.
pub type ComponentFactory =
    Arc<dyn Fn(&mut ComponentRegistry) -> Result<Instance, RegistryError> + Send + Sync>;

/// Role of a definition inside the container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// User-visible component.
    #[default]
    Application,
    /// Supporting part of a larger configuration.
    Support,
    /// Synthetic, container-internal component.
    Infrastructure,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Application => "application",
            Self::Support => "support",
            Self::Infrastructure => "infrastructure",
        }
    }
}

/// Named, mutable component record.
#[derive(Clone)]
pub struct ComponentDefinition {
    name: String,
    role: Role,
    capabilities: CapabilitySet,
    precedence: Precedence,
    lazy_init: bool,
    attributes: BTreeMap<String, String>,
    factory: ComponentFactory,
}

impl ComponentDefinition {
    pub fn new<F>(name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&mut ComponentRegistry) -> Result<Instance, RegistryError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            role: Role::default(),
            capabilities: CapabilitySet::new(),
            precedence: Precedence::default(),
            lazy_init: false,
            attributes: BTreeMap::new(),
            factory: Arc::new(factory),
        }
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    pub fn with_capability(mut self, capability: Capability) -> Self {
        self.capabilities.insert(capability);
        self
    }

    pub fn with_precedence(mut self, precedence: Precedence) -> Self {
        self.precedence = precedence;
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Excludes the component from eager creation during refresh.
    pub fn lazy(mut self) -> Self {
        self.lazy_init = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn capabilities(&self) -> &CapabilitySet {
        &self.capabilities
    }

    pub fn precedence(&self) -> Precedence {
        self.precedence
    }

    pub fn is_lazy_init(&self) -> bool {
        self.lazy_init
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }

    pub fn set_role(&mut self, role: Role) {
        self.role = role;
    }

    pub fn set_precedence(&mut self, precedence: Precedence) {
        self.precedence = precedence;
    }

    pub fn set_lazy_init(&mut self, lazy_init: bool) {
        self.lazy_init = lazy_init;
    }

    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(key.into(), value.into());
    }

    pub fn factory(&self) -> ComponentFactory {
        self.factory.clone()
    }
}

impl Debug for ComponentDefinition {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentDefinition")
            .field("name", &self.name)
            .field("role", &self.role)
            .field("capabilities", &self.capabilities)
            .field("precedence", &self.precedence)
            .field("lazy_init", &self.lazy_init)
            .field("attributes", &self.attributes)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::{ComponentDefinition, Role};
    use crate::extension::capability::Capability;
    use crate::extension::precedence::Precedence;
    use crate::model::instance::Instance;

    #[test]
    fn builder_sets_declaration_metadata() {
        let definition = ComponentDefinition::new("scanner", |_| Ok(Instance::new(1_u8)))
            .with_role(Role::Infrastructure)
            .with_capability(Capability::RegistryMutator)
            .with_precedence(Precedence::Priority(0))
            .with_attribute("base_package", "app")
            .lazy();

        assert_eq!(definition.name(), "scanner");
        assert_eq!(definition.role(), Role::Infrastructure);
        assert!(definition.capabilities().contains(Capability::Finalizer));
        assert_eq!(definition.precedence(), Precedence::Priority(0));
        assert_eq!(definition.attribute("base_package"), Some("app"));
        assert!(definition.is_lazy_init());
    }

    #[test]
    fn setters_mutate_in_place() {
        let mut definition = ComponentDefinition::new("service", |_| Ok(Instance::new(())));
        definition.set_role(Role::Support);
        definition.set_precedence(Precedence::Ordered(3));
        definition.set_lazy_init(true);
        definition.set_attribute("greeting", "hi");

        assert_eq!(definition.role().as_str(), "support");
        assert_eq!(definition.precedence(), Precedence::Ordered(3));
        assert!(definition.is_lazy_init());
        assert_eq!(definition.attributes().len(), 1);
        assert!(format!("{definition:?}").contains("service"));
    }
}
