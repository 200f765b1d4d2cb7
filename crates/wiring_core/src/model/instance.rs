//! Type-erased component instances.

use crate::extension::contract::Extension;
use std::any::Any;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

/// Created component value.
///
/// Plain components are stored as `Arc<dyn Any>`; extensions additionally
/// keep an `Arc<dyn Extension>` view of the same allocation so hooks can be
/// queried without downcasting.
#[derive(Clone)]
pub struct Instance {
    type_name: &'static str,
    value: Arc<dyn Any + Send + Sync>,
    extension: Option<Arc<dyn Extension>>,
}

impl Instance {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self::from_arc(Arc::new(value))
    }

    pub fn from_arc<T: Any + Send + Sync>(value: Arc<T>) -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
            value,
            extension: None,
        }
    }

    pub fn extension<E: Extension + Any>(extension: E) -> Self {
        Self::shared_extension(Arc::new(extension))
    }

    /// Wraps an extension the caller keeps a handle to.
    pub fn shared_extension<E: Extension + Any>(extension: Arc<E>) -> Self {
        let view: Arc<dyn Extension> = extension.clone();
        Self {
            type_name: std::any::type_name::<E>(),
            value: extension,
            extension: Some(view),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.value.clone().downcast::<T>().ok()
    }

    pub fn as_extension(&self) -> Option<&Arc<dyn Extension>> {
        self.extension.as_ref()
    }

    /// Whether this instance is itself an instance hook.
    pub fn is_instance_hook(&self) -> bool {
        self.extension
            .as_ref()
            .is_some_and(|extension| extension.as_instance_hook().is_some())
    }

    /// Whether both handles point at the same allocation.
    pub fn ptr_eq(&self, other: &Instance) -> bool {
        Arc::ptr_eq(&self.value, &other.value)
    }
}

impl Debug for Instance {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instance")
            .field("type_name", &self.type_name)
            .field("extension", &self.extension.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::Instance;
    use crate::extension::contract::{Extension, InstanceHook};
    use std::sync::Arc;

    #[derive(Debug, PartialEq)]
    struct Greeting {
        text: String,
    }

    struct Hook;

    impl InstanceHook for Hook {}

    impl Extension for Hook {
        fn as_instance_hook(&self) -> Option<&dyn InstanceHook> {
            Some(self)
        }
    }

    #[test]
    fn downcasts_plain_values() {
        let instance = Instance::new(Greeting {
            text: "hello".to_string(),
        });
        let greeting = instance.downcast::<Greeting>().expect("greeting");
        assert_eq!(greeting.text, "hello");
        assert!(instance.downcast::<String>().is_none());
        assert!(instance.as_extension().is_none());
        assert!(instance.type_name().ends_with("Greeting"));
    }

    #[test]
    fn extension_instances_expose_both_views() {
        let hook = Arc::new(Hook);
        let instance = Instance::shared_extension(hook.clone());
        assert!(instance.is_instance_hook());
        assert!(instance.downcast::<Hook>().is_some_and(|value| Arc::ptr_eq(&value, &hook)));
        assert!(instance.ptr_eq(&instance.clone()));
        assert!(!instance.ptr_eq(&Instance::extension(Hook)));
    }
}
