//! Listener detection for container events.

use crate::extension::contract::{Extension, HookResult, InitContext, InstanceHook};
use crate::model::instance::Instance;
use log::debug;
use std::sync::{Arc, Mutex};

/// Pipeline name of the detector entry.
pub const LISTENER_DETECTOR_NAME: &str = "internal.listener_detector";

/// Instance hook that collects components implementing the event-listener
/// capability once they finish initializing.
#[derive(Default)]
pub struct ListenerDetector {
    listeners: Mutex<Vec<(String, Arc<dyn Extension>)>>,
}

impl ListenerDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Detected listeners in detection order.
    pub fn listeners(&self) -> Vec<(String, Arc<dyn Extension>)> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(String, Arc<dyn Extension>)>> {
        self.listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for ListenerDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<String> = self.lock().iter().map(|(name, _)| name.clone()).collect();
        f.debug_struct("ListenerDetector")
            .field("listeners", &names)
            .finish()
    }
}

impl InstanceHook for ListenerDetector {
    fn after_init(&self, instance: Instance, ctx: &InitContext<'_>) -> HookResult<Option<Instance>> {
        let Some(extension) = instance.as_extension() else {
            return Ok(Some(instance));
        };
        if extension.as_event_listener().is_none() {
            return Ok(Some(instance));
        }

        let mut listeners = self.lock();
        if !listeners.iter().any(|(name, _)| name == ctx.component_name) {
            debug!(
                "event=listener_detect module=container status=ok name={}",
                ctx.component_name
            );
            listeners.push((ctx.component_name.to_string(), extension.clone()));
        }
        drop(listeners);
        Ok(Some(instance))
    }
}

impl Extension for ListenerDetector {
    fn as_instance_hook(&self) -> Option<&dyn InstanceHook> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::ListenerDetector;
    use crate::extension::contract::{
        ContainerEvent, EventListener, Extension, HookResult, InitContext, InstanceHook,
    };
    use crate::model::definition::Role;
    use crate::model::instance::Instance;

    struct Audit;

    impl EventListener for Audit {
        fn on_event(&self, _event: &ContainerEvent) -> HookResult<()> {
            Ok(())
        }
    }

    impl Extension for Audit {
        fn as_event_listener(&self) -> Option<&dyn EventListener> {
            Some(self)
        }
    }

    fn ctx(name: &str) -> InitContext<'_> {
        InitContext {
            component_name: name,
            role: Role::Application,
            pipeline_len: 1,
        }
    }

    #[test]
    fn collects_listeners_once_and_ignores_other_components() {
        let detector = ListenerDetector::new();
        let audit = Instance::extension(Audit);
        detector.after_init(audit.clone(), &ctx("audit")).expect("audit");
        detector.after_init(audit, &ctx("audit")).expect("audit again");
        detector
            .after_init(Instance::new("plain"), &ctx("plain"))
            .expect("plain");

        let names: Vec<String> = detector
            .listeners()
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(names, vec!["audit"]);

        detector.clear();
        assert!(detector.is_empty());
    }
}
