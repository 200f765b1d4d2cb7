//! Eligibility checker inserted ahead of the discovered instance hooks.
//!
//! # Responsibility
//! - Detect components that finish initializing before the pipeline holds
//!   every instance hook it is expected to hold.
//!
//! # Invariants
//! - The checker never replaces or vetoes an instance.
//! - Instance hooks themselves and infrastructure-role components are never
//!   reported.
//! - The target count is fixed at construction time.

use crate::extension::contract::{Extension, HookResult, InitContext, InstanceHook};
use crate::model::definition::Role;
use crate::model::instance::Instance;
use log::info;
use serde::Serialize;
use std::sync::Mutex;

/// Pipeline name of the checker entry.
pub const ELIGIBILITY_CHECKER_NAME: &str = "internal.eligibility_checker";

/// One component that missed part of the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IneligibleComponent {
    pub name: String,
    pub type_name: String,
    pub role: Role,
    pub pipeline_len: usize,
    pub target_count: usize,
}

/// Checker state relative to the current pipeline length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EligibilityState {
    /// Pipeline is still below the target count.
    Armed,
    /// Pipeline reached the target count.
    Settled,
}

#[derive(Debug)]
pub struct EligibilityChecker {
    target_count: usize,
    reports: Mutex<Vec<IneligibleComponent>>,
}

impl EligibilityChecker {
    pub fn new(target_count: usize) -> Self {
        Self {
            target_count,
            reports: Mutex::new(vec![]),
        }
    }

    pub fn target_count(&self) -> usize {
        self.target_count
    }

    pub fn state(&self, pipeline_len: usize) -> EligibilityState {
        if pipeline_len < self.target_count {
            EligibilityState::Armed
        } else {
            EligibilityState::Settled
        }
    }

    /// Components reported so far, in report order.
    pub fn reports(&self) -> Vec<IneligibleComponent> {
        self.reports
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl InstanceHook for EligibilityChecker {
    fn after_init(&self, instance: Instance, ctx: &InitContext<'_>) -> HookResult<Option<Instance>> {
        if instance.is_instance_hook()
            || ctx.role == Role::Infrastructure
            || self.state(ctx.pipeline_len) == EligibilityState::Settled
        {
            return Ok(Some(instance));
        }

        info!(
            "event=component_not_eligible module=eligibility status=report component={} type={} pipeline_len={} target={} detail=not_processed_by_all_instance_hooks",
            ctx.component_name,
            instance.type_name(),
            ctx.pipeline_len,
            self.target_count
        );
        self.reports
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(IneligibleComponent {
                name: ctx.component_name.to_string(),
                type_name: instance.type_name().to_string(),
                role: ctx.role,
                pipeline_len: ctx.pipeline_len,
                target_count: self.target_count,
            });
        Ok(Some(instance))
    }
}

impl Extension for EligibilityChecker {
    fn as_instance_hook(&self) -> Option<&dyn InstanceHook> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::{EligibilityChecker, EligibilityState};
    use crate::extension::contract::{Extension, InitContext, InstanceHook};
    use crate::model::definition::Role;
    use crate::model::instance::Instance;

    struct Hook;

    impl InstanceHook for Hook {}

    impl Extension for Hook {
        fn as_instance_hook(&self) -> Option<&dyn InstanceHook> {
            Some(self)
        }
    }

    fn ctx(name: &str, role: Role, pipeline_len: usize) -> InitContext<'_> {
        InitContext {
            component_name: name,
            role,
            pipeline_len,
        }
    }

    #[test]
    fn reports_application_components_below_target() {
        let checker = EligibilityChecker::new(5);
        let instance = Instance::new(42_u32);
        let returned = checker
            .after_init(instance.clone(), &ctx("early", Role::Application, 3))
            .expect("checker never fails")
            .expect("checker never vetoes");
        assert!(returned.ptr_eq(&instance));

        let reports = checker.reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].name, "early");
        assert_eq!(reports[0].type_name, "u32");
        assert_eq!(reports[0].role, Role::Application);
        assert_eq!(reports[0].target_count, 5);
    }

    #[test]
    fn ignores_hooks_infrastructure_and_settled_pipeline() {
        let checker = EligibilityChecker::new(5);
        checker
            .after_init(Instance::extension(Hook), &ctx("hook", Role::Application, 2))
            .expect("hook");
        checker
            .after_init(Instance::new(()), &ctx("infra", Role::Infrastructure, 2))
            .expect("infra");
        checker
            .after_init(Instance::new(()), &ctx("late", Role::Application, 5))
            .expect("late");
        assert!(checker.reports().is_empty());
    }

    #[test]
    fn state_tracks_target() {
        let checker = EligibilityChecker::new(3);
        assert_eq!(checker.state(2), EligibilityState::Armed);
        assert_eq!(checker.state(3), EligibilityState::Settled);
        assert_eq!(checker.target_count(), 3);
    }
}
