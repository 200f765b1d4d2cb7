//! Bootstrap-time extension orchestration.
//!
//! # Responsibility
//! - Run registry mutators to a fixed point, then finalize the registry.
//! - Build the instance-lifecycle pipeline with its eligibility checker.
//!
//! # Invariants
//! - One [`ExtensionInvoker`] drives exactly one container bootstrap.
//! - Every failure surfaces as [`BootstrapError`] naming the extension and
//!   the phase.

pub mod eligibility;
pub mod error;
pub mod invoker;
pub mod pipeline_builder;
pub mod processed;

pub use eligibility::{EligibilityChecker, IneligibleComponent, ELIGIBILITY_CHECKER_NAME};
pub use error::{BootstrapError, Phase};
pub use invoker::{ExtensionInvoker, MutationSummary, SuppliedExtension};
pub use pipeline_builder::BuiltPipeline;
pub use processed::ProcessedSet;
