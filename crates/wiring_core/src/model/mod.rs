//! Component model shared by the registry and the extension contracts.
//!
//! # Responsibility
//! - Define component definitions and the type-erased instances they create.
//!
//! # Invariants
//! - Every component is identified by a stable registry name.
//! - Instances are shared through `Arc`; a registry hands out the same
//!   allocation for repeated lookups of one name.

pub mod definition;
pub mod instance;
