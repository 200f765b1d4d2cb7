//! Extension contracts.
//!
//! This module defines the hook families an extension may implement, the
//! capability declarations used for discovery, and the precedence order used
//! by every invocation phase.

pub mod capability;
pub mod contract;
pub mod precedence;
