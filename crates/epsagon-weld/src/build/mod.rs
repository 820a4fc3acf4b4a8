//! Pipeline orchestration for wrapper generation
//!
//! This module provides:
//! - `WrapperBuilder`, which runs the whole pipeline and cleans up after it
//! - Handler source probing for TypeScript detection
//! - Tracer dependency validation
//! - Handler reassignment applied by the host
//! - The host lifecycle hook table

pub mod builder;
pub mod dependency;
pub mod hooks;
pub mod probe;
pub mod reassign;

pub use builder::{
    BuildError, BuildOutcome, DisabledReason, HookOutcome, Result, WrapperBuilder,
};
pub use dependency::validate_dependencies;
pub use hooks::{HookAction, LifecycleHook, UnknownHook};
pub use probe::{refine_languages, sibling_extension};
pub use reassign::{HandlerAssignment, Reassignment};
