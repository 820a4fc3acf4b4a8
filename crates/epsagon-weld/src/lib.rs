//! Epsagon-Weld: tracing wrappers for serverless function handlers
//!
//! For every eligible function in a service descriptor this crate renders a
//! small wrapper module that initializes the Epsagon tracer and re-exports
//! the original handler instrumented, then reports the handler references
//! the host should switch to.
//!
//! # Architecture
//!
//! - `ir`: Service descriptor model, plugin configuration, language
//!   classification and resolved function descriptors
//! - `codegen`: Per-language wrapper templates and literal escaping
//! - `build`: The pipeline, dependency checks, reassignment and cleanup
//!
//! # Usage
//!
//! ```rust,ignore
//! use epsagon_weld::{ServiceDocument, WrapperBuilder};
//!
//! let mut doc = ServiceDocument::load("serverless.yml")?;
//! let builder = WrapperBuilder::new(".", doc.spec().clone());
//! if let Some(reassignment) = builder.run().await?.reassignment() {
//!     reassignment.apply_to_document(&mut doc);
//! }
//! ```

pub mod build;
pub mod codegen;
pub mod ir;

// Re-export commonly used types
pub use build::{
    BuildError, BuildOutcome, DisabledReason, HookAction, HookOutcome, LifecycleHook,
    Reassignment, WrapperBuilder,
};
pub use codegen::{generate_wrapper, wrapper_file_name, WrapperArtifact, WrapperParams};
pub use ir::{
    FunctionSpec, Language, PluginConfig, ResolvedFunction, ServiceDocument, ServiceError,
    ServiceSpec,
};
