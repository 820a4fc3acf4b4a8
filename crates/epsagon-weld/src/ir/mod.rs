//! Intermediate Representation (IR) for wrapper generation
//!
//! This module provides the declared service model read from the host
//! descriptor and the resolved per-function descriptors derived from it.

pub mod config;
pub mod function;
pub mod language;
pub mod service;

pub use config::*;
pub use function::*;
pub use language::*;
pub use service::*;
