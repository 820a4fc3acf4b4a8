//! Code generation for handler wrappers
//!
//! This module provides one template per language:
//! - Python wrappers (`.py`) that degrade to the bare handler when the
//!   tracer is not installed
//! - Node.js CommonJS wrappers (`.js`)
//! - Node.js TypeScript wrappers (`.ts`)

pub mod literal;
pub mod node;
pub mod python;

pub use node::{ModuleFlavor, NodeGenerator};
pub use python::PythonGenerator;

use crate::ir::{Label, Language, PluginConfig, ResolvedFunction};
use std::path::Component;
use std::path::Path;
use thiserror::Error;

/// Module name of the tracing library imported by every wrapper
pub const TRACER_MODULE: &str = "epsagon";

/// Errors that can occur while preparing wrapper parameters
#[derive(Debug, Error)]
pub enum CodegenError {
    /// The wrapper kind cannot be emitted as an attribute name
    #[error("Invalid wrapper kind {wrapper:?} for {language} function {function}")]
    InvalidWrapperKind {
        wrapper: String,
        language: Language,
        function: String,
    },
}

/// Everything a template needs to render one wrapper
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrapperParams<'a> {
    /// Module path of the original handler, in the language's own syntax
    pub module_path: String,
    pub method: &'a str,
    /// Tracer function that instruments the handler
    pub wrapper: &'a str,
    pub token: &'a str,
    pub app_name: Option<&'a str>,
    pub collector_url: Option<&'a str>,
    pub metadata_only: bool,
    pub urls_to_ignore: Option<&'a str>,
    pub ignored_keys: Option<&'a str>,
    pub labels: &'a [Label],
    /// Number of directories between the service root and the wrapper
    pub output_depth: usize,
}

impl<'a> WrapperParams<'a> {
    /// Build parameters for a resolved function
    pub fn new(
        function: &'a ResolvedFunction,
        config: &'a PluginConfig,
        token: &'a str,
    ) -> Result<Self, CodegenError> {
        let wrapper = config.wrapper_for(function.language, function.wrapper_override.as_deref());
        if !function.language.is_identifier(wrapper) {
            return Err(CodegenError::InvalidWrapperKind {
                wrapper: wrapper.to_string(),
                language: function.language,
                function: function.key.clone(),
            });
        }

        Ok(Self {
            module_path: function.module_path(),
            method: &function.method,
            wrapper,
            token,
            app_name: config.app_name_value(),
            collector_url: config.collector_url(),
            metadata_only: config.metadata_only,
            urls_to_ignore: config.urls_to_ignore.as_deref(),
            ignored_keys: config.ignored_keys.as_deref(),
            labels: &config.labels,
            output_depth: output_depth(&config.output_dir()),
        })
    }
}

/// A rendered wrapper, ready to be written into the output directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrapperArtifact {
    pub file_name: String,
    pub source: String,
}

/// Render the wrapper source for a language
pub fn generate_wrapper(language: Language, params: &WrapperParams<'_>) -> String {
    match language {
        Language::Python => PythonGenerator::new(params).generate(),
        Language::Node => NodeGenerator::new(params, ModuleFlavor::CommonJs).generate(),
        Language::TsNode => NodeGenerator::new(params, ModuleFlavor::TypeScript).generate(),
    }
}

/// Render the wrapper artifact for a resolved function
pub fn generate_artifact(
    function: &ResolvedFunction,
    config: &PluginConfig,
    token: &str,
) -> Result<WrapperArtifact, CodegenError> {
    let params = WrapperParams::new(function, config, token)?;
    Ok(WrapperArtifact {
        file_name: function.file_name(),
        source: generate_wrapper(function.language, &params),
    })
}

/// File name of a generated wrapper: `<base>.<extension>`
pub fn wrapper_file_name(language: Language, base: &str) -> String {
    format!("{}.{}", base, language.extension())
}

/// Pick a binding name derived from `base` that is not in `taken`
pub(crate) fn unique_alias(base: &str, taken: &[&str]) -> String {
    let mut alias = base.to_string();
    while taken.contains(&alias.as_str()) {
        alias.insert(0, '_');
    }
    alias
}

fn output_depth(output_dir: &str) -> usize {
    Path::new(output_dir)
        .components()
        .filter(|c| matches!(c, Component::Normal(_)))
        .count()
        .max(1)
}
