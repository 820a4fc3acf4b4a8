//! Handler reassignment
//!
//! The pipeline never edits the host's descriptor while it runs. It returns
//! a [`Reassignment`] that the host applies once every wrapper is on disk.

use crate::ir::{PackageSpec, ResolvedFunction, ServiceDocument, ServiceSpec};
use indexmap::IndexMap;
use serde_yaml::Value;

/// New handler reference and wrapper path for one function
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerAssignment {
    /// `<output-dir>/<wrapper-name>.<method>`
    pub handler: String,
    /// `<output-dir>/<wrapper-file>`, added to explicit inclusion lists
    pub artifact: String,
}

/// Mapping from function key to its new handler reference
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reassignment {
    /// Output directory, `/`-separated
    pub output_dir: String,
    pub handlers: IndexMap<String, HandlerAssignment>,
}

impl Reassignment {
    /// Create an empty reassignment for an output directory
    pub fn new(output_dir: impl Into<String>) -> Self {
        Self {
            output_dir: output_dir.into(),
            handlers: IndexMap::new(),
        }
    }

    /// Build the reassignment for a set of resolved functions
    pub fn from_functions(functions: &[ResolvedFunction], output_dir: &str) -> Self {
        let handlers = functions
            .iter()
            .map(|f| {
                let assignment = HandlerAssignment {
                    handler: f.handler_ref(output_dir),
                    artifact: f.artifact_path(output_dir),
                };
                (f.key.clone(), assignment)
            })
            .collect();
        Self {
            output_dir: output_dir.to_string(),
            handlers,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// New handler reference for a function key
    pub fn handler(&self, key: &str) -> Option<&str> {
        self.handlers.get(key).map(|a| a.handler.as_str())
    }

    /// Directory-wide pattern for the top-level inclusion list
    pub fn output_pattern(&self) -> String {
        format!("{}/**", self.output_dir)
    }

    /// Apply to a typed descriptor
    pub fn apply(&self, service: &mut ServiceSpec) {
        for (key, assignment) in &self.handlers {
            let Some(function) = service.functions.get_mut(key) else {
                continue;
            };
            function.handler = Some(assignment.handler.clone());
            if let Some(package) = function.package.as_mut() {
                package.add_inclusion(&assignment.artifact);
            }
        }

        if !self.is_empty() {
            if let Some(package) = service.package.as_mut() {
                package.add_inclusion(&self.output_pattern());
            }
        }
    }

    /// Apply to raw descriptor YAML, leaving unrelated keys untouched
    pub fn apply_to_yaml(&self, doc: &mut Value) {
        if let Some(functions) = doc.get_mut("functions") {
            for (key, assignment) in &self.handlers {
                let Some(function) = functions.get_mut(key.as_str()) else {
                    continue;
                };
                if let Some(map) = function.as_mapping_mut() {
                    map.insert(Value::from("handler"), Value::from(assignment.handler.clone()));
                }
                add_yaml_inclusion(function.get_mut("package"), &assignment.artifact);
            }
        }

        if !self.is_empty() {
            add_yaml_inclusion(doc.get_mut("package"), &self.output_pattern());
        }
    }

    /// Apply to a loaded document, keeping its raw and typed views in step
    pub fn apply_to_document(&self, doc: &mut ServiceDocument) {
        self.apply_to_yaml(doc.raw_mut());
        self.apply(doc.spec_mut());
    }
}

/// YAML counterpart of [`PackageSpec::add_inclusion`]
fn add_yaml_inclusion(package: Option<&mut Value>, pattern: &str) {
    let Some(package) = package else {
        return;
    };
    for key in ["include", "patterns"] {
        if let Some(list) = package.get_mut(key).and_then(Value::as_sequence_mut) {
            if !list.iter().any(|v| v.as_str() == Some(pattern)) {
                list.push(Value::from(pattern));
            }
        }
    }
}
