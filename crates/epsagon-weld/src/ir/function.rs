//! Function descriptor resolution
//!
//! Walks the declared function map, drops functions that cannot or should
//! not be wrapped, and produces one [`ResolvedFunction`] per eligible
//! function.

use crate::codegen::wrapper_file_name;
use crate::ir::{FunctionSpec, Language};
use indexmap::IndexMap;
use tracing::{debug, info, warn};

/// Suffix appended to a function key to name its wrapper module
pub const WRAPPER_SUFFIX: &str = "-epsagon";

/// Wrapper module name for a function key.
///
/// The key is embedded verbatim, so distinct keys never share a wrapper.
pub fn wrapper_name(key: &str) -> String {
    format!("{}{}", key, WRAPPER_SUFFIX)
}

/// An eligible function, enriched with everything the generator needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFunction {
    /// Key in the function map
    pub key: String,
    pub language: Language,
    /// Exported callable the wrapper re-exports under the same name
    pub method: String,
    /// Handler module path relative to the service root, `/`-separated
    pub source_path: String,
    /// Wrapper module name (file name without extension)
    pub wrapper_name: String,
    /// Per-function wrapper-kind override
    pub wrapper_override: Option<String>,
}

impl ResolvedFunction {
    /// Module path as the wrapper imports it.
    ///
    /// Python uses dotted namespaces; other languages keep the path as-is.
    pub fn module_path(&self) -> String {
        if self.language.uses_dotted_modules() {
            self.source_path.replace(['/', '\\'], ".")
        } else {
            self.source_path.clone()
        }
    }

    /// File name of the generated wrapper
    pub fn file_name(&self) -> String {
        wrapper_file_name(self.language, &self.wrapper_name)
    }

    /// Handler reference pointing at the generated wrapper
    pub fn handler_ref(&self, output_dir: &str) -> String {
        format!("{}/{}.{}", output_dir, self.wrapper_name, self.method)
    }

    /// Path of the generated wrapper relative to the service root
    pub fn artifact_path(&self, output_dir: &str) -> String {
        format!("{}/{}", output_dir, self.file_name())
    }

    /// Why this function cannot be rendered for its current language.
    ///
    /// Checked again after source probing, since TypeScript reserves more
    /// words than CommonJS.
    pub fn rejection(&self) -> Option<String> {
        if !self.language.is_identifier(&self.method) {
            return Some(format!(
                "method {:?} of function {} is not a valid {} identifier",
                self.method, self.key, self.language
            ));
        }
        if self.language.uses_dotted_modules()
            && !self
                .module_path()
                .split('.')
                .all(|segment| self.language.is_identifier(segment))
        {
            return Some(format!(
                "module {:?} of function {} is not an importable {} module",
                self.source_path, self.key, self.language
            ));
        }
        None
    }
}

/// Resolve every eligible function, preserving declaration order.
///
/// Exclusions, in order: functions disabled by their override (logged),
/// functions without a runtime (silent), functions whose runtime maps to no
/// supported language (logged). Malformed handler references and handlers
/// that already point into `output_dir` are skipped with a warning.
pub fn resolve_functions(
    functions: &IndexMap<String, FunctionSpec>,
    default_runtime: Option<&str>,
    output_dir: &str,
) -> Vec<ResolvedFunction> {
    functions
        .iter()
        .filter_map(|(key, func)| resolve_function(key, func, default_runtime, output_dir))
        .collect()
}

/// Wrapper modules that declared handlers already point at.
///
/// Names are relative to `output_dir`. These wrappers came from an earlier
/// run whose reassignment was persisted, so regeneration must keep them.
pub fn generated_modules(
    functions: &IndexMap<String, FunctionSpec>,
    output_dir: &str,
) -> Vec<String> {
    let mut modules: Vec<String> = Vec::new();
    for func in functions.values() {
        let Some((source_path, _)) = func.handler.as_deref().and_then(split_handler) else {
            continue;
        };
        if let Some(module) = generated_module(&source_path, output_dir) {
            if !modules.iter().any(|m| m == module) {
                modules.push(module.to_string());
            }
        }
    }
    modules
}

/// Module name inside `output_dir` when `source_path` points directly into it
fn generated_module<'a>(source_path: &'a str, output_dir: &str) -> Option<&'a str> {
    source_path
        .strip_prefix(output_dir)?
        .strip_prefix('/')
        .filter(|module| !module.is_empty() && !module.contains('/'))
}

fn resolve_function(
    key: &str,
    func: &FunctionSpec,
    default_runtime: Option<&str>,
    output_dir: &str,
) -> Option<ResolvedFunction> {
    if func.is_disabled() {
        info!("Epsagon is disabled for function {}, skipping", key);
        return None;
    }

    let Some(runtime) = func.runtime.as_deref().or(default_runtime) else {
        debug!(function = %key, "no runtime declared, skipping");
        return None;
    };

    let Some(language) = Language::from_runtime(runtime) else {
        warn!("runtime \"{}\" is not supported yet, skipping function {}", runtime, key);
        return None;
    };

    let Some((source_path, method)) = func.handler.as_deref().and_then(split_handler) else {
        warn!(
            "handler {:?} of function {} is not a <module>.<method> reference, skipping",
            func.handler.as_deref().unwrap_or_default(),
            key
        );
        return None;
    };

    if generated_module(&source_path, output_dir).is_some() {
        warn!(
            "handler of function {} already points at generated wrapper {}, keeping it",
            key, source_path
        );
        return None;
    }

    let resolved = ResolvedFunction {
        key: key.to_string(),
        language,
        method,
        source_path,
        wrapper_name: wrapper_name(key),
        wrapper_override: func.wrapper_override().map(str::to_string),
    };

    if let Some(reason) = resolved.rejection() {
        warn!("{}, skipping", reason);
        return None;
    }
    Some(resolved)
}

/// Split `<module-path>.<method>` on its last dot
fn split_handler(handler: &str) -> Option<(String, String)> {
    let handler = handler.trim().replace('\\', "/");
    let handler = handler.trim_start_matches("./");
    let (module, method) = handler.rsplit_once('.')?;
    if module.is_empty() || method.is_empty() {
        return None;
    }
    Some((module.to_string(), method.to_string()))
}
