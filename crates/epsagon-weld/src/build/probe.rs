//! Handler source probing
//!
//! Node.js runtimes run both JavaScript and TypeScript handlers. The
//! runtime string cannot tell them apart, so the handler module's sibling
//! files decide.

use crate::ir::ResolvedFunction;
use globset::GlobBuilder;
use std::path::Path;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Declaration files sit next to compiled JavaScript and say nothing about
/// the handler's own language
const DECLARATION_SUFFIX: &str = ".d.ts";

/// Extension of the first file (by name) matching `<source_path>.*`,
/// ignoring TypeScript declaration files
pub fn sibling_extension(root: &Path, source_path: &str) -> Option<String> {
    let source = Path::new(source_path);
    let stem = source.file_name()?.to_str()?;
    let dir = root.join(source.parent().unwrap_or_else(|| Path::new("")));

    let matcher = GlobBuilder::new(&format!("{}.*", escape_glob(stem)))
        .backslash_escape(true)
        .build()
        .ok()?
        .compile_matcher();

    let mut candidates: Vec<_> = WalkDir::new(&dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.file_name().to_owned())
        .filter(|name| matcher.is_match(name))
        .filter(|name| {
            !name
                .to_str()
                .is_some_and(|name| name.ends_with(DECLARATION_SUFFIX))
        })
        .collect();
    candidates.sort();

    let first = candidates.first()?;
    Path::new(first)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_string)
}

/// Refine every function's language from its handler source.
///
/// Runs over the whole set before any wrapper is rendered. Functions that
/// the refined language cannot express are dropped with a warning.
pub fn refine_languages(root: &Path, functions: Vec<ResolvedFunction>) -> Vec<ResolvedFunction> {
    functions
        .into_iter()
        .filter_map(|mut function| {
            if !function.language.refines_by_source() {
                return Some(function);
            }
            if let Some(extension) = sibling_extension(root, &function.source_path) {
                let refined = function.language.refine(&extension);
                if refined != function.language {
                    debug!(function = %function.key, from = %function.language, to = %refined, "refined language");
                    function.language = refined;
                }
            }
            if let Some(reason) = function.rejection() {
                warn!("{}, skipping", reason);
                return None;
            }
            Some(function)
        })
        .collect()
}

fn escape_glob(literal: &str) -> String {
    let mut escaped = String::with_capacity(literal.len());
    for c in literal.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '{' | '}' | '\\' | '!') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
