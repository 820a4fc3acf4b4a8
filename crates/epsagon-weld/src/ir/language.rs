//! Function languages
//!
//! A function's language is derived once from its runtime string and then
//! carried as a typed tag through resolution, rendering and file naming.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Implementation language of a deployable function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// CPython runtimes (`python3.x`)
    Python,
    /// Node.js runtimes with CommonJS JavaScript sources
    Node,
    /// Node.js runtimes whose handler module is written in TypeScript
    #[serde(rename = "tsnode")]
    TsNode,
}

/// Runtime substrings checked in order; the first match wins.
///
/// `TsNode` never appears here: it is only reachable by refining `Node`
/// from the handler's source file.
const RUNTIME_MATCHERS: &[(&str, Language)] = &[
    ("python", Language::Python),
    ("node", Language::Node),
];

/// Python keywords; none of them can name a module segment or a binding
const PYTHON_KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global",
    "if", "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return",
    "try", "while", "with", "yield",
];

/// Words that cannot be bound by `export const` in an ES module
const ES_MODULE_RESERVED: &[&str] = &[
    "arguments", "await", "break", "case", "catch", "class", "const", "continue", "debugger",
    "default", "delete", "do", "else", "enum", "eval", "export", "extends", "false", "finally",
    "for", "function", "if", "implements", "import", "in", "instanceof", "interface", "let",
    "new", "null", "package", "private", "protected", "public", "return", "static", "super",
    "switch", "this", "throw", "true", "try", "typeof", "var", "void", "while", "with", "yield",
];

impl Language {
    /// Every supported language
    pub const ALL: [Language; 3] = [Language::Python, Language::Node, Language::TsNode];

    /// Classify a runtime string such as `nodejs18.x` or `python3.11`
    pub fn from_runtime(runtime: &str) -> Option<Self> {
        let runtime = runtime.to_ascii_lowercase();
        RUNTIME_MATCHERS
            .iter()
            .find(|(needle, _)| runtime.contains(needle))
            .map(|(_, language)| *language)
    }

    /// Short stable name used in logs
    pub fn as_str(self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::Node => "node",
            Language::TsNode => "tsnode",
        }
    }

    /// File extension of generated wrappers. Unique per language.
    pub fn extension(self) -> &'static str {
        match self {
            Language::Python => "py",
            Language::Node => "js",
            Language::TsNode => "ts",
        }
    }

    /// Name of the tracer function used when nothing overrides it
    pub fn default_wrapper(self) -> &'static str {
        match self {
            Language::Python => "lambda_wrapper",
            Language::Node | Language::TsNode => "lambdaWrapper",
        }
    }

    /// Whether the handler's source file may reclassify this language
    pub fn refines_by_source(self) -> bool {
        matches!(self, Language::Node)
    }

    /// Refine a classification from the extension of the handler's source file
    pub fn refine(self, source_extension: &str) -> Self {
        match (self, source_extension) {
            (Language::Node, "ts") => Language::TsNode,
            (language, _) => language,
        }
    }

    /// Whether module paths use dotted namespaces instead of file paths
    pub fn uses_dotted_modules(self) -> bool {
        matches!(self, Language::Python)
    }

    /// Whether the tracer's presence can be checked in the project manifest
    pub fn has_verifiable_dependency(self) -> bool {
        matches!(self, Language::Node | Language::TsNode)
    }

    /// Whether `name` is a reserved word where wrappers bind or import it.
    ///
    /// CommonJS wrappers only use the method as a property name, so nothing
    /// is reserved for them.
    pub fn is_reserved(self, name: &str) -> bool {
        match self {
            Language::Python => PYTHON_KEYWORDS.contains(&name),
            Language::TsNode => ES_MODULE_RESERVED.contains(&name),
            Language::Node => false,
        }
    }

    /// Whether `name` can be emitted verbatim as an identifier (ASCII only)
    pub fn is_identifier(self, name: &str) -> bool {
        let extra = |c: char| c == '_' || (c == '$' && !matches!(self, Language::Python));
        let mut chars = name.chars();
        let well_formed = match chars.next() {
            Some(first) if first.is_ascii_alphabetic() || extra(first) => {
                chars.all(|c| c.is_ascii_alphanumeric() || extra(c))
            }
            _ => false,
        };
        well_formed && !self.is_reserved(name)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
