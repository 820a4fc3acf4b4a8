//! Shared helpers for pipeline tests

#![allow(dead_code)]

use deno_ast::{MediaType, ParseParams};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// A throwaway service root
pub struct Project {
    pub dir: TempDir,
}

impl Project {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    /// A project whose package.json declares the tracer
    pub fn with_tracer() -> Self {
        let project = Self::new();
        project.write("package.json", r#"{"dependencies": {"epsagon": "^1.100.0"}}"#);
        project
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn write(&self, relative: &str, content: &str) {
        let path = self.root().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    pub fn read(&self, relative: &str) -> String {
        fs::read_to_string(self.root().join(relative)).unwrap()
    }

    pub fn exists(&self, relative: &str) -> bool {
        self.root().join(relative).exists()
    }
}

/// Parse a generated JavaScript or TypeScript wrapper, panicking on any diagnostic
pub fn assert_parses(file_name: &str, source: &str) {
    let media_type = if file_name.ends_with(".ts") {
        MediaType::TypeScript
    } else {
        MediaType::JavaScript
    };
    let parsed = deno_ast::parse_module(ParseParams {
        specifier: deno_ast::ModuleSpecifier::parse(&format!("file:///{}", file_name)).unwrap(),
        text: source.into(),
        media_type,
        capture_tokens: false,
        scope_analysis: false,
        maybe_syntax: None,
    })
    .unwrap_or_else(|err| panic!("{} does not parse: {}\n{}", file_name, err, source));
    assert!(
        parsed.diagnostics().is_empty(),
        "{} has diagnostics: {:?}\n{}",
        file_name,
        parsed.diagnostics(),
        source
    );
}

/// Decode the single-quoted Python string literal at the start of `text`.
///
/// Returns the decoded value and the text following the closing quote.
pub fn read_py_string(text: &str) -> Option<(String, &str)> {
    let mut chars = text.char_indices();
    if chars.next()?.1 != '\'' {
        return None;
    }
    let mut value = String::new();
    while let Some((i, c)) = chars.next() {
        match c {
            '\'' => return Some((value, &text[i + 1..])),
            '\n' | '\r' => return None,
            '\\' => match chars.next()?.1 {
                'n' => value.push('\n'),
                'r' => value.push('\r'),
                't' => value.push('\t'),
                'x' => {
                    let hex: String = (0..2).filter_map(|_| chars.next().map(|(_, c)| c)).collect();
                    value.push(char::from_u32(u32::from_str_radix(&hex, 16).ok()?)?);
                }
                other => value.push(other),
            },
            c => value.push(c),
        }
    }
    None
}
