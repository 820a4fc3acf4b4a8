//! Native literal rendering
//!
//! Every configuration value reaches generated source through these
//! functions, never through raw interpolation.

use crate::ir::Label;
use std::fmt::Write;

/// Render a single-quoted JavaScript/TypeScript string literal
pub fn js_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{2028}' | '\u{2029}' => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c if c.is_control() => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// Render a single-quoted Python string literal
pub fn py_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                let _ = write!(out, "\\x{:02x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// Render a JavaScript boolean literal
pub fn js_bool(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

/// Render a Python boolean literal
pub fn py_bool(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}

/// Render labels as a JavaScript array; pairs become two-element arrays
pub fn js_labels(labels: &[Label]) -> String {
    let items: Vec<String> = labels
        .iter()
        .map(|label| match label {
            Label::Pair(key, value) => format!("[{}, {}]", js_string(key), js_string(value)),
            Label::Plain(value) => js_string(value),
        })
        .collect();
    format!("[{}]", items.join(", "))
}
