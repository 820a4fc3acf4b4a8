//! Node.js wrapper generator
//!
//! Generates CommonJS (`.js`) and TypeScript (`.ts`) modules that
//! initialize the tracer once at load and re-export the instrumented handler
//! under its original name.

use crate::codegen::literal::{js_bool, js_labels, js_string};
use crate::codegen::{unique_alias, WrapperParams, TRACER_MODULE};

/// Module system of the generated wrapper
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleFlavor {
    /// `require` / `exports`
    CommonJs,
    /// `import` / `export`
    TypeScript,
}

/// Generator for Node.js wrappers
pub struct NodeGenerator<'a> {
    params: &'a WrapperParams<'a>,
    flavor: ModuleFlavor,
}

impl<'a> NodeGenerator<'a> {
    /// Create a generator for the given flavor
    pub fn new(params: &'a WrapperParams<'a>, flavor: ModuleFlavor) -> Self {
        Self { params, flavor }
    }

    /// Generate the complete wrapper source
    pub fn generate(&self) -> String {
        let p = self.params;
        let tracer = unique_alias(TRACER_MODULE, &[p.method]);
        let handler = unique_alias("epsagonHandler", &[p.method, &tracer]);

        let mut output = String::new();
        output.push_str("// Generated by epsagon-weld - do not edit manually\n");
        output.push_str(&self.generate_imports(&tracer, &handler));
        output.push('\n');

        let env_defaults = self.generate_env_defaults();
        if !env_defaults.is_empty() {
            output.push_str(&env_defaults);
            output.push('\n');
        }

        output.push_str(&self.generate_init(&tracer));
        output.push('\n');
        output.push_str(&self.generate_export(&tracer, &handler));
        output
    }

    fn generate_imports(&self, tracer: &str, handler: &str) -> String {
        let p = self.params;
        let module = format!("{}{}", "../".repeat(p.output_depth), p.module_path);

        match self.flavor {
            ModuleFlavor::CommonJs => format!(
                "const {} = require({});\nconst {} = require({});\n",
                tracer,
                js_string(TRACER_MODULE),
                handler,
                js_string(&format!("{}.js", module))
            ),
            ModuleFlavor::TypeScript => format!(
                "import * as {} from {};\nimport * as {} from {};\n",
                tracer,
                js_string(TRACER_MODULE),
                handler,
                js_string(&module)
            ),
        }
    }

    /// Ignore lists become environment defaults; an already-set variable wins.
    fn generate_env_defaults(&self) -> String {
        let p = self.params;
        let mut output = String::new();
        for (name, value) in [
            ("EPSAGON_URLS_TO_IGNORE", p.urls_to_ignore),
            ("EPSAGON_IGNORED_KEYS", p.ignored_keys),
        ] {
            if let Some(value) = value {
                output.push_str(&format!(
                    "process.env.{name} = process.env.{name} || {};\n",
                    js_string(value)
                ));
            }
        }
        output
    }

    /// Initialization call; absent optional fields are left out entirely.
    fn generate_init(&self, tracer: &str) -> String {
        let p = self.params;
        let mut fields = vec![format!("token: {}", js_string(p.token))];
        if let Some(app_name) = p.app_name {
            fields.push(format!("appName: {}", js_string(app_name)));
        }
        if let Some(url) = p.collector_url {
            fields.push(format!("traceCollectorURL: {}", js_string(url)));
        }
        fields.push(format!("metadataOnly: {}", js_bool(p.metadata_only)));
        if !p.labels.is_empty() {
            fields.push(format!("labels: {}", js_labels(p.labels)));
        }

        let mut output = format!("{}.init({{\n", tracer);
        for field in fields {
            output.push_str(&format!("    {},\n", field));
        }
        output.push_str("});\n");
        output
    }

    fn generate_export(&self, tracer: &str, handler: &str) -> String {
        let p = self.params;
        let wrapped = format!("{}.{}({}.{})", tracer, p.wrapper, handler, p.method);
        match self.flavor {
            ModuleFlavor::CommonJs => format!("exports.{} = {};\n", p.method, wrapped),
            ModuleFlavor::TypeScript => format!("export const {} = {};\n", p.method, wrapped),
        }
    }
}
