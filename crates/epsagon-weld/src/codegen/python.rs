//! Python wrapper generator
//!
//! The generated module binds the original handler first and only then
//! tries to import the tracer. If the import fails the module keeps
//! exporting the unwrapped handler and prints a warning, so the function
//! still loads in environments where the tracer is not installed. This
//! fallback is part of the artifact's contract.

use crate::codegen::literal::{py_bool, py_string};
use crate::codegen::{unique_alias, WrapperParams, TRACER_MODULE};

/// Empty package marker written next to Python wrappers
pub const PACKAGE_MARKER: &str = "__init__.py";

/// Printed by the generated module when the tracer cannot be imported
pub const MISSING_TRACER_WARNING: &str =
    "Warning: Epsagon package not found. The function will not be monitored";

/// Generator for Python wrappers
pub struct PythonGenerator<'a> {
    params: &'a WrapperParams<'a>,
}

impl<'a> PythonGenerator<'a> {
    /// Create a new Python generator
    pub fn new(params: &'a WrapperParams<'a>) -> Self {
        Self { params }
    }

    /// Generate the complete wrapper source
    pub fn generate(&self) -> String {
        let p = self.params;
        let internal = format!("{}_internal", p.method);
        let tracer = unique_alias(TRACER_MODULE, &[p.method, &internal]);
        let os = unique_alias("os", &[p.method, &internal, &tracer]);

        let mut output = String::new();
        output.push_str("# Generated by epsagon-weld - do not edit manually\n");
        output.push_str(&format!(
            "from {} import {} as {}\n\n",
            p.module_path, p.method, internal
        ));
        output.push_str(&format!("{} = {}\n\n", p.method, internal));

        output.push_str("try:\n");
        output.push_str(&import_line(TRACER_MODULE, &tracer));

        let env_defaults = self.generate_env_defaults(&os);
        if !env_defaults.is_empty() {
            output.push_str(&import_line("os", &os));
            output.push('\n');
            output.push_str(&env_defaults);
        }
        output.push('\n');

        output.push_str(&self.generate_init(&tracer));
        output.push('\n');
        output.push_str(&format!(
            "    {} = {}.{}({})\n",
            p.method, tracer, p.wrapper, internal
        ));
        output.push_str("except ImportError:\n");
        output.push_str(&format!("    print({})\n", py_string(MISSING_TRACER_WARNING)));
        output
    }

    /// Ignore lists become environment defaults; an already-set variable wins.
    fn generate_env_defaults(&self, os: &str) -> String {
        let p = self.params;
        let mut output = String::new();
        for (name, value) in [
            ("EPSAGON_URLS_TO_IGNORE", p.urls_to_ignore),
            ("EPSAGON_IGNORED_KEYS", p.ignored_keys),
        ] {
            if let Some(value) = value {
                output.push_str(&format!(
                    "    {}.environ.setdefault({}, {})\n",
                    os,
                    py_string(name),
                    py_string(value)
                ));
            }
        }
        output
    }

    /// Initialization call; absent optional fields are left out entirely.
    ///
    /// The Python tracer takes no labels at init time.
    fn generate_init(&self, tracer: &str) -> String {
        let p = self.params;
        let mut args = vec![format!("token={}", py_string(p.token))];
        if let Some(app_name) = p.app_name {
            args.push(format!("app_name={}", py_string(app_name)));
        }
        if let Some(url) = p.collector_url {
            args.push(format!("collector_url={}", py_string(url)));
        }
        args.push(format!("metadata_only={}", py_bool(p.metadata_only)));

        let mut output = format!("    {}.init(\n", tracer);
        for arg in args {
            output.push_str(&format!("        {},\n", arg));
        }
        output.push_str("    )\n");
        output
    }
}

fn import_line(module: &str, alias: &str) -> String {
    if module == alias {
        format!("    import {}\n", module)
    } else {
        format!("    import {} as {}\n", module, alias)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn params(method: &str) -> WrapperParams<'_> {
        WrapperParams {
            module_path: "src.handler".into(),
            method,
            wrapper: "lambda_wrapper",
            token: "abc",
            app_name: Some("svc"),
            collector_url: None,
            metadata_only: false,
            urls_to_ignore: None,
            ignored_keys: None,
            labels: &[],
            output_depth: 1,
        }
    }

    #[test]
    fn test_generate_python() {
        let p = params("run");
        let output = PythonGenerator::new(&p).generate();

        let expected = "\
# Generated by epsagon-weld - do not edit manually
from src.handler import run as run_internal

run = run_internal

try:
    import epsagon

    epsagon.init(
        token='abc',
        app_name='svc',
        metadata_only=False,
    )

    run = epsagon.lambda_wrapper(run_internal)
except ImportError:
    print('Warning: Epsagon package not found. The function will not be monitored')
";
        assert_eq!(output, expected);
    }

    #[test]
    fn test_fallback_structure() {
        let p = params("handle");
        let output = PythonGenerator::new(&p).generate();

        // The unwrapped handler is bound before the tracer import is attempted.
        let bind = output.find("handle = handle_internal").unwrap();
        let try_block = output.find("try:\n    import epsagon").unwrap();
        let except = output.find("except ImportError:").unwrap();
        assert!(bind < try_block && try_block < except);
        assert!(output[except..].contains("print('Warning: Epsagon package not found."));
    }

    #[test]
    fn test_optional_fields_and_escaping() {
        let mut p = params("run");
        p.token = "a'b\\c";
        p.collector_url = Some("https://collector.example.com");
        p.metadata_only = true;
        p.urls_to_ignore = Some("a.com");
        p.ignored_keys = Some("password,secret");
        let output = PythonGenerator::new(&p).generate();

        assert!(output.contains(r"        token='a\'b\\c',"));
        assert!(output.contains("        collector_url='https://collector.example.com',\n"));
        assert!(output.contains("        metadata_only=True,\n"));
        assert!(output.contains("    import os\n"));
        assert!(output.contains("    os.environ.setdefault('EPSAGON_URLS_TO_IGNORE', 'a.com')\n"));
        assert!(output.contains(
            "    os.environ.setdefault('EPSAGON_IGNORED_KEYS', 'password,secret')\n"
        ));
    }

    #[test]
    fn test_absent_collector_url_is_omitted() {
        let p = params("run");
        let output = PythonGenerator::new(&p).generate();
        assert!(!output.contains("collector_url"));
        assert!(!output.contains("None"));
        assert!(!output.contains("import os"));
    }

    #[test]
    fn test_method_named_like_imports() {
        let mut p = params("epsagon");
        p.urls_to_ignore = Some("a.com");
        let output = PythonGenerator::new(&p).generate();
        assert!(output.contains("    import epsagon as _epsagon\n"));
        assert!(output.contains("    epsagon = _epsagon.lambda_wrapper(epsagon_internal)\n"));

        let mut p = params("os");
        p.urls_to_ignore = Some("a.com");
        let output = PythonGenerator::new(&p).generate();
        assert!(output.contains("    import os as _os\n"));
        assert!(output.contains("    _os.environ.setdefault("));
    }
}
