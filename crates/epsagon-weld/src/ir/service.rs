//! Service descriptor model
//!
//! The subset of a `serverless.yml` this crate reads: the provider default
//! runtime, the function map, packaging lists and the `custom.epsagon`
//! block. [`ServiceDocument`] keeps the raw YAML alongside the typed view so
//! handler reassignment can be written back without losing unrelated keys.
//! Only the typed view sees `${env:NAME}` values; the raw YAML keeps the
//! references, so secrets never reach a written-back descriptor.

use crate::ir::PluginConfig;
use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;

static ENV_VAR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{env:([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid env var regex")
});

/// Errors raised while reading a service descriptor
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The descriptor could not be read
    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The descriptor is not valid YAML or does not match the expected shape
    #[error("Invalid service descriptor: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// `${env:NAME}` references to unset variables
    #[error("Missing environment variable(s): {}", .0.join(", "))]
    MissingEnv(Vec<String>),
}

/// Provider-wide defaults
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSpec {
    pub runtime: Option<String>,
}

/// Per-function `epsagon` block
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct FunctionOverrides {
    #[serde(deserialize_with = "crate::ir::config::lenient_bool")]
    pub disable: bool,
    #[serde(alias = "wrapperKind")]
    pub wrapper: Option<String>,
}

/// Artifact inclusion/exclusion patterns
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackageSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclude: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patterns: Option<Vec<String>>,
}

impl PackageSpec {
    /// Whether an explicit inclusion list is configured
    pub fn has_inclusions(&self) -> bool {
        self.include.is_some() || self.patterns.is_some()
    }

    /// Append `pattern` to every configured inclusion list that lacks it
    pub fn add_inclusion(&mut self, pattern: &str) {
        for list in [self.include.as_mut(), self.patterns.as_mut()].into_iter().flatten() {
            if !list.iter().any(|existing| existing == pattern) {
                list.push(pattern.to_string());
            }
        }
    }
}

/// A declared function
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FunctionSpec {
    /// `<module-path>.<exportedMethod>`
    pub handler: Option<String>,
    pub runtime: Option<String>,
    #[serde(rename = "epsagon")]
    pub overrides: Option<FunctionOverrides>,
    pub package: Option<PackageSpec>,
}

impl FunctionSpec {
    /// Create a function with a handler reference
    pub fn new(handler: impl Into<String>) -> Self {
        Self {
            handler: Some(handler.into()),
            ..Self::default()
        }
    }

    /// Set the runtime
    pub fn runtime(mut self, runtime: impl Into<String>) -> Self {
        self.runtime = Some(runtime.into());
        self
    }

    /// Set per-function overrides
    pub fn overrides(mut self, overrides: FunctionOverrides) -> Self {
        self.overrides = Some(overrides);
        self
    }

    /// Whether the function opted out of wrapping
    pub fn is_disabled(&self) -> bool {
        self.overrides.as_ref().is_some_and(|o| o.disable)
    }

    /// Per-function wrapper-kind override
    pub fn wrapper_override(&self) -> Option<&str> {
        self.overrides.as_ref().and_then(|o| o.wrapper.as_deref())
    }
}

/// `custom` section; only the `epsagon` block is read
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CustomSection {
    pub epsagon: Option<PluginConfig>,
}

/// Typed view over a service descriptor
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServiceSpec {
    pub provider: ProviderSpec,
    pub functions: IndexMap<String, FunctionSpec>,
    pub package: Option<PackageSpec>,
    pub custom: CustomSection,
}

impl ServiceSpec {
    /// Parse a descriptor from YAML, substituting `${env:NAME}` first
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ServiceError> {
        let substituted = substitute_env_vars(yaml)?;
        Ok(serde_yaml::from_str(&substituted)?)
    }

    /// Add a function
    pub fn function(mut self, key: impl Into<String>, spec: FunctionSpec) -> Self {
        self.functions.insert(key.into(), spec);
        self
    }

    /// Set the provider default runtime
    pub fn provider_runtime(mut self, runtime: impl Into<String>) -> Self {
        self.provider.runtime = Some(runtime.into());
        self
    }

    /// Set the plugin configuration
    pub fn with_config(mut self, config: PluginConfig) -> Self {
        self.custom.epsagon = Some(config);
        self
    }

    /// The plugin configuration, or defaults when the block is absent
    pub fn plugin_config(&self) -> PluginConfig {
        self.custom.epsagon.clone().unwrap_or_default()
    }
}

/// A descriptor loaded from disk: raw YAML plus its typed view
#[derive(Debug, Clone)]
pub struct ServiceDocument {
    /// As written, with `${env:NAME}` references intact
    raw: serde_yaml::Value,
    /// With `${env:NAME}` references substituted
    spec: ServiceSpec,
}

impl ServiceDocument {
    /// Parse a descriptor from YAML.
    ///
    /// The typed view is built from the substituted text; the raw YAML is not.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ServiceError> {
        let raw: serde_yaml::Value = serde_yaml::from_str(yaml)?;
        let spec = ServiceSpec::from_yaml_str(yaml)?;
        Ok(Self { raw, spec })
    }

    /// Load a descriptor file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ServiceError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ServiceError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&content)
    }

    pub fn spec(&self) -> &ServiceSpec {
        &self.spec
    }

    pub fn spec_mut(&mut self) -> &mut ServiceSpec {
        &mut self.spec
    }

    pub fn raw(&self) -> &serde_yaml::Value {
        &self.raw
    }

    /// Mutable access to the raw YAML; the typed view is not refreshed
    pub fn raw_mut(&mut self) -> &mut serde_yaml::Value {
        &mut self.raw
    }

    /// Serialize the raw YAML
    pub fn to_yaml_string(&self) -> Result<String, ServiceError> {
        Ok(serde_yaml::to_string(&self.raw)?)
    }
}

/// Substitute `${env:NAME}` references with environment variable values.
///
/// All missing variables are reported together.
pub fn substitute_env_vars(input: &str) -> Result<String, ServiceError> {
    let mut missing = Vec::new();
    let substituted = ENV_VAR_RE.replace_all(input, |caps: &regex::Captures<'_>| {
        match std::env::var(&caps[1]) {
            Ok(value) => value,
            Err(_) => {
                missing.push(caps[1].to_string());
                String::new()
            }
        }
    });

    if !missing.is_empty() {
        return Err(ServiceError::MissingEnv(missing));
    }
    Ok(substituted.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SERVICE: &str = r#"
service: demo
provider:
  name: aws
  runtime: nodejs18.x
package:
  include:
    - src/**
functions:
  hello:
    handler: src/handler.run
  report:
    handler: jobs/report.main
    runtime: python3.11
    epsagon:
      disable: true
  typed:
    handler: src/typed.handle
    epsagon:
      wrapper: stepLambdaWrapper
    package:
      patterns:
        - src/typed.ts
custom:
  epsagon:
    token: abc
    appName: svc
"#;

    #[test]
    fn test_parse_service() {
        let spec = ServiceSpec::from_yaml_str(SERVICE).unwrap();
        assert_eq!(spec.provider.runtime.as_deref(), Some("nodejs18.x"));
        let keys: Vec<_> = spec.functions.keys().cloned().collect();
        assert_eq!(keys, vec!["hello", "report", "typed"]);
        assert!(spec.functions["report"].is_disabled());
        assert_eq!(spec.functions["typed"].wrapper_override(), Some("stepLambdaWrapper"));
        assert_eq!(spec.plugin_config().token(), Some("abc"));
        assert!(spec.package.as_ref().unwrap().has_inclusions());
    }

    #[test]
    fn test_missing_custom_block_uses_defaults() {
        let spec = ServiceSpec::from_yaml_str("functions: {}").unwrap();
        let config = spec.plugin_config();
        assert_eq!(config.token(), None);
        assert_eq!(config.output_dir(), "epsagon_handlers");
    }

    #[test]
    fn test_add_inclusion_is_deduplicated() {
        let mut package = PackageSpec {
            include: Some(vec!["src/**".into()]),
            exclude: Some(vec!["tests/**".into()]),
            patterns: Some(Vec::new()),
        };
        package.add_inclusion("epsagon_handlers/**");
        package.add_inclusion("epsagon_handlers/**");
        assert_eq!(package.include.as_ref().unwrap(), &vec!["src/**", "epsagon_handlers/**"]);
        assert_eq!(package.patterns.as_ref().unwrap(), &vec!["epsagon_handlers/**"]);
        assert_eq!(package.exclude.as_ref().unwrap(), &vec!["tests/**"]);
    }

    #[test]
    fn test_add_inclusion_without_lists_is_noop() {
        let mut package = PackageSpec::default();
        package.add_inclusion("epsagon_handlers/**");
        assert_eq!(package, PackageSpec::default());
    }

    #[test]
    fn test_env_substitution() {
        std::env::set_var("EPSAGON_WELD_TEST_TOKEN", "from-env");
        let yaml = "custom:\n  epsagon:\n    token: ${env:EPSAGON_WELD_TEST_TOKEN}\n";
        let spec = ServiceSpec::from_yaml_str(yaml).unwrap();
        assert_eq!(spec.plugin_config().token(), Some("from-env"));
        std::env::remove_var("EPSAGON_WELD_TEST_TOKEN");
    }

    #[test]
    fn test_missing_env_vars_all_reported() {
        let input = "${env:EPSAGON_WELD_MISSING_A} ${env:EPSAGON_WELD_MISSING_B}";
        let err = substitute_env_vars(input).unwrap_err().to_string();
        assert!(err.contains("EPSAGON_WELD_MISSING_A"));
        assert!(err.contains("EPSAGON_WELD_MISSING_B"));
    }

    #[test]
    fn test_document_keeps_env_references() {
        std::env::set_var("EPSAGON_WELD_TEST_SECRET", "s3cr3t");
        let yaml = "functions: {}\ncustom:\n  epsagon:\n    token: ${env:EPSAGON_WELD_TEST_SECRET}\n";
        let doc = ServiceDocument::from_yaml_str(yaml).unwrap();
        std::env::remove_var("EPSAGON_WELD_TEST_SECRET");

        assert_eq!(doc.spec().plugin_config().token(), Some("s3cr3t"));
        let written = doc.to_yaml_string().unwrap();
        assert!(written.contains("${env:EPSAGON_WELD_TEST_SECRET}"), "{}", written);
        assert!(!written.contains("s3cr3t"));
    }

    #[test]
    fn test_document_keeps_unknown_keys() {
        let doc = ServiceDocument::from_yaml_str(SERVICE).unwrap();
        assert_eq!(doc.raw()["service"].as_str(), Some("demo"));
        assert_eq!(doc.spec().functions.len(), 3);
        let yaml = doc.to_yaml_string().unwrap();
        assert!(yaml.contains("service: demo"));
    }
}
