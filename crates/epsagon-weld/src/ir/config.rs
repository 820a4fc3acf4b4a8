//! Plugin configuration
//!
//! Read from the `custom.epsagon` block of the service descriptor. Field
//! names accept both the plugin's historical spellings and their long forms.

use crate::ir::Language;
use serde::de::{self, Deserializer};
use serde::Deserialize;
use std::path::PathBuf;

/// Default directory (relative to the service root) for generated wrappers
pub const DEFAULT_HANDLERS_DIR: &str = "epsagon_handlers";

/// A trace label: either a bare value or a `[key, value]` pair
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Label {
    Pair(String, String),
    Plain(String),
}

/// Process-wide configuration for one pipeline run
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PluginConfig {
    /// Collector token. Without one the pipeline does nothing.
    #[serde(alias = "collectorToken")]
    pub token: Option<String>,

    #[serde(alias = "applicationName")]
    pub app_name: Option<String>,

    /// Disable wrapping for every function
    #[serde(deserialize_with = "lenient_bool")]
    pub disable: bool,

    #[serde(deserialize_with = "lenient_bool")]
    pub metadata_only: bool,

    /// Output directory, relative to the service root
    #[serde(alias = "outputDirName")]
    pub handlers_dir_name: String,

    /// Manifest consulted for the tracer dependency (default: `package.json`)
    #[serde(alias = "packageManifestPath")]
    pub package_json_path: Option<PathBuf>,

    #[serde(rename = "collectorURL", alias = "collectorUrl")]
    pub collector_url: Option<String>,

    /// Comma-joined URL patterns the tracer ignores
    #[serde(deserialize_with = "joined_list")]
    pub urls_to_ignore: Option<String>,

    /// Comma-joined payload keys the tracer ignores
    #[serde(deserialize_with = "joined_list")]
    pub ignored_keys: Option<String>,

    pub labels: Vec<Label>,

    /// Global wrapper-kind override
    #[serde(alias = "wrapperKindOverride")]
    pub wrapper: Option<String>,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            token: None,
            app_name: None,
            disable: false,
            metadata_only: false,
            handlers_dir_name: DEFAULT_HANDLERS_DIR.to_string(),
            package_json_path: None,
            collector_url: None,
            urls_to_ignore: None,
            ignored_keys: None,
            labels: Vec::new(),
            wrapper: None,
        }
    }
}

impl PluginConfig {
    /// Create a config with only a token set
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            ..Self::default()
        }
    }

    /// Set the application name
    pub fn app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = Some(app_name.into());
        self
    }

    /// Set the output directory name
    pub fn handlers_dir(mut self, dir: impl Into<String>) -> Self {
        self.handlers_dir_name = dir.into();
        self
    }

    /// The collector token, if one is set and non-empty
    pub fn token(&self) -> Option<&str> {
        non_empty(&self.token)
    }

    pub fn app_name_value(&self) -> Option<&str> {
        non_empty(&self.app_name)
    }

    pub fn collector_url(&self) -> Option<&str> {
        non_empty(&self.collector_url)
    }

    /// Output directory with forward slashes, no empty or `.` segments and
    /// no trailing separator.
    ///
    /// Falls back to the default when nothing is left, so the service root
    /// itself is never the output directory. `..` segments are kept; the
    /// builder rejects them.
    pub fn output_dir(&self) -> String {
        let normalized = self.handlers_dir_name.replace('\\', "/");
        let segments: Vec<&str> = normalized
            .split('/')
            .filter(|segment| !segment.is_empty() && *segment != ".")
            .collect();
        if segments.is_empty() {
            DEFAULT_HANDLERS_DIR.to_string()
        } else {
            segments.join("/")
        }
    }

    /// Pick the wrapper kind for a function.
    ///
    /// Per-function override wins over the global override, which wins over
    /// the language default.
    pub fn wrapper_for<'a>(&'a self, language: Language, function_override: Option<&'a str>) -> &'a str {
        function_override
            .filter(|w| !w.is_empty())
            .or_else(|| non_empty(&self.wrapper))
            .unwrap_or_else(|| language.default_wrapper())
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Accept YAML booleans as well as `"true"`/`"false"` strings.
pub(crate) fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Text(String),
    }

    match Option::<Flag>::deserialize(deserializer)? {
        None => Ok(false),
        Some(Flag::Bool(value)) => Ok(value),
        Some(Flag::Text(text)) => match text.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(true),
            "false" | "0" | "" => Ok(false),
            other => Err(de::Error::custom(format!("expected a boolean, got {:?}", other))),
        },
    }
}

/// Accept a string or a list of strings, joined with commas. Empty becomes `None`.
fn joined_list<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    let joined = match Option::<OneOrMany>::deserialize(deserializer)? {
        None => return Ok(None),
        Some(OneOrMany::One(value)) => value,
        Some(OneOrMany::Many(values)) => values.join(","),
    };
    Ok(Some(joined).filter(|v| !v.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config: PluginConfig = serde_yaml::from_str("token: abc").unwrap();
        assert_eq!(config.token(), Some("abc"));
        assert!(!config.metadata_only);
        assert!(!config.disable);
        assert_eq!(config.output_dir(), "epsagon_handlers");
    }

    #[test]
    fn test_aliases_and_lenient_values() {
        let yaml = r#"
collectorToken: abc
applicationName: svc
metadataOnly: "true"
disable: false
outputDirName: 'gen\wrappers/'
collectorURL: https://collector.example.com
urlsToIgnore: [a.com, b.com]
ignoredKeys: password
labels:
  - [team, core]
  - plain
wrapperKindOverride: stepLambdaWrapper
"#;
        let config: PluginConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.token(), Some("abc"));
        assert_eq!(config.app_name_value(), Some("svc"));
        assert!(config.metadata_only);
        assert_eq!(config.output_dir(), "gen/wrappers");
        assert_eq!(config.collector_url(), Some("https://collector.example.com"));
        assert_eq!(config.urls_to_ignore.as_deref(), Some("a.com,b.com"));
        assert_eq!(config.ignored_keys.as_deref(), Some("password"));
        assert_eq!(
            config.labels,
            vec![
                Label::Pair("team".into(), "core".into()),
                Label::Plain("plain".into())
            ]
        );
        assert_eq!(config.wrapper.as_deref(), Some("stepLambdaWrapper"));
    }

    #[test]
    fn test_invalid_flag_is_rejected() {
        let result: Result<PluginConfig, _> = serde_yaml::from_str("metadataOnly: maybe");
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_values_are_absent() {
        let config: PluginConfig =
            serde_yaml::from_str("token: ''\ncollectorURL: ''\nurlsToIgnore: []").unwrap();
        assert_eq!(config.token(), None);
        assert_eq!(config.collector_url(), None);
        assert_eq!(config.urls_to_ignore, None);
    }

    #[test]
    fn test_wrapper_precedence() {
        let mut config = PluginConfig::with_token("abc");
        assert_eq!(config.wrapper_for(Language::Python, None), "lambda_wrapper");
        assert_eq!(config.wrapper_for(Language::TsNode, None), "lambdaWrapper");

        config.wrapper = Some("globalWrapper".into());
        assert_eq!(config.wrapper_for(Language::Node, None), "globalWrapper");
        assert_eq!(config.wrapper_for(Language::Node, Some("fnWrapper")), "fnWrapper");
    }

    #[test]
    fn test_output_dir_never_resolves_to_root() {
        for dir in ["", ".", "./", "/", "\\", "./."] {
            let config = PluginConfig::default().handlers_dir(dir);
            assert_eq!(config.output_dir(), DEFAULT_HANDLERS_DIR, "{:?}", dir);
        }
        let config = PluginConfig::default().handlers_dir("./gen/./wrappers/");
        assert_eq!(config.output_dir(), "gen/wrappers");
        let config = PluginConfig::default().handlers_dir("build\\epsagon");
        assert_eq!(config.output_dir(), "build/epsagon");
        let config = PluginConfig::default().handlers_dir("../outside");
        assert_eq!(config.output_dir(), "../outside");
    }
}
