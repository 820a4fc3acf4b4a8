//! WrapperBuilder, the wrapper generation pipeline
//!
//! One run goes through these stages in order:
//! 1. Check the plugin is enabled and has a token
//! 2. Resolve eligible functions
//! 3. Refine languages from handler sources
//! 4. Validate the tracer dependency
//! 5. Render every wrapper in memory
//! 6. Read back wrappers that handlers already point at
//! 7. Purge and recreate the output directory
//! 8. Write all wrappers concurrently
//! 9. Return the handler reassignment for the host to apply
//!
//! Nothing on disk changes before step 7, so configuration and dependency
//! failures leave the previous output and the descriptor untouched.
//! The output directory must lie strictly inside the service root.

use crate::build::dependency::validate_dependencies;
use crate::build::hooks::{HookAction, LifecycleHook};
use crate::build::probe::refine_languages;
use crate::build::reassign::Reassignment;
use crate::codegen::python::PACKAGE_MARKER;
use crate::codegen::{generate_artifact, wrapper_file_name, CodegenError, WrapperArtifact};
use crate::ir::{
    generated_modules, resolve_functions, Language, PluginConfig, ServiceError, ServiceSpec,
};
use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument};

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, BuildError>;

/// Errors that can abort a pipeline run
#[derive(Debug, Error)]
pub enum BuildError {
    /// Filesystem failure
    #[error("IO error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The tracer is not declared for a language that needs it
    #[error(
        "The {package} package is required by {language} functions but is not declared in {}",
        .manifest.display()
    )]
    MissingDependency {
        package: String,
        language: Language,
        manifest: PathBuf,
    },

    /// The output directory would not be a subdirectory of the service root
    #[error("Output directory {dir:?} must be a subdirectory of the service directory")]
    InvalidOutputDir { dir: String },

    /// Wrapper rendering error
    #[error(transparent)]
    Codegen(#[from] CodegenError),

    /// Service descriptor error
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// A background task panicked or was cancelled
    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Why a run did nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisabledReason {
    /// `disable: true` in the plugin configuration
    Disabled,
    /// No collector token configured
    MissingToken,
}

/// Outcome of a successful run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutcome {
    /// The pipeline exited early without side effects
    Disabled(DisabledReason),
    /// Wrappers were written; the host should apply the reassignment
    Wrapped(Reassignment),
}

impl BuildOutcome {
    pub fn reassignment(&self) -> Option<&Reassignment> {
        match self {
            BuildOutcome::Wrapped(reassignment) => Some(reassignment),
            BuildOutcome::Disabled(_) => None,
        }
    }
}

/// Outcome of a dispatched lifecycle hook
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookOutcome {
    Built(BuildOutcome),
    Cleaned,
}

/// Generates wrappers for the functions of one service
///
/// # Example
/// ```no_run
/// use epsagon_weld::{ServiceDocument, WrapperBuilder};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let mut doc = ServiceDocument::load("serverless.yml")?;
/// let outcome = WrapperBuilder::new(".", doc.spec().clone()).run().await?;
/// if let Some(reassignment) = outcome.reassignment() {
///     reassignment.apply_to_document(&mut doc);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct WrapperBuilder {
    root: PathBuf,
    service: ServiceSpec,
    config: PluginConfig,
}

impl WrapperBuilder {
    /// Create a builder for a service rooted at `root`.
    ///
    /// The plugin configuration is taken from the descriptor's
    /// `custom.epsagon` block.
    pub fn new(root: impl Into<PathBuf>, service: ServiceSpec) -> Self {
        let config = service.plugin_config();
        Self {
            root: root.into(),
            service,
            config,
        }
    }

    /// Replace the plugin configuration
    pub fn config(mut self, config: PluginConfig) -> Self {
        self.config = config;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn plugin_config(&self) -> &PluginConfig {
        &self.config
    }

    /// Absolute output directory
    pub fn output_dir(&self) -> PathBuf {
        self.root.join(self.config.output_dir())
    }

    /// Output directory name, checked to stay below the service root
    fn checked_output_dir(&self) -> Result<String> {
        let dir = self.config.output_dir();
        let nested = Path::new(&dir)
            .components()
            .all(|component| matches!(component, Component::Normal(_)));
        if !nested {
            return Err(BuildError::InvalidOutputDir { dir });
        }
        Ok(dir)
    }

    /// Manifest consulted for the tracer dependency
    pub fn manifest_path(&self) -> PathBuf {
        let manifest = self
            .config
            .package_json_path
            .clone()
            .unwrap_or_else(|| PathBuf::from("package.json"));
        self.root.join(manifest)
    }

    /// Run the pipeline
    #[instrument(name = "epsagon", skip_all)]
    pub async fn run(&self) -> Result<BuildOutcome> {
        if self.config.disable {
            info!("Epsagon disabled - not wrapping functions");
            return Ok(BuildOutcome::Disabled(DisabledReason::Disabled));
        }
        let Some(token) = self.config.token() else {
            info!("No epsagon token was supplied - not wrapping functions");
            return Ok(BuildOutcome::Disabled(DisabledReason::MissingToken));
        };
        let output_dir_name = self.checked_output_dir()?;
        info!("Wrapping your functions with Epsagon...");

        let functions = resolve_functions(
            &self.service.functions,
            self.service.provider.runtime.as_deref(),
            &output_dir_name,
        );
        let root = self.root.clone();
        let functions =
            tokio::task::spawn_blocking(move || refine_languages(&root, functions)).await?;

        let languages: BTreeSet<Language> = functions.iter().map(|f| f.language).collect();
        validate_dependencies(&self.manifest_path(), &languages).await?;

        let mut artifacts = functions
            .iter()
            .map(|f| generate_artifact(f, &self.config, token))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let output_dir = self.root.join(&output_dir_name);
        let modules = generated_modules(&self.service.functions, &output_dir_name);
        for kept in read_existing(&output_dir, &modules).await? {
            if !artifacts.iter().any(|a| a.file_name == kept.file_name) {
                artifacts.push(kept);
            }
        }
        let has_python = artifacts
            .iter()
            .any(|a| a.file_name.ends_with(&format!(".{}", Language::Python.extension())));
        if has_python {
            artifacts.push(WrapperArtifact {
                file_name: PACKAGE_MARKER.to_string(),
                source: String::new(),
            });
        }

        remove_output_dir(&output_dir).await?;
        tokio::fs::create_dir_all(&output_dir)
            .await
            .map_err(|source| BuildError::Io {
                path: output_dir.clone(),
                source,
            })?;
        write_artifacts(&output_dir, artifacts).await?;

        let reassignment = Reassignment::from_functions(&functions, &output_dir_name);
        info!("Wrapped {} function(s) with Epsagon", reassignment.len());
        Ok(BuildOutcome::Wrapped(reassignment))
    }

    /// Remove the output directory. A missing directory is not an error.
    #[instrument(name = "epsagon", skip_all)]
    pub async fn cleanup(&self) -> Result<()> {
        let dir = self.checked_output_dir()?;
        info!("Cleaning up Epsagon's handlers");
        remove_output_dir(&self.root.join(dir)).await
    }

    /// Dispatch a host lifecycle event
    pub async fn handle(&self, hook: LifecycleHook) -> Result<HookOutcome> {
        debug!(event = %hook, "lifecycle hook");
        match hook.action() {
            HookAction::Run => Ok(HookOutcome::Built(self.run().await?)),
            HookAction::Cleanup => {
                self.cleanup().await?;
                Ok(HookOutcome::Cleaned)
            }
        }
    }
}

async fn remove_output_dir(path: &Path) -> Result<()> {
    match tokio::fs::remove_dir_all(path).await {
        Ok(()) => {
            debug!(path = %path.display(), "removed output directory");
            Ok(())
        }
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(source) => Err(BuildError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Read the existing wrapper files for `modules` before the directory is purged
async fn read_existing(dir: &Path, modules: &[String]) -> Result<Vec<WrapperArtifact>> {
    let mut kept = Vec::new();
    for module in modules {
        for language in Language::ALL {
            let file_name = wrapper_file_name(language, module);
            let path = dir.join(&file_name);
            match tokio::fs::read_to_string(&path).await {
                Ok(source) => {
                    debug!(path = %path.display(), "keeping existing wrapper");
                    kept.push(WrapperArtifact { file_name, source });
                }
                Err(err) if err.kind() == ErrorKind::NotFound => {}
                Err(source) => return Err(BuildError::Io { path, source }),
            }
        }
    }
    Ok(kept)
}

/// Write every artifact concurrently; the first failure aborts the rest.
async fn write_artifacts(dir: &Path, artifacts: Vec<WrapperArtifact>) -> Result<()> {
    let mut tasks = JoinSet::new();
    for artifact in artifacts {
        let path = dir.join(&artifact.file_name);
        tasks.spawn(async move {
            debug!(path = %path.display(), len = artifact.source.len(), "writing wrapper");
            tokio::fs::write(&path, artifact.source)
                .await
                .map_err(|source| BuildError::Io { path, source })
        });
    }

    while let Some(result) = tasks.join_next().await {
        result??;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::FunctionSpec;
    use tempfile::TempDir;

    fn service() -> ServiceSpec {
        ServiceSpec::default()
            .provider_runtime("nodejs18.x")
            .function("hello", FunctionSpec::new("src/handler.run"))
    }

    #[test]
    fn test_paths() {
        let builder = WrapperBuilder::new("/srv/app", service())
            .config(PluginConfig::with_token("abc").handlers_dir("gen/wrappers/"));
        assert_eq!(builder.output_dir(), PathBuf::from("/srv/app/gen/wrappers"));
        assert_eq!(builder.manifest_path(), PathBuf::from("/srv/app/package.json"));
    }

    #[tokio::test]
    async fn test_disabled_has_no_side_effects() {
        let temp = TempDir::new().unwrap();
        let mut config = PluginConfig::with_token("abc");
        config.disable = true;
        let builder = WrapperBuilder::new(temp.path(), service()).config(config);

        let outcome = builder.run().await.unwrap();
        assert_eq!(outcome, BuildOutcome::Disabled(DisabledReason::Disabled));
        assert!(!builder.output_dir().exists());
    }

    #[tokio::test]
    async fn test_missing_token_has_no_side_effects() {
        let temp = TempDir::new().unwrap();
        let builder = WrapperBuilder::new(temp.path(), service());

        let outcome = builder.run().await.unwrap();
        assert_eq!(outcome, BuildOutcome::Disabled(DisabledReason::MissingToken));
        assert!(outcome.reassignment().is_none());
        assert!(!builder.output_dir().exists());
    }

    #[tokio::test]
    async fn test_cleanup_missing_dir_is_ok() {
        let temp = TempDir::new().unwrap();
        let builder = WrapperBuilder::new(temp.path(), service());
        builder.cleanup().await.unwrap();
        assert_eq!(
            builder.handle(LifecycleHook::CleanCommand).await.unwrap(),
            HookOutcome::Cleaned
        );
    }

    #[tokio::test]
    async fn test_output_dir_outside_root_is_rejected() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("service");
        std::fs::create_dir_all(root.join("src")).unwrap();
        std::fs::write(root.join("src/handler.js"), "").unwrap();
        std::fs::write(root.join("package.json"), r#"{"dependencies": {"epsagon": "1"}}"#)
            .unwrap();

        for dir in ["..", "../service", "gen/../.."] {
            let builder = WrapperBuilder::new(&root, service())
                .config(PluginConfig::with_token("abc").handlers_dir(dir));
            let err = builder.run().await.unwrap_err();
            assert!(matches!(err, BuildError::InvalidOutputDir { .. }), "{}", dir);
            let err = builder.cleanup().await.unwrap_err();
            assert!(matches!(err, BuildError::InvalidOutputDir { .. }), "{}", dir);
        }
        assert!(root.join("src/handler.js").exists());
        assert!(root.join("package.json").exists());
    }

    #[tokio::test]
    async fn test_current_dir_falls_back_to_default() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("src")).unwrap();
        std::fs::write(temp.path().join("src/handler.js"), "").unwrap();
        std::fs::write(
            temp.path().join("package.json"),
            r#"{"dependencies": {"epsagon": "1"}}"#,
        )
        .unwrap();

        for dir in [".", "./"] {
            let builder = WrapperBuilder::new(temp.path(), service())
                .config(PluginConfig::with_token("abc").handlers_dir(dir));
            let outcome = builder.run().await.unwrap();
            assert_eq!(
                outcome.reassignment().unwrap().handler("hello"),
                Some("epsagon_handlers/hello-epsagon.run")
            );
            builder.cleanup().await.unwrap();
            assert!(temp.path().join("src/handler.js").exists());
            assert!(temp.path().join("package.json").exists());
        }
    }

    #[tokio::test]
    async fn test_write_failure_is_fatal() {
        let temp = TempDir::new().unwrap();
        let missing_dir = temp.path().join("does-not-exist");
        let err = write_artifacts(
            &missing_dir,
            vec![WrapperArtifact {
                file_name: "a.js".into(),
                source: String::new(),
            }],
        )
        .await
        .unwrap_err();
        assert!(matches!(err, BuildError::Io { .. }));
    }
}
