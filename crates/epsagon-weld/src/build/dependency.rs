//! Tracer dependency validation
//!
//! Node.js projects must declare the tracer in their `package.json`, or
//! every wrapper would fail at load time. Python projects cannot be checked
//! ahead of time; their wrappers degrade on their own.

use crate::build::builder::BuildError;
use crate::codegen::TRACER_MODULE;
use crate::ir::Language;
use std::collections::BTreeSet;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

/// `package.json` sections that count as declaring a dependency
const DEPENDENCY_SECTIONS: &[&str] = &["dependencies", "devDependencies"];

#[derive(Debug, Error)]
enum ManifestError {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Json(#[from] serde_json::Error),
}

/// Validate the tracer dependency once per distinct language.
///
/// A missing dependency is fatal for languages whose manifest can be
/// checked. An unreadable manifest only produces a warning.
pub async fn validate_dependencies(
    manifest: &Path,
    languages: &BTreeSet<Language>,
) -> Result<(), BuildError> {
    if languages.contains(&Language::Python) {
        warn!(
            "Cannot verify that the {} package is installed for Python functions; \
             their wrappers run unmonitored if it is missing",
            TRACER_MODULE
        );
    }

    let Some(language) = languages
        .iter()
        .copied()
        .find(|language| language.has_verifiable_dependency())
    else {
        return Ok(());
    };

    match manifest_declares(manifest, TRACER_MODULE).await {
        Ok(true) => {
            debug!(manifest = %manifest.display(), "tracer dependency found");
            Ok(())
        }
        Ok(false) => Err(BuildError::MissingDependency {
            package: TRACER_MODULE.to_string(),
            language,
            manifest: manifest.to_path_buf(),
        }),
        Err(err) => {
            warn!(
                "Could not read {} ({}); skipping the {} dependency check",
                manifest.display(),
                err,
                TRACER_MODULE
            );
            Ok(())
        }
    }
}

async fn manifest_declares(manifest: &Path, package: &str) -> Result<bool, ManifestError> {
    let content = tokio::fs::read_to_string(manifest).await?;
    let json: serde_json::Value = serde_json::from_str(&content)?;
    Ok(DEPENDENCY_SECTIONS
        .iter()
        .filter_map(|section| json.get(section))
        .any(|deps| deps.get(package).is_some()))
}
