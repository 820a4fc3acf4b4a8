pub mod clean;
pub mod hook;
pub mod run;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use epsagon_weld::{BuildOutcome, DisabledReason, ServiceDocument, WrapperBuilder};

/// Where the service lives and which descriptor to read
pub struct ServiceArgs {
    pub dir: PathBuf,
    pub config: PathBuf,
}

impl ServiceArgs {
    pub fn new(dir: PathBuf, config: PathBuf) -> Self {
        Self { dir, config }
    }

    pub fn descriptor_path(&self) -> PathBuf {
        self.dir.join(&self.config)
    }

    /// Load the descriptor and a builder rooted at the service directory
    pub fn load(&self) -> Result<(ServiceDocument, WrapperBuilder)> {
        let path = self.descriptor_path();
        let doc = ServiceDocument::load(&path)
            .with_context(|| format!("Failed to load service: {}", path.display()))?;
        let builder = WrapperBuilder::new(&self.dir, doc.spec().clone());
        Ok((doc, builder))
    }
}

/// Apply a run's reassignment and report it
pub fn report(mut doc: ServiceDocument, outcome: &BuildOutcome, output: Option<&Path>) -> Result<()> {
    let reassignment = match outcome {
        BuildOutcome::Disabled(DisabledReason::Disabled) => {
            println!("Epsagon is disabled; no functions were wrapped.");
            return Ok(());
        }
        BuildOutcome::Disabled(DisabledReason::MissingToken) => {
            println!("No Epsagon token configured; no functions were wrapped.");
            return Ok(());
        }
        BuildOutcome::Wrapped(reassignment) => reassignment,
    };
    reassignment.apply_to_document(&mut doc);

    if let Some(output) = output {
        let yaml = doc.to_yaml_string()?;
        std::fs::write(output, yaml)
            .with_context(|| format!("Failed to write {}", output.display()))?;
        println!(
            "Wrapped {} function(s); descriptor written to {}",
            reassignment.len(),
            output.display()
        );
        return Ok(());
    }

    if reassignment.is_empty() {
        println!("No functions to wrap.");
    }
    for (key, assignment) in &reassignment.handlers {
        println!("{:24} {}", key, assignment.handler);
    }
    Ok(())
}
