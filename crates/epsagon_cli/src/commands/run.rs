use std::path::Path;

use anyhow::Result;

use super::{report, ServiceArgs};

/// Execute the `run` command: generate wrappers and reassign handlers.
pub async fn execute(service: &ServiceArgs, output: Option<&Path>) -> Result<()> {
    let (doc, builder) = service.load()?;
    let outcome = builder.run().await?;
    report(doc, &outcome, output)
}
