use anyhow::Result;

use super::ServiceArgs;

/// Execute the `clean` command: remove the generated handlers directory.
pub async fn execute(service: &ServiceArgs) -> Result<()> {
    let (_, builder) = service.load()?;
    builder.cleanup().await?;
    println!("Removed {}", builder.output_dir().display());
    Ok(())
}
