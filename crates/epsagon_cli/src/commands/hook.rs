use std::path::Path;

use anyhow::Result;
use epsagon_weld::{HookAction, HookOutcome, LifecycleHook};

use super::{report, ServiceArgs};

/// Execute the `hook` command: dispatch one lifecycle event.
pub async fn execute(service: &ServiceArgs, event: &str, output: Option<&Path>) -> Result<()> {
    let hook: LifecycleHook = event.parse()?;
    let (doc, builder) = service.load()?;
    match builder.handle(hook).await? {
        HookOutcome::Built(outcome) => report(doc, &outcome, output),
        HookOutcome::Cleaned => {
            println!("Removed {}", builder.output_dir().display());
            Ok(())
        }
    }
}

/// Print every lifecycle event and the action it triggers
pub fn list() {
    for hook in LifecycleHook::ALL {
        let action = match hook.action() {
            HookAction::Run => "run",
            HookAction::Cleanup => "clean",
        };
        println!("{:45} {}", hook.event(), action);
    }
}
