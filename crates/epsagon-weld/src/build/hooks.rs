//! Host lifecycle hooks
//!
//! Maps the deployment orchestrator's lifecycle events to pipeline actions.

use std::fmt;
use std::str::FromStr;

/// What a lifecycle event triggers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookAction {
    /// Generate wrappers and reassign handlers
    Run,
    /// Remove the output directory
    Cleanup,
}

/// A lifecycle event the pipeline is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleHook {
    BeforePackage,
    BeforeDeployFunction,
    BeforeInvokeLocal,
    BeforeOfflineStart,
    BeforeStepFunctionsOffline,
    AfterPackage,
    AfterInvokeLocal,
    RunCommand,
    CleanCommand,
}

impl LifecycleHook {
    pub const ALL: [LifecycleHook; 9] = [
        LifecycleHook::BeforePackage,
        LifecycleHook::BeforeDeployFunction,
        LifecycleHook::BeforeInvokeLocal,
        LifecycleHook::BeforeOfflineStart,
        LifecycleHook::BeforeStepFunctionsOffline,
        LifecycleHook::AfterPackage,
        LifecycleHook::AfterInvokeLocal,
        LifecycleHook::RunCommand,
        LifecycleHook::CleanCommand,
    ];

    /// Event name as the host emits it
    pub fn event(self) -> &'static str {
        match self {
            LifecycleHook::BeforePackage => "before:package:createDeploymentArtifacts",
            LifecycleHook::BeforeDeployFunction => "before:deploy:function:packageFunction",
            LifecycleHook::BeforeInvokeLocal => "before:invoke:local:invoke",
            LifecycleHook::BeforeOfflineStart => "before:offline:start:init",
            LifecycleHook::BeforeStepFunctionsOffline => "before:step-functions-offline:start",
            LifecycleHook::AfterPackage => "after:package:createDeploymentArtifacts",
            LifecycleHook::AfterInvokeLocal => "after:invoke:local:invoke",
            LifecycleHook::RunCommand => "epsagon:run",
            LifecycleHook::CleanCommand => "epsagon:clean:init",
        }
    }

    /// Look up a hook by event name
    pub fn from_event(event: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|hook| hook.event() == event)
    }

    pub fn action(self) -> HookAction {
        match self {
            LifecycleHook::AfterPackage
            | LifecycleHook::AfterInvokeLocal
            | LifecycleHook::CleanCommand => HookAction::Cleanup,
            _ => HookAction::Run,
        }
    }
}

impl fmt::Display for LifecycleHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.event())
    }
}

/// Unknown lifecycle event name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown lifecycle event: {0}")]
pub struct UnknownHook(pub String);

impl FromStr for LifecycleHook {
    type Err = UnknownHook;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_event(s).ok_or_else(|| UnknownHook(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_round_trip() {
        for hook in LifecycleHook::ALL {
            assert_eq!(hook.event().parse::<LifecycleHook>(), Ok(hook));
        }
    }

    #[test]
    fn test_actions() {
        assert_eq!(LifecycleHook::BeforePackage.action(), HookAction::Run);
        assert_eq!(LifecycleHook::BeforeInvokeLocal.action(), HookAction::Run);
        assert_eq!(LifecycleHook::AfterPackage.action(), HookAction::Cleanup);
        assert_eq!(LifecycleHook::CleanCommand.action(), HookAction::Cleanup);
    }

    #[test]
    fn test_unknown_event() {
        let err = "before:remove:remove".parse::<LifecycleHook>().unwrap_err();
        assert_eq!(err.to_string(), "Unknown lifecycle event: before:remove:remove");
    }
}
