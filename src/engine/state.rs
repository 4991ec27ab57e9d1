//! Engine state machine states.

use std::fmt;

/// Where the engine is in a purchase cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineState {
    /// Resolving regions, snapshotting currency, arming the first refresh.
    Init,
    /// Polling the countdown and filtering readings.
    Monitoring,
    /// Countdown hit 0:01; waiting out the pre-click delay.
    TriggerWindow,
    /// Clicking buy and polling for the purchase signal.
    Buying,
    /// Dismissing the confirmation overlay.
    VerifyConfirm,
    /// Settling, cleaning up, and deciding loop-vs-finish.
    PostRefresh,
    /// Run finished normally.
    Completed,
    /// Run stopped by request.
    Stopped,
    /// Run aborted on an unrecoverable error.
    Failed(String),
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineState::Init => write!(f, "Initializing"),
            EngineState::Monitoring => write!(f, "Watching countdown"),
            EngineState::TriggerWindow => write!(f, "Trigger window"),
            EngineState::Buying => write!(f, "Buying"),
            EngineState::VerifyConfirm => write!(f, "Confirming purchase"),
            EngineState::PostRefresh => write!(f, "Post-purchase cleanup"),
            EngineState::Completed => write!(f, "Completed"),
            EngineState::Stopped => write!(f, "Stopped"),
            EngineState::Failed(reason) => write!(f, "Failed: {}", reason),
        }
    }
}

impl EngineState {
    /// Terminal states end the run loop.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            EngineState::Completed | EngineState::Stopped | EngineState::Failed(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(EngineState::Completed.is_terminal());
        assert!(EngineState::Stopped.is_terminal());
        assert!(EngineState::Failed("x".into()).is_terminal());
        assert!(!EngineState::Monitoring.is_terminal());
        assert!(!EngineState::Buying.is_terminal());
    }

    #[test]
    fn test_display() {
        assert_eq!(EngineState::Monitoring.to_string(), "Watching countdown");
        assert_eq!(
            EngineState::Failed("no window".into()).to_string(),
            "Failed: no window"
        );
    }
}
