// mcdex-common/src/model/pack.rs
use std::fmt;

use tracing::debug;

use crate::error::{McdexError, Result};
use crate::pipeline::PipelineStage;

#[derive(Debug, Clone)]
pub struct FailureReason {
    pub stage: PipelineStage,
    pub error: McdexError,
}

/// Lifecycle of a pack handle within one command.
#[derive(Debug, Clone, Default)]
pub enum PackState {
    #[default]
    Uninitialized,
    Created,
    ManifestLoaded,
    Resolving,
    Installing,
    Ready,
    Failed(FailureReason),
}

impl PackState {
    pub fn name(&self) -> &'static str {
        match self {
            PackState::Uninitialized => "uninitialized",
            PackState::Created => "created",
            PackState::ManifestLoaded => "manifest-loaded",
            PackState::Resolving => "resolving",
            PackState::Installing => "installing",
            PackState::Ready => "ready",
            PackState::Failed(_) => "failed",
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, PackState::Failed(_))
    }

    fn allows(&self, next: &PackState) -> bool {
        use PackState::*;
        match (self, next) {
            (Failed(_), _) => false,
            (_, Failed(_)) => true,
            (Uninitialized, Created | ManifestLoaded) => true,
            (Created, ManifestLoaded) => true,
            (ManifestLoaded, Resolving) => true,
            (Resolving, Installing) => true,
            (Installing, Ready) => true,
            // A ready pack can take another register/install round.
            (Ready, Resolving) => true,
            _ => false,
        }
    }

    pub fn transition(&mut self, next: PackState) -> Result<()> {
        if !self.allows(&next) {
            return Err(McdexError::InvalidTransition {
                from: self.name().to_string(),
                to: next.name().to_string(),
            });
        }
        debug!("Pack state {} -> {}", self.name(), next.name());
        *self = next;
        Ok(())
    }

    pub fn fail(&mut self, stage: PipelineStage, error: McdexError) -> Result<()> {
        self.transition(PackState::Failed(FailureReason { stage, error }))
    }
}

impl fmt::Display for PackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PackState::Failed(reason) => write!(f, "failed during {}: {}", reason.stage, reason.error),
            other => f.write_str(other.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_path_reaches_ready() {
        let mut state = PackState::default();
        state.transition(PackState::Created).unwrap();
        state.transition(PackState::ManifestLoaded).unwrap();
        state.transition(PackState::Resolving).unwrap();
        state.transition(PackState::Installing).unwrap();
        state.transition(PackState::Ready).unwrap();
        state.transition(PackState::Resolving).unwrap();
    }

    #[test]
    fn skipping_stages_is_rejected() {
        let mut state = PackState::ManifestLoaded;
        let err = state.transition(PackState::Ready).unwrap_err();
        assert!(matches!(err, McdexError::InvalidTransition { .. }));
        assert!(matches!(state, PackState::ManifestLoaded));
    }

    #[test]
    fn failed_is_terminal() {
        let mut state = PackState::Resolving;
        state
            .fail(PipelineStage::Resolve, McdexError::Cancelled)
            .unwrap();
        assert!(state.is_failed());
        assert!(state.transition(PackState::Ready).is_err());
        assert!(state.fail(PipelineStage::Install, McdexError::Cancelled).is_err());
        assert_eq!(state.to_string(), "failed during resolve: Operation cancelled");
    }
}
